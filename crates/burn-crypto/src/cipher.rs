//! AES-256-GCM encryption of a whole secret
//!
//! Envelope fields (both standard base64):
//! ```text
//! iv         = [12 bytes: random, fresh per call]
//! ciphertext = [N bytes: ciphertext][16 bytes: GCM tag]
//! ```
//!
//! This matches what WebCrypto produces for `{ name: "AES-GCM", iv }`, so a
//! browser client and this crate can open each other's envelopes.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;

use burn_core::Envelope;

use crate::encoding;
use crate::error::CryptoError;
use crate::keys::SymmetricKey;
use crate::{IV_SIZE, TAG_SIZE};

/// The encrypted half of an envelope, in transport form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub iv: String,
    pub ciphertext: String,
}

/// Encrypt `plaintext` under `key` with a freshly drawn IV.
///
/// The IV is never taken from the caller, so two calls can only share one by
/// a 96-bit random collision.
pub fn encrypt(plaintext: &[u8], key: &SymmetricKey) -> Result<Sealed, CryptoError> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let mut iv = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);
    let nonce = Nonce::from_slice(&iv);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok(Sealed {
        iv: encoding::encode(&iv),
        ciphertext: encoding::encode(&ciphertext),
    })
}

/// Decrypt and verify. Either the full plaintext comes back or an error does.
pub fn decrypt(iv: &str, ciphertext: &str, key: &SymmetricKey) -> Result<Vec<u8>, CryptoError> {
    let iv = encoding::decode(iv)?;
    if iv.len() != IV_SIZE {
        return Err(CryptoError::InvalidIv {
            expected: IV_SIZE,
            got: iv.len(),
        });
    }

    let ciphertext = encoding::decode(ciphertext)?;
    if ciphertext.len() < TAG_SIZE {
        // Too short to even hold a tag; cannot have been produced by us.
        return Err(CryptoError::AuthenticationFailure);
    }

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    cipher
        .decrypt(Nonce::from_slice(&iv), ciphertext.as_ref())
        .map_err(|_| CryptoError::AuthenticationFailure)
}

/// Encrypt a secret and wrap it with its metadata.
pub fn seal(
    plaintext: &[u8],
    content_type: &str,
    filename: Option<&str>,
    key: &SymmetricKey,
) -> Result<Envelope, CryptoError> {
    let Sealed { iv, ciphertext } = encrypt(plaintext, key)?;
    Ok(Envelope {
        iv,
        ciphertext,
        content_type: content_type.to_string(),
        filename: filename.map(str::to_string),
    })
}

/// Recover the plaintext of an envelope.
pub fn open(envelope: &Envelope, key: &SymmetricKey) -> Result<Vec<u8>, CryptoError> {
    decrypt(&envelope.iv, &envelope.ciphertext, key)
}

//! Per-secret symmetric key: generation and text form

use base64::{
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD},
    Engine as _,
};
use rand::RngCore;
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::KEY_SIZE;

/// A 256-bit key for one secret. Zeroized on drop, never sent to the server.
#[derive(Clone)]
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Standard base64, the form carried in a share link fragment.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.bytes)
    }

    /// Parse a key from its base64 form.
    ///
    /// Accepts the standard and URL-safe alphabets, padded or not, since links
    /// get rewritten by chat clients and browsers.
    pub fn from_base64(text: &str) -> Result<Self, CryptoError> {
        let text = text.trim();
        let mut raw = STANDARD
            .decode(text)
            .or_else(|_| STANDARD_NO_PAD.decode(text))
            .or_else(|_| URL_SAFE.decode(text))
            .or_else(|_| URL_SAFE_NO_PAD.decode(text))
            .map_err(|e| CryptoError::Encoding(format!("key is not base64: {e}")))?;

        if raw.len() != KEY_SIZE {
            let got = raw.len();
            raw.zeroize();
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                got,
            });
        }

        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&raw);
        raw.zeroize();
        Ok(Self::from_bytes(bytes))
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random 256-bit key from the OS-seeded CSPRNG.
pub fn generate_key() -> SymmetricKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    SymmetricKey::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_generation() {
        let k1 = generate_key();
        let k2 = generate_key();
        assert_ne!(k1.as_bytes(), k2.as_bytes(), "random keys must differ");
    }

    #[test]
    fn test_base64_roundtrip() {
        let key = generate_key();
        let parsed = SymmetricKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(key.as_bytes(), parsed.as_bytes());
    }

    #[test]
    fn test_url_safe_accepted() {
        let key = SymmetricKey::from_bytes([0xFB; KEY_SIZE]);
        let url_safe = URL_SAFE_NO_PAD.encode(key.as_bytes());
        assert!(url_safe.contains('-') || url_safe.contains('_'));
        assert_eq!(
            SymmetricKey::from_base64(&url_safe).unwrap().as_bytes(),
            key.as_bytes()
        );
    }

    #[test]
    fn test_standard_without_padding_accepted() {
        let key = SymmetricKey::from_bytes([0xFB; KEY_SIZE]);
        let unpadded = STANDARD_NO_PAD.encode(key.as_bytes());
        assert!(unpadded.contains('+') || unpadded.contains('/'));
        assert_eq!(
            SymmetricKey::from_base64(&unpadded).unwrap().as_bytes(),
            key.as_bytes()
        );
    }

    #[test]
    fn test_wrong_length_rejected() {
        let short = STANDARD.encode([1u8; 16]);
        assert!(matches!(
            SymmetricKey::from_base64(&short),
            Err(CryptoError::InvalidKeyLength {
                expected: 32,
                got: 16
            })
        ));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = SymmetricKey::from_bytes([0x41; KEY_SIZE]);
        let dbg = format!("{key:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains(&key.to_base64()));
    }
}

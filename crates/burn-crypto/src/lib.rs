//! burn-crypto: client-side E2E encryption for burnnote
//!
//! The server only ever sees an [`Envelope`](burn_core::Envelope). The key is
//! generated here, used here, and leaves the client only inside the fragment
//! of a share link.
//!
//! ```text
//! generate_key()  ──►  256-bit random key
//! seal(plaintext) ──►  Envelope { iv: random 96-bit, ciphertext: AES-256-GCM(pt) || tag }
//! ShareLink       ──►  https://host/#<base64 key>?id=<secret id>
//! ```

pub mod cipher;
pub mod encoding;
pub mod error;
pub mod keys;
pub mod link;

pub use cipher::{decrypt, encrypt, open, seal, Sealed};
pub use error::{CryptoError, LinkError};
pub use keys::{generate_key, SymmetricKey};
pub use link::ShareLink;

/// Size of a symmetric key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM initialization vector (96-bit)
pub const IV_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

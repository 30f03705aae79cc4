use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// Tag did not verify: wrong key, corrupted data, or tampering.
    #[error("authentication failed: wrong key or corrupted ciphertext")]
    AuthenticationFailure,

    #[error("invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("invalid iv length: expected {expected} bytes, got {got}")]
    InvalidIv { expected: usize, got: usize },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link has no fragment; the key travels after '#'")]
    MissingFragment,

    #[error("link fragment does not contain a key")]
    MissingKey,

    #[error("link does not contain an id")]
    MissingId,

    #[error("link id is not a valid secret id")]
    InvalidId,

    #[error("key appears outside the link fragment")]
    KeyOutsideFragment,

    #[error("link key: {0}")]
    Key(#[from] CryptoError),
}

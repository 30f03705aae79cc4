//! Transport-safe text form for binary data (standard base64, padded).

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::CryptoError;

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode(text: &str) -> Result<Vec<u8>, CryptoError> {
    STANDARD
        .decode(text)
        .map_err(|e| CryptoError::Encoding(e.to_string()))
}

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BurnError, BurnResult};

/// Content type assumed when the sender does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Longest accepted `contentType` / `filename`, in bytes.
pub const MAX_METADATA_LEN: usize = 255;

/// Longest accepted externally supplied identifier.
pub const MAX_ID_LEN: usize = 128;

/// The stored unit: an encrypted secret plus what is needed to rebuild it.
///
/// Holds ciphertext only. The key never appears here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Base64 of the random per-encryption IV
    pub iv: String,
    /// Base64 of AEAD output (ciphertext || tag)
    #[serde(alias = "data")]
    pub ciphertext: String,
    #[serde(alias = "type", default = "default_content_type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.into()
}

impl Envelope {
    /// Structural checks done before anything is stored.
    ///
    /// The server cannot verify the ciphertext, only that it is well-formed
    /// transport data.
    pub fn validate(&self) -> BurnResult<()> {
        if self.ciphertext.is_empty() {
            return Err(BurnError::invalid("ciphertext is missing or empty"));
        }
        if self.iv.is_empty() {
            return Err(BurnError::invalid("iv is missing or empty"));
        }
        STANDARD
            .decode(&self.ciphertext)
            .map_err(|e| BurnError::invalid(format!("ciphertext is not base64: {e}")))?;
        STANDARD
            .decode(&self.iv)
            .map_err(|e| BurnError::invalid(format!("iv is not base64: {e}")))?;
        if self.content_type.len() > MAX_METADATA_LEN {
            return Err(BurnError::invalid("contentType too long"));
        }
        if let Some(name) = &self.filename {
            if name.len() > MAX_METADATA_LEN {
                return Err(BurnError::invalid("filename too long"));
            }
        }
        Ok(())
    }

    /// Size of the encoded ciphertext, for logging.
    pub fn ciphertext_len(&self) -> usize {
        self.ciphertext.len()
    }
}

/// Opaque identifier of a stored secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretId(String);

impl SecretId {
    /// Fresh identifier drawn from a random 122-bit space.
    pub fn generate() -> Self {
        SecretId(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Accept an identifier supplied by a caller.
    ///
    /// Returns `None` for anything that could never have been generated or
    /// that would be unsafe as a backing-store key.
    pub fn parse(raw: &str) -> Option<Self> {
        let ok = !raw.is_empty()
            && raw.len() <= MAX_ID_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        ok.then(|| SecretId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecretId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of `POST /api/note`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSecretRequest {
    #[serde(alias = "payload")]
    pub envelope: Envelope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
}

/// Body returned by a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSecretResponse {
    pub id: SecretId,
    /// Unix seconds after which the secret can no longer be retrieved
    pub expires_at: u64,
}

/// Body returned by a successful retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveSecretResponse {
    pub envelope: Envelope,
}

/// Uniform error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

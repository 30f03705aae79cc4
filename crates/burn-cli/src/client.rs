//! HTTP client for the burnd transfer protocol.

use std::time::Duration;

use burn_core::types::{CreateSecretRequest, CreateSecretResponse, ErrorBody, RetrieveSecretResponse};
use burn_core::{Envelope, SecretId};
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("secret not found or already burned")]
    NotFound,

    #[error("server rejected the request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

pub struct BurnClient {
    http: reqwest::Client,
    server: String,
}

impl BurnClient {
    pub fn new(server: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("burn/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ClientError::Http {
                url: server.to_string(),
                source,
            })?;
        Ok(Self {
            http,
            server: server.trim_end_matches('/').to_string(),
        })
    }

    pub fn create_url(&self) -> String {
        format!("{}/api/note", self.server)
    }

    pub fn retrieve_url(&self, id: &SecretId) -> String {
        format!("{}/api/note/{}", self.server, id)
    }

    /// Upload an envelope. The key never leaves the caller.
    pub async fn create(
        &self,
        envelope: Envelope,
        ttl_seconds: Option<u64>,
    ) -> Result<CreateSecretResponse, ClientError> {
        let url = self.create_url();
        let body = CreateSecretRequest {
            envelope,
            ttl_seconds,
        };
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|source| ClientError::Http {
                url: url.clone(),
                source,
            })?;

        let resp = check_status(resp).await?;
        resp.json()
            .await
            .map_err(|source| ClientError::Http { url, source })
    }

    /// Fetch an envelope. The server forgets it as soon as it answers.
    pub async fn retrieve(&self, id: &SecretId) -> Result<Envelope, ClientError> {
        let url = self.retrieve_url(id);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Http {
                url: url.clone(),
                source,
            })?;

        let resp = check_status(resp).await?;
        let body: RetrieveSecretResponse = resp
            .json()
            .await
            .map_err(|source| ClientError::Http { url, source })?;
        Ok(body.envelope)
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.error)
        .unwrap_or(text);
    Err(ClientError::Rejected { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_strip_trailing_slash() {
        let client = BurnClient::new("https://burn.example/", Duration::from_secs(5)).unwrap();
        let id = SecretId::parse("abc123").unwrap();

        assert_eq!(client.create_url(), "https://burn.example/api/note");
        assert_eq!(
            client.retrieve_url(&id),
            "https://burn.example/api/note/abc123"
        );
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(
            ClientError::NotFound.to_string(),
            "secret not found or already burned"
        );
    }
}

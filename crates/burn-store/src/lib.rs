//! burn-store: consume-once secret storage
//!
//! Two interchangeable backings sit behind [`SecretStore`]:
//! - [`MemoryStore`]: in-process, mutex-guarded shards, lives as long as the service
//! - [`NatsStore`]: NATS JetStream key-value bucket shared by every instance
//!
//! Both guarantee that of any number of concurrent `consume` calls for one id,
//! exactly one receives the envelope.

pub mod backend;
pub mod memory;
pub mod nats;

#[cfg(test)]
mod contract;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use burn_core::{Envelope, SecretId};

pub use backend::open_store;
pub use memory::MemoryStore;
pub use nats::NatsStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Backing store unreachable, timed out, or returned an error.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("ttl out of range: {0:?}")]
    InvalidTtl(Duration),
}

impl From<StoreError> for burn_core::BurnError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => burn_core::BurnError::StoreUnavailable(msg),
            StoreError::InvalidTtl(ttl) => {
                burn_core::BurnError::InvalidPayload(format!("ttl out of range: {ttl:?}"))
            }
        }
    }
}

/// Mapping from identifier to envelope with atomic read-and-remove.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Store `envelope` under a fresh random id; it expires after `ttl`.
    async fn create(&self, envelope: Envelope, ttl: Duration) -> Result<SecretId, StoreError>;

    /// Read and remove in one step.
    ///
    /// `Ok(None)` covers never-created, expired and already-consumed alike.
    async fn consume(&self, id: &SecretId) -> Result<Option<Envelope>, StoreError>;

    /// Cheap round trip proving the backing answers.
    async fn check_health(&self) -> Result<(), StoreError>;

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;
}

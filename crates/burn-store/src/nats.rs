//! Shared backing on a NATS JetStream key-value bucket.
//!
//! Bucket layout:
//! ```text
//! bucket   = <config.bucket>, history = 1, max_age = max TTL
//! key      = secret id
//! value    = JSON { envelope, expiresAtMs }
//! ```
//!
//! Consume is read-then-compare-and-delete: the delete carries the revision
//! that was read and the server rejects it if the key has moved on. Only one
//! caller can delete a given revision, so only one caller returns the
//! envelope. `history = 1` means the delete marker replaces the ciphertext.

use async_nats::jetstream::{self, kv};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use burn_core::config::NatsConfig;
use burn_core::{Envelope, SecretId};

use crate::{SecretStore, StoreError};

/// Key probed by health checks; never written.
const HEALTH_PROBE_KEY: &str = "burnnote-health-probe";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    envelope: Envelope,
    expires_at_ms: u64,
}

/// Secrets held in a JetStream KV bucket, visible to every service instance.
pub struct NatsStore {
    kv: kv::Store,
    timeout: Duration,
}

impl NatsStore {
    /// Connect to NATS and open (or create) the bucket.
    ///
    /// `max_ttl` becomes the bucket's `max_age`, so nothing outlives it even
    /// if no reader ever comes. An existing bucket is refused unless it keeps a
    /// single revision per key and holds values at least `max_ttl`.
    pub async fn connect(config: &NatsConfig, max_ttl: Duration) -> Result<Self, StoreError> {
        let timeout = config.timeout();
        let client = async_nats::ConnectOptions::new()
            .connection_timeout(timeout)
            .request_timeout(Some(timeout))
            .connect(config.url.as_str())
            .await
            .map_err(|e| {
                StoreError::Unavailable(format!("connecting to NATS at {}: {e}", config.url))
            })?;
        info!(url = %config.url, "NATS: connected");

        let js = jetstream::new(client);
        let kv = match js.get_key_value(config.bucket.as_str()).await {
            Ok(kv) => {
                let status = kv.status().await.map_err(|e| {
                    StoreError::Unavailable(format!("reading KV bucket {}: {e}", config.bucket))
                })?;
                check_bucket(&config.bucket, status.history(), status.max_age(), max_ttl)?;
                kv
            }
            Err(e) => {
                debug!(bucket = %config.bucket, "NATS: bucket lookup failed ({e}), creating");
                js.create_key_value(kv::Config {
                    bucket: config.bucket.clone(),
                    history: 1,
                    max_age: max_ttl,
                    storage: jetstream::stream::StorageType::File,
                    ..Default::default()
                })
                .await
                .map_err(|e| {
                    StoreError::Unavailable(format!("creating KV bucket {}: {e}", config.bucket))
                })?
            }
        };
        info!(bucket = %config.bucket, "NATS: KV bucket ready");

        Ok(Self { kv, timeout })
    }

    /// Run one store call under the configured timeout.
    async fn bounded<T, E, F>(&self, what: &str, call: F) -> Result<T, StoreError>
    where
        E: Display,
        F: Future<Output = Result<T, E>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StoreError::Unavailable(format!("{what}: {e}"))),
            Err(_) => Err(StoreError::Unavailable(format!(
                "{what}: timed out after {:?}",
                self.timeout
            ))),
        }
    }

    /// Latest live entry for `id`, ignoring delete/purge markers.
    async fn live_entry(&self, id: &SecretId) -> Result<Option<kv::Entry>, StoreError> {
        let entry = self
            .bounded("reading secret", self.kv.entry(id.as_str()))
            .await?;
        Ok(entry.filter(|e| matches!(e.operation, kv::Operation::Put)))
    }
}

/// An existing bucket must keep one revision per key, or consumed ciphertext
/// stays in the stream, and must not age values out before `max_ttl`.
fn check_bucket(
    bucket: &str,
    history: i64,
    max_age: Duration,
    max_ttl: Duration,
) -> Result<(), StoreError> {
    if history != 1 {
        return Err(StoreError::Unavailable(format!(
            "KV bucket {bucket} keeps {history} revisions per key, need 1"
        )));
    }
    if max_age < max_ttl {
        return Err(StoreError::Unavailable(format!(
            "KV bucket {bucket} max_age {max_age:?} is shorter than max ttl {max_ttl:?}"
        )));
    }
    Ok(())
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[async_trait]
impl SecretStore for NatsStore {
    async fn create(&self, envelope: Envelope, ttl: Duration) -> Result<SecretId, StoreError> {
        let ttl_ms = u64::try_from(ttl.as_millis()).map_err(|_| StoreError::InvalidTtl(ttl))?;
        let expires_at_ms = now_ms()
            .checked_add(ttl_ms)
            .ok_or(StoreError::InvalidTtl(ttl))?;

        let record = StoredRecord {
            envelope,
            expires_at_ms,
        };
        let value = serde_json::to_vec(&record)
            .map_err(|e| StoreError::Unavailable(format!("encoding record: {e}")))?;

        let id = SecretId::generate();
        // `create` refuses to overwrite an existing key.
        self.bounded(
            "storing secret",
            self.kv.create(id.as_str(), bytes::Bytes::from(value)),
        )
        .await?;
        Ok(id)
    }

    async fn consume(&self, id: &SecretId) -> Result<Option<Envelope>, StoreError> {
        let Some(entry) = self.live_entry(id).await? else {
            return Ok(None);
        };
        let revision = entry.revision;

        let deleted = self
            .bounded(
                "deleting secret",
                self.kv.delete_expect_revision(id.as_str(), Some(revision)),
            )
            .await;

        if let Err(err) = deleted {
            // A rejected compare-and-delete means another reader got there
            // first. Anything else is a real failure.
            let current = self.live_entry(id).await?;
            if matches!(&current, Some(e) if e.revision == revision) {
                return Err(err);
            }
            debug!(id = %id, revision, "NATS: lost consume race");
            return Ok(None);
        }

        let record: StoredRecord = match serde_json::from_slice(&entry.value) {
            Ok(record) => record,
            Err(e) => {
                warn!(id = %id, "NATS: discarded undecodable record: {e}");
                return Ok(None);
            }
        };

        if record.expires_at_ms <= now_ms() {
            debug!(id = %id, "NATS: dropped expired secret on read");
            return Ok(None);
        }
        Ok(Some(record.envelope))
    }

    async fn check_health(&self) -> Result<(), StoreError> {
        self.bounded("health probe", self.kv.get(HEALTH_PROBE_KEY))
            .await
            .map(|_| ())
    }

    fn backend(&self) -> &'static str {
        "nats"
    }
}

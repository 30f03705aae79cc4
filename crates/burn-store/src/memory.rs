//! In-process backing: sharded maps with read-time expiry and a background sweep.
//!
//! A record is removed from its shard under the shard lock before its expiry
//! is checked, so two consumers of the same id can never both see it. Expiry
//! is enforced at read time; the sweeper only reclaims memory.

use async_trait::async_trait;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use burn_core::{Envelope, SecretId};

use crate::{SecretStore, StoreError};

const SHARD_COUNT: usize = 16;

struct Record {
    envelope: Envelope,
    expires_at: Instant,
}

impl Record {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

type Shard = Mutex<HashMap<SecretId, Record>>;

/// Secrets held in this process only. Lost on restart.
pub struct MemoryStore {
    shards: Vec<Shard>,
    hasher: RandomState,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect(),
            hasher: RandomState::new(),
        }
    }

    fn shard(&self, id: &SecretId) -> &Shard {
        let idx = self.hasher.hash_one(id) as usize % SHARD_COUNT;
        &self.shards[idx]
    }

    /// Drop every expired record. Returns how many were removed.
    pub async fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut evicted = 0;
        for shard in &self.shards {
            let mut map = shard.lock().await;
            let before = map.len();
            map.retain(|_, record| record.is_live(now));
            evicted += before - map.len();
        }
        evicted
    }

    /// Records currently held, expired or not.
    pub async fn len(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.lock().await.len();
        }
        total
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Run [`evict_expired`](Self::evict_expired) every `interval` until the
    /// store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(store) = weak.upgrade() else {
                    break;
                };
                let evicted = store.evict_expired().await;
                if evicted > 0 {
                    debug!(evicted, "memory store: swept expired secrets");
                }
            }
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn create(&self, envelope: Envelope, ttl: Duration) -> Result<SecretId, StoreError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or(StoreError::InvalidTtl(ttl))?;

        loop {
            let id = SecretId::generate();
            let mut map = self.shard(&id).lock().await;
            if map.contains_key(&id) {
                continue;
            }
            map.insert(
                id.clone(),
                Record {
                    envelope,
                    expires_at,
                },
            );
            return Ok(id);
        }
    }

    async fn consume(&self, id: &SecretId) -> Result<Option<Envelope>, StoreError> {
        let record = self.shard(id).lock().await.remove(id);
        match record {
            Some(record) if record.is_live(Instant::now()) => Ok(Some(record.envelope)),
            Some(_) => {
                debug!(id = %id, "memory store: dropped expired secret on read");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn check_health(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract;

    #[tokio::test]
    async fn consume_once() {
        contract::consume_once(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn unknown_id_is_none() {
        contract::unknown_id_is_none(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn ids_are_distinct() {
        contract::ids_are_distinct(&MemoryStore::new()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_consume_single_winner() {
        let store: Arc<dyn SecretStore> = Arc::new(MemoryStore::new());
        contract::concurrent_consume_single_winner(store, 64).await;
    }

    #[tokio::test(start_paused = true)]
    async fn expired_secret_is_none_without_sweep() {
        let store = MemoryStore::new();
        let id = store
            .create(contract::envelope(b"ttl"), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(store.len().await, 1, "record still physically present");
        assert!(store.consume(&id).await.unwrap().is_none());
        assert!(store.is_empty().await, "expired record dropped on read");
    }

    #[tokio::test(start_paused = true)]
    async fn live_secret_before_ttl() {
        let store = MemoryStore::new();
        let id = store
            .create(contract::envelope(b"ttl"), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(store.consume(&id).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn evict_expired_only_removes_expired() {
        let store = MemoryStore::new();
        store
            .create(contract::envelope(b"short"), Duration::from_secs(10))
            .await
            .unwrap();
        let keep = store
            .create(contract::envelope(b"long"), Duration::from_secs(100))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;

        assert_eq!(store.evict_expired().await, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.consume(&keep).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_reclaims_expired() {
        let store = Arc::new(MemoryStore::new());
        let handle = store.spawn_sweeper(Duration::from_secs(5));

        store
            .create(contract::envelope(b"sweep"), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(store.len().await, 1);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(store.is_empty().await);

        drop(store);
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(handle.is_finished(), "sweeper stops once the store is gone");
    }

    #[tokio::test]
    async fn overflowing_ttl_rejected() {
        let store = MemoryStore::new();
        let res = store
            .create(contract::envelope(b"x"), Duration::from_secs(u64::MAX))
            .await;
        assert!(matches!(res, Err(StoreError::InvalidTtl(_))));
    }
}

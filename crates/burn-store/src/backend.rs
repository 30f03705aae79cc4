//! Pick and build the configured backing at startup.

use std::sync::Arc;
use tracing::{info, warn};

use burn_core::config::{BackendKind, StoreConfig};

use crate::memory::MemoryStore;
use crate::nats::NatsStore;
use crate::{SecretStore, StoreError};

/// Build the backing named by `config.backend`.
///
/// The memory backing gets its sweeper started here. If NATS is unreachable
/// and `fallback_to_memory` is set, the memory backing is used instead.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn SecretStore>, StoreError> {
    match config.backend {
        BackendKind::Memory => Ok(open_memory(config)),
        BackendKind::Nats => match NatsStore::connect(&config.nats, config.max_ttl()).await {
            Ok(store) => Ok(Arc::new(store)),
            Err(e) if config.fallback_to_memory => {
                warn!("NATS backing unavailable: {e}  (falling back to memory)");
                Ok(open_memory(config))
            }
            Err(e) => Err(e),
        },
    }
}

fn open_memory(config: &StoreConfig) -> Arc<dyn SecretStore> {
    let store = Arc::new(MemoryStore::new());
    // The task ends by itself once the store is dropped.
    let _sweeper = store.spawn_sweeper(config.sweep_interval());
    info!(
        sweep_interval_secs = config.sweep_interval_secs,
        "memory store ready"
    );
    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_core::config::NatsConfig;

    #[tokio::test]
    async fn memory_backend_selected() {
        let store = open_store(&StoreConfig::default()).await.unwrap();
        assert_eq!(store.backend(), "memory");
        assert!(store.check_health().await.is_ok());
    }

    fn unreachable_nats(fallback: bool) -> StoreConfig {
        StoreConfig {
            backend: BackendKind::Nats,
            fallback_to_memory: fallback,
            nats: NatsConfig {
                url: "nats://127.0.0.1:1".into(),
                timeout_ms: 200,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn nats_failure_without_fallback() {
        let res = open_store(&unreachable_nats(false)).await;
        assert!(matches!(res, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn nats_failure_with_fallback() {
        let store = open_store(&unreachable_nats(true)).await.unwrap();
        assert_eq!(store.backend(), "memory");
    }
}

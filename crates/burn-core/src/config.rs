use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{BurnError, BurnResult};

/// Top-level service configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BurnConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP listen address (default: 127.0.0.1:4000)
    pub listen: String,
    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,
    /// Log level (default: info)
    pub log_level: String,
    /// Log format: "json" or "text"
    pub log_format: String,
    /// Serve Prometheus metrics on /metrics
    pub metrics: bool,
}

/// Which backing implementation holds the secrets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process, lost on restart
    #[default]
    Memory,
    /// NATS JetStream key-value bucket, shared between instances
    Nats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendKind,
    /// TTL applied when the uploader does not request one
    pub default_ttl_secs: u64,
    /// Largest TTL an uploader may request
    pub max_ttl_secs: u64,
    /// How often the memory backing evicts expired records
    pub sweep_interval_secs: u64,
    /// Start on the memory backing if NATS is unreachable at startup
    pub fallback_to_memory: bool,
    pub nats: NatsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// JetStream key-value bucket name
    pub bucket: String,
    /// Upper bound on any single round trip
    pub timeout_ms: u64,
}

impl BurnConfig {
    /// Reject combinations that would make the service misbehave.
    pub fn validate(&self) -> BurnResult<()> {
        let store = &self.store;
        if store.max_ttl_secs == 0 {
            return Err(BurnError::Config("store.max_ttl_secs must be > 0".into()));
        }
        if store.default_ttl_secs == 0 || store.default_ttl_secs > store.max_ttl_secs {
            return Err(BurnError::Config(format!(
                "store.default_ttl_secs must be in 1..={}",
                store.max_ttl_secs
            )));
        }
        if store.sweep_interval_secs == 0 {
            return Err(BurnError::Config(
                "store.sweep_interval_secs must be > 0".into(),
            ));
        }
        if store.nats.timeout_ms == 0 {
            return Err(BurnError::Config("store.nats.timeout_ms must be > 0".into()));
        }
        if self.server.max_body_bytes == 0 {
            return Err(BurnError::Config("server.max_body_bytes must be > 0".into()));
        }
        Ok(())
    }
}

impl StoreConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn max_ttl(&self) -> Duration {
        Duration::from_secs(self.max_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl NatsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:4000".into(),
            max_body_bytes: 16 * 1024 * 1024,
            log_level: "info".into(),
            log_format: "text".into(),
            metrics: true,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            default_ttl_secs: 24 * 3600,
            max_ttl_secs: 7 * 24 * 3600,
            sweep_interval_secs: 60,
            fallback_to_memory: false,
            nats: NatsConfig::default(),
        }
    }
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".into(),
            bucket: "burnnote".into(),
            timeout_ms: 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[server]
listen = "0.0.0.0:8080"
max_body_bytes = 1048576
log_level = "debug"
log_format = "json"
metrics = false

[store]
backend = "nats"
default_ttl_secs = 3600
max_ttl_secs = 86400
sweep_interval_secs = 10
fallback_to_memory = true

[store.nats]
url = "nats://nats.example.com:4222"
bucket = "secrets"
timeout_ms = 250
"#;
        let config: BurnConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.server.max_body_bytes, 1048576);
        assert_eq!(config.server.log_format, "json");
        assert!(!config.server.metrics);
        assert_eq!(config.store.backend, BackendKind::Nats);
        assert_eq!(config.store.default_ttl(), Duration::from_secs(3600));
        assert_eq!(config.store.max_ttl(), Duration::from_secs(86400));
        assert!(config.store.fallback_to_memory);
        assert_eq!(config.store.nats.bucket, "secrets");
        assert_eq!(config.store.nats.timeout(), Duration::from_millis(250));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_defaults() {
        let config: BurnConfig = toml::from_str("").unwrap();

        assert_eq!(config.server.listen, "127.0.0.1:4000");
        assert_eq!(config.server.log_level, "info");
        assert!(config.server.metrics);
        assert_eq!(config.store.backend, BackendKind::Memory);
        assert_eq!(config.store.default_ttl_secs, 86400);
        assert_eq!(config.store.max_ttl_secs, 604800);
        assert!(!config.store.fallback_to_memory);
        assert_eq!(config.store.nats.url, "nats://localhost:4222");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[store.nats]
url = "nats://10.0.0.5:4222"
"#;
        let config: BurnConfig = toml::from_str(toml_str).unwrap();

        // Overridden
        assert_eq!(config.store.nats.url, "nats://10.0.0.5:4222");
        // Defaults
        assert_eq!(config.store.nats.bucket, "burnnote");
        assert_eq!(config.store.backend, BackendKind::Memory);
        assert_eq!(config.server.listen, "127.0.0.1:4000");
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let res: Result<BurnConfig, _> = toml::from_str("[store]\nbackend = \"redis\"\n");
        assert!(res.is_err());
    }

    #[test]
    fn test_validate_default_above_max() {
        let mut config = BurnConfig::default();
        config.store.default_ttl_secs = config.store.max_ttl_secs + 1;
        assert!(matches!(config.validate(), Err(BurnError::Config(_))));
    }

    #[test]
    fn test_validate_zero_values() {
        let mut config = BurnConfig::default();
        config.store.default_ttl_secs = 0;
        assert!(config.validate().is_err());

        let mut config = BurnConfig::default();
        config.store.nats.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = BurnConfig::default();
        config.store.sweep_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nlisten = \"127.0.0.1:9999\"").unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let config: BurnConfig = toml::from_str(&content).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:9999");
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = BurnConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: BurnConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.server.listen, parsed.server.listen);
        assert_eq!(config.store.backend, parsed.store.backend);
        assert_eq!(config.store.nats.url, parsed.store.nats.url);
    }
}

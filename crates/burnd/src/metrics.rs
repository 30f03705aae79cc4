//! Prometheus /metrics + health check HTTP endpoints
//!
//! Endpoints:
//!   GET /metrics  Prometheus text format
//!   GET /healthz  Liveness probe (always 200 if process is running)
//!   GET /readyz   Readiness probe (200 if the secret store answers)

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use prometheus_client::{encoding::text::encode, metrics::counter::Counter, registry::Registry};

use crate::api::AppState;

/// Counters for the transfer protocol. Never labelled by secret id.
pub struct Metrics {
    registry: Registry,
    pub created: Counter,
    pub consumed: Counter,
    pub not_found: Counter,
    pub store_errors: Counter,
    pub invalid_requests: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("burnnote");
        let created = Counter::default();
        let consumed = Counter::default();
        let not_found = Counter::default();
        let store_errors = Counter::default();
        let invalid_requests = Counter::default();

        registry.register("secrets_created", "Secrets stored", created.clone());
        registry.register(
            "secrets_consumed",
            "Secrets handed out and destroyed",
            consumed.clone(),
        );
        registry.register(
            "secrets_not_found",
            "Retrievals of unknown, expired or consumed secrets",
            not_found.clone(),
        );
        registry.register(
            "store_errors",
            "Backing store failures",
            store_errors.clone(),
        );
        registry.register(
            "invalid_requests",
            "Uploads rejected as invalid",
            invalid_requests.clone(),
        );

        Self {
            registry,
            created,
            consumed,
            not_found,
            store_errors,
            invalid_requests,
        }
    }

    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => {
            tracing::error!("metrics encode failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                e.to_string(),
            )
        }
    }
}

/// Liveness probe: returns 200 if the process is running.
pub async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness probe: returns 200 if the store is reachable, 503 otherwise.
pub async fn readyz_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.check_health().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::warn!(backend = state.store.backend(), "readiness check failed: {e}");
            (StatusCode::SERVICE_UNAVAILABLE, "store unreachable")
        }
    }
}

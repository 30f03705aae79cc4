//! HTTP transfer protocol: upload an envelope, retrieve it exactly once.
//!
//! The service only ever handles ciphertext. The decryption key is not part
//! of any request, so nothing here can log or store it.

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info};

use burn_core::config::BurnConfig;
use burn_core::types::{
    CreateSecretRequest, CreateSecretResponse, ErrorBody, RetrieveSecretResponse,
};
use burn_core::{BurnError, SecretId};
use burn_store::SecretStore;

use crate::metrics::{self, Metrics};

/// TTL bounds applied to uploads.
#[derive(Debug, Clone, Copy)]
pub struct TtlPolicy {
    pub default_ttl: Duration,
    pub max_ttl: Duration,
}

impl TtlPolicy {
    /// Requested TTL, or the default. Zero and over-limit requests are
    /// rejected rather than clamped.
    pub fn resolve(&self, requested_secs: Option<u64>) -> Result<Duration, BurnError> {
        let Some(secs) = requested_secs else {
            return Ok(self.default_ttl);
        };
        let ttl = Duration::from_secs(secs);
        if secs == 0 || ttl > self.max_ttl {
            return Err(BurnError::invalid(format!(
                "ttlSeconds must be in 1..={}",
                self.max_ttl.as_secs()
            )));
        }
        Ok(ttl)
    }
}

/// Everything a handler needs, injected at startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SecretStore>,
    pub ttl: TtlPolicy,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(store: Arc<dyn SecretStore>, config: &BurnConfig) -> Self {
        Self {
            store,
            ttl: TtlPolicy {
                default_ttl: config.store.default_ttl(),
                max_ttl: config.store.max_ttl(),
            },
            metrics: Arc::new(Metrics::new()),
        }
    }
}

pub fn router(state: AppState, config: &BurnConfig) -> Router {
    let mut app = Router::new()
        .route("/api/note", post(create_secret))
        .route("/api/note/{id}", get(retrieve_secret))
        .route("/api/health", get(health))
        .route("/healthz", get(metrics::healthz_handler))
        .route("/readyz", get(metrics::readyz_handler));

    if config.server.metrics {
        app = app.route("/metrics", get(metrics::metrics_handler));
    }

    app.layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .with_state(state)
}

/// Error response. Bodies are `{"error": "..."}`.
pub enum ApiError {
    Burn(BurnError),
    Rejected(JsonRejection),
}

impl From<BurnError> for ApiError {
    fn from(err: BurnError) -> Self {
        ApiError::Burn(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Burn(BurnError::InvalidPayload(msg)) => {
                (StatusCode::BAD_REQUEST, format!("invalid payload: {msg}"))
            }
            ApiError::Burn(BurnError::NotFound) => (
                StatusCode::NOT_FOUND,
                "secret not found or already burned".to_string(),
            ),
            ApiError::Burn(BurnError::StoreUnavailable(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "secret store unavailable".to_string(),
            ),
            ApiError::Burn(other) => {
                error!("request failed: {other}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
            ApiError::Rejected(rejection)
                if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE =>
            {
                (StatusCode::PAYLOAD_TOO_LARGE, rejection.body_text())
            }
            ApiError::Rejected(rejection) => (
                StatusCode::BAD_REQUEST,
                format!("invalid payload: {}", rejection.body_text()),
            ),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

async fn create_secret(
    State(state): State<AppState>,
    body: Result<Json<CreateSecretRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateSecretResponse>), ApiError> {
    let Json(request) = body
        .inspect_err(|_| {
            state.metrics.invalid_requests.inc();
        })
        .map_err(ApiError::Rejected)?;

    let ttl = request
        .envelope
        .validate()
        .and_then(|()| state.ttl.resolve(request.ttl_seconds))
        .inspect_err(|e| {
            state.metrics.invalid_requests.inc();
            debug!("upload rejected: {e}");
        })?;

    let ciphertext_len = request.envelope.ciphertext_len();
    let id = state
        .store
        .create(request.envelope, ttl)
        .await
        .map_err(|e| {
            state.metrics.store_errors.inc();
            error!(backend = state.store.backend(), "create failed: {e}");
            BurnError::from(e)
        })?;

    state.metrics.created.inc();
    info!(id = %id, ttl_secs = ttl.as_secs(), ciphertext_len, "secret stored");

    let expires_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .saturating_add(ttl)
        .as_secs();
    Ok((
        StatusCode::CREATED,
        Json(CreateSecretResponse { id, expires_at }),
    ))
}

async fn retrieve_secret(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<RetrieveSecretResponse>, ApiError> {
    // A malformed id gets the same answer as a consumed one.
    let Some(id) = SecretId::parse(&raw_id) else {
        state.metrics.not_found.inc();
        return Err(BurnError::NotFound.into());
    };

    let envelope = state.store.consume(&id).await.map_err(|e| {
        state.metrics.store_errors.inc();
        error!(id = %id, backend = state.store.backend(), "consume failed: {e}");
        BurnError::from(e)
    })?;

    match envelope {
        Some(envelope) => {
            state.metrics.consumed.inc();
            info!(id = %id, "secret retrieved and destroyed");
            Ok(Json(RetrieveSecretResponse { envelope }))
        }
        None => {
            state.metrics.not_found.inc();
            debug!(id = %id, "secret not available");
            Err(BurnError::NotFound.into())
        }
    }
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    time: String,
    backend: &'static str,
}

async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        time: chrono::Utc::now().to_rfc3339(),
        backend: state.store.backend(),
    })
}

use thiserror::Error;

pub type BurnResult<T> = Result<T, BurnError>;

/// Errors surfaced across the transfer protocol.
///
/// `NotFound` deliberately carries no detail: an absent, expired and already
/// consumed secret must look the same to the caller.
#[derive(Debug, Error)]
pub enum BurnError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("secret not found")]
    NotFound,

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BurnError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        BurnError::InvalidPayload(msg.into())
    }
}

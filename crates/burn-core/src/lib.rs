pub mod config;
pub mod error;
pub mod types;

pub use error::{BurnError, BurnResult};
pub use types::{Envelope, SecretId};

//! Engine-level error type. `NotFound` and `Store` surface to the façade,
//! `Validation` is rejected before reaching the engine, `Cancelled` is
//! cooperative monitor shutdown rather than a true error. The linguistic
//! dispatcher has no error variant here because it recovers from failures
//! locally and never surfaces one.

use crate::store::StorageError;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(StorageError),

    #[error("cancelled")]
    Cancelled,
}

impl From<StorageError> for EngineError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(msg) => EngineError::NotFound(msg),
            other => EngineError::Store(other),
        }
    }
}

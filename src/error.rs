//! Crate-level error taxonomy.
//!
//! Storage internals use `anyhow` for context chaining; everything that
//! crosses the public API surfaces as a `VigilError` so callers can react
//! to the cases that matter (missing session, ended session, rejected
//! event) without string matching.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VigilError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session {0} has already ended")]
    SessionEnded(String),

    #[error("invalid event: {0}")]
    Validation(String),

    #[error("storage failure: {0}")]
    Storage(#[source] anyhow::Error),
}

impl From<anyhow::Error> for VigilError {
    fn from(err: anyhow::Error) -> Self {
        // Atomic append raises domain errors from inside the storage
        // closure; unwrap them instead of burying them in a Storage chain.
        match err.downcast::<VigilError>() {
            Ok(domain) => domain,
            Err(other) => VigilError::Storage(other),
        }
    }
}

impl From<rusqlite::Error> for VigilError {
    fn from(err: rusqlite::Error) -> Self {
        VigilError::Storage(anyhow::Error::new(err))
    }
}

pub type Result<T, E = VigilError> = std::result::Result<T, E>;

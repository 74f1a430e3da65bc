//! Store error types.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing session/connection was disposed and must be recreated.
    /// `JobStore::with_retry` retries exactly once on this variant (spec
    /// §4.4: "if the store signals a disposed session, retry once with a
    /// fresh session").
    #[error("session disposed: {0}")]
    Disposed(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self, StoreError::Disposed(_))
    }
}

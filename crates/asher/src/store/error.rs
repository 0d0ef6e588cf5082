//! Storage error types.

use thiserror::Error;

/// Errors returned by conversation and key stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

use thiserror::Error;

use crate::llm::ProviderError;
use crate::store::StoreError;

/// Whole-request failures. Inside a batch, per-provider failures are reported
/// in that provider's outcome instead.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("batch names no providers")]
    EmptyBatch,

    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("store error: {0}")]
    Store(StoreError),

    /// The only provider of a single-provider conversation call failed.
    #[error(transparent)]
    Provider(ProviderError),
}

impl From<StoreError> for GatewayError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConversationNotFound(id) => GatewayError::ConversationNotFound(id),
            other => GatewayError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_conversation_is_lifted() {
        let err = GatewayError::from(StoreError::ConversationNotFound("c9".to_string()));
        assert!(matches!(err, GatewayError::ConversationNotFound(id) if id == "c9"));

        let err = GatewayError::from(StoreError::Backend("disk full".to_string()));
        assert_eq!(err.to_string(), "store error: storage backend error: disk full");
    }
}

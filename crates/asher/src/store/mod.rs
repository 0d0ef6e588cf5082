//! Persistence collaborators for stored conversations and per-user keys.
//!
//! The gateway only depends on the traits here. The in-memory types provide
//! process-local implementations used by the binary and the tests.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::conversation::{Conversation, StoredMessage};
use crate::llm::Role;

mod error;
mod memory;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryConversationStore, MemoryKeyStore};

/// Append-only conversation storage.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_conversation(&self, title: Option<String>) -> StoreResult<Conversation>;

    /// Messages ordered by timestamp ascending.
    async fn get_ordered_messages(
        &self,
        conversation_id: &str,
    ) -> StoreResult<Vec<StoredMessage>>;

    /// Append a message. Its timestamp is later than every earlier message in
    /// the same conversation.
    async fn append_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: String,
        model_identifier: Option<String>,
    ) -> StoreResult<StoredMessage>;
}

/// Per-user API key lookup.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Key map for `user_id`, keyed by `openai`, `anthropic`, `google`, `xai`.
    /// Unknown users have an empty map.
    async fn api_keys_for(&self, user_id: &str) -> StoreResult<HashMap<String, String>>;
}

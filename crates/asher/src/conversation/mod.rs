//! Stored conversations and the per-provider view of their history.

mod filter;

pub use filter::{filter_history, visible_messages};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::Role;

/// A persisted conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted message, as returned by the store in timestamp order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    /// Provider id or model that produced an assistant message.
    #[serde(rename = "model")]
    pub model_identifier: Option<String>,
    pub timestamp: DateTime<Utc>,
}

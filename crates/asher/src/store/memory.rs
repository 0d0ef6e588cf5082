//! In-memory store implementations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;

use super::error::{StoreError, StoreResult};
use super::{ConversationStore, KeyStore};
use crate::conversation::{Conversation, StoredMessage};
use crate::llm::Role;

struct ConversationEntry {
    conversation: Conversation,
    messages: Vec<StoredMessage>,
}

/// Conversations held in a concurrent map.
///
/// Each conversation's map entry is its write boundary: appends to one
/// conversation are serialized, appends to different conversations are not.
#[derive(Clone, Default)]
pub struct MemoryConversationStore {
    conversations: Arc<DashMap<String, ConversationEntry>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, conversation_id: &str) -> Option<Conversation> {
        self.conversations
            .get(conversation_id)
            .map(|entry| entry.conversation.clone())
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn create_conversation(&self, title: Option<String>) -> StoreResult<Conversation> {
        let now = Utc::now();
        let conversation = Conversation {
            id: ulid::Ulid::new().to_string(),
            title: title.filter(|t| !t.trim().is_empty()),
            created_at: now,
            updated_at: now,
        };
        self.conversations.insert(
            conversation.id.clone(),
            ConversationEntry {
                conversation: conversation.clone(),
                messages: Vec::new(),
            },
        );
        Ok(conversation)
    }

    async fn get_ordered_messages(
        &self,
        conversation_id: &str,
    ) -> StoreResult<Vec<StoredMessage>> {
        self.conversations
            .get(conversation_id)
            .map(|entry| entry.messages.clone())
            .ok_or_else(|| StoreError::ConversationNotFound(conversation_id.to_string()))
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: String,
        model_identifier: Option<String>,
    ) -> StoreResult<StoredMessage> {
        let mut entry = self
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(|| StoreError::ConversationNotFound(conversation_id.to_string()))?;

        let timestamp = next_timestamp(entry.messages.last().map(|m| m.timestamp));
        let message = StoredMessage {
            id: ulid::Ulid::new().to_string(),
            conversation_id: conversation_id.to_string(),
            role,
            content,
            model_identifier,
            timestamp,
        };
        entry.messages.push(message.clone());
        entry.conversation.updated_at = timestamp;
        Ok(message)
    }
}

/// Wall-clock time, bumped past `last` when the clock has not advanced.
fn next_timestamp(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match last {
        Some(last) if now <= last => last + TimeDelta::microseconds(1),
        _ => now,
    }
}

/// Per-user key maps.
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    keys: Arc<DashMap<String, HashMap<String, String>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `keys` into the user's map. A blank value removes that key.
    pub fn set_api_keys(&self, user_id: &str, keys: HashMap<String, String>) {
        let mut entry = self.keys.entry(user_id.to_string()).or_default();
        for (name, value) in keys {
            let value = value.trim();
            if value.is_empty() {
                entry.remove(&name);
            } else {
                entry.insert(name, value.to_string());
            }
        }
    }

    /// Key names configured for `user_id`, sorted. Values are never exposed.
    pub fn configured_keys(&self, user_id: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .keys
            .get(user_id)
            .map(|entry| entry.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn api_keys_for(&self, user_id: &str) -> StoreResult<HashMap<String, String>> {
        Ok(self
            .keys
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }
}

//! Chat against a stored conversation.
//!
//! One snapshot of the conversation is read per request and filtered per
//! target family, so each provider only sees the user's turns and its own
//! earlier replies. Credentials come from the caller's stored key map.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{ChatGateway, ChatOutcome, GatewayError, ProviderCall, unique_ids};
use crate::conversation::{Conversation, StoredMessage, filter_history};
use crate::credentials::Credentials;
use crate::llm::{Message, ProviderFamily, Role};
use crate::store::{ConversationStore, KeyStore};

// ============================================================================
// Request/Response Types
// ============================================================================

/// A new user turn for one provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendMessage {
    pub message: String,
    #[serde(alias = "provider")]
    pub provider_id: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default, alias = "model")]
    pub model_override: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    /// The user turn is already stored (an earlier call of a client-driven
    /// batch saved it).
    #[serde(default)]
    pub skip_user_message: bool,
}

/// Messages persisted by a successful send.
#[derive(Debug, Serialize)]
pub struct MessageExchange {
    pub user_message: Option<StoredMessage>,
    pub assistant_message: StoredMessage,
}

/// One provider in a stored-conversation batch.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchTarget {
    #[serde(alias = "provider")]
    pub provider_id: String,
    #[serde(default, alias = "model")]
    pub model_override: Option<String>,
}

impl BatchTarget {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            model_override: None,
        }
    }
}

/// The same user turn sent to several providers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchSend {
    pub message: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub targets: Vec<BatchTarget>,
}

#[derive(Debug, Serialize)]
pub struct ConversationBatchEntry {
    #[serde(flatten)]
    pub outcome: ChatOutcome,
    pub assistant_message: Option<StoredMessage>,
}

#[derive(Debug, Serialize)]
pub struct ConversationBatch {
    pub user_message: StoredMessage,
    pub results: BTreeMap<String, ConversationBatchEntry>,
}

// ============================================================================
// ConversationChat
// ============================================================================

#[derive(Clone)]
pub struct ConversationChat {
    gateway: ChatGateway,
    conversations: Arc<dyn ConversationStore>,
    keys: Arc<dyn KeyStore>,
    fallback_to_env: bool,
}

impl ConversationChat {
    pub fn new(
        gateway: ChatGateway,
        conversations: Arc<dyn ConversationStore>,
        keys: Arc<dyn KeyStore>,
    ) -> Self {
        Self {
            gateway,
            conversations,
            keys,
            fallback_to_env: false,
        }
    }

    /// Let families missing from a user's key map use process-wide keys.
    #[must_use]
    pub fn with_env_fallback(mut self, enabled: bool) -> Self {
        self.fallback_to_env = enabled;
        self
    }

    pub async fn create_conversation(
        &self,
        title: Option<String>,
    ) -> Result<Conversation, GatewayError> {
        Ok(self.conversations.create_conversation(title).await?)
    }

    pub async fn messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredMessage>, GatewayError> {
        Ok(self.conversations.get_ordered_messages(conversation_id).await?)
    }

    /// Send a user turn to one provider.
    ///
    /// Nothing is persisted unless the provider replies. The stored assistant
    /// message is tagged with an identifier that classifies into the family
    /// that answered.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        user_id: &str,
        request: &SendMessage,
    ) -> Result<MessageExchange, GatewayError> {
        let snapshot = self.conversations.get_ordered_messages(conversation_id).await?;
        let credentials = self.credentials_for(user_id).await?;
        let family = self
            .gateway
            .registry()
            .family_of(&request.provider_id)
            .map_err(GatewayError::Provider)?;

        let mut history = filter_history(&snapshot, family);
        let already_stored = request.skip_user_message
            && history
                .last()
                .is_some_and(|m| m.role == Role::User && m.content == request.message);
        if !already_stored {
            history.push(Message::user(request.message.clone()));
        }

        let model_override = non_blank(request.model_override.as_deref());
        let call = ProviderCall {
            provider_id: &request.provider_id,
            model_override,
            history: &history,
            system_prompt: &request.system_prompt,
            temperature: request.temperature,
        };
        let reply = self
            .gateway
            .dispatch(call, &credentials)
            .await
            .result
            .map_err(GatewayError::Provider)?;

        let user_message = if request.skip_user_message {
            None
        } else {
            Some(
                self.conversations
                    .append_message(conversation_id, Role::User, request.message.clone(), None)
                    .await?,
            )
        };
        let assistant_message = self
            .conversations
            .append_message(
                conversation_id,
                Role::Assistant,
                reply,
                Some(reply_tag(family, &request.provider_id, model_override)),
            )
            .await?;

        Ok(MessageExchange {
            user_message,
            assistant_message,
        })
    }

    /// Send one user turn to several providers concurrently.
    ///
    /// The user turn is stored once before dispatch. Each provider's reply is
    /// stored as soon as that provider finishes, so completed replies survive
    /// if the batch is abandoned part way.
    pub async fn send_batch(
        &self,
        conversation_id: &str,
        user_id: &str,
        request: &BatchSend,
    ) -> Result<ConversationBatch, GatewayError> {
        let ids = unique_ids(request.targets.iter().map(|t| t.provider_id.as_str()))?;
        let targets: Vec<&BatchTarget> = ids
            .into_iter()
            .filter_map(|id| request.targets.iter().find(|t| t.provider_id == id))
            .collect();

        let snapshot = self.conversations.get_ordered_messages(conversation_id).await?;
        let credentials = self.credentials_for(user_id).await?;
        let user_message = self
            .conversations
            .append_message(conversation_id, Role::User, request.message.clone(), None)
            .await?;

        info!(
            conversation_id,
            providers = targets.len(),
            "dispatching conversation batch"
        );
        let members = targets.into_iter().map(|target| {
            self.run_member(conversation_id, &snapshot, target, request, &credentials)
        });
        let entries = join_all(members).await;

        Ok(ConversationBatch {
            user_message,
            results: entries
                .into_iter()
                .map(|entry| (entry.outcome.provider_id.clone(), entry))
                .collect(),
        })
    }

    async fn run_member(
        &self,
        conversation_id: &str,
        snapshot: &[StoredMessage],
        target: &BatchTarget,
        request: &BatchSend,
        credentials: &Credentials,
    ) -> ConversationBatchEntry {
        let family = match self.gateway.registry().family_of(&target.provider_id) {
            Ok(family) => family,
            Err(e) => {
                return ConversationBatchEntry {
                    outcome: ChatOutcome {
                        provider_id: target.provider_id.clone(),
                        result: Err(e),
                    },
                    assistant_message: None,
                };
            }
        };

        let mut history = filter_history(snapshot, family);
        history.push(Message::user(request.message.clone()));

        let model_override = non_blank(target.model_override.as_deref());
        let call = ProviderCall {
            provider_id: &target.provider_id,
            model_override,
            history: &history,
            system_prompt: &request.system_prompt,
            temperature: None,
        };
        let outcome = self.gateway.dispatch(call, credentials).await;

        let assistant_message = match &outcome.result {
            Ok(reply) => self
                .conversations
                .append_message(
                    conversation_id,
                    Role::Assistant,
                    reply.clone(),
                    Some(reply_tag(family, &target.provider_id, model_override)),
                )
                .await
                .inspect_err(|e| {
                    warn!(
                        conversation_id,
                        provider_id = %target.provider_id,
                        error = %e,
                        "Failed to store assistant reply"
                    )
                })
                .ok(),
            Err(_) => None,
        };

        ConversationBatchEntry {
            outcome,
            assistant_message,
        }
    }

    async fn credentials_for(&self, user_id: &str) -> Result<Credentials, GatewayError> {
        let keys = self.keys.api_keys_for(user_id).await?;
        let credentials = Credentials::from_user_keys(&keys);
        Ok(if self.fallback_to_env {
            credentials.or_fallback(self.gateway.env_credentials())
        } else {
            credentials
        })
    }
}

/// Model identifier stored on an assistant reply.
///
/// The override is kept only when it classifies back into the family that
/// answered; otherwise the provider id is stored. Either way the reply stays
/// visible to that family's later history.
fn reply_tag(
    family: ProviderFamily,
    provider_id: &str,
    model_override: Option<&str>,
) -> String {
    model_override
        .filter(|model| ProviderFamily::classify_model(model) == Some(family))
        .unwrap_or(provider_id)
        .to_string()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

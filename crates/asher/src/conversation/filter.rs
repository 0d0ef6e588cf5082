//! Provider-scoped history reconstruction.
//!
//! When one stored conversation is fanned out to several vendors, each vendor
//! sees the user's turns plus only the assistant turns its own family
//! produced. Assistant turns without a model identifier belong to nobody and
//! are dropped.

use super::StoredMessage;
use crate::llm::{Message, ProviderFamily, Role};

/// Stored messages visible to `family`, in original order.
pub fn visible_messages(
    stored: &[StoredMessage],
    family: ProviderFamily,
) -> impl Iterator<Item = &StoredMessage> {
    stored.iter().filter(move |m| match m.role {
        Role::User => true,
        Role::Assistant => m
            .model_identifier
            .as_deref()
            .and_then(ProviderFamily::classify_model)
            == Some(family),
    })
}

/// History turns to send to a provider of `family`.
pub fn filter_history(stored: &[StoredMessage], family: ProviderFamily) -> Vec<Message> {
    visible_messages(stored, family)
        .map(|m| Message {
            role: m.role,
            content: m.content.clone(),
        })
        .collect()
}

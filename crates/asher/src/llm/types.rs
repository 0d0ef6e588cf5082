//! Normalized chat turns shared by every provider adapter.

use serde::{Deserialize, Serialize};

/// A turn in a chat history.
///
/// System instructions never appear here; each adapter places the system
/// prompt according to its vendor's convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Per-call knobs forwarded to the vendor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallOptions {
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_roles() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
        assert_eq!(
            serde_json::from_str::<Role>("\"assistant\"").unwrap(),
            Role::Assistant
        );
    }

    #[test]
    fn test_system_role_is_rejected_in_history() {
        let result = serde_json::from_str::<Message>(r#"{"role":"system","content":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(
            Message::user("hi"),
            Message {
                role: Role::User,
                content: "hi".to_string()
            }
        );
        assert_eq!(Message::assistant("hey").role, Role::Assistant);
    }
}

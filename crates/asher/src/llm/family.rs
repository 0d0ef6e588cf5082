//! Provider families and the identifier rules that map onto them.
//!
//! Two rule sets live here and nowhere else:
//!
//! - [`ProviderFamily::from_provider_id`] classifies a requested provider id
//!   (`gpt-4o`, `claude`, `grok-3`, ...).
//! - [`ProviderFamily::classify_model`] classifies the model identifier stored
//!   on an assistant message, which is what the history filter keys on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the four vendor integration styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFamily {
    OpenAI,
    Claude,
    Gemini,
    Grok,
}

impl ProviderFamily {
    pub const ALL: [ProviderFamily; 4] = [
        ProviderFamily::OpenAI,
        ProviderFamily::Claude,
        ProviderFamily::Gemini,
        ProviderFamily::Grok,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderFamily::OpenAI => "openai",
            ProviderFamily::Claude => "claude",
            ProviderFamily::Gemini => "gemini",
            ProviderFamily::Grok => "grok",
        }
    }

    /// Name of the company operating the API, used in user-facing messages.
    pub fn vendor(&self) -> &'static str {
        match self {
            ProviderFamily::OpenAI => "OpenAI",
            ProviderFamily::Claude => "Anthropic",
            ProviderFamily::Gemini => "Google",
            ProviderFamily::Grok => "xAI",
        }
    }

    /// Process-wide environment variable holding this family's API key.
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderFamily::OpenAI => "OPENAI_API_KEY",
            ProviderFamily::Claude => "ANTHROPIC_API_KEY",
            ProviderFamily::Gemini => "GOOGLE_API_KEY",
            ProviderFamily::Grok => "XAI_API_KEY",
        }
    }

    /// Key under which a user's stored key map holds this family's secret.
    pub fn user_key(&self) -> &'static str {
        match self {
            ProviderFamily::OpenAI => "openai",
            ProviderFamily::Claude => "anthropic",
            ProviderFamily::Gemini => "google",
            ProviderFamily::Grok => "xai",
        }
    }

    /// Classify a requested provider id by prefix or exact match.
    pub fn from_provider_id(provider_id: &str) -> Option<Self> {
        let id = provider_id.trim().to_ascii_lowercase();
        if id == "openai" || id.starts_with("gpt") || id.starts_with("o3") || id.starts_with("o4")
        {
            Some(ProviderFamily::OpenAI)
        } else if id.starts_with("claude") {
            Some(ProviderFamily::Claude)
        } else if id.starts_with("gemini") {
            Some(ProviderFamily::Gemini)
        } else if id.starts_with("grok") {
            Some(ProviderFamily::Grok)
        } else {
            None
        }
    }

    /// Classify the model identifier recorded on an assistant message.
    ///
    /// Substring rules are looser than [`Self::from_provider_id`] because stored
    /// identifiers may be provider ids (`openai-gpt5`), friendly aliases
    /// (`claude-sonnet-4.5`) or real vendor model names.
    pub fn classify_model(model_identifier: &str) -> Option<Self> {
        let model = model_identifier.to_ascii_lowercase();
        if model.contains("gpt")
            || model.starts_with("o3")
            || model.starts_with("o4")
            || model.contains("openai")
        {
            Some(ProviderFamily::OpenAI)
        } else if model.contains("claude") {
            Some(ProviderFamily::Claude)
        } else if model.contains("gemini") {
            Some(ProviderFamily::Gemini)
        } else if model.contains("grok") {
            Some(ProviderFamily::Grok)
        } else {
            None
        }
    }
}

impl fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderFamily::OpenAI),
            "claude" => Ok(ProviderFamily::Claude),
            "gemini" => Ok(ProviderFamily::Gemini),
            "grok" => Ok(ProviderFamily::Grok),
            other => Err(format!("unknown provider family: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_ids_classify_by_prefix() {
        let cases = [
            ("openai", Some(ProviderFamily::OpenAI)),
            ("gpt-4o", Some(ProviderFamily::OpenAI)),
            ("o3", Some(ProviderFamily::OpenAI)),
            ("o4-mini", Some(ProviderFamily::OpenAI)),
            ("claude", Some(ProviderFamily::Claude)),
            ("claude-sonnet-4.5", Some(ProviderFamily::Claude)),
            ("gemini-2.5-pro", Some(ProviderFamily::Gemini)),
            ("grok", Some(ProviderFamily::Grok)),
            ("grok-beta", Some(ProviderFamily::Grok)),
            ("mistral", None),
            ("", None),
        ];
        for (id, expected) in cases {
            assert_eq!(ProviderFamily::from_provider_id(id), expected, "{id}");
        }
    }

    #[test]
    fn provider_id_prefix_is_not_substring() {
        // "openai-gpt5" is a catalog id, not a prefix-rule id.
        assert_eq!(ProviderFamily::from_provider_id("openai-gpt5"), None);
        assert_eq!(ProviderFamily::from_provider_id("my-claude"), None);
    }

    #[test]
    fn model_identifiers_classify_by_substring() {
        let cases = [
            ("gpt-4o", Some(ProviderFamily::OpenAI)),
            ("openai-gpt5.1", Some(ProviderFamily::OpenAI)),
            ("openai", Some(ProviderFamily::OpenAI)),
            ("o3", Some(ProviderFamily::OpenAI)),
            ("O4-MINI", Some(ProviderFamily::OpenAI)),
            ("claude-3-5-sonnet-20241022", Some(ProviderFamily::Claude)),
            ("Gemini-2.0-Flash", Some(ProviderFamily::Gemini)),
            ("grok-3", Some(ProviderFamily::Grok)),
            ("o1-mini", None),
            ("llama-3", None),
        ];
        for (model, expected) in cases {
            assert_eq!(ProviderFamily::classify_model(model), expected, "{model}");
        }
    }

    #[test]
    fn family_round_trips_through_str() {
        for family in ProviderFamily::ALL {
            assert_eq!(family.as_str().parse::<ProviderFamily>(), Ok(family));
        }
        assert!("anthropic".parse::<ProviderFamily>().is_err());
    }

    #[test]
    fn family_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ProviderFamily::OpenAI).unwrap(),
            "\"openai\""
        );
    }
}

//! Provider catalog and model alias resolution.
//!
//! The registry is the one place that knows which provider ids exist, which
//! family each belongs to, and how friendly model names map to the model
//! strings vendors accept. Catalog entries name friendly models, and every
//! friendly model goes through the same alias table at call time.

use std::collections::HashMap;

use serde::Serialize;

use super::error::ProviderError;
use super::family::ProviderFamily;
use crate::credentials::Credentials;

/// A catalog entry: a selectable provider preset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSpec {
    pub id: &'static str,
    pub display_name: &'static str,
    pub family: ProviderFamily,
    /// Friendly model id, resolved through the alias table.
    pub model: &'static str,
}

/// Outcome of resolving a provider id and optional model override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    pub family: ProviderFamily,
    pub model: String,
}

/// Availability of one catalog entry.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProviderStatus {
    #[serde(rename = "id")]
    pub provider_id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "model")]
    pub model_id: String,
    pub available: bool,
    pub error: Option<String>,
}

const CATALOG: &[ProviderSpec] = &[
    spec("openai-gpt5.1", "OpenAI GPT-5.1", ProviderFamily::OpenAI, "gpt-5.1"),
    spec("openai-gpt5", "OpenAI GPT-5", ProviderFamily::OpenAI, "gpt-5"),
    spec("openai-gpt5-mini", "OpenAI GPT-5 Mini", ProviderFamily::OpenAI, "gpt-5-mini"),
    spec("openai-gpt4.1", "OpenAI GPT-4.1", ProviderFamily::OpenAI, "gpt-4.1"),
    spec("openai-gpt4o", "OpenAI GPT-4o", ProviderFamily::OpenAI, "gpt-4o"),
    spec("openai-o3", "OpenAI o3", ProviderFamily::OpenAI, "o3"),
    spec("openai-o4-mini", "OpenAI o4-mini", ProviderFamily::OpenAI, "o4-mini"),
    spec("claude-sonnet-4.5", "Claude Sonnet 4.5", ProviderFamily::Claude, "claude-sonnet-4.5"),
    spec("claude-opus-4.1", "Claude Opus 4.1", ProviderFamily::Claude, "claude-opus-4.1"),
    spec("claude-sonnet-4", "Claude Sonnet 4", ProviderFamily::Claude, "claude-sonnet-4"),
    spec("gemini-2.5-pro", "Gemini 2.5 Pro", ProviderFamily::Gemini, "gemini-2.5-pro"),
    spec("gemini-2.5-flash", "Gemini 2.5 Flash", ProviderFamily::Gemini, "gemini-2.5-flash"),
    spec("gemini-2.0-flash", "Gemini 2.0 Flash", ProviderFamily::Gemini, "gemini-2.0-flash"),
    spec("grok-4.1-fast", "xAI Grok 4.1 Fast", ProviderFamily::Grok, "grok-4.1-fast"),
    spec("grok-4", "xAI Grok 4", ProviderFamily::Grok, "grok-4"),
    spec("grok-3", "xAI Grok 3", ProviderFamily::Grok, "grok-3"),
    spec("grok-beta", "xAI Grok Beta", ProviderFamily::Grok, "grok-beta"),
];

/// Friendly model id -> model string the vendor accepts.
const ALIASES: &[(&str, &str)] = &[
    ("gpt-5.1", "gpt-4o"),
    ("gpt-5", "gpt-4o"),
    ("gpt-5-mini", "gpt-4o-mini"),
    ("gpt-4.1", "gpt-4-turbo"),
    ("gpt-4o", "gpt-4o"),
    ("o3", "o1-mini"),
    ("o4-mini", "o1-mini"),
    ("claude-sonnet-4.5", "claude-sonnet-4-5-20250929"),
    ("claude-haiku-4.5", "claude-3-5-haiku-20241022"),
    ("claude-opus-4.1", "claude-opus-4-1-20250805"),
    ("claude-opus-4", "claude-3-opus-20240229"),
    ("claude-sonnet-4", "claude-sonnet-4-20250514"),
    ("claude-3.5-sonnet", "claude-3-5-sonnet-20241022"),
    ("claude-3-opus", "claude-3-opus-20240229"),
    ("claude-3-haiku", "claude-3-haiku-20240307"),
    ("gemini-2.5-pro", "gemini-2.5-pro"),
    ("gemini-2.5-flash", "gemini-2.5-flash"),
    ("gemini-2.0-flash", "gemini-2.0-flash-001"),
    ("grok-4.1-fast", "grok-3"),
    ("grok-4", "grok-3"),
    ("grok-3", "grok-3"),
    ("grok-beta", "grok-3"),
];

const fn spec(
    id: &'static str,
    display_name: &'static str,
    family: ProviderFamily,
    model: &'static str,
) -> ProviderSpec {
    ProviderSpec {
        id,
        display_name,
        family,
        model,
    }
}

/// Registry of provider presets and model aliases.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    catalog: Vec<ProviderSpec>,
    aliases: HashMap<&'static str, &'static str>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProviderRegistry {
    /// The built-in catalog and alias table.
    pub fn builtin() -> Self {
        Self {
            catalog: CATALOG.to_vec(),
            aliases: ALIASES.iter().copied().collect(),
        }
    }

    /// Model used when a family is requested without an override.
    pub fn default_model(family: ProviderFamily) -> &'static str {
        match family {
            ProviderFamily::OpenAI => "gpt-4o",
            ProviderFamily::Claude => "claude-sonnet-4-20250514",
            ProviderFamily::Gemini => "gemini-2.0-flash-exp",
            ProviderFamily::Grok => "grok-2-latest",
        }
    }

    pub fn specs(&self) -> &[ProviderSpec] {
        &self.catalog
    }

    /// Get a catalog entry by id.
    pub fn get(&self, provider_id: &str) -> Option<&ProviderSpec> {
        self.catalog.iter().find(|s| s.id == provider_id)
    }

    /// Family of a provider id: catalog entry first, then prefix rules.
    pub fn family_of(&self, provider_id: &str) -> Result<ProviderFamily, ProviderError> {
        self.get(provider_id)
            .map(|s| s.family)
            .or_else(|| ProviderFamily::from_provider_id(provider_id))
            .ok_or_else(|| ProviderError::UnknownProvider(provider_id.to_string()))
    }

    /// Map a friendly model id to the vendor model; unknown ids pass through.
    pub fn resolve_alias<'a>(&'a self, model: &'a str) -> &'a str {
        self.aliases.get(model).copied().unwrap_or(model)
    }

    /// Resolve a provider id and optional model override to a family and real model.
    pub fn resolve(
        &self,
        provider_id: &str,
        model_override: Option<&str>,
    ) -> Result<ResolvedModel, ProviderError> {
        let family = self.family_of(provider_id)?;

        let model = match model_override.map(str::trim).filter(|m| !m.is_empty()) {
            Some(model) => self.resolve_alias(model),
            None => match self.get(provider_id) {
                Some(spec) => self.resolve_alias(spec.model),
                None => Self::default_model(family),
            },
        };

        Ok(ResolvedModel {
            family,
            model: model.to_string(),
        })
    }

    /// Availability of every catalog entry under the given credentials.
    pub fn list_providers(&self, credentials: &Credentials) -> Vec<ProviderStatus> {
        self.catalog
            .iter()
            .map(|spec| self.status(spec.id, credentials))
            .collect()
    }

    /// Availability of any provider id, catalog entry or family name.
    pub fn status(&self, provider_id: &str, credentials: &Credentials) -> ProviderStatus {
        let resolved = self.resolve(provider_id, None);
        let display_name = match (self.get(provider_id), &resolved) {
            (Some(spec), _) => spec.display_name.to_string(),
            (None, Ok(r)) => r.family.vendor().to_string(),
            (None, Err(_)) => provider_id.to_string(),
        };
        let (model_id, error) = match resolved {
            Ok(r) => {
                let error = credentials.require(r.family).err().map(|e| e.to_string());
                (r.model, error)
            }
            Err(e) => (String::new(), Some(e.to_string())),
        };

        ProviderStatus {
            provider_id: provider_id.to_string(),
            display_name,
            model_id,
            available: error.is_none(),
            error,
        }
    }
}

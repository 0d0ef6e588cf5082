//! LLM provider trait and the per-family adapter set.

use async_trait::async_trait;
use reqwest::Client;

use super::anthropic::AnthropicProvider;
use super::error::{LLMError, ProviderError};
use super::family::ProviderFamily;
use super::gemini::GeminiProvider;
use super::openai::OpenAICompatibleProvider;
use super::types::{CallOptions, Message};
use crate::config::ProvidersConfig;
use crate::credentials::Credentials;

/// Trait for LLM providers with different API formats.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send `history` (oldest first, ending with the newest turn) and return the reply text.
    async fn chat(
        &self,
        history: &[Message],
        system_prompt: &str,
        options: CallOptions,
    ) -> Result<String, LLMError>;
}

/// One vendor adapter, tagged by family.
///
/// An adapter only exists once its credential has been found, so a
/// constructed adapter is always callable.
pub enum ProviderAdapter {
    OpenAI(OpenAICompatibleProvider),
    Claude(AnthropicProvider),
    Gemini(GeminiProvider),
    Grok(OpenAICompatibleProvider),
}

impl ProviderAdapter {
    /// Build the adapter for `family`, failing if its credential is absent.
    pub fn build(
        family: ProviderFamily,
        model: String,
        credentials: &Credentials,
        client: Client,
        config: &ProvidersConfig,
    ) -> Result<Self, ProviderError> {
        let api_key = credentials.require(family)?.to_string();

        let adapter = match family {
            ProviderFamily::OpenAI => ProviderAdapter::OpenAI(OpenAICompatibleProvider::new(
                client,
                config.openai_base_url.clone(),
                api_key,
                model,
            )),
            ProviderFamily::Claude => ProviderAdapter::Claude(AnthropicProvider::new(
                client,
                config.anthropic_base_url.clone(),
                api_key,
                model,
            )),
            ProviderFamily::Gemini => ProviderAdapter::Gemini(GeminiProvider::new(
                client,
                config.gemini_base_url.clone(),
                api_key,
                model,
            )),
            ProviderFamily::Grok => ProviderAdapter::Grok(OpenAICompatibleProvider::new(
                client,
                config.xai_base_url.clone(),
                api_key,
                model,
            )),
        };
        Ok(adapter)
    }

    pub fn family(&self) -> ProviderFamily {
        match self {
            ProviderAdapter::OpenAI(_) => ProviderFamily::OpenAI,
            ProviderAdapter::Claude(_) => ProviderFamily::Claude,
            ProviderAdapter::Gemini(_) => ProviderFamily::Gemini,
            ProviderAdapter::Grok(_) => ProviderFamily::Grok,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            ProviderAdapter::OpenAI(p) | ProviderAdapter::Grok(p) => p.model(),
            ProviderAdapter::Claude(p) => p.model(),
            ProviderAdapter::Gemini(p) => p.model(),
        }
    }

    fn provider(&self) -> &dyn LLMProvider {
        match self {
            ProviderAdapter::OpenAI(p) | ProviderAdapter::Grok(p) => p,
            ProviderAdapter::Claude(p) => p,
            ProviderAdapter::Gemini(p) => p,
        }
    }

    /// Call the vendor, classifying failures as upstream errors of this family.
    pub async fn chat(
        &self,
        history: &[Message],
        system_prompt: &str,
        options: CallOptions,
    ) -> Result<String, ProviderError> {
        self.provider()
            .chat(history, system_prompt, options)
            .await
            .map_err(|e| ProviderError::upstream(self.family(), e))
    }
}

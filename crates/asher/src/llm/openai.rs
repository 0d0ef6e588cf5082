//! OpenAI-compatible LLM provider.
//!
//! Serves both OpenAI and xAI Grok, which speaks the same chat completions
//! protocol against a different host.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::{LLMError, ensure_success};
use super::provider::LLMProvider;
use super::types::{CallOptions, Message};

/// OpenAI-compatible provider (works for OpenAI and Grok).
pub struct OpenAICompatibleProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAICompatibleProvider {
    pub const OPENAI_BASE_URL: &'static str = "https://api.openai.com/v1";
    pub const XAI_BASE_URL: &'static str = "https://api.x.ai/v1";

    #[must_use]
    pub fn new(client: Client, base_url: String, api_key: String, model: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn to_request(
        &self,
        history: &[Message],
        system_prompt: &str,
        options: CallOptions,
    ) -> Request {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if !system_prompt.is_empty() {
            messages.push(RequestMessage {
                role: "system",
                content: system_prompt.to_string(),
            });
        }
        messages.extend(history.iter().map(|m| RequestMessage {
            role: m.role.as_str(),
            content: m.content.clone(),
        }));

        Request {
            model: self.model.clone(),
            messages,
            temperature: options.temperature,
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    async fn chat(
        &self,
        history: &[Message],
        system_prompt: &str,
        options: CallOptions,
    ) -> Result<String, LLMError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let request = self.to_request(history, system_prompt, options);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let body: Response = response.json().await?;
        reply_text(body)
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
struct Request {
    model: String,
    messages: Vec<RequestMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct RequestMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

fn reply_text(response: Response) -> Result<String, LLMError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LLMError::MalformedResponse("no choices in response".to_string()))?;
    choice
        .message
        .content
        .ok_or_else(|| LLMError::MalformedResponse("choice has no message content".to_string()))
}

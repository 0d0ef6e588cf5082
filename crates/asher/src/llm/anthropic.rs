//! Anthropic LLM provider with native API format.

use async_trait::async_trait;
use reqwest::Client;

use super::error::{LLMError, ensure_success};
use super::provider::LLMProvider;
use super::types::{CallOptions, Message};

/// Instruction sent when the caller supplies no system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Anthropic provider with native API format.
pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    api_key: String,
    api_version: String,
    model: String,
}

impl AnthropicProvider {
    pub const BASE_URL: &'static str = "https://api.anthropic.com";
    pub const DEFAULT_API_VERSION: &'static str = "2023-06-01";

    #[must_use]
    pub fn new(client: Client, base_url: String, api_key: String, model: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
            api_version: Self::DEFAULT_API_VERSION.to_string(),
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, url: &str, body: &Request) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("Content-Type", "application/json")
            .header("accept", "application/json")
            .header("anthropic-version", &self.api_version)
            .header("x-api-key", &self.api_key)
            .json(body)
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    async fn chat(
        &self,
        history: &[Message],
        system_prompt: &str,
        options: CallOptions,
    ) -> Result<String, LLMError> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let request = to_request(&self.model, history, system_prompt, options);

        let response = self.build_request(&url, &request).send().await?;
        let response = ensure_success(response).await?;

        let body: Response = response.json().await?;
        from_response(body)
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(serde::Serialize)]
struct Request {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<RequestMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(serde::Serialize)]
struct RequestMessage {
    role: &'static str,
    content: String,
}

#[derive(serde::Deserialize)]
struct Response {
    #[serde(default)]
    content: Vec<ResponseContent>,
}

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseContent {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

// ============================================================================
// Conversions
// ============================================================================

/// History goes out unchanged; the system prompt rides in its own field.
fn to_request(
    model: &str,
    history: &[Message],
    system_prompt: &str,
    options: CallOptions,
) -> Request {
    let system = if system_prompt.is_empty() {
        DEFAULT_SYSTEM_PROMPT.to_string()
    } else {
        system_prompt.to_string()
    };

    let messages = history
        .iter()
        .map(|m| RequestMessage {
            role: m.role.as_str(),
            content: m.content.clone(),
        })
        .collect();

    Request {
        model: model.to_string(),
        max_tokens: options.max_tokens,
        system,
        messages,
        temperature: options.temperature,
    }
}

fn from_response(response: Response) -> Result<String, LLMError> {
    let texts: Vec<String> = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ResponseContent::Text { text } => Some(text),
            ResponseContent::Other => None,
        })
        .collect();

    if texts.is_empty() {
        return Err(LLMError::MalformedResponse(
            "no text content in response".to_string(),
        ));
    }
    Ok(texts.join(""))
}

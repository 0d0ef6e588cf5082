//! Google Gemini LLM provider.
//!
//! Gemini has no system role. The last incoming turn becomes the current
//! message, everything before it becomes prior context, and the system prompt
//! is prefixed onto the current message text.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::{LLMError, ensure_success};
use super::provider::LLMProvider;
use super::types::{CallOptions, Message, Role};

/// Gemini provider using the `generateContent` REST endpoint.
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub const BASE_URL: &'static str = "https://generativelanguage.googleapis.com";

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
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    async fn chat(
        &self,
        history: &[Message],
        system_prompt: &str,
        options: CallOptions,
    ) -> Result<String, LLMError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let request = GeminiTurns::split(history, system_prompt).into_request(options);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let body: Response = response.json().await?;
        from_response(body)
    }
}

// ============================================================================
// Turn splitting
// ============================================================================

/// A history split into Gemini's prior context and current message.
#[derive(Debug, PartialEq)]
struct GeminiTurns {
    history: Vec<Content>,
    current: String,
}

impl GeminiTurns {
    fn split(history: &[Message], system_prompt: &str) -> Self {
        let (current, prior) = match history.split_last() {
            Some((last, prior)) => (last.content.as_str(), prior),
            None => ("", history),
        };

        let current = match (system_prompt.is_empty(), current.is_empty()) {
            (true, _) => current.to_string(),
            (false, true) => system_prompt.to_string(),
            (false, false) => format!("{system_prompt}\n\n{current}"),
        };

        Self {
            history: prior.iter().map(Content::from_message).collect(),
            current,
        }
    }

    fn into_request(self, options: CallOptions) -> Request {
        let mut contents = self.history;
        contents.push(Content::text(GeminiRole::User, self.current));

        Request {
            contents,
            generation_config: options.temperature.map(|temperature| GenerationConfig {
                temperature: Some(temperature),
            }),
        }
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Request {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum GeminiRole {
    User,
    Model,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<GeminiRole>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: GeminiRole, text: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            parts: vec![Part {
                text: Some(text.into()),
            }],
        }
    }

    fn from_message(message: &Message) -> Self {
        let role = match message.role {
            Role::User => GeminiRole::User,
            Role::Assistant => GeminiRole::Model,
        };
        Self::text(role, message.content.clone())
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Response {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn from_response(response: Response) -> Result<String, LLMError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates in response".to_string());
        return Err(LLMError::MalformedResponse(reason));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.is_empty() {
        return Err(LLMError::MalformedResponse(
            "candidate has no text parts".to_string(),
        ));
    }
    Ok(text)
}

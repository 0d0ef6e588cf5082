//! Single-provider calls and concurrent multi-provider fan-out.
//!
//! Every provider call goes through [`ChatGateway::dispatch`]: resolve the
//! provider id through the registry, build the family's adapter from the
//! caller's credentials, and run the vendor call under its own deadline.
//! Failures are captured per provider in a [`ChatOutcome`] and never abort
//! sibling calls.

mod conversation;
mod error;

pub use conversation::{
    BatchSend, BatchTarget, ConversationBatch, ConversationBatchEntry, ConversationChat,
    MessageExchange, SendMessage,
};
pub use error::GatewayError;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::config::ProvidersConfig;
use crate::credentials::Credentials;
use crate::llm::{
    CallOptions, LLMError, Message, ProviderAdapter, ProviderError, ProviderRegistry,
    ProviderStatus, ResolvedModel,
};

// ============================================================================
// Request/Outcome Types
// ============================================================================

/// An ad-hoc chat request against one provider.
#[derive(Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(alias = "provider")]
    pub provider_id: String,
    pub message: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default, alias = "model")]
    pub model_override: Option<String>,
    /// Prior turns supplied by the caller.
    #[serde(default, alias = "conversation_history")]
    pub history: Vec<Message>,
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Key for the resolved family, taking precedence over the environment.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ChatRequest {
    pub fn new(provider_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    /// Caller history plus the new message, unless the history already ends
    /// with that exact content.
    fn turns(&self) -> Vec<Message> {
        let mut turns = self.history.clone();
        if turns.last().map(|m| m.content.as_str()) != Some(self.message.as_str()) {
            turns.push(Message::user(self.message.clone()));
        }
        turns
    }
}

/// Result of one provider call.
#[derive(Debug)]
pub struct ChatOutcome {
    pub provider_id: String,
    pub result: Result<String, ProviderError>,
}

impl ChatOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Reply text, empty on failure.
    pub fn reply(&self) -> &str {
        self.result.as_deref().unwrap_or_default()
    }

    pub fn error(&self) -> Option<&ProviderError> {
        self.result.as_ref().err()
    }
}

impl Serialize for ChatOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Body<'a> {
            provider: &'a str,
            reply: &'a str,
            success: bool,
            error: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            error_kind: Option<&'static str>,
        }

        let error = self.error();
        Body {
            provider: &self.provider_id,
            reply: self.reply(),
            success: self.is_success(),
            error: error.map(ToString::to_string),
            error_kind: error.map(ProviderError::kind),
        }
        .serialize(serializer)
    }
}

/// One normalized provider call, borrowed from whichever request built it.
#[derive(Clone, Copy)]
pub(crate) struct ProviderCall<'a> {
    pub provider_id: &'a str,
    pub model_override: Option<&'a str>,
    pub history: &'a [Message],
    pub system_prompt: &'a str,
    pub temperature: Option<f32>,
}

// ============================================================================
// ChatGateway
// ============================================================================

/// Orchestrates provider calls. Cheap to clone.
#[derive(Clone)]
pub struct ChatGateway {
    registry: Arc<ProviderRegistry>,
    config: Arc<ProvidersConfig>,
    env_credentials: Arc<Credentials>,
    client: Client,
}

impl ChatGateway {
    pub fn new(
        registry: ProviderRegistry,
        config: ProvidersConfig,
        env_credentials: Credentials,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            config: Arc::new(config),
            env_credentials: Arc::new(env_credentials),
            client: Client::new(),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Process-wide credentials used by the ad-hoc entry points.
    pub fn env_credentials(&self) -> &Credentials {
        &self.env_credentials
    }

    /// Every catalog entry with its availability under process-wide credentials.
    pub fn list_providers(&self) -> Vec<ProviderStatus> {
        self.registry.list_providers(&self.env_credentials)
    }

    /// Call one provider. Never fails; errors are reported in the outcome.
    pub async fn chat_once(&self, request: &ChatRequest) -> ChatOutcome {
        let mut credentials = (*self.env_credentials).clone();
        if let Some(api_key) = &request.api_key
            && let Ok(family) = self.registry.family_of(&request.provider_id)
        {
            credentials.set(family, api_key.as_str());
        }

        let turns = request.turns();
        let call = ProviderCall {
            provider_id: &request.provider_id,
            model_override: request.model_override.as_deref(),
            history: &turns,
            system_prompt: &request.system_prompt,
            temperature: request.temperature,
        };
        self.dispatch(call, &credentials).await
    }

    /// Send `message` to every provider in `provider_ids` concurrently.
    ///
    /// Duplicate ids collapse into one call. Each entry succeeds or fails on
    /// its own.
    pub async fn chat_batch(
        &self,
        message: &str,
        system_prompt: &str,
        provider_ids: &[String],
    ) -> Result<BTreeMap<String, ChatOutcome>, GatewayError> {
        let ids = unique_ids(provider_ids.iter().map(String::as_str))?;
        let history = [Message::user(message)];

        info!(providers = ids.len(), "dispatching batch");
        let calls = ids.into_iter().map(|provider_id| {
            let call = ProviderCall {
                provider_id,
                model_override: None,
                history: &history,
                system_prompt,
                temperature: None,
            };
            self.dispatch(call, &self.env_credentials)
        });
        let outcomes = join_all(calls).await;

        Ok(outcomes
            .into_iter()
            .map(|outcome| (outcome.provider_id.clone(), outcome))
            .collect())
    }

    pub(crate) async fn dispatch(
        &self,
        call: ProviderCall<'_>,
        credentials: &Credentials,
    ) -> ChatOutcome {
        let started = Instant::now();
        let (resolved, result) = match self.registry.resolve(call.provider_id, call.model_override)
        {
            Ok(resolved) => {
                let result = self.call_provider(&resolved, call, credentials).await;
                (Some(resolved), result)
            }
            Err(e) => (None, Err(e)),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let family = resolved.as_ref().map(|r| r.family.as_str());
        let model = resolved.as_ref().map(|r| r.model.as_str());

        match &result {
            Ok(reply) => info!(
                provider_id = call.provider_id,
                family,
                model,
                elapsed_ms,
                reply_chars = reply.chars().count(),
                "provider call succeeded"
            ),
            Err(e) => warn!(
                provider_id = call.provider_id,
                family,
                model,
                kind = e.kind(),
                elapsed_ms,
                error = %e,
                "provider call failed"
            ),
        }

        ChatOutcome {
            provider_id: call.provider_id.to_string(),
            result,
        }
    }

    async fn call_provider(
        &self,
        resolved: &ResolvedModel,
        call: ProviderCall<'_>,
        credentials: &Credentials,
    ) -> Result<String, ProviderError> {
        let family = resolved.family;
        let adapter = ProviderAdapter::build(
            family,
            resolved.model.clone(),
            credentials,
            self.client.clone(),
            &self.config,
        )?;

        debug!(
            provider_id = call.provider_id,
            turns = call.history.len(),
            "calling provider"
        );

        let options = CallOptions {
            max_tokens: self.config.max_tokens,
            temperature: call.temperature,
        };
        let deadline = Duration::from_secs(self.config.timeout_seconds);
        match tokio::time::timeout(
            deadline,
            adapter.chat(call.history, call.system_prompt, options),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::upstream(
                family,
                LLMError::Timeout(self.config.timeout_seconds),
            )),
        }
    }
}

/// Distinct ids in sorted order; an empty set is malformed input.
pub(crate) fn unique_ids<'a>(
    ids: impl IntoIterator<Item = &'a str>,
) -> Result<BTreeSet<&'a str>, GatewayError> {
    let ids: BTreeSet<&str> = ids.into_iter().collect();
    if ids.is_empty() {
        return Err(GatewayError::EmptyBatch);
    }
    Ok(ids)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    use super::*;
    use crate::llm::{ProviderFamily, Role};

    pub(crate) const OPENAI_REPLY: &str =
        r#"{"choices":[{"message":{"role":"assistant","content":"from openai"}}]}"#;
    pub(crate) const CLAUDE_REPLY: &str = r#"{"content":[{"type":"text","text":"from claude"}]}"#;
    pub(crate) const GEMINI_REPLY: &str =
        r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"from gemini"}]}}]}"#;

    /// Point every vendor base URL at one fake server.
    pub(crate) fn config_for(server: &ServerGuard) -> ProvidersConfig {
        ProvidersConfig {
            timeout_seconds: 5,
            openai_base_url: server.url(),
            anthropic_base_url: server.url(),
            gemini_base_url: server.url(),
            xai_base_url: server.url(),
            ..ProvidersConfig::default()
        }
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn batch_isolates_missing_credential() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(OPENAI_REPLY)
            .create_async()
            .await;
        server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body(CLAUDE_REPLY)
            .create_async()
            .await;
        server
            .mock("POST", "/v1beta/models/gemini-2.0-flash-exp:generateContent")
            .with_status(200)
            .with_body(GEMINI_REPLY)
            .create_async()
            .await;

        let credentials = Credentials::default()
            .with_key(ProviderFamily::OpenAI, "sk")
            .with_key(ProviderFamily::Claude, "ant")
            .with_key(ProviderFamily::Gemini, "goog");
        let gateway =
            ChatGateway::new(ProviderRegistry::builtin(), config_for(&server), credentials);

        let results = gateway
            .chat_batch("hello", "", &ids(&["openai", "claude", "gemini", "grok"]))
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results["openai"].reply(), "from openai");
        assert_eq!(results["claude"].reply(), "from claude");
        assert_eq!(results["gemini"].reply(), "from gemini");

        let grok = &results["grok"];
        assert!(!grok.is_success());
        assert_eq!(grok.reply(), "");
        assert!(matches!(
            grok.error(),
            Some(ProviderError::Configuration {
                family: ProviderFamily::Grok,
                ..
            })
        ));
        assert!(grok.error().unwrap().to_string().contains("XAI_API_KEY"));
    }

    #[tokio::test]
    async fn batch_rejects_empty_provider_set() {
        let gateway = ChatGateway::new(
            ProviderRegistry::builtin(),
            ProvidersConfig::default(),
            Credentials::default(),
        );
        let result = gateway.chat_batch("hello", "", &[]).await;
        assert!(matches!(result, Err(GatewayError::EmptyBatch)));
    }

    #[tokio::test]
    async fn batch_collapses_duplicates_and_reports_unknown_ids() {
        let gateway = ChatGateway::new(
            ProviderRegistry::builtin(),
            ProvidersConfig::default(),
            Credentials::default(),
        );
        let results = gateway
            .chat_batch("hello", "", &ids(&["mystery", "mystery", "claude"]))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results["mystery"].error().unwrap().kind(), "unknown_provider");
        assert_eq!(results["claude"].error().unwrap().kind(), "configuration");
    }

    #[tokio::test]
    async fn chat_once_forwards_history_and_dedups_message() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "ant")
            .match_body(Matcher::PartialJson(json!({
                "model": "claude-3-haiku-20240307",
                "system": "be brief",
                "messages": [
                    {"role": "user", "content": "a"},
                    {"role": "assistant", "content": "b"},
                    {"role": "user", "content": "c"}
                ],
                "temperature": 0.5
            })))
            .with_status(200)
            .with_body(CLAUDE_REPLY)
            .create_async()
            .await;

        let gateway = ChatGateway::new(
            ProviderRegistry::builtin(),
            config_for(&server),
            Credentials::default().with_key(ProviderFamily::Claude, "ant"),
        );
        let request = ChatRequest {
            system_prompt: "be brief".to_string(),
            model_override: Some("claude-3-haiku".to_string()),
            history: vec![Message::user("a"), Message::assistant("b"), Message::user("c")],
            temperature: Some(0.5),
            ..ChatRequest::new("claude-sonnet-4.5", "c")
        };

        let outcome = gateway.chat_once(&request).await;
        assert!(outcome.is_success(), "{:?}", outcome.error());
        assert_eq!(outcome.reply(), "from claude");
        mock.assert_async().await;
    }

    #[test]
    fn turns_append_new_message_unless_repeated() {
        let mut request = ChatRequest::new("openai", "next");
        request.history = vec![Message::user("first"), Message::assistant("reply")];
        let turns = request.turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[2], Message::user("next"));

        request.history.push(Message::user("next"));
        assert_eq!(request.turns().len(), 3);

        let empty = ChatRequest::new("openai", "solo");
        assert_eq!(empty.turns(), vec![Message::user("solo")]);
        assert_eq!(empty.turns()[0].role, Role::User);
    }

    #[tokio::test]
    async fn request_key_overrides_environment() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer request-key")
            .with_status(200)
            .with_body(OPENAI_REPLY)
            .create_async()
            .await;

        let gateway = ChatGateway::new(
            ProviderRegistry::builtin(),
            config_for(&server),
            Credentials::default().with_key(ProviderFamily::OpenAI, "env-key"),
        );
        let request = ChatRequest {
            api_key: Some("request-key".to_string()),
            ..ChatRequest::new("openai", "hi")
        };

        let outcome = gateway.chat_once(&request).await;
        assert!(outcome.is_success());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unknown_provider_never_reaches_a_vendor() {
        let gateway = ChatGateway::new(
            ProviderRegistry::builtin(),
            ProvidersConfig::default(),
            Credentials::default(),
        );
        let outcome = gateway.chat_once(&ChatRequest::new("llama-3", "hi")).await;
        assert!(matches!(
            outcome.error(),
            Some(ProviderError::UnknownProvider(id)) if id == "llama-3"
        ));
    }

    /// A vendor that accepts connections and never answers.
    pub(crate) async fn silent_vendor() -> (String, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hold = tokio::spawn(async move {
            let mut sockets = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                sockets.push(socket);
            }
        });
        (format!("http://{addr}"), hold)
    }

    #[tokio::test]
    async fn slow_vendor_times_out_as_upstream_error() {
        let (url, hold) = silent_vendor().await;
        let config = ProvidersConfig {
            timeout_seconds: 1,
            xai_base_url: url,
            ..ProvidersConfig::default()
        };
        let gateway = ChatGateway::new(
            ProviderRegistry::builtin(),
            config,
            Credentials::default().with_key(ProviderFamily::Grok, "xai"),
        );

        let outcome = gateway.chat_once(&ChatRequest::new("grok", "hi")).await;
        match outcome.error() {
            Some(ProviderError::Upstream {
                family: ProviderFamily::Grok,
                source: LLMError::Timeout(1),
            }) => {}
            other => panic!("expected timeout, got {other:?}"),
        }
        hold.abort();
    }

    #[tokio::test]
    async fn hung_member_does_not_hold_back_batch() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(OPENAI_REPLY)
            .create_async()
            .await;
        let (url, hold) = silent_vendor().await;

        let config = ProvidersConfig {
            timeout_seconds: 1,
            xai_base_url: url,
            ..config_for(&server)
        };
        let credentials = Credentials::default()
            .with_key(ProviderFamily::OpenAI, "sk")
            .with_key(ProviderFamily::Grok, "xai");
        let gateway = ChatGateway::new(ProviderRegistry::builtin(), config, credentials);

        let started = Instant::now();
        let results = gateway
            .chat_batch("hello", "", &ids(&["openai", "grok"]))
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(3));

        assert_eq!(results["openai"].reply(), "from openai");
        assert!(matches!(
            results["grok"].error(),
            Some(ProviderError::Upstream {
                family: ProviderFamily::Grok,
                source: LLMError::Timeout(1),
            })
        ));
        hold.abort();
    }

    #[test]
    fn outcome_serializes_flat() {
        let ok = ChatOutcome {
            provider_id: "grok".to_string(),
            result: Ok("hey".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"provider": "grok", "reply": "hey", "success": true, "error": null})
        );

        let failed = ChatOutcome {
            provider_id: "nope".to_string(),
            result: Err(ProviderError::UnknownProvider("nope".to_string())),
        };
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["reply"], "");
        assert_eq!(value["error"], "unknown provider: nope");
        assert_eq!(value["error_kind"], "unknown_provider");
    }

    #[test]
    fn chat_request_accepts_short_field_names() {
        let request: ChatRequest = serde_json::from_value(json!({
            "provider": "gemini",
            "message": "hi",
            "model": "gemini-2.5-pro",
            "conversation_history": [{"role": "user", "content": "earlier"}]
        }))
        .unwrap();
        assert_eq!(request.provider_id, "gemini");
        assert_eq!(request.model_override.as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(request.history, vec![Message::user("earlier")]);

        let system_turn = serde_json::from_value::<ChatRequest>(json!({
            "provider": "gemini",
            "message": "hi",
            "history": [{"role": "system", "content": "nope"}]
        }));
        assert!(system_turn.is_err());
    }
}

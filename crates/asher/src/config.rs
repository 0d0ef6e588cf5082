use std::io::ErrorKind;
use std::path::Path;

use tokio::fs;

use serde::Deserialize;
use thiserror::Error;

use crate::llm::{AnthropicProvider, GeminiProvider, OpenAICompatibleProvider};

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        Ok(serde_saphyr::from_str(&contents)?)
    }
}

// ============================================================================
// ServerConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    300
}

// ============================================================================
// ProvidersConfig
// ============================================================================

/// Vendor endpoints and per-call limits.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// Deadline for one vendor call.
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
    /// Output token cap (required by the Anthropic API).
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_xai_base_url")]
    pub xai_base_url: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_provider_timeout(),
            max_tokens: default_max_tokens(),
            openai_base_url: default_openai_base_url(),
            anthropic_base_url: default_anthropic_base_url(),
            gemini_base_url: default_gemini_base_url(),
            xai_base_url: default_xai_base_url(),
        }
    }
}

fn default_provider_timeout() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_openai_base_url() -> String {
    OpenAICompatibleProvider::OPENAI_BASE_URL.to_string()
}

fn default_anthropic_base_url() -> String {
    AnthropicProvider::BASE_URL.to_string()
}

fn default_gemini_base_url() -> String {
    GeminiProvider::BASE_URL.to_string()
}

fn default_xai_base_url() -> String {
    OpenAICompatibleProvider::XAI_BASE_URL.to_string()
}

// ============================================================================
// BatchConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct BatchConfig {
    /// Providers used when a batch request names none.
    #[serde(default = "default_batch_providers")]
    pub default_providers: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            default_providers: default_batch_providers(),
        }
    }
}

fn default_batch_providers() -> Vec<String> {
    ["openai", "claude", "gemini", "grok"]
        .into_iter()
        .map(String::from)
        .collect()
}

// ============================================================================
// CredentialsConfig
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct CredentialsConfig {
    /// Let stored-conversation calls use process-wide keys for families the
    /// user has not configured. A user's own key always wins.
    #[serde(default)]
    pub user_keys_fallback_to_env: bool,
}

// ============================================================================
// ConfigError
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_saphyr::Error),
}

// ============================================================================
// Tests
// ============================================================================

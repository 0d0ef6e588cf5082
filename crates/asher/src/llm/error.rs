//! LLM error types.

use thiserror::Error;

use super::family::ProviderFamily;
use crate::credentials::CredentialSource;

/// Check an HTTP response for rate-limit errors, returning `RateLimit` for 429.
pub fn check_response_error(response: &reqwest::Response) -> Option<LLMError> {
    if response.status().is_success() {
        return None;
    }
    if response.status().as_u16() == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        return Some(LLMError::RateLimit { retry_after });
    }
    None
}

/// Turn a non-success response into an `LLMError`, keeping the vendor's body.
pub async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, LLMError> {
    if let Some(err) = check_response_error(&response) {
        return Err(err);
    }
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        return Err(LLMError::Api { status, message });
    }
    Ok(response)
}

/// Errors that can occur when making LLM API calls.
#[derive(Debug, Error)]
pub enum LLMError {
    /// HTTP request failed
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// API returned an error response
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limited (429)
    #[error("rate limited (retry after {retry_after:?}s)")]
    RateLimit { retry_after: Option<u64> },

    /// Response decoded but carried no usable reply
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Call exceeded its deadline
    #[error("request timed out after {0}s")]
    Timeout(u64),
}

/// Errors surfaced by a single provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider id matches no known family.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// The resolved family has no credential.
    #[error("{} API key not configured: {}", .family.vendor(), .origin.hint(.family))]
    Configuration {
        family: ProviderFamily,
        origin: CredentialSource,
    },

    /// The vendor call failed.
    #[error("{family} provider error: {source}")]
    Upstream {
        family: ProviderFamily,
        #[source]
        source: LLMError,
    },
}

impl ProviderError {
    pub fn upstream(family: ProviderFamily, source: LLMError) -> Self {
        ProviderError::Upstream { family, source }
    }

    /// Short machine-readable kind, stable across message wording changes.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::UnknownProvider(_) => "unknown_provider",
            ProviderError::Configuration { .. } => "configuration",
            ProviderError::Upstream { .. } => "upstream",
        }
    }
}

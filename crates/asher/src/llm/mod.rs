//! LLM provider clients for chat completions.

mod anthropic;
mod error;
mod family;
mod gemini;
mod openai;
mod provider;
mod registry;
mod types;

pub use anthropic::{AnthropicProvider, DEFAULT_SYSTEM_PROMPT};
pub use error::{LLMError, ProviderError};
pub use family::ProviderFamily;
pub use gemini::GeminiProvider;
pub use openai::OpenAICompatibleProvider;
pub use provider::{LLMProvider, ProviderAdapter};
pub use registry::{ProviderRegistry, ProviderSpec, ProviderStatus, ResolvedModel};
pub use types::{CallOptions, Message, Role};

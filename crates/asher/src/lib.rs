//! Asher - send one prompt to several LLM vendors and keep provider-aware
//! conversations.

// ============================================================================
// Always Available
// ============================================================================

pub mod config;
pub mod conversation;
pub mod credentials;
pub mod gateway;
pub mod llm;
pub mod store;

// ============================================================================
// Server-only (behind `server` feature)
// ============================================================================

#[cfg(feature = "server")]
pub mod handlers;
#[cfg(feature = "server")]
pub mod response;
#[cfg(feature = "server")]
pub mod server;

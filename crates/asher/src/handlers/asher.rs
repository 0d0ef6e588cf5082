//! Ad-hoc provider testing handlers.
//!
//! These use process-wide credentials and never touch stored conversations.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::gateway::{ChatOutcome, ChatRequest};
use crate::llm::{ProviderError, ProviderStatus};
use crate::response;
use crate::server::AppState;

const SERVICE_NAME: &str = "ASHER Testing Lab";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ProvidersResponse {
    providers: Vec<ProviderStatus>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    service: &'static str,
    version: &'static str,
    available: bool,
    providers: Vec<ProviderStatus>,
    total_providers: usize,
    available_providers: usize,
}

#[derive(Deserialize)]
pub struct BatchRequest {
    message: String,
    #[serde(default)]
    system_prompt: String,
    /// Absent means the configured defaults; an explicit empty list is rejected.
    #[serde(default)]
    providers: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct BatchResponse {
    message: String,
    system_prompt: String,
    results: BTreeMap<String, ChatOutcome>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /providers
pub async fn list_providers(State(state): State<AppState>) -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        providers: state.gateway.list_providers(),
    })
}

/// GET /asher/status
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let registry = state.gateway.registry();
    let credentials = state.gateway.env_credentials();
    let providers: Vec<ProviderStatus> = state
        .batch_defaults
        .iter()
        .map(|id| registry.status(id, credentials))
        .collect();
    let available_providers = providers.iter().filter(|p| p.available).count();

    Json(StatusResponse {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        available: true,
        total_providers: providers.len(),
        available_providers,
        providers,
    })
}

/// POST /asher/test
///
/// Unknown provider ids are rejected with 400. Every other failure is a
/// 200 response with `success: false`.
pub async fn test_provider(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Response {
    let outcome = state.gateway.chat_once(&req).await;
    if let Some(e @ ProviderError::UnknownProvider(_)) = outcome.error() {
        return response::provider_error(e).into_response();
    }
    (StatusCode::OK, Json(outcome)).into_response()
}

/// POST /asher/batch
pub async fn batch(State(state): State<AppState>, Json(req): Json<BatchRequest>) -> Response {
    let providers = req
        .providers
        .unwrap_or_else(|| state.batch_defaults.to_vec());

    match state
        .gateway
        .chat_batch(&req.message, &req.system_prompt, &providers)
        .await
    {
        Ok(results) => (
            StatusCode::OK,
            Json(BatchResponse {
                message: req.message,
                system_prompt: req.system_prompt,
                results,
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

use std::collections::HashMap;

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use super::UserId;
use crate::llm::ProviderFamily;
use crate::response;
use crate::server::AppState;

#[derive(Deserialize)]
pub struct SetKeysRequest {
    api_keys: HashMap<String, String>,
}

#[derive(Serialize)]
pub struct SetKeysResponse {
    configured: Vec<String>,
}

/// PUT /api/keys
///
/// Merges the given keys into the caller's key map. A blank value removes a
/// key. Only `openai`, `anthropic`, `google` and `xai` are accepted.
pub async fn set_api_keys(
    State(state): State<AppState>,
    UserId(user): UserId,
    Json(req): Json<SetKeysRequest>,
) -> Response {
    if let Some(name) = req
        .api_keys
        .keys()
        .find(|name| !ProviderFamily::ALL.iter().any(|f| f.user_key() == name.as_str()))
    {
        return response::bad_request(format!("unknown key name: {name}")).into_response();
    }

    state.keys.set_api_keys(&user, req.api_keys);
    Json(SetKeysResponse {
        configured: state.keys.configured_keys(&user),
    })
    .into_response()
}

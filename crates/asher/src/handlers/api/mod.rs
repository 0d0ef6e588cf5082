//! Stored-conversation and per-user key handlers.

mod conversations;
mod keys;

pub use conversations::{create_conversation, get_messages, send_batch, send_message};
pub use keys::set_api_keys;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::response::{self, ErrorResponse};

/// Header carrying the caller identity, set by the upstream auth layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller.
pub struct UserId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for UserId {
    type Rejection = ErrorResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| UserId(v.to_string()))
            .ok_or_else(|| response::unauthorized(format!("missing {USER_ID_HEADER} header")))
    }
}

//! JSON error responses shared by the HTTP handlers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::gateway::GatewayError;
use crate::llm::ProviderError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
}

pub type ErrorResponse = (StatusCode, Json<ErrorBody>);

fn error(status: StatusCode, message: impl Into<String>) -> ErrorResponse {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
            kind: None,
        }),
    )
}

pub fn bad_request(message: impl Into<String>) -> ErrorResponse {
    error(StatusCode::BAD_REQUEST, message)
}

pub fn unauthorized(message: impl Into<String>) -> ErrorResponse {
    error(StatusCode::UNAUTHORIZED, message)
}

pub fn not_found(message: impl Into<String>) -> ErrorResponse {
    error(StatusCode::NOT_FOUND, message)
}

pub fn internal_error(message: impl Into<String>) -> ErrorResponse {
    error(StatusCode::INTERNAL_SERVER_ERROR, message)
}

/// A provider failure: caller mistakes are 400, vendor failures 502.
pub fn provider_error(e: &ProviderError) -> ErrorResponse {
    let status = match e {
        ProviderError::UnknownProvider(_) | ProviderError::Configuration { .. } => {
            StatusCode::BAD_REQUEST
        }
        ProviderError::Upstream { .. } => StatusCode::BAD_GATEWAY,
    };
    (
        status,
        Json(ErrorBody {
            error: e.to_string(),
            kind: Some(e.kind()),
        }),
    )
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match &self {
            GatewayError::EmptyBatch => bad_request(self.to_string()).into_response(),
            GatewayError::ConversationNotFound(_) => not_found(self.to_string()).into_response(),
            GatewayError::Store(_) => internal_error(self.to_string()).into_response(),
            GatewayError::Provider(e) => provider_error(e).into_response(),
        }
    }
}

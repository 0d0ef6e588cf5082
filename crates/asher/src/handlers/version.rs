use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct VersionResponse {
    name: &'static str,
    version: &'static str,
}

/// GET /version
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

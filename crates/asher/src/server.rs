use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use tower_http::timeout::TimeoutLayer;

use crate::config::Config;
use crate::credentials::Credentials;
use crate::gateway::{ChatGateway, ConversationChat};
use crate::handlers;
use crate::llm::ProviderRegistry;
use crate::store::{MemoryConversationStore, MemoryKeyStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: ChatGateway,
    pub conversations: ConversationChat,
    pub keys: MemoryKeyStore,
    /// Providers used by `/asher/batch` when the request names none.
    pub batch_defaults: Arc<[String]>,
}

impl AppState {
    /// Wire the gateway and in-memory stores from configuration.
    pub fn new(config: &Config, env_credentials: Credentials) -> Self {
        let gateway = ChatGateway::new(
            ProviderRegistry::builtin(),
            config.providers.clone(),
            env_credentials,
        );
        let keys = MemoryKeyStore::new();
        let conversations = ConversationChat::new(
            gateway.clone(),
            Arc::new(MemoryConversationStore::new()),
            Arc::new(keys.clone()),
        )
        .with_env_fallback(config.credentials.user_keys_fallback_to_env);

        Self {
            gateway,
            conversations,
            keys,
            batch_defaults: config.batch.default_providers.clone().into(),
        }
    }
}

pub fn build_app(state: AppState, request_timeout_secs: u64) -> Router {
    let api = Router::new()
        .route("/conversations", post(handlers::api::create_conversation))
        .route(
            "/conversations/{conversation_id}/messages",
            get(handlers::api::get_messages).post(handlers::api::send_message),
        )
        .route(
            "/conversations/{conversation_id}/batch",
            post(handlers::api::send_batch),
        )
        .route("/keys", put(handlers::api::set_api_keys));

    Router::new()
        .route("/livez", get(handlers::livez))
        .route("/readyz", get(handlers::readyz))
        .route("/version", get(handlers::version))
        .route("/providers", get(handlers::list_providers))
        .route("/asher/status", get(handlers::status))
        .route("/asher/test", post(handlers::test_provider))
        .route("/asher/batch", post(handlers::batch))
        .nest("/api", api)
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(request_timeout_secs),
        ))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, Response};
    use http_body_util::BodyExt;
    use mockito::Server;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::llm::ProviderFamily;

    fn app_with(config: Config, credentials: Credentials) -> Router {
        build_app(AppState::new(&config, credentials), 30)
    }

    fn app() -> Router {
        app_with(Config::default(), Credentials::default())
    }

    fn json_request(method: Method, uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoints_respond_ok() {
        for uri in ["/livez", "/readyz"] {
            let response = app()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app()
            .oneshot(Request::get("/version").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["name"], "asher");
    }

    #[tokio::test]
    async fn providers_lists_catalog_availability() {
        let credentials = Credentials::default().with_key(ProviderFamily::Grok, "xai");
        let response = app_with(Config::default(), credentials)
            .oneshot(Request::get("/providers").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let providers = body["providers"].as_array().unwrap();
        let grok = providers.iter().find(|p| p["id"] == "grok-3").unwrap();
        assert_eq!(grok["available"], true);
        let claude = providers
            .iter()
            .find(|p| p["id"] == "claude-sonnet-4.5")
            .unwrap();
        assert_eq!(claude["available"], false);
    }

    #[tokio::test]
    async fn status_counts_default_providers() {
        let credentials = Credentials::default()
            .with_key(ProviderFamily::OpenAI, "sk")
            .with_key(ProviderFamily::Claude, "ant");
        let response = app_with(Config::default(), credentials)
            .oneshot(Request::get("/asher/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["total_providers"], 4);
        assert_eq!(body["available_providers"], 2);
    }

    #[tokio::test]
    async fn test_endpoint_rejects_unknown_provider() {
        let response = app()
            .oneshot(json_request(
                Method::POST,
                "/asher/test",
                None,
                json!({"provider": "llama", "message": "hi"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["kind"], "unknown_provider");
    }

    #[tokio::test]
    async fn test_endpoint_reports_missing_key_as_failed_outcome() {
        let response = app()
            .oneshot(json_request(
                Method::POST,
                "/asher/test",
                None,
                json!({"provider": "gemini", "message": "hi"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["reply"], "");
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .contains("GOOGLE_API_KEY")
        );
    }

    #[tokio::test]
    async fn batch_endpoint_uses_defaults_and_rejects_empty_list() {
        let response = app()
            .oneshot(json_request(
                Method::POST,
                "/asher/batch",
                None,
                json!({"message": "hi"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let results = body["results"].as_object().unwrap();
        assert_eq!(results.len(), 4);
        assert!(results.values().all(|r| r["success"] == false));

        let response = app()
            .oneshot(json_request(
                Method::POST,
                "/asher/batch",
                None,
                json!({"message": "hi", "providers": []}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn conversation_routes_require_user() {
        let response = app()
            .oneshot(json_request(
                Method::POST,
                "/api/conversations",
                None,
                json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_conversation_is_404() {
        let response = app()
            .oneshot(
                Request::get("/api/conversations/nope/messages")
                    .header("x-user-id", "u1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn conversation_round_trip_through_http() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer user-key")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"pong"}}]}"#)
            .create_async()
            .await;

        let mut config = Config::default();
        config.providers.openai_base_url = server.url();
        let app = app_with(config, Credentials::default());

        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                "/api/keys",
                Some("u1"),
                json!({"api_keys": {"openai": "user-key"}}),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["configured"], json!(["openai"]));

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/conversations",
                Some("u1"),
                json!({"title": "ping test"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = body_json(response).await["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                &format!("/api/conversations/{id}/messages"),
                Some("u1"),
                json!({"provider": "openai", "message": "ping"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["assistant_message"]["content"], "pong");
        assert_eq!(body["assistant_message"]["model"], "openai");

        let response = app
            .oneshot(
                Request::get(format!("/api/conversations/{id}/messages"))
                    .header("x-user-id", "u1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn keys_endpoint_rejects_unknown_names() {
        let response = app()
            .oneshot(json_request(
                Method::PUT,
                "/api/keys",
                Some("u1"),
                json!({"api_keys": {"mistral": "k"}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

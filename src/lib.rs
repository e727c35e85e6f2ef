//! Core library for the Jaadu backend. Wires the configuration, the shared
//! state injected into handlers and the HTTP router.

mod config;
pub mod auth;
pub mod error;
pub mod model;
pub mod rate_limit;
pub mod routes;

pub use config::{AppConfig, GeminiConfig, DEFAULT_MAX_REQUEST_BYTES};
pub use error::{ApiError, ErrorResponse};
pub use model::{GeminiClient, ModelClient, ProviderError};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use routes::{AiResponse, ChatRequest, HealthResponse, TextRequest};

use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Process-scoped state shared by every handler. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub extension_api_key: Arc<str>,
    pub limiter: Arc<RateLimiter>,
    pub model: Arc<dyn ModelClient>,
    /// Maximum accepted raw request body size in bytes.
    pub max_request_bytes: usize,
}

impl AppState {
    pub fn new(config: &AppConfig, model: Arc<dyn ModelClient>) -> Self {
        Self {
            extension_api_key: Arc::from(config.extension_api_key.as_str()),
            limiter: Arc::new(RateLimiter::new(config.rate_limit.clone())),
            model,
            max_request_bytes: config.max_request_bytes,
        }
    }
}

/// Build state for a given configuration, backed by the Gemini client.
pub fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let gemini = GeminiClient::new(config.gemini.clone()).context("failed to build Gemini client")?;
    Ok(AppState::new(config, Arc::new(gemini)))
}

/// Build the Axum router. Serve it with connect info so handlers can key the
/// rate limiter on the client address.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    Router::new()
        .route("/", get(routes::health_handler))
        .route("/ai/summarize", post(routes::summarize_handler))
        .route("/ai/explain", post(routes::explain_handler))
        .route("/ai/chat", post(routes::chat_handler))
        .layer(DefaultBodyLimit::max(state.max_request_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

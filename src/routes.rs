//! HTTP handlers for the health check and the three AI operations.
//!
//! The AI routes differ only in body type and prompt template, so each one is
//! a thin wrapper around [`run_operation`], which applies the shared sequence:
//! authorize, validate, rate-limit, build the prompt, make one model call.

use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

use axum::extract::rejection::{BytesRejection, FailedToBufferBody, JsonRejection};
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::auth::ensure_authorized;
use crate::error::ApiError;
use crate::AppState;

pub const SERVICE_NAME: &str = "Jaadu backend";

pub const MAX_TEXT_CHARS: usize = 8000;
pub const MAX_QUESTION_CHARS: usize = 1000;
pub const MAX_CONTEXT_CHARS: usize = 8000;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChatRequest {
    pub question: String,
    pub context: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct AiResponse {
    pub result: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
}

/// Field-length checks run on every body before the model is called.
pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

impl Validate for TextRequest {
    fn validate(&self) -> Result<(), ApiError> {
        check_len("text", &self.text, MAX_TEXT_CHARS)
    }
}

impl Validate for ChatRequest {
    fn validate(&self) -> Result<(), ApiError> {
        check_len("question", &self.question, MAX_QUESTION_CHARS)?;
        check_len("context", &self.context, MAX_CONTEXT_CHARS)
    }
}

fn check_len(field: &str, value: &str, max: usize) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len > max {
        return Err(ApiError::Validation(format!(
            "{}: must be at most {} characters (got {})",
            field, max, len
        )));
    }
    Ok(())
}

pub fn summarize_prompt(req: &TextRequest) -> String {
    format!(
        "Summarize the following text in clear, concise bullet points:\n\n{}",
        req.text
    )
}

pub fn explain_prompt(req: &TextRequest) -> String {
    format!("Explain this in simple, clear language:\n\n{}", req.text)
}

pub fn chat_prompt(req: &ChatRequest) -> String {
    format!(
        "\nYou are a helpful assistant answering questions about a webpage.\n\n\
         Page content:\n{}\n\n\
         User question:\n{}\n\n\
         Answer clearly and concisely.\n",
        req.context, req.question
    )
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: format!("{} running", SERVICE_NAME),
    })
}

pub async fn summarize_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<AiResponse>, ApiError> {
    run_operation(&state, "summarize", &headers, addr.ip(), payload, summarize_prompt).await
}

pub async fn explain_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<AiResponse>, ApiError> {
    run_operation(&state, "explain", &headers, addr.ip(), payload, explain_prompt).await
}

pub async fn chat_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<AiResponse>, ApiError> {
    run_operation(&state, "chat", &headers, addr.ip(), payload, chat_prompt).await
}

/// Shared executor for the AI routes. `operation` doubles as the rate-limit
/// scope, so each route has its own quota per client.
pub async fn run_operation<B>(
    state: &AppState,
    operation: &'static str,
    headers: &HeaderMap,
    client: IpAddr,
    payload: Result<Json<B>, JsonRejection>,
    template: fn(&B) -> String,
) -> Result<Json<AiResponse>, ApiError>
where
    B: DeserializeOwned + Validate,
{
    if let Err(err) = ensure_authorized(headers, &state.extension_api_key) {
        tracing::info!(operation, client = %client, "rejected request with bad extension key");
        return Err(err);
    }
    let Json(body) = payload.map_err(|rejection| map_json_rejection(state, rejection))?;
    body.validate()?;

    // Only well-formed requests count against the quota.
    if !state.limiter.try_acquire(operation, client) {
        tracing::info!(operation, client = %client, "rate limit exceeded");
        return Err(ApiError::RateLimited);
    }

    let prompt = template(&body);
    let start = Instant::now();
    match state.model.generate(&prompt).await {
        Ok(result) => {
            tracing::info!(
                operation,
                client = %client,
                model = state.model.name(),
                latency_ms = start.elapsed().as_millis() as u64,
                "generation completed"
            );
            Ok(Json(AiResponse { result }))
        }
        Err(err) => {
            tracing::warn!(
                operation,
                client = %client,
                model = state.model.name(),
                error = %err,
                "generation failed"
            );
            Err(ApiError::Provider(err))
        }
    }
}

fn map_json_rejection(state: &AppState, rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::BytesRejection(BytesRejection::FailedToBufferBody(
            FailedToBufferBody::LengthLimitError(_),
        )) => {
            tracing::warn!(limit = state.max_request_bytes, "request body exceeded configured limit");
            ApiError::PayloadTooLarge {
                limit: state.max_request_bytes,
            }
        }
        other => ApiError::Validation(other.body_text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_and_explain_templates() {
        let req = TextRequest {
            text: "A long paragraph.".into(),
        };
        assert_eq!(
            summarize_prompt(&req),
            "Summarize the following text in clear, concise bullet points:\n\nA long paragraph."
        );
        assert_eq!(
            explain_prompt(&req),
            "Explain this in simple, clear language:\n\nA long paragraph."
        );
    }

    #[test]
    fn chat_template_embeds_context_then_question() {
        let req = ChatRequest {
            question: "Who wrote it?".into(),
            context: "An essay by Ada.".into(),
        };
        let prompt = chat_prompt(&req);
        assert!(prompt.contains("answering questions about a webpage"));
        assert!(prompt.contains("Page content:\nAn essay by Ada.\n\nUser question:\nWho wrote it?"));
        assert!(prompt.trim_end().ends_with("Answer clearly and concisely."));
    }

    #[test]
    fn length_limits_count_characters() {
        let at_limit = TextRequest {
            text: "é".repeat(MAX_TEXT_CHARS),
        };
        assert!(at_limit.validate().is_ok());

        let over = TextRequest {
            text: "a".repeat(MAX_TEXT_CHARS + 1),
        };
        let err = over.validate().unwrap_err();
        assert!(err.to_string().starts_with("text:"));

        let chat = ChatRequest {
            question: "q".repeat(MAX_QUESTION_CHARS + 1),
            context: String::new(),
        };
        assert!(chat.validate().unwrap_err().to_string().starts_with("question:"));

        let chat = ChatRequest {
            question: "q".into(),
            context: "c".repeat(MAX_CONTEXT_CHARS + 1),
        };
        assert!(chat.validate().unwrap_err().to_string().starts_with("context:"));
    }
}

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use flowrelay_conversation::ChatService;
use flowrelay_core::{ChatResponse, SessionHistory};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::{ApiError, Result};
use crate::health;

pub const MAX_MESSAGE_CHARS: usize = 5000;
pub const MAX_SESSION_ID_CHARS: usize = 100;

/// Application state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub langflow_configured: bool,
    pub started_at: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(chat: Arc<ChatService>, langflow_configured: bool) -> Self {
        Self {
            chat,
            langflow_configured,
            started_at: Instant::now(),
        }
    }
}

/// Success envelope shared by every chat route.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: String,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Create router with all routes
pub fn create_router(state: AppState) -> Router {
    let chat = Router::new()
        .route("/message", post(send_message))
        .route("/session", post(create_session))
        .route("/session/:session_id/history", get(get_session_history));

    let health = Router::new()
        .route("/", get(health::health))
        .route("/ready", get(health::ready));

    let api = Router::new()
        .nest("/chat", chat)
        .nest("/health", health.clone());

    Router::new()
        .nest("/api/v1", api)
        .nest("/health", health)
        .with_state(state)
}

/// POST /api/v1/chat/message
async fn send_message(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ChatResponse>>> {
    let Json(request) = payload.map_err(|e| ApiError::Validation(vec![e.body_text()]))?;

    let message = check_length("Message", &request.message, MAX_MESSAGE_CHARS);
    let session_id = request
        .session_id
        .as_deref()
        .map(|raw| check_length("Session ID", raw, MAX_SESSION_ID_CHARS))
        .transpose();
    let (message, session_id) = match (message, session_id) {
        (Ok(message), Ok(session_id)) => (message, session_id),
        (message, session_id) => {
            let problems = [message.err(), session_id.err()]
                .into_iter()
                .flatten()
                .collect();
            return Err(ApiError::Validation(problems));
        }
    };

    info!(
        "Processing chat message for session: {}",
        session_id.unwrap_or("new")
    );

    let response = state.chat.process_message(message, session_id).await?;
    Ok(ApiResponse::ok(response))
}

/// GET /api/v1/chat/session/:session_id/history
async fn get_session_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<SessionHistory>>> {
    let session_id = check_length("Session ID", &session_id, MAX_SESSION_ID_CHARS)
        .map_err(|p| ApiError::Validation(vec![p]))?;

    Ok(ApiResponse::ok(state.chat.session_history(session_id)))
}

/// POST /api/v1/chat/session
async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let session_id = state.chat.create_session();
    (
        StatusCode::CREATED,
        ApiResponse::ok(json!({ "sessionId": session_id })),
    )
}

/// Trim `raw` and require between 1 and `max` characters.
fn check_length<'a>(field: &str, raw: &'a str, max: usize) -> std::result::Result<&'a str, String> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if (1..=max).contains(&len) {
        Ok(trimmed)
    } else {
        Err(format!("{field} must be between 1 and {max} characters"))
    }
}

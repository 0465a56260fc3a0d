//! Liveness and readiness probes.

use axum::extract::State;
use axum::response::Json;
use serde_json::{Value, json};
use tracing::info;

use crate::routes::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    info!("Health check requested");
    Json(json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime": state.started_at.elapsed().as_secs_f64(),
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.chat.store().len(),
    }))
}

/// GET /health/ready
pub async fn ready(State(state): State<AppState>) -> Json<Value> {
    let langflow = if state.langflow_configured {
        "configured"
    } else {
        "not configured"
    };
    Json(json!({
        "status": "READY",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "services": { "langflow": langflow },
    }))
}

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body or path failed validation before reaching the core.
    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error(transparent)]
    Core(#[from] flowrelay_core::Error),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Core(e) => StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        error!("Request failed ({}): {self}", status.as_u16());

        let details = match &self {
            Self::Validation(details) => Some(json!(details)),
            Self::Core(flowrelay_core::Error::Validation(reason)) => Some(json!([reason])),
            Self::Core(_) => None,
        };

        let mut error = json!({
            "message": self.to_string(),
            "code": status.as_u16(),
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        let body = Json(json!({
            "success": false,
            "error": error,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

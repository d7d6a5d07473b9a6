use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::time::Duration;

/// Errors returned by the gateway's handlers.
///
/// Implements `IntoResponse` so handlers can return `Result<T, ApiError>`. Upstream
/// failure details are logged, never forwarded, since they may echo request headers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No voice configured and none requested")]
    NoVoice,

    #[error("Vendor request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Vendor responded with status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Vendor did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Transcription produced no text")]
    EmptyTranscript,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            ApiError::NoVoice => (
                StatusCode::BAD_REQUEST,
                "NO_VOICE",
                "A voice_id is required".to_string(),
            ),
            ApiError::Transport(e) => {
                tracing::error!("Vendor transport error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_UNREACHABLE",
                    "The speech vendor could not be reached".to_string(),
                )
            }
            ApiError::Upstream { status, message } => {
                tracing::error!("Vendor error {status}: {message}");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    format!("The speech vendor rejected the request ({status})"),
                )
            }
            ApiError::Timeout(after) => {
                tracing::warn!("Vendor timed out after {after:?}");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "UPSTREAM_TIMEOUT",
                    "The speech vendor took too long to respond".to_string(),
                )
            }
            ApiError::EmptyTranscript => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "EMPTY_TRANSCRIPT",
                "No speech was recognized in the recording".to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

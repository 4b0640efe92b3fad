//! Error types for the transcription webhook

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced synchronously to the webhook caller
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Missing phone number")]
    MissingPhoneNumber,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::InvalidPayload(_) | Error::MissingPhoneNumber => StatusCode::BAD_REQUEST,
            Error::Internal(_) => {
                tracing::error!("Internal error: {:?}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<callbridge_core::CallbridgeError> for Error {
    fn from(err: callbridge_core::CallbridgeError) -> Self {
        match err {
            callbridge_core::CallbridgeError::Validation(msg) => Error::InvalidPayload(msg),
            other => Error::Internal(other.to_string()),
        }
    }
}

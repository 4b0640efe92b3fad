//! Shared reqwest plumbing for the upstream API clients

use callbridge_core::{CallbridgeError, Result};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// Body excerpt length kept in error messages
const ERROR_BODY_LIMIT: usize = 300;

pub fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| CallbridgeError::Config(format!("Failed to create HTTP client: {}", e)))
}

pub fn map_reqwest(err: reqwest::Error) -> CallbridgeError {
    if err.is_timeout() {
        CallbridgeError::Timeout(err.to_string())
    } else if err.is_decode() {
        CallbridgeError::Protocol(err.to_string())
    } else {
        CallbridgeError::Network(err.to_string())
    }
}

/// Pass 2xx responses through; turn anything else into an error carrying
/// the status and a truncated body.
pub async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    if status == StatusCode::NOT_FOUND {
        Err(CallbridgeError::NotFound(message))
    } else {
        Err(CallbridgeError::Upstream {
            status: status.as_u16(),
            message,
        })
    }
}

/// Content type without parameters, lower-cased
pub fn content_type(response: &Response) -> String {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

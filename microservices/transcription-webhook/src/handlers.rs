//! HTTP handlers for the transcription webhook

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use callbridge_core::HealthStatus;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::stats::StatsSnapshot;
use crate::{AppState, Error, Result};

/// Body of the 202 acknowledgment
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedResponse {
    pub success: bool,
    pub message: String,
    pub call_id: String,
    pub phone_number: String,
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus::ok())
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.pipeline.metrics().snapshot())
}

/// `POST /cloudtalk/transcription`
pub async fn cloudtalk_transcription(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<AcceptedResponse>)> {
    let payload = parse_body(&headers, &body)?;
    let event = state.pipeline.accept(payload).await?;

    info!(call_id = %event.call_id, phone = ?event.phone_number, "Webhook accepted");

    let response = AcceptedResponse {
        success: true,
        message: "Webhook received, processing started".to_string(),
        call_id: event.call_id.to_string(),
        phone_number: event.phone_number.clone().unwrap_or_default(),
    };
    state.pipeline.spawn(event);

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// JSON bodies, plus form-encoded bodies some webhook senders use
fn parse_body(headers: &HeaderMap, body: &[u8]) -> Result<Value> {
    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);

    if is_form {
        let fields: Map<String, Value> = url::form_urlencoded::parse(body)
            .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
            .collect();
        return Ok(Value::Object(fields));
    }

    serde_json::from_slice(body).map_err(|e| Error::InvalidPayload(format!("body is not valid JSON: {}", e)))
}

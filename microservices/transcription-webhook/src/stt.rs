//! Speech-to-text fallback (OpenAI Whisper compatible API)

use crate::cloudtalk::Recording;
use crate::config::SpeechToTextConfig;
use crate::http::{ensure_success, map_reqwest};
use async_trait::async_trait;
use callbridge_core::{CallbridgeError, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, recording: &Recording) -> Result<String>;
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

pub struct WhisperClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl WhisperClient {
    /// `None` when no API key is configured
    pub fn from_config(client: Client, config: &SpeechToTextConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        Some(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

/// Upload file name matching the audio container
fn file_name(content_type: &str) -> &'static str {
    match content_type {
        "audio/wav" | "audio/x-wav" | "audio/wave" => "recording.wav",
        "audio/ogg" => "recording.ogg",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "recording.m4a",
        "audio/webm" => "recording.webm",
        _ => "recording.mp3",
    }
}

#[async_trait]
impl SpeechToText for WhisperClient {
    async fn transcribe(&self, recording: &Recording) -> Result<String> {
        let mime = if recording.content_type.starts_with("audio/") {
            recording.content_type.as_str()
        } else {
            "audio/mpeg"
        };
        let part = Part::bytes(recording.bytes.to_vec())
            .file_name(file_name(mime))
            .mime_str(mime)
            .map_err(|e| CallbridgeError::Internal(format!("invalid audio mime type: {}", e)))?;

        let form = Form::new()
            .text("model", self.model.clone())
            .text("response_format", "json")
            .part("file", part);

        debug!(bytes = recording.bytes.len(), model = %self.model, "Submitting recording for transcription");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest)?;
        let response = ensure_success(response).await?;

        let body: TranscriptionResponse = response.json().await.map_err(map_reqwest)?;
        let text = body.text.trim();
        if text.is_empty() {
            return Err(CallbridgeError::NotFound("speech-to-text returned no text".into()));
        }
        Ok(text.to_string())
    }
}

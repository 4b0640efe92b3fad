//! CloudTalk REST client
//!
//! Call detail lookup, transcription polling and recording download.

use crate::config::CloudTalkConfig;
use crate::http::{content_type, ensure_success, map_reqwest};
use async_trait::async_trait;
use bytes::Bytes;
use callbridge_core::{CallId, CallbridgeError, Result};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};

/// Call details the enricher can use
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallRecord {
    pub phone_number: Option<String>,
    pub caller_name: Option<String>,
    pub recording_link: Option<String>,
    pub call_uuid: Option<String>,
}

/// Downloaded call audio
#[derive(Debug, Clone)]
pub struct Recording {
    pub bytes: Bytes,
    pub content_type: String,
    /// Candidate URL the audio came from
    pub source: String,
}

/// Telephony provider operations used by the pipeline
#[async_trait]
pub trait CallProvider: Send + Sync {
    /// Whether API credentials are available
    fn is_configured(&self) -> bool;

    /// First call record for `call_id`, if the provider knows it
    async fn find_call(&self, call_id: &CallId) -> Result<Option<CallRecord>>;

    /// Resolve the conversation-intelligence UUID for a numeric call id
    async fn lookup_call_uuid(&self, call_id: &CallId) -> Result<String>;

    /// Transcript text for `id`. `NotFound` while it is not ready yet.
    async fn fetch_transcription(&self, id: &str) -> Result<String>;

    /// Audio for the call, trying each candidate source in order
    async fn download_recording(&self, call_id: &CallId, link: Option<&str>) -> Result<Recording>;
}

/// One way of asking for the recording
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingCandidate {
    pub url: String,
    pub authenticated: bool,
}

/// Ordered recording sources: the link as-is, the link with credentials,
/// then the two API download routes.
pub fn recording_candidates(
    base_url: &str,
    call_id: &CallId,
    link: Option<&str>,
    has_credentials: bool,
) -> Vec<RecordingCandidate> {
    let mut candidates = Vec::new();
    if let Some(link) = link {
        candidates.push(RecordingCandidate {
            url: link.to_string(),
            authenticated: false,
        });
        if has_credentials {
            candidates.push(RecordingCandidate {
                url: link.to_string(),
                authenticated: true,
            });
        }
    }
    if has_credentials && call_id.is_known() {
        for suffix in ["recording.mp3", "recording"] {
            candidates.push(RecordingCandidate {
                url: format!("{}/calls/{}/{}", base_url, call_id, suffix),
                authenticated: true,
            });
        }
    }
    candidates
}

/// Content types accepted as call audio
pub fn is_audio(content_type: &str) -> bool {
    content_type.starts_with("audio/") || content_type == "application/octet-stream"
}

/// Pull the enrichment fields out of one `calls/index.json` record
pub fn parse_call_record(record: &Value) -> CallRecord {
    let first = |pointers: &[&str]| {
        pointers.iter().find_map(|p| match record.pointer(p) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    };

    CallRecord {
        phone_number: first(&[
            "/Contact/contact_numbers/0",
            "/Cdr/caller_number",
            "/external_number",
            "/b_number",
        ]),
        caller_name: first(&["/Contact/name"]),
        recording_link: first(&[
            "/recording_link",
            "/Cdr/recording_link",
            "/recording_url",
            "/Cdr/recording_url",
        ]),
        call_uuid: first(&["/uuid", "/Cdr/uuid"]),
    }
}

/// Call UUID from an analytics call record; blank candidates are passed over.
pub fn parse_call_uuid(body: &Value) -> Option<String> {
    ["/uuid", "/call_uuid", "/data/uuid", "/data/call_uuid"]
        .iter()
        .find_map(|p| match body.pointer(p) {
            Some(Value::String(uuid)) if !uuid.trim().is_empty() => Some(uuid.trim().to_string()),
            _ => None,
        })
}

/// Text of a transcription response; `None` while nothing is available.
pub fn transcription_body_text(body: &Value) -> Option<String> {
    if let Some(text) = body.get("text").and_then(Value::as_str) {
        let text = text.trim();
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }
    body.get("segments")
        .and_then(Value::as_array)
        .and_then(|segments| crate::structured::join_segments(segments))
}

pub struct CloudTalkClient {
    client: Client,
    base_url: String,
    analytics_url: String,
    credentials: Option<(String, String)>,
}

impl CloudTalkClient {
    pub fn new(client: Client, config: &CloudTalkConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            analytics_url: config.analytics_url.trim_end_matches('/').to_string(),
            credentials: config.credentials(),
        }
    }

    fn authed(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let (key, secret) = self
            .credentials
            .as_ref()
            .ok_or_else(|| CallbridgeError::Config("CloudTalk credentials not configured".into()))?;
        Ok(request.basic_auth(key, Some(secret)))
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let request = self.authed(self.client.get(url))?;
        let response = request.send().await.map_err(map_reqwest)?;
        let response = ensure_success(response).await?;
        response.json().await.map_err(map_reqwest)
    }

    async fn try_candidate(&self, candidate: &RecordingCandidate) -> Result<Recording> {
        let mut request = self.client.get(&candidate.url);
        if candidate.authenticated {
            request = self.authed(request)?;
        }
        let response = ensure_success(request.send().await.map_err(map_reqwest)?).await?;

        let content_type = content_type(&response);
        if !is_audio(&content_type) {
            return Err(CallbridgeError::Protocol(format!(
                "unexpected content type '{}'",
                content_type
            )));
        }

        let bytes = response.bytes().await.map_err(map_reqwest)?;
        Ok(Recording {
            bytes,
            content_type,
            source: candidate.url.clone(),
        })
    }
}

#[async_trait]
impl CallProvider for CloudTalkClient {
    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn find_call(&self, call_id: &CallId) -> Result<Option<CallRecord>> {
        let url = format!("{}/calls/index.json?call_id={}", self.base_url, call_id);
        debug!(call_id = %call_id, "Fetching call details");

        let body = self.get_json(&url).await?;
        let records = body
            .pointer("/responseData/data")
            .and_then(Value::as_array)
            .ok_or_else(|| CallbridgeError::Protocol("missing responseData.data".into()))?;

        Ok(records.first().map(parse_call_record))
    }

    async fn lookup_call_uuid(&self, call_id: &CallId) -> Result<String> {
        let url = format!("{}/calls/{}", self.analytics_url, call_id);
        let body = self.get_json(&url).await?;
        parse_call_uuid(&body)
            .ok_or_else(|| CallbridgeError::NotFound(format!("no call uuid for call {}", call_id)))
    }

    async fn fetch_transcription(&self, id: &str) -> Result<String> {
        let url = format!(
            "{}/conversation-intelligence/transcription/{}.json",
            self.base_url, id
        );
        let body = self.get_json(&url).await?;
        transcription_body_text(&body)
            .ok_or_else(|| CallbridgeError::NotFound(format!("transcription {} has no text yet", id)))
    }

    async fn download_recording(&self, call_id: &CallId, link: Option<&str>) -> Result<Recording> {
        let candidates = recording_candidates(&self.base_url, call_id, link, self.is_configured());
        if candidates.is_empty() {
            return Err(CallbridgeError::NotFound(format!(
                "no recording source for call {}",
                call_id
            )));
        }

        let mut last_error = None;
        for candidate in &candidates {
            match self.try_candidate(candidate).await {
                Ok(recording) => {
                    debug!(source = %recording.source, bytes = recording.bytes.len(), "Recording downloaded");
                    return Ok(recording);
                }
                Err(e) => {
                    warn!(
                        url = %candidate.url,
                        authenticated = candidate.authenticated,
                        error = %e,
                        "Recording candidate failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CallbridgeError::NotFound("no recording".into())))
    }
}

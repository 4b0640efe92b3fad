//! Inbound CloudTalk webhook payloads

use crate::error::{Error, Result};
use crate::structured::join_segments;
use callbridge_core::{CallId, PhoneNumber};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Transcription strings CloudTalk sends when nothing was transcribed
const PLACEHOLDER_TRANSCRIPTS: &[&str] = &["[object Object]", "{}", "null"];

/// One completed call, as reported by the webhook and later enriched
#[derive(Debug, Clone, Serialize)]
pub struct CallEvent {
    pub call_id: CallId,
    pub call_uuid: Option<String>,
    pub phone_number: Option<String>,
    pub caller_name: Option<String>,
    pub transcript: Option<String>,
    pub recording_link: Option<String>,
    pub received_at: DateTime<Utc>,
    pub raw: Value,
    /// Set once the provider's call record has been consulted
    #[serde(skip)]
    pub details_fetched: bool,
}

impl CallEvent {
    /// Parse a webhook body. Only non-object bodies are rejected here;
    /// phone validation happens after enrichment.
    pub fn from_payload(raw: Value) -> Result<Self> {
        let fields = match &raw {
            Value::Object(map) => map,
            other => {
                return Err(Error::InvalidPayload(format!(
                    "expected a JSON object, got {}",
                    json_kind(other)
                )))
            }
        };

        let call_id = field(fields, "call_id")
            .and_then(scalar_string)
            .map(CallId::new)
            .unwrap_or_else(CallId::unknown);

        let recording_link = field(fields, "recording_link")
            .or_else(|| field(fields, "recording_url"))
            .and_then(scalar_string);

        Ok(Self {
            call_id,
            call_uuid: field(fields, "call_uuid").and_then(scalar_string),
            phone_number: field(fields, "external_number").and_then(scalar_string),
            caller_name: caller_name(fields),
            transcript: field(fields, "transcription").and_then(transcription_text),
            recording_link,
            received_at: Utc::now(),
            raw,
            details_fetched: false,
        })
    }

    /// Phone number usable for matching, if any
    pub fn phone(&self) -> Option<PhoneNumber> {
        self.phone_number.as_deref().and_then(PhoneNumber::parse)
    }

    pub fn has_usable_phone(&self) -> bool {
        self.phone().is_some()
    }

    /// Caller name for display, defaulting to `Unknown`
    pub fn client_label(&self) -> &str {
        self.caller_name.as_deref().unwrap_or("Unknown")
    }
}

/// Keys compare equal after trimming, lower-casing and dropping `_`/`-`.
fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn field<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    let wanted = normalize_key(name);
    fields
        .iter()
        .find(|(key, _)| normalize_key(key) == wanted)
        .map(|(_, value)| value)
}

/// Non-blank strings and numbers, trimmed
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn caller_name(fields: &Map<String, Value>) -> Option<String> {
    for container in ["contacts", "contact"] {
        let nested = match field(fields, container) {
            Some(Value::Object(map)) => field(map, "name"),
            Some(Value::Array(items)) => items
                .first()
                .and_then(Value::as_object)
                .and_then(|map| field(map, "name")),
            _ => None,
        };
        if let Some(name) = nested.and_then(scalar_string) {
            return Some(name);
        }
    }

    field(fields, "contact_name")
        .or_else(|| field(fields, "caller_name"))
        .and_then(scalar_string)
}

/// Text carried by a `transcription` value, or `None` when it is one of the
/// shapes CloudTalk uses for "nothing yet".
pub fn transcription_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || PLACEHOLDER_TRANSCRIPTS.contains(&trimmed) {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Object(map) if map.is_empty() => None,
        Value::Object(map) => match map.get("text") {
            Some(Value::String(text)) => transcription_text(&Value::String(text.clone())),
            _ => match map.get("segments") {
                Some(Value::Array(segments)) => join_segments(segments),
                _ => Some(value.to_string()),
            },
        },
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items) => join_segments(items),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

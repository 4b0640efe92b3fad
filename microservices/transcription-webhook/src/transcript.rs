//! Transcript resolution: inline text, provider API, speech-to-text, placeholder

use crate::cloudtalk::CallProvider;
use crate::event::CallEvent;
use crate::stt::SpeechToText;
use crate::structured::format_transcript;
use callbridge_core::{retry_with_backoff, CallbridgeError, RetryPolicy};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Marker line prepended to machine-transcribed text
pub const AI_TRANSCRIPT_MARKER: &str = "[AI-generated transcript]";
pub const PENDING_PLACEHOLDER: &str = "[Transcript processing or not available]";

/// Where the transcript text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Inline,
    ProviderApi,
    SpeechToText,
    Unavailable,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::ProviderApi => "provider_api",
            Self::SpeechToText => "speech_to_text",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedTranscript {
    pub text: String,
    pub provenance: Provenance,
}

impl ResolvedTranscript {
    fn new(text: String, provenance: Provenance) -> Self {
        Self { text, provenance }
    }

    /// Placeholder for when no strategy produced text
    pub fn unavailable(recording_link: Option<&str>) -> Self {
        let text = match recording_link {
            Some(link) => format!("[Transcript not available, backup link: {}]", link),
            None => PENDING_PLACEHOLDER.to_string(),
        };
        Self::new(text, Provenance::Unavailable)
    }

    /// Text as written to downstream records
    pub fn rendered(&self) -> String {
        match self.provenance {
            Provenance::SpeechToText => format!("{}\n\n{}", AI_TRANSCRIPT_MARKER, self.text),
            _ => self.text.clone(),
        }
    }
}

pub struct TranscriptResolver {
    provider: Arc<dyn CallProvider>,
    speech: Option<Arc<dyn SpeechToText>>,
    retry: RetryPolicy,
}

impl TranscriptResolver {
    pub fn new(
        provider: Arc<dyn CallProvider>,
        speech: Option<Arc<dyn SpeechToText>>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            speech,
            retry,
        }
    }

    /// Try each strategy in order and stop at the first that yields text.
    pub async fn resolve(&self, event: &CallEvent) -> ResolvedTranscript {
        if let Some(text) = event.transcript.as_deref() {
            debug!(call_id = %event.call_id, "Using inline transcript");
            return ResolvedTranscript::new(format_transcript(text), Provenance::Inline);
        }

        if let Some(text) = self.from_provider(event).await {
            return ResolvedTranscript::new(format_transcript(&text), Provenance::ProviderApi);
        }

        if let Some(text) = self.from_recording(event).await {
            return ResolvedTranscript::new(text, Provenance::SpeechToText);
        }

        info!(call_id = %event.call_id, "No transcript available, using placeholder");
        ResolvedTranscript::unavailable(event.recording_link.as_deref())
    }

    async fn from_provider(&self, event: &CallEvent) -> Option<String> {
        if !self.provider.is_configured() {
            debug!("CloudTalk credentials missing, skipping transcription API");
            return None;
        }

        let id = match &event.call_uuid {
            Some(uuid) => uuid.clone(),
            None if event.call_id.is_known() => {
                match self.provider.lookup_call_uuid(&event.call_id).await {
                    Ok(uuid) => uuid,
                    Err(e) => {
                        debug!(call_id = %event.call_id, error = %e, "Call uuid lookup failed, using call id");
                        event.call_id.as_str().to_string()
                    }
                }
            }
            None => return None,
        };

        let result = retry_with_backoff(&self.retry, CallbridgeError::is_retryable, |attempt| {
            let provider = Arc::clone(&self.provider);
            let id = id.clone();
            async move {
                debug!(attempt, transcription_id = %id, "Polling transcription");
                provider.fetch_transcription(&id).await
            }
        })
        .await;

        match result {
            Ok(text) => {
                info!(call_id = %event.call_id, "Transcript fetched from CloudTalk");
                Some(text)
            }
            Err(e) => {
                warn!(call_id = %event.call_id, attempts = e.attempts(), error = %e, "Transcription API gave no text");
                None
            }
        }
    }

    async fn from_recording(&self, event: &CallEvent) -> Option<String> {
        let speech = self.speech.as_ref()?;
        let reachable = event.recording_link.is_some()
            || (self.provider.is_configured() && event.call_id.is_known());
        if !reachable {
            return None;
        }

        let recording = match self
            .provider
            .download_recording(&event.call_id, event.recording_link.as_deref())
            .await
        {
            Ok(recording) => recording,
            Err(e) => {
                warn!(call_id = %event.call_id, error = %e, "Recording download failed");
                return None;
            }
        };

        match speech.transcribe(&recording).await {
            Ok(text) => {
                info!(call_id = %event.call_id, source = %recording.source, "Recording transcribed");
                Some(text)
            }
            Err(e) => {
                warn!(call_id = %event.call_id, error = %e, "Speech-to-text failed");
                None
            }
        }
    }
}

//! Transcription Webhook
//!
//! Receives CloudTalk call-transcription webhooks, resolves a transcript
//! (inline, CloudTalk API, or speech-to-text), renders a proposal and files
//! both against the caller's ClickUp task.

pub mod artifacts;
pub mod clickup;
pub mod cloudtalk;
pub mod config;
pub mod enricher;
pub mod error;
pub mod event;
pub mod handlers;
pub mod http;
pub mod pipeline;
pub mod proposal;
pub mod reconciler;
pub mod routes;
pub mod service;
pub mod stats;
pub mod structured;
pub mod stt;
pub mod tasks;
pub mod transcript;

use std::sync::Arc;

pub use config::BridgeConfig;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineReport};
pub use routes::create_router;
pub use service::TranscriptionWebhookService;

/// Shared state for handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

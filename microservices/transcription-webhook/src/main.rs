//! Transcription Webhook
//!
//! CloudTalk call transcripts in, ClickUp task updates out.

use callbridge_core::MicroserviceRuntime;
use std::sync::Arc;
use tracing::info;
use transcription_webhook::{BridgeConfig, TranscriptionWebhookService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    callbridge_telemetry::init("transcription-webhook")?;

    let config = BridgeConfig::from_env()?;
    info!(
        cloudtalk_configured = config.cloudtalk.credentials().is_some(),
        speech_to_text = config.speech.api_key.is_some(),
        clickup_list = ?config.clickup.list_id,
        "Starting Transcription Webhook"
    );

    let service = Arc::new(TranscriptionWebhookService::new(config)?);
    MicroserviceRuntime::run(service).await?;
    Ok(())
}

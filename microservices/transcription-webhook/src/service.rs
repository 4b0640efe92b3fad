//! Service lifecycle for the transcription webhook

use async_trait::async_trait;
use callbridge_core::{CallbridgeService, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::info;

use crate::{create_router, AppState, BridgeConfig, Pipeline};

pub struct TranscriptionWebhookService {
    config: BridgeConfig,
    state: AppState,
    shutdown: Arc<Notify>,
}

impl TranscriptionWebhookService {
    pub fn new(config: BridgeConfig) -> Result<Self> {
        let pipeline = Arc::new(Pipeline::from_config(&config)?);
        Ok(Self {
            config,
            state: AppState::new(pipeline),
            shutdown: Arc::new(Notify::new()),
        })
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }
}

#[async_trait]
impl CallbridgeService for TranscriptionWebhookService {
    fn service_id(&self) -> &'static str {
        "transcription-webhook"
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Stopping webhook listener");
        self.shutdown.notify_one();
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        let bind_addr = self.config.service.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            address = %bind_addr,
            scratch_dir = %self.config.service.scratch_dir.display(),
            "Transcription webhook listening"
        );

        let shutdown = Arc::clone(&self.shutdown);
        axum::serve(listener, create_router(self.state()))
            .with_graceful_shutdown(async move { shutdown.notified().await })
            .await?;
        Ok(())
    }
}

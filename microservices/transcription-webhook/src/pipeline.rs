//! Webhook acceptance and the background run that follows it

use crate::artifacts::{ArtifactStore, TranscriptSnapshot};
use crate::clickup::ClickUpConnector;
use crate::cloudtalk::{CallProvider, CloudTalkClient};
use crate::config::BridgeConfig;
use crate::enricher::Enricher;
use crate::error::Error;
use crate::event::CallEvent;
use crate::http::build_client;
use crate::proposal::{self, ProposalInput};
use crate::reconciler::{ReconcileOutcome, ReconcileRequest, TaskReconciler};
use crate::stats::BridgeMetrics;
use crate::stt::{SpeechToText, WhisperClient};
use crate::tasks::{TaskToolConnector, TaskToolError};
use crate::transcript::{Provenance, TranscriptResolver};
use callbridge_core::{CallId, PhoneNumber};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// What one background run did
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub call_id: CallId,
    pub provenance: Provenance,
    pub outcome: Option<ReconcileOutcome>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl PipelineReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

pub struct Pipeline {
    artifacts: ArtifactStore,
    enricher: Enricher,
    resolver: TranscriptResolver,
    connector: Arc<dyn TaskToolConnector>,
    reconciler: TaskReconciler,
    metrics: BridgeMetrics,
}

impl Pipeline {
    pub fn new(
        config: &BridgeConfig,
        provider: Arc<dyn CallProvider>,
        speech: Option<Arc<dyn SpeechToText>>,
        connector: Arc<dyn TaskToolConnector>,
    ) -> Self {
        Self {
            artifacts: ArtifactStore::new(config.service.scratch_dir.clone()),
            enricher: Enricher::new(Arc::clone(&provider)),
            resolver: TranscriptResolver::new(provider, speech, config.transcript_retry.clone()),
            connector,
            reconciler: TaskReconciler::new(&config.clickup),
            metrics: BridgeMetrics::new(),
        }
    }

    /// Wire the CloudTalk, Whisper and ClickUp clients described by `config`
    pub fn from_config(config: &BridgeConfig) -> callbridge_core::Result<Self> {
        let http = build_client(config.service.http_timeout_secs)?;
        let provider: Arc<dyn CallProvider> = Arc::new(CloudTalkClient::new(http.clone(), &config.cloudtalk));
        let speech = WhisperClient::from_config(http, &config.speech)
            .map(|client| Arc::new(client) as Arc<dyn SpeechToText>);
        if speech.is_none() {
            info!("OPENAI_API_KEY not set, speech-to-text fallback disabled");
        }
        let connector = Arc::new(ClickUpConnector::new(config.clickup.clone()));

        Ok(Self::new(config, provider, speech, connector))
    }

    pub fn metrics(&self) -> &BridgeMetrics {
        &self.metrics
    }

    /// Synchronous part of a webhook: log, parse, validate. The provider is
    /// only consulted here when the phone number has to come from it.
    pub async fn accept(&self, payload: Value) -> Result<CallEvent, Error> {
        self.metrics.record_received();

        if let Err(e) = self.artifacts.write_raw_payload(&payload, Utc::now()).await {
            warn!(error = %e, "Failed to log raw webhook payload");
        }

        let mut event = match CallEvent::from_payload(payload) {
            Ok(event) => event,
            Err(e) => {
                self.metrics.record_rejected();
                return Err(e);
            }
        };

        if !event.has_usable_phone() {
            self.enricher.enrich(&mut event).await;
        }

        if !event.has_usable_phone() {
            warn!(call_id = %event.call_id, "Rejecting webhook without phone number");
            self.metrics.record_rejected();
            return Err(Error::MissingPhoneNumber);
        }

        self.metrics.record_accepted();
        Ok(event)
    }

    /// Run the rest of the pipeline detached from the request
    pub fn spawn(self: &Arc<Self>, event: CallEvent) -> JoinHandle<PipelineReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", %run_id, call_id = %event.call_id);
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.process(run_id, event).await }.instrument(span))
    }

    pub async fn process(&self, run_id: Uuid, mut event: CallEvent) -> PipelineReport {
        let started = Instant::now();
        self.metrics.pipeline_started();

        // Recording details for the fallback strategies, when accept() had no need to look them up
        self.enricher.enrich(&mut event).await;

        let transcript = self.resolver.resolve(&event).await;
        self.metrics.record_transcript(transcript.provenance);
        info!(provenance = %transcript.provenance, chars = transcript.text.len(), "Transcript resolved");
        let rendered = transcript.rendered();

        let phone = event
            .phone()
            .unwrap_or_else(|| PhoneNumber::new(event.phone_number.clone().unwrap_or_default()));

        let snapshot = TranscriptSnapshot {
            id: event.call_id.to_string(),
            phone_number: phone.to_string(),
            client: event.client_label().to_string(),
            date: event.received_at,
            transcript: rendered.clone(),
            provenance: transcript.provenance,
            raw: event.raw.clone(),
        };
        if let Err(e) = self.artifacts.write_snapshot(&snapshot).await {
            warn!(error = %e, "Failed to write transcript snapshot");
        }

        let proposal = proposal::generate(
            &ProposalInput {
                call_id: event.call_id.clone(),
                phone: phone.to_string(),
                client: event.caller_name.clone(),
                call_date: event.received_at,
                transcript: rendered.clone(),
            },
            Utc::now(),
        );
        if let Err(e) = self.artifacts.write_proposal(&proposal).await {
            warn!(error = %e, "Failed to write proposal");
        }

        let request = ReconcileRequest {
            call_id: event.call_id.clone(),
            phone,
            caller_name: event.caller_name.clone(),
            call_date: event.received_at,
            transcript: rendered,
            proposal: proposal.content,
        };
        let result = self.reconcile(&request).await;
        self.metrics.record_reconcile(result.as_ref().ok());

        let (outcome, error) = match result {
            Ok(outcome) => {
                info!(outcome = ?outcome, "Reconciliation finished");
                (Some(outcome), None)
            }
            Err(e) => {
                error!(error = %e, "Reconciliation failed");
                (None, Some(e.to_string()))
            }
        };

        let elapsed = started.elapsed();
        let report = PipelineReport {
            run_id,
            call_id: event.call_id,
            provenance: transcript.provenance,
            outcome,
            error,
            elapsed_ms: elapsed.as_millis() as u64,
        };
        self.write_report(&report).await;
        self.metrics.pipeline_finished(elapsed.as_secs_f64() * 1000.0);

        info!(elapsed_ms = report.elapsed_ms, succeeded = report.succeeded(), "Pipeline finished");
        report
    }

    /// One tool session per run; the server is shut down whatever the result.
    async fn reconcile(&self, request: &ReconcileRequest) -> Result<ReconcileOutcome, TaskToolError> {
        self.reconciler.list_id()?;
        let tool = self.connector.connect().await?;
        let result = self.reconciler.reconcile(tool.as_ref(), request).await;
        if let Err(e) = tool.close().await {
            warn!(error = %e, "Failed to close task tool session");
        }
        result
    }

    async fn write_report(&self, report: &PipelineReport) {
        let contents = match serde_json::to_string_pretty(report) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(error = %e, "Failed to serialize pipeline report");
                return;
            }
        };
        if let Err(e) = self.artifacts.write_result(&report.call_id, Utc::now(), &contents).await {
            warn!(error = %e, "Failed to write pipeline result");
        }
    }
}

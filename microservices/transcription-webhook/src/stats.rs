//! In-process webhook counters served on `/stats`

use crate::reconciler::ReconcileOutcome;
use crate::transcript::Provenance;
use callbridge_telemetry::{Counter, Gauge, Histogram, MetricSnapshot};
use serde::Serialize;

#[derive(Clone)]
pub struct BridgeMetrics {
    webhooks_received: Counter,
    webhooks_rejected: Counter,
    webhooks_accepted: Counter,
    transcripts_inline: Counter,
    transcripts_provider: Counter,
    transcripts_speech: Counter,
    transcripts_unavailable: Counter,
    tasks_created: Counter,
    tasks_updated: Counter,
    reconcile_failures: Counter,
    pipelines_in_flight: Gauge,
    pipeline_duration_ms: Histogram,
}

/// `/stats` response body
#[derive(Debug, Serialize)]
pub struct StatsSnapshot {
    pub metrics: Vec<MetricSnapshot>,
    pub pipeline_p95_ms: f64,
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self {
            webhooks_received: Counter::new("webhooks_received"),
            webhooks_rejected: Counter::new("webhooks_rejected"),
            webhooks_accepted: Counter::new("webhooks_accepted"),
            transcripts_inline: Counter::new("transcripts_inline"),
            transcripts_provider: Counter::new("transcripts_provider_api"),
            transcripts_speech: Counter::new("transcripts_speech_to_text"),
            transcripts_unavailable: Counter::new("transcripts_unavailable"),
            tasks_created: Counter::new("tasks_created"),
            tasks_updated: Counter::new("tasks_updated"),
            reconcile_failures: Counter::new("reconcile_failures"),
            pipelines_in_flight: Gauge::new("pipelines_in_flight"),
            pipeline_duration_ms: Histogram::new("pipeline_duration_ms"),
        }
    }

    pub fn record_received(&self) {
        self.webhooks_received.inc();
    }

    pub fn record_rejected(&self) {
        self.webhooks_rejected.inc();
    }

    pub fn record_accepted(&self) {
        self.webhooks_accepted.inc();
    }

    pub fn pipeline_started(&self) {
        self.pipelines_in_flight.inc();
    }

    pub fn record_transcript(&self, provenance: Provenance) {
        match provenance {
            Provenance::Inline => self.transcripts_inline.inc(),
            Provenance::ProviderApi => self.transcripts_provider.inc(),
            Provenance::SpeechToText => self.transcripts_speech.inc(),
            Provenance::Unavailable => self.transcripts_unavailable.inc(),
        }
    }

    pub fn record_reconcile(&self, outcome: Option<&ReconcileOutcome>) {
        match outcome {
            Some(ReconcileOutcome::Created { .. }) => self.tasks_created.inc(),
            Some(ReconcileOutcome::Updated { .. }) => self.tasks_updated.inc(),
            None => self.reconcile_failures.inc(),
        }
    }

    pub fn pipeline_finished(&self, elapsed_ms: f64) {
        self.pipelines_in_flight.dec();
        self.pipeline_duration_ms.record(elapsed_ms);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let metrics = vec![
            self.webhooks_received.snapshot(),
            self.webhooks_rejected.snapshot(),
            self.webhooks_accepted.snapshot(),
            self.transcripts_inline.snapshot(),
            self.transcripts_provider.snapshot(),
            self.transcripts_speech.snapshot(),
            self.transcripts_unavailable.snapshot(),
            self.tasks_created.snapshot(),
            self.tasks_updated.snapshot(),
            self.reconcile_failures.snapshot(),
            self.pipelines_in_flight.snapshot(),
            self.pipeline_duration_ms.snapshot(),
        ];
        StatsSnapshot {
            metrics,
            pipeline_p95_ms: self.pipeline_duration_ms.percentile(95.0),
        }
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.snapshot()
            .metrics
            .into_iter()
            .find(|m| m.name == name)
            .map(|m| m.value)
    }
}

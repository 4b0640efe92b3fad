//! Backfills call metadata the webhook left out

use crate::cloudtalk::CallProvider;
use crate::event::CallEvent;
use callbridge_core::PhoneNumber;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Enricher {
    provider: Arc<dyn CallProvider>,
}

impl Enricher {
    pub fn new(provider: Arc<dyn CallProvider>) -> Self {
        Self { provider }
    }

    /// Whether a call-detail lookup could add anything to `event`. The
    /// record is fetched at most once per event.
    pub fn needs_enrichment(event: &CallEvent) -> bool {
        if event.details_fetched {
            return false;
        }
        let phone_missing = !event.has_usable_phone();
        let nothing_to_transcribe = event.transcript.is_none() && event.recording_link.is_none();
        phone_missing || nothing_to_transcribe
    }

    /// Fill absent fields from the provider's call record. Failures leave
    /// the event as it was.
    pub async fn enrich(&self, event: &mut CallEvent) {
        if !Self::needs_enrichment(event) {
            return;
        }
        if !event.call_id.is_known() {
            debug!("No call id, skipping enrichment");
            return;
        }
        if !self.provider.is_configured() {
            warn!(call_id = %event.call_id, "CloudTalk credentials missing, cannot enrich call");
            return;
        }

        event.details_fetched = true;
        let record = match self.provider.find_call(&event.call_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(call_id = %event.call_id, "Call not found at provider");
                return;
            }
            Err(e) => {
                warn!(call_id = %event.call_id, error = %e, "Call detail lookup failed");
                return;
            }
        };

        if !event.has_usable_phone() {
            if let Some(phone) = record.phone_number.as_deref().and_then(PhoneNumber::parse) {
                info!(call_id = %event.call_id, phone = %phone, "Phone number recovered from call details");
                event.phone_number = Some(phone.as_str().to_string());
            }
        }
        fill(&mut event.caller_name, record.caller_name);
        fill(&mut event.recording_link, record.recording_link);
        fill(&mut event.call_uuid, record.call_uuid);
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

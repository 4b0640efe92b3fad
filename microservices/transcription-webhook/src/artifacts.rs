//! Debug artifacts written under the scratch directory

use crate::proposal::Proposal;
use crate::transcript::Provenance;
use callbridge_core::{CallId, Result, Timestamp};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

const WEBHOOK_LOGS: &str = "webhook_logs";
const TRANSCRIPTS: &str = "transcripts";
const PROPOSALS: &str = "proposals";

/// Per-call transcript record
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptSnapshot {
    pub id: String,
    pub phone_number: String,
    pub client: String,
    pub date: DateTime<Utc>,
    pub transcript: String,
    pub provenance: Provenance,
    pub raw: Value,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn write_raw_payload(&self, payload: &Value, received_at: DateTime<Utc>) -> Result<PathBuf> {
        let name = format!("webhook_{}.json", Timestamp(received_at).file_stamp());
        self.write(WEBHOOK_LOGS, &name, serde_json::to_vec_pretty(payload)?).await
    }

    pub async fn write_snapshot(&self, snapshot: &TranscriptSnapshot) -> Result<PathBuf> {
        let name = format!("transcript_{}.json", file_safe(&snapshot.id));
        self.write(TRANSCRIPTS, &name, serde_json::to_vec_pretty(snapshot)?).await
    }

    /// Overwrites any earlier proposal for the same call
    pub async fn write_proposal(&self, proposal: &Proposal) -> Result<PathBuf> {
        let name = format!("proposal_{}.md", file_safe(proposal.call_id.as_str()));
        self.write(PROPOSALS, &name, proposal.content.clone().into_bytes()).await
    }

    pub async fn write_result(&self, call_id: &CallId, at: DateTime<Utc>, contents: &str) -> Result<PathBuf> {
        let name = format!(
            "result_{}_{}.txt",
            file_safe(call_id.as_str()),
            at.timestamp_millis()
        );
        self.write(WEBHOOK_LOGS, &name, contents.as_bytes().to_vec()).await
    }

    async fn write(&self, dir: &str, name: &str, contents: Vec<u8>) -> Result<PathBuf> {
        let dir = self.root.join(dir);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(name);
        tokio::fs::write(&path, contents).await?;
        debug!(path = %path.display(), "Artifact written");
        Ok(path)
    }
}

/// Keep provider ids from escaping the artifact directory
fn file_safe(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

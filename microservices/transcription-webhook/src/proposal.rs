//! Proposal document rendering

use callbridge_core::CallId;
use chrono::{DateTime, SecondsFormat, Utc};

/// Everything a proposal is rendered from
#[derive(Debug, Clone)]
pub struct ProposalInput {
    pub call_id: CallId,
    pub phone: String,
    pub client: Option<String>,
    pub call_date: DateTime<Utc>,
    pub transcript: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub call_id: CallId,
    pub content: String,
}

/// Render the proposal. Output depends only on the input and `generated_at`,
/// which appears solely in the footer line.
pub fn generate(input: &ProposalInput, generated_at: DateTime<Utc>) -> Proposal {
    let client = input.client.as_deref().unwrap_or("Unknown Client");
    let date = input.call_date.format("%Y-%m-%d");

    let content = format!(
        "# Project Proposal for {client}\n\
         \n\
         - **Call ID:** {call_id}\n\
         - **Phone:** {phone}\n\
         - **Client:** {client}\n\
         - **Date:** {date}\n\
         \n\
         ## Overview\n\
         Based on our conversation on {date}, here is a proposal draft.\n\
         \n\
         ## Discussion Summary\n\
         {transcript}\n\
         \n\
         ## Proposed Action Items\n\
         1. [User to fill in]\n\
         2. [User to fill in]\n\
         \n\
         ## Next Steps\n\
         - Review this proposal.\n\
         - Confirm scope.\n\
         \n\
         ---\n\
         *Generated automatically on {generated} from CloudTalk Call ID: {call_id}*\n",
        client = client,
        call_id = input.call_id,
        phone = input.phone,
        date = date,
        transcript = input.transcript,
        generated = generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    );

    Proposal {
        call_id: input.call_id.clone(),
        content,
    }
}

//! Downstream task records and the tool interface used to reach them

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Custom field names that may hold the caller's number
pub const PHONE_FIELD_NAMES: &[&str] = &["Phone Number", "Phone", "Telefon"];
pub const TRANSCRIPT_FIELD: &str = "Transcript";
pub const PROPOSAL_FIELD: &str = "Proposal";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomField {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
}

impl CustomField {
    /// Field value as text; empty strings and non-scalar values count as unset
    pub fn text_value(&self) -> Option<String> {
        match self.value.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl Task {
    pub fn field(&self, name: &str) -> Option<&CustomField> {
        self.custom_fields.iter().find(|f| f.name == name)
    }

    /// The first phone-like field that carries a value
    pub fn phone_value(&self) -> Option<String> {
        self.custom_fields
            .iter()
            .filter(|f| PHONE_FIELD_NAMES.contains(&f.name.as_str()))
            .find_map(CustomField::text_value)
    }
}

/// Creation request for a task
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub list_id: String,
    pub name: String,
    pub description: String,
    pub status: String,
    /// `(field id, value)` pairs set at creation time
    pub custom_fields: Vec<(String, Value)>,
}

#[derive(Debug, thiserror::Error)]
pub enum TaskToolError {
    #[error("could not start tool server: {0}")]
    Spawn(String),

    #[error("tool server connection: {0}")]
    Transport(String),

    #[error("tool server did not answer {0} in time")]
    Timeout(String),

    #[error("tool '{0}' not offered by the tool server")]
    ToolMissing(String),

    #[error("tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("unexpected tool output: {0}")]
    Protocol(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Operations the reconciler needs from the task tool server
#[async_trait]
pub trait TaskTool: Send + Sync {
    async fn list_tasks(&self, list_id: &str) -> Result<Vec<Task>, TaskToolError>;

    /// Returns the new task's id
    async fn create_task(&self, task: &NewTask) -> Result<String, TaskToolError>;

    /// Whether [`TaskTool::set_custom_field`] is available
    fn supports_field_updates(&self) -> bool;

    async fn set_custom_field(&self, task_id: &str, field_id: &str, value: &str) -> Result<(), TaskToolError>;

    /// End the session and stop the server behind it
    async fn close(self: Box<Self>) -> Result<(), TaskToolError>;
}

/// Opens a fresh tool session per reconciliation
#[async_trait]
pub trait TaskToolConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn TaskTool>, TaskToolError>;
}

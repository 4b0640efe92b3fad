//! Pairs a call with a task by phone number, creating or updating it

use crate::config::ClickUpConfig;
use crate::tasks::{NewTask, Task, TaskTool, TaskToolError, PROPOSAL_FIELD, TRANSCRIPT_FIELD};
use callbridge_core::{CallId, PhoneNumber};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

/// Task name used when the caller is unknown
pub const DEFAULT_TASK_NAME: &str = "New Caller";

#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    pub call_id: CallId,
    pub phone: PhoneNumber,
    pub caller_name: Option<String>,
    pub call_date: DateTime<Utc>,
    pub transcript: String,
    pub proposal: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Created { task_id: String, name: String },
    Updated {
        task_id: String,
        written: Vec<String>,
        skipped: Vec<String>,
    },
}

pub struct TaskReconciler {
    list_id: Option<String>,
    default_status: String,
    phone_field_id: Option<String>,
}

impl TaskReconciler {
    pub fn new(config: &ClickUpConfig) -> Self {
        Self {
            list_id: config.list_id.clone(),
            default_status: config.default_status.clone(),
            phone_field_id: config.phone_field_id.clone(),
        }
    }

    /// Target list; a missing one fails before any tool server is started.
    pub fn list_id(&self) -> Result<&str, TaskToolError> {
        self.list_id
            .as_deref()
            .ok_or_else(|| TaskToolError::Config("CLICKUP_LIST_ID is not set".into()))
    }

    pub async fn reconcile(
        &self,
        tool: &dyn TaskTool,
        request: &ReconcileRequest,
    ) -> Result<ReconcileOutcome, TaskToolError> {
        let list_id = self.list_id()?;

        let tasks = tool.list_tasks(list_id).await?;
        info!(list_id, task_count = tasks.len(), "Fetched tasks");

        match find_matching_task(&tasks, &request.phone) {
            Some(task) => self.update(tool, task, request).await,
            None => self.create(tool, list_id, request).await,
        }
    }

    async fn create(
        &self,
        tool: &dyn TaskTool,
        list_id: &str,
        request: &ReconcileRequest,
    ) -> Result<ReconcileOutcome, TaskToolError> {
        let name = request
            .caller_name
            .clone()
            .unwrap_or_else(|| DEFAULT_TASK_NAME.to_string());
        let custom_fields = self
            .phone_field_id
            .iter()
            .map(|id| (id.clone(), json!(request.phone.as_str())))
            .collect();

        let new_task = NewTask {
            list_id: list_id.to_string(),
            name: name.clone(),
            description: task_description(request),
            status: self.default_status.clone(),
            custom_fields,
        };

        info!(phone = %request.phone, name = %name, "No task for caller, creating one");
        let task_id = tool.create_task(&new_task).await?;
        info!(task_id = %task_id, "Task created");

        Ok(ReconcileOutcome::Created { task_id, name })
    }

    async fn update(
        &self,
        tool: &dyn TaskTool,
        task: &Task,
        request: &ReconcileRequest,
    ) -> Result<ReconcileOutcome, TaskToolError> {
        info!(task_id = %task.id, task_name = %task.name, phone = %request.phone, "Matched existing task");

        let mut written = Vec::new();
        let mut skipped = Vec::new();

        for (field_name, value) in [
            (TRANSCRIPT_FIELD, request.transcript.as_str()),
            (PROPOSAL_FIELD, request.proposal.as_str()),
        ] {
            let Some(field) = task.field(field_name) else {
                let available: Vec<&str> = task.custom_fields.iter().map(|f| f.name.as_str()).collect();
                warn!(task_id = %task.id, field = field_name, available = ?available, "Field not on task, skipping");
                skipped.push(field_name.to_string());
                continue;
            };
            if !tool.supports_field_updates() {
                warn!(task_id = %task.id, field = field_name, "No set_custom_field tool, skipping");
                skipped.push(field_name.to_string());
                continue;
            }

            tool.set_custom_field(&task.id, &field.id, value).await?;
            info!(task_id = %task.id, field = field_name, "Field updated");
            written.push(field_name.to_string());
        }

        Ok(ReconcileOutcome::Updated {
            task_id: task.id.clone(),
            written,
            skipped,
        })
    }
}

/// First task whose phone field loosely matches `phone`
pub fn find_matching_task<'a>(tasks: &'a [Task], phone: &PhoneNumber) -> Option<&'a Task> {
    tasks.iter().find(|task| {
        task.phone_value()
            .map(|stored| phone.loosely_matches(&stored))
            .unwrap_or(false)
    })
}

fn task_description(request: &ReconcileRequest) -> String {
    format!(
        "Created via CloudTalk Webhook\n\nCall ID: {}\nDate: {}\n\n## Transcript\n\n{}",
        request.call_id,
        request.call_date.to_rfc3339(),
        request.transcript
    )
}

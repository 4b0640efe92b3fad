//! ClickUp task access through the ClickUp MCP tool server

use crate::config::ClickUpConfig;
use crate::tasks::{NewTask, Task, TaskTool, TaskToolConnector, TaskToolError};
use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, CallToolResult};
use rmcp::service::{RunningService, ServiceExt};
use rmcp::transport::{child_process::TokioChildProcess, ConfigureCommandExt};
use rmcp::RoleClient;
use serde_json::{json, Map, Value};
use std::future::Future;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

const GET_TASKS: &str = "get_tasks";
const CREATE_TASK: &str = "create_task";
const SET_CUSTOM_FIELD: &str = "set_custom_field";

/// One session with the tool server, with tool names resolved up front
pub struct McpTaskTool {
    service: RunningService<RoleClient, ()>,
    timeout: Duration,
    get_tasks: String,
    create_task: String,
    set_custom_field: Option<String>,
}

/// Bound `request` by `limit`, naming `what` on expiry
async fn bounded<T, E: std::fmt::Display>(
    limit: Duration,
    what: &str,
    request: impl Future<Output = Result<T, E>>,
) -> Result<T, TaskToolError> {
    tokio::time::timeout(limit, request)
        .await
        .map_err(|_| TaskToolError::Timeout(what.to_string()))?
        .map_err(|e| TaskToolError::Transport(format!("{} failed: {}", what, e)))
}

impl McpTaskTool {
    /// Discover the task tools offered by a connected server
    pub async fn from_service(
        service: RunningService<RoleClient, ()>,
        timeout: Duration,
    ) -> Result<Self, TaskToolError> {
        let listed = bounded(timeout, "tools/list", service.list_tools(Default::default())).await?;
        let listed = serde_json::to_value(&listed)
            .map_err(|e| TaskToolError::Protocol(format!("unreadable tool list: {}", e)))?;
        let tools = tool_names(&listed)?;

        let get_tasks = find_tool(&tools, GET_TASKS).ok_or_else(|| TaskToolError::ToolMissing(GET_TASKS.into()))?;
        let create_task =
            find_tool(&tools, CREATE_TASK).ok_or_else(|| TaskToolError::ToolMissing(CREATE_TASK.into()))?;
        let set_custom_field = find_tool(&tools, SET_CUSTOM_FIELD);

        debug!(
            get_tasks = %get_tasks,
            create_task = %create_task,
            set_custom_field = ?set_custom_field,
            tool_count = tools.len(),
            "Resolved task tools"
        );

        Ok(Self {
            service,
            timeout,
            get_tasks,
            create_task,
            set_custom_field,
        })
    }

    /// Call `tool` and return its first text block
    async fn call(&self, tool: &str, arguments: Value) -> Result<String, TaskToolError> {
        let request = self.service.call_tool(CallToolRequestParam {
            name: tool.to_string().into(),
            arguments: arguments.as_object().cloned(),
        });
        let result = bounded(self.timeout, tool, request).await?;

        let text = first_text(&result);
        if result.is_error.unwrap_or(false) {
            return Err(TaskToolError::ToolFailed {
                tool: tool.to_string(),
                message: text.unwrap_or_else(|| "no details".to_string()),
            });
        }
        Ok(text.unwrap_or_default())
    }
}

/// Names out of a serialized `tools/list` result
fn tool_names(listed: &Value) -> Result<Vec<String>, TaskToolError> {
    let tools = listed
        .get("tools")
        .and_then(Value::as_array)
        .ok_or_else(|| TaskToolError::Protocol("tool list has no 'tools' array".into()))?;
    Ok(tools
        .iter()
        .filter_map(|t| t.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect())
}

/// First tool whose name contains `fragment`; servers prefix their tool
/// names inconsistently.
fn find_tool(tools: &[String], fragment: &str) -> Option<String> {
    tools.iter().find(|name| name.contains(fragment)).cloned()
}

fn first_text(result: &CallToolResult) -> Option<String> {
    result
        .content
        .iter()
        .find_map(|c| c.as_text().map(|t| t.text.clone()))
}

/// Task list out of `get_tasks` output (`{"tasks": [...]}`)
pub fn parse_task_list(text: &str) -> Result<Vec<Task>, TaskToolError> {
    let body: Value = serde_json::from_str(text)
        .map_err(|_| TaskToolError::Protocol("get_tasks did not return JSON".into()))?;
    match body.get("tasks") {
        Some(tasks) => serde_json::from_value(tasks.clone())
            .map_err(|e| TaskToolError::Protocol(format!("malformed task list: {}", e))),
        None => Ok(Vec::new()),
    }
}

/// New task id out of `create_task` output (`id` or `task.id`)
pub fn parse_created_id(text: &str) -> Result<String, TaskToolError> {
    let body: Value = serde_json::from_str(text)
        .map_err(|_| TaskToolError::Protocol(format!("create_task did not return JSON: {}", text)))?;

    ["/id", "/task/id"]
        .iter()
        .find_map(|p| match body.pointer(p) {
            Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .ok_or_else(|| TaskToolError::Protocol("create_task result carries no task id".into()))
}

#[async_trait]
impl TaskTool for McpTaskTool {
    async fn list_tasks(&self, list_id: &str) -> Result<Vec<Task>, TaskToolError> {
        let text = self
            .call(&self.get_tasks, json!({"list_id": list_id, "include_closed": true}))
            .await?;
        parse_task_list(&text)
    }

    async fn create_task(&self, task: &NewTask) -> Result<String, TaskToolError> {
        let mut arguments = Map::new();
        arguments.insert("list_id".into(), json!(task.list_id));
        arguments.insert("name".into(), json!(task.name));
        arguments.insert("description".into(), json!(task.description));
        arguments.insert("status".into(), json!(task.status));
        if !task.custom_fields.is_empty() {
            let fields: Vec<Value> = task
                .custom_fields
                .iter()
                .map(|(id, value)| json!({"id": id, "value": value}))
                .collect();
            arguments.insert("custom_fields".into(), Value::Array(fields));
        }

        let text = self.call(&self.create_task, Value::Object(arguments)).await?;
        parse_created_id(&text)
    }

    fn supports_field_updates(&self) -> bool {
        self.set_custom_field.is_some()
    }

    async fn set_custom_field(&self, task_id: &str, field_id: &str, value: &str) -> Result<(), TaskToolError> {
        let tool = self
            .set_custom_field
            .as_deref()
            .ok_or_else(|| TaskToolError::ToolMissing(SET_CUSTOM_FIELD.into()))?;
        self.call(
            tool,
            json!({"task_id": task_id, "field_id": field_id, "value": value}),
        )
        .await?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), TaskToolError> {
        self.service
            .cancel()
            .await
            .map_err(|e| TaskToolError::Transport(format!("shutdown failed: {}", e)))?;
        Ok(())
    }
}

/// Spawns the ClickUp MCP server for each session
pub struct ClickUpConnector {
    config: ClickUpConfig,
}

impl ClickUpConnector {
    pub fn new(config: ClickUpConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> Result<Command, TaskToolError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| TaskToolError::Config("CLICKUP_API_KEY is not set".into()))?;

        Ok(Command::new(&self.config.mcp_command).configure(|cmd| {
            cmd.args(&self.config.mcp_args);
            cmd.env("CLICKUP_API_TOKEN", api_key);
        }))
    }
}

#[async_trait]
impl TaskToolConnector for ClickUpConnector {
    async fn connect(&self) -> Result<Box<dyn TaskTool>, TaskToolError> {
        let command = self.command()?;
        debug!(command = %self.config.mcp_command, args = ?self.config.mcp_args, "Launching ClickUp tool server");
        let child = TokioChildProcess::new(command).map_err(|e| {
            TaskToolError::Spawn(format!("failed to launch '{}': {}", self.config.mcp_command, e))
        })?;

        let service = bounded(self.config.tool_timeout, "initialize", ().serve(child)).await?;
        info!("Connected to ClickUp tool server");
        Ok(Box::new(
            McpTaskTool::from_service(service, self.config.tool_timeout).await?,
        ))
    }
}

//! Configuration for the transcription webhook service

use callbridge_core::{EnvSource, Result, RetryPolicy, ServiceConfig};
use std::time::Duration;

/// Default MCP server entry point for the ClickUp tool server
const DEFAULT_CLICKUP_MCP_ARGS: &str = "node_modules/@chykalophia/clickup-mcp-server/build/index.js";

/// Complete service configuration, passed explicitly to every component
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub service: ServiceConfig,
    pub cloudtalk: CloudTalkConfig,
    pub speech: SpeechToTextConfig,
    pub clickup: ClickUpConfig,
    /// Polling policy for the provider transcription endpoint
    pub transcript_retry: RetryPolicy,
}

/// CloudTalk REST API access
#[derive(Debug, Clone)]
pub struct CloudTalkConfig {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub base_url: String,
    pub analytics_url: String,
}

/// Speech-to-text (Whisper-compatible) API access
#[derive(Debug, Clone)]
pub struct SpeechToTextConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

/// ClickUp tool server and target list
#[derive(Debug, Clone)]
pub struct ClickUpConfig {
    pub api_key: Option<String>,
    pub list_id: Option<String>,
    pub mcp_command: String,
    pub mcp_args: Vec<String>,
    /// Status given to tasks created for unknown callers
    pub default_status: String,
    /// Custom field pre-filled with the caller's number on creation
    pub phone_field_id: Option<String>,
    /// Upper bound on each request to the tool server
    pub tool_timeout: Duration,
}

impl BridgeConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_source(&EnvSource::process())
    }

    pub fn from_source(source: &EnvSource) -> Result<Self> {
        let service = ServiceConfig::from_source(source)?;

        let transcript_retry = RetryPolicy::new()
            .with_maximum_attempts(source.parse("TRANSCRIPT_MAX_ATTEMPTS", 12)?)
            .with_initial_interval(source.duration_secs("TRANSCRIPT_RETRY_DELAY_SECS", 10.0)?)
            .with_backoff_coefficient(source.parse("TRANSCRIPT_BACKOFF_COEFFICIENT", 1.0)?)
            .with_maximum_interval(source.duration_secs("TRANSCRIPT_MAX_DELAY_SECS", 60.0)?);

        Ok(Self {
            service,
            cloudtalk: CloudTalkConfig {
                api_key: source.optional("CLOUDTALK_API_KEY"),
                api_secret: source.optional("CLOUDTALK_API_SECRET"),
                base_url: source.string_or("CLOUDTALK_BASE_URL", "https://my.cloudtalk.io/api"),
                analytics_url: source.string_or(
                    "CLOUDTALK_ANALYTICS_URL",
                    "https://analytics-api.cloudtalk.io/api",
                ),
            },
            speech: SpeechToTextConfig {
                api_key: source.optional("OPENAI_API_KEY"),
                base_url: source.string_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
                model: source.string_or("OPENAI_TRANSCRIBE_MODEL", "whisper-1"),
            },
            clickup: ClickUpConfig {
                api_key: source.optional("CLICKUP_API_KEY"),
                list_id: source.optional("CLICKUP_LIST_ID"),
                mcp_command: source.string_or("CLICKUP_MCP_COMMAND", "node"),
                mcp_args: source
                    .string_or("CLICKUP_MCP_ARGS", DEFAULT_CLICKUP_MCP_ARGS)
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
                default_status: source.string_or("CLICKUP_DEFAULT_STATUS", "lead necontactat"),
                phone_field_id: source.optional("CLICKUP_PHONE_FIELD_ID"),
                tool_timeout: source.duration_secs("CLICKUP_TOOL_TIMEOUT_SECS", 30.0)?,
            },
            transcript_retry,
        })
    }
}

impl CloudTalkConfig {
    /// Basic-auth pair, present only when both halves are configured
    pub fn credentials(&self) -> Option<(String, String)> {
        match (&self.api_key, &self.api_secret) {
            (Some(key), Some(secret)) => Some((key.clone(), secret.clone())),
            _ => None,
        }
    }
}

//! Logging configuration read from the environment

/// Log line encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, span fields included
    Json,
    /// Human-readable lines for local runs
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" | "true" | "1" => Some(Self::Json),
            "pretty" | "plain" | "text" | "false" | "0" => Some(Self::Pretty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
    pub format: LogFormat,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            default_filter: "info".to_string(),
            format: LogFormat::Json,
        }
    }

    /// `SERVICE_NAME`, `RUST_LOG`, and `LOG_FORMAT` (or the older boolean
    /// `JSON_LOGS`) from the process environment.
    pub fn from_env(service_name: &str) -> Self {
        Self::from_lookup(service_name, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(service_name: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::new(
            lookup("SERVICE_NAME")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| service_name.to_string()),
        );
        if let Some(filter) = lookup("RUST_LOG").filter(|s| !s.trim().is_empty()) {
            config.default_filter = filter;
        }
        if let Some(format) = lookup("LOG_FORMAT")
            .or_else(|| lookup("JSON_LOGS"))
            .as_deref()
            .and_then(LogFormat::parse)
        {
            config.format = format;
        }
        config
    }
}

//! Configuration management for bridge services

use crate::error::{CallbridgeError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Where configuration values are read from
pub struct EnvSource {
    lookup: Box<dyn Fn(&str) -> Option<String> + Send + Sync>,
}

impl EnvSource {
    /// The process environment
    pub fn process() -> Self {
        Self {
            lookup: Box::new(|key| std::env::var(key).ok()),
        }
    }

    /// A fixed set of values; every other key reads as unset.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            lookup: Box::new(move |key| values.get(key).cloned()),
        }
    }

    /// Read `key`, treating empty values as unset.
    pub fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Read `key` and parse it, falling back to `default` when unset.
    /// A present but unparsable value is a configuration error.
    pub fn parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(key) {
            Some(raw) => raw
                .parse()
                .map_err(|e| CallbridgeError::Config(format!("Invalid {}: {}", key, e))),
            None => Ok(default),
        }
    }

    /// Fractional seconds; negative, non-finite and out-of-range values are rejected.
    pub fn duration_secs(&self, key: &str, default: f64) -> Result<Duration> {
        let secs: f64 = self.parse(key, default)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|e| CallbridgeError::Config(format!("Invalid {}: {}", key, e)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub service_name: String,
    pub host: String,
    pub http_port: u16,
    /// Directory for debug artifacts (raw payloads, snapshots, proposals)
    pub scratch_dir: PathBuf,
    pub http_timeout_secs: u64,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_source(&EnvSource::process())
    }

    pub fn from_source(source: &EnvSource) -> Result<Self> {
        Ok(Self {
            service_name: source.string_or("SERVICE_NAME", "transcription-webhook"),
            host: source.string_or("HOST", "0.0.0.0"),
            http_port: source.parse("WEBHOOK_PORT", 3000)?,
            scratch_dir: PathBuf::from(source.string_or("SCRATCH_DIR", ".tmp")),
            http_timeout_secs: source.parse("HTTP_TIMEOUT_SECS", 30)?,
        })
    }

    /// Address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

//! Core domain types shared by the bridge services

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Call id used when the provider omitted one
pub const UNKNOWN_CALL_ID: &str = "unknown";

/// Provider-assigned call identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub String);

impl CallId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn unknown() -> Self {
        Self(UNKNOWN_CALL_ID.to_string())
    }

    pub fn is_known(&self) -> bool {
        !self.0.is_empty() && self.0 != UNKNOWN_CALL_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Phone number as received, with the loose comparison used to pair calls
/// with downstream records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Shortest value accepted as a usable number
    pub const MIN_LEN: usize = 3;

    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into().trim().to_string())
    }

    /// `None` when the value is blank or too short to identify a caller.
    pub fn parse(number: &str) -> Option<Self> {
        let trimmed = number.trim();
        if trimmed.chars().count() < Self::MIN_LEN {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Strip whitespace and rewrite a leading `00` dialing prefix as `+`.
    pub fn normalize(number: &str) -> String {
        let compact: String = number.chars().filter(|c| !c.is_whitespace()).collect();
        match compact.strip_prefix("00") {
            Some(rest) => format!("+{}", rest),
            None => compact,
        }
    }

    pub fn normalized(&self) -> String {
        Self::normalize(&self.0)
    }

    /// Substring containment in either direction after normalization.
    /// Tolerates partial-vs-full formatting; a short number contained in a
    /// longer one will also match.
    pub fn loosely_matches(&self, other: &str) -> bool {
        let mine = self.normalized();
        let theirs = Self::normalize(other);
        if mine.is_empty() || theirs.is_empty() {
            return false;
        }
        mine.contains(&theirs) || theirs.contains(&mine)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timestamp wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Filesystem-safe form (`:` and `.` replaced) for artifact names
    pub fn file_stamp(&self) -> String {
        self.0
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
            .replace([':', '.'], "-")
    }
}

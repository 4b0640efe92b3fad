//! Callbridge Core - Shared domain types and service infrastructure
//!
//! This crate provides:
//! - Standard service trait the bridge services implement
//! - Call and phone-number domain types
//! - Error handling utilities
//! - Configuration management
//! - Retry-with-backoff for flaky upstream calls

pub mod config;
pub mod domain;
pub mod error;
pub mod retry;
pub mod service;

pub use config::{EnvSource, ServiceConfig};
pub use domain::*;
pub use error::{CallbridgeError, Result};
pub use retry::{retry_with_backoff, RetryError, RetryPolicy};
pub use service::{CallbridgeService, HealthStatus, MicroserviceRuntime};

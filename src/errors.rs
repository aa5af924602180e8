use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{Display, EnumString};
use thiserror::Error;

/// Configuration related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error loading configuration file
    #[error("Failed to load config from {path}: {message}")]
    LoadError { path: PathBuf, message: String },

    /// A value was present but outside its valid range
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Closed set of failure categories surfaced across the analysis boundary
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The external binary is absent or unreachable
    ToolInstallationMissing,

    /// The external invocation exceeded its configured budget
    ToolExecutionTimeout,

    /// The external invocation ran but exited abnormally or produced unusable output
    ToolExecutionFailed,

    /// No analyzer exists for the platform, or the platform is inactive
    AnalyzerUnavailable,
}

/// The single error shape that crosses the analyzer boundary.
///
/// Every failure leaving an analyzer, the registry or the fallback service is
/// exactly one `PlatformError`, carrying the platform it happened on and free
/// form context (timeouts, filenames, exit codes) for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("[{code}] {platform}: {message}")]
pub struct PlatformError {
    /// Error category
    pub code: ErrorCode,

    /// Human readable message
    pub message: String,

    /// Platform id the error belongs to
    pub platform: String,

    /// Contextual metadata
    #[serde(default)]
    pub context: BTreeMap<String, Value>,
}

impl PlatformError {
    /// Create a new error with empty context
    pub fn new(code: ErrorCode, platform: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            platform: platform.into(),
            context: BTreeMap::new(),
        }
    }

    /// Attach a context entry
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn installation_missing(platform: &str, tool: &str) -> Self {
        Self::new(
            ErrorCode::ToolInstallationMissing,
            platform,
            format!("Tool '{}' is not installed or not on PATH", tool),
        )
        .with_context("tool", tool)
    }

    pub fn timeout(platform: &str, tool: &str, timeout: Duration, contracts: &[String]) -> Self {
        Self::new(
            ErrorCode::ToolExecutionTimeout,
            platform,
            format!("Tool '{}' timed out after {}ms", tool, timeout.as_millis()),
        )
        .with_context("tool", tool)
        .with_context("timeout_ms", timeout.as_millis() as u64)
        .with_context("contracts", contracts.to_vec())
    }

    pub fn execution_failed(platform: &str, tool: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ToolExecutionFailed, platform, message).with_context("tool", tool)
    }

    pub fn unavailable(platform: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AnalyzerUnavailable, platform, message)
    }

    /// Translate an invoker-level error into the platform taxonomy
    pub fn from_tool_error(platform: &str, error: ToolError, contracts: &[String]) -> Self {
        match error {
            ToolError::NotFound(tool) => Self::installation_missing(platform, &tool),
            ToolError::Timeout { name, timeout } => {
                Self::timeout(platform, &name, timeout, contracts)
            }
            ToolError::ExecutionFailed { name, message } => {
                Self::execution_failed(platform, &name, message)
                    .with_context("contracts", contracts.to_vec())
            }
        }
    }
}

/// Errors raised by the external tool invoker
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool not found
    #[error("Tool '{0}' not found")]
    NotFound(String),

    /// Tool did not finish in time
    #[error("Tool '{name}' timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    /// Tool execution failed
    #[error("Failed to execute tool '{name}': {message}")]
    ExecutionFailed { name: String, message: String },
}

/// Errors raised by the AI ensemble
#[derive(Debug, Error)]
pub enum AiError {
    /// The completion service could not be reached or rejected the request
    #[error("Completion request to '{model}' failed: {message}")]
    Transport { model: String, message: String },

    /// The completion service did not answer in time
    #[error("Model '{model}' timed out after {timeout:?}")]
    Timeout { model: String, timeout: Duration },

    /// No API credentials were configured
    #[error("AI service is not configured: {0}")]
    NotConfigured(String),

    /// Every configured model failed at the transport level
    #[error("All AI models failed to analyze the contract")]
    AllModelsFailed { failures: Vec<String> },
}

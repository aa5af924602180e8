//! Configuration management for Argus

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::ConfigError;

mod provider;

pub use provider::{ConfigProvider, TomlConfigProvider};

/// Default maximum contract size (10 MiB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// General analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Maximum contract size in bytes
    pub max_file_size: usize,

    /// Budget for one static tool invocation, in seconds
    pub tool_timeout_secs: u64,

    /// Budget for a version query, in seconds
    pub health_check_timeout_secs: u64,

    /// Run the AI ensemble alongside static analysis
    pub enable_ai: bool,

    /// Parent directory for scratch projects (system temp dir when unset)
    pub temp_dir: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            tool_timeout_secs: 300,
            health_check_timeout_secs: 5,
            enable_ai: true,
            temp_dir: None,
        }
    }
}

impl GeneralConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_secs(self.health_check_timeout_secs.min(5))
    }
}

/// AI ensemble configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Model identifiers, invoked concurrently
    pub models: Vec<String>,

    /// Per-model timeout in seconds
    pub timeout_secs: u64,

    pub max_tokens: u32,

    /// Kept low to minimise response variance
    pub temperature: f32,

    /// Fraction of models that must agree on a finding
    pub ensemble_threshold: f64,

    /// Base URL of an OpenAI-compatible completion API
    pub api_base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            models: vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()],
            timeout_secs: 120,
            max_tokens: 4000,
            temperature: 0.1,
            ensemble_threshold: 0.6,
            api_base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Retry and fallback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Attempts of the static stage before falling back
    pub max_retries: u32,

    /// Base delay between attempts, multiplied by the attempt number
    pub retry_delay_ms: u64,

    pub enable_ai_fallback: bool,
    pub enable_basic_validation: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
            enable_ai_fallback: true,
            enable_basic_validation: true,
        }
    }
}

/// Per-platform tool overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformToolConfig {
    /// Whether the platform may be analyzed
    pub enabled: bool,

    /// Custom executable path (if not using the one in PATH)
    pub executable_path: Option<String>,

    /// Additional command-line arguments for the tool
    pub extra_args: Vec<String>,

    /// Override of the general tool timeout
    pub timeout_secs: Option<u64>,
}

impl Default for PlatformToolConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            executable_path: None,
            extra_args: Vec::new(),
            timeout_secs: None,
        }
    }
}

/// Main configuration for Argus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ArgusConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Platform-specific configuration, keyed by platform id
    #[serde(default)]
    pub platforms: HashMap<String, PlatformToolConfig>,
}

impl ArgusConfig {
    /// Tool settings for a platform, defaults when absent
    pub fn platform(&self, id: &str) -> PlatformToolConfig {
        self.platforms.get(id).cloned().unwrap_or_default()
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ai.models.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "ai.models".to_string(),
                message: "at least one model is required".to_string(),
            });
        }
        if !(self.ai.ensemble_threshold > 0.0 && self.ai.ensemble_threshold <= 1.0) {
            return Err(ConfigError::InvalidValue {
                key: "ai.ensemble_threshold".to_string(),
                message: format!("{} is not in (0, 1]", self.ai.ensemble_threshold),
            });
        }
        if !(0.0..=2.0).contains(&self.ai.temperature) {
            return Err(ConfigError::InvalidValue {
                key: "ai.temperature".to_string(),
                message: format!("{} is not in [0, 2]", self.ai.temperature),
            });
        }
        if self.general.max_file_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "general.max_file_size".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.general.tool_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "general.tool_timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.general.health_check_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "general.health_check_timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.ai.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ai.timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        for (id, platform) in &self.platforms {
            if platform.timeout_secs == Some(0) {
                return Err(ConfigError::InvalidValue {
                    key: format!("platforms.{}.timeout_secs", id),
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::ArgusConfig;
use crate::errors::ConfigError;

/// Trait for providing configuration to the application
pub trait ConfigProvider {
    /// Load configuration from a base directory
    fn load_config(&self, base_dir: &Path) -> Result<ArgusConfig, ConfigError>;
}

/// TOML-based configuration provider
#[derive(Debug, Default, Clone)]
pub struct TomlConfigProvider {
    /// Explicit configuration file, bypassing discovery
    config_path: Option<PathBuf>,
}

impl TomlConfigProvider {
    /// Create a new TOML configuration provider
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Use a specific configuration file
    pub fn with_config_file(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    /// Find project-level config by traversing directory tree upwards
    fn find_project_config(&self, base_dir: &Path) -> Option<PathBuf> {
        let mut current_dir = base_dir.to_path_buf();

        loop {
            for name in [".argus.toml", "argus.toml"] {
                let config_path = current_dir.join(name);
                if config_path.exists() {
                    return Some(config_path);
                }
            }

            if !current_dir.pop() {
                break;
            }
        }

        None
    }

    /// Read configuration from a file
    fn read_config_file(&self, path: &Path) -> Result<ArgusConfig, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let config: ArgusConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn load_config(&self, base_dir: &Path) -> Result<ArgusConfig, ConfigError> {
        let path = match &self.config_path {
            Some(path) => Some(path.clone()),
            None => self.find_project_config(base_dir),
        };

        let config = match path {
            Some(path) => {
                debug!("Loading config from {:?}", path);
                self.read_config_file(&path)?
            }
            None => {
                debug!("No config file found from {:?}, using defaults", base_dir);
                ArgusConfig::default()
            }
        };

        config.validate()?;
        Ok(config)
    }
}

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::debug;

use argus::config::{ArgusConfig, ConfigProvider, TomlConfigProvider};
use argus::engine::AuditEngine;

use crate::cli::{Cli, Commands, Verbosity};
use crate::commands::{AnalyzeCommand, HealthCommand, PlatformsCommand, ValidateCommand};

/// Wires configuration, the engine and the command handlers together
pub struct ArgusApp<C: ConfigProvider> {
    config_provider: C,
    verbosity: Verbosity,
}

impl ArgusApp<TomlConfigProvider> {
    /// App reading `.argus.toml`, or the given file
    pub fn from_config_path(path: Option<PathBuf>) -> Self {
        let provider = match path {
            Some(path) => TomlConfigProvider::new().with_config_file(path),
            None => TomlConfigProvider::new(),
        };
        Self::new(provider)
    }
}

impl<C: ConfigProvider> ArgusApp<C> {
    pub fn new(config_provider: C) -> Self {
        Self {
            config_provider,
            verbosity: Verbosity::default(),
        }
    }

    /// Set the verbosity level
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    fn load_config(&self) -> Result<ArgusConfig> {
        let base_dir = env::current_dir().context("Failed to determine the current directory")?;
        let config = self
            .config_provider
            .load_config(&base_dir)
            .context("Failed to load configuration")?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Run one command; returns whether it succeeded
    pub async fn run(&self, cli: Cli) -> Result<bool> {
        let mut config = self.load_config()?;

        if let Commands::Analyze(args) = &cli.command {
            if args.no_ai {
                config.general.enable_ai = false;
            }
        }
        // these commands never call a model
        if matches!(cli.command, Commands::Platforms(_) | Commands::Validate(_)) {
            config.general.enable_ai = false;
        }

        let engine = AuditEngine::from_config(config);

        match cli.command {
            Commands::Analyze(args) => {
                AnalyzeCommand::new(&engine, self.verbosity)
                    .execute(args)
                    .await
            }
            Commands::Validate(args) => ValidateCommand::new(&engine).execute(args).await,
            Commands::Health(args) => HealthCommand::new(&engine).execute(args).await,
            Commands::Platforms(args) => PlatformsCommand::new(&engine).execute(args),
        }
    }
}

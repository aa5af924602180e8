//! Command-line interface for Argus

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Verbosity level for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Default)]
pub enum Verbosity {
    /// Only the result itself
    Quiet = 0,

    /// Results plus summaries
    #[default]
    Normal = 1,

    /// Also info logging
    Verbose = 2,

    /// Everything including debug logging
    Debug = 3,
}

impl From<u8> for Verbosity {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }
}

impl Verbosity {
    /// Log filter matching this verbosity
    pub fn log_filter(&self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
        }
    }
}

/// Argus - multi-chain smart contract security analysis
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Argus - multi-chain smart contract security analysis",
    long_about = "Argus runs each platform's static analyzer and an ensemble of AI models over smart contract sources, then merges the findings into one deduplicated report. Supported platforms include EVM chains (Slither), Cardano (Aiken), Sui and Aptos (Move)."
)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v=info, -vv=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only print results and errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Custom configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,
}

/// Commands that Argus can execute
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze contracts for vulnerabilities
    #[command(visible_alias = "audit")]
    Analyze(AnalyzeArgs),

    /// Validate contracts without running a full analysis
    Validate(ValidateArgs),

    /// Report the health of every platform's tooling
    Health(HealthArgs),

    /// List known platforms
    #[command(visible_alias = "list")]
    Platforms(PlatformsArgs),
}

/// Arguments for the analyze command
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Target platform (ethereum, polygon, bsc, arbitrum, cardano, sui, aptos)
    #[arg(short, long)]
    pub platform: String,

    /// Output format (pretty, json)
    #[arg(long, default_value = "pretty")]
    pub format: String,

    /// Exit with an error when a finding of this severity or higher is reported
    #[arg(long)]
    pub fail_on: Option<String>,

    /// Skip the AI ensemble
    #[arg(long)]
    pub no_ai: bool,

    /// Contract files or directories
    #[arg(name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Target platform
    #[arg(short, long)]
    pub platform: String,

    /// Output format (pretty, json)
    #[arg(long, default_value = "pretty")]
    pub format: String,

    /// Contract files or directories
    #[arg(name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}

/// Arguments for the health command
#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Check a single platform and explain what is missing
    #[arg(short, long)]
    pub platform: Option<String>,

    /// Output format (pretty, json)
    #[arg(long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the platforms command
#[derive(Args, Debug)]
pub struct PlatformsArgs {
    /// Include inactive and unimplemented platforms
    #[arg(short, long)]
    pub all: bool,

    /// Output format (pretty, json)
    #[arg(long, default_value = "pretty")]
    pub format: String,
}

mod app;
mod cli;
mod commands;
mod output;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Verbosity};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        Verbosity::from(cli.verbose)
    };

    // RUST_LOG still wins when set
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(verbosity.log_filter()),
    )
    .format_timestamp(None)
    .init();

    let app = app::ArgusApp::from_config_path(cli.config.clone()).with_verbosity(verbosity);

    match app.run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::from(2)
        }
    }
}

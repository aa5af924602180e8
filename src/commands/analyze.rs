use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use log::info;

use argus::engine::AuditEngine;
use argus::models::Severity;

use super::collect_contracts;
use crate::cli::{AnalyzeArgs, Verbosity};
use crate::output::formatter_for;

/// Command handler for `argus analyze`
pub struct AnalyzeCommand<'a> {
    engine: &'a AuditEngine,
    verbosity: Verbosity,
}

impl<'a> AnalyzeCommand<'a> {
    pub fn new(engine: &'a AuditEngine, verbosity: Verbosity) -> Self {
        Self { engine, verbosity }
    }

    /// Run the analysis and print the report.
    ///
    /// Returns `false` when the result should fail the process: the analysis
    /// did not complete, or a finding reached the `--fail-on` threshold.
    pub async fn execute(&self, args: AnalyzeArgs) -> Result<bool> {
        let formatter = formatter_for(&args.format)
            .ok_or_else(|| anyhow!("Unknown output format '{}'", args.format))?;
        let fail_on = args
            .fail_on
            .as_deref()
            .map(Severity::from_str)
            .transpose()
            .map_err(|_| anyhow!("Unknown severity for --fail-on"))?;

        let platform = self
            .engine
            .factory()
            .platforms()
            .get(&args.platform)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown platform '{}'", args.platform))?;

        let contracts = collect_contracts(&args.paths, &platform)
            .context("Failed to collect contracts")?;
        if contracts.is_empty() {
            return Err(anyhow!(
                "No .{} files found in the given paths",
                platform.file_extensions.join(", .")
            ));
        }
        if self.verbosity >= Verbosity::Verbose {
            info!("Analyzing {} contract(s) for {}", contracts.len(), platform.id);
        }

        let result = self.engine.analyze(&platform.id, &contracts).await?;
        println!("{}", formatter.format_analysis(&platform.id, &result));

        let threshold_hit = fail_on
            .map(|level| result.vulnerabilities.iter().any(|v| v.severity >= level))
            .unwrap_or(false);
        Ok(result.success && !threshold_hit)
    }
}

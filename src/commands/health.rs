use anyhow::{anyhow, Result};

use argus::engine::AuditEngine;
use argus::models::HealthStatus;

use crate::cli::HealthArgs;
use crate::output::formatter_for;

/// Command handler for `argus health`
pub struct HealthCommand<'a> {
    engine: &'a AuditEngine,
}

impl<'a> HealthCommand<'a> {
    pub fn new(engine: &'a AuditEngine) -> Self {
        Self { engine }
    }

    /// Print platform health; returns whether nothing is unhealthy
    pub async fn execute(&self, args: HealthArgs) -> Result<bool> {
        let formatter = formatter_for(&args.format)
            .ok_or_else(|| anyhow!("Unknown output format '{}'", args.format))?;

        if let Some(platform) = &args.platform {
            let validation = self.engine.validate_analyzer(platform).await;
            println!("{}", formatter.format_analyzer_validation(platform, &validation));
            return Ok(validation.valid);
        }

        let summary = self.engine.health_summary().await;
        println!("{}", formatter.format_health(&summary));
        Ok(summary
            .platforms
            .iter()
            .all(|p| p.status != HealthStatus::Unhealthy))
    }
}

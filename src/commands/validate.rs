use anyhow::{anyhow, Result};

use argus::engine::AuditEngine;

use super::collect_contracts;
use crate::cli::ValidateArgs;
use crate::output::formatter_for;

/// Command handler for `argus validate`
pub struct ValidateCommand<'a> {
    engine: &'a AuditEngine,
}

impl<'a> ValidateCommand<'a> {
    pub fn new(engine: &'a AuditEngine) -> Self {
        Self { engine }
    }

    /// Validate every contract; returns whether all of them are valid
    pub async fn execute(&self, args: ValidateArgs) -> Result<bool> {
        let formatter = formatter_for(&args.format)
            .ok_or_else(|| anyhow!("Unknown output format '{}'", args.format))?;
        let platform = self
            .engine
            .factory()
            .platforms()
            .get(&args.platform)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown platform '{}'", args.platform))?;

        let contracts = collect_contracts(&args.paths, &platform)?;

        let mut results = Vec::with_capacity(contracts.len());
        for contract in &contracts {
            let result = self.engine.validate_contract(&platform.id, contract).await?;
            results.push((contract.filename.clone(), result));
        }

        println!("{}", formatter.format_validation(&results));
        Ok(results.iter().all(|(_, r)| r.is_valid))
    }
}

use anyhow::{anyhow, Result};

use argus::engine::AuditEngine;
use argus::models::PlatformInfo;

use crate::cli::PlatformsArgs;
use crate::output::formatter_for;

/// Command handler for `argus platforms`
pub struct PlatformsCommand<'a> {
    engine: &'a AuditEngine,
}

impl<'a> PlatformsCommand<'a> {
    pub fn new(engine: &'a AuditEngine) -> Self {
        Self { engine }
    }

    pub fn execute(&self, args: PlatformsArgs) -> Result<bool> {
        let formatter = formatter_for(&args.format)
            .ok_or_else(|| anyhow!("Unknown output format '{}'", args.format))?;

        let platforms: Vec<PlatformInfo> = if args.all {
            self.engine.factory().platforms().all().to_vec()
        } else {
            let supported = self.engine.factory().supported_platforms();
            self.engine
                .factory()
                .platforms()
                .all()
                .iter()
                .filter(|p| supported.contains(&p.id))
                .cloned()
                .collect()
        };

        println!("{}", formatter.format_platforms(&platforms));
        Ok(true)
    }
}

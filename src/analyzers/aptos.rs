//! Aptos Move analyzer

use async_trait::async_trait;

use crate::analyzers::{AnalyzerBase, AnalyzerContext, MoveFlavor, MoveFramework, PlatformAnalyzer};
use crate::errors::PlatformError;
use crate::models::{AnalysisResult, ContractInput, PlatformInfo};

/// Aptos analyzer, compiling with `aptos move compile`
pub struct AptosMoveAnalyzer {
    base: AnalyzerBase,
    framework: MoveFramework,
}

impl AptosMoveAnalyzer {
    pub fn new(platform: PlatformInfo, context: &AnalyzerContext) -> Self {
        Self {
            base: AnalyzerBase::new(platform, "aptos", context),
            framework: MoveFramework::new(MoveFlavor::Aptos),
        }
    }
}

#[async_trait]
impl PlatformAnalyzer for AptosMoveAnalyzer {
    fn base(&self) -> &AnalyzerBase {
        &self.base
    }

    async fn run_static_analysis(
        &self,
        contracts: &[ContractInput],
    ) -> Result<AnalysisResult, PlatformError> {
        self.framework.run(&self.base, contracts).await
    }

    async fn syntax_check(&self, contract: &ContractInput) -> Result<Vec<String>, PlatformError> {
        self.framework.syntax_check(&self.base, contract).await
    }
}

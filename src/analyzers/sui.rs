//! Sui Move analyzer

use async_trait::async_trait;

use crate::analyzers::{AnalyzerBase, AnalyzerContext, MoveFlavor, MoveFramework, PlatformAnalyzer};
use crate::errors::PlatformError;
use crate::models::{AnalysisResult, ContractInput, PlatformInfo};

/// Sui analyzer, compiling with `sui move build`
pub struct SuiMoveAnalyzer {
    base: AnalyzerBase,
    framework: MoveFramework,
}

impl SuiMoveAnalyzer {
    pub fn new(platform: PlatformInfo, context: &AnalyzerContext) -> Self {
        Self {
            base: AnalyzerBase::new(platform, "sui", context),
            framework: MoveFramework::new(MoveFlavor::Sui),
        }
    }
}

#[async_trait]
impl PlatformAnalyzer for SuiMoveAnalyzer {
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

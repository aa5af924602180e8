//! Entry point tying the registry and the fallback policy together

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{info, warn};

use crate::ai::{AiEnsembleAnalyzer, HttpCompletionClient};
use crate::analyzers::AnalyzerContext;
use crate::config::ArgusConfig;
use crate::errors::PlatformError;
use crate::fallback::FallbackService;
use crate::invoker::{ProcessInvoker, ToolInvoker};
use crate::models::{
    AnalysisResult, AnalyzerValidation, ContractInput, InstallationCheckResult,
    PlatformHealthSummary, ValidationResult,
};
use crate::platforms::PlatformRegistry;
use crate::registry::AnalyzerFactory;

/// Analyzes contracts for a platform id, with retries and fallbacks
pub struct AuditEngine {
    config: Arc<ArgusConfig>,
    factory: AnalyzerFactory,
    fallback: FallbackService,
}

impl AuditEngine {
    /// Assemble an engine from explicit collaborators
    pub fn new(
        config: ArgusConfig,
        invoker: Arc<dyn ToolInvoker>,
        ai: Option<Arc<AiEnsembleAnalyzer>>,
    ) -> Self {
        Self::with_platforms(config, PlatformRegistry::default(), invoker, ai)
    }

    /// Same as [`AuditEngine::new`] with a custom platform table
    pub fn with_platforms(
        config: ArgusConfig,
        platforms: PlatformRegistry,
        invoker: Arc<dyn ToolInvoker>,
        ai: Option<Arc<AiEnsembleAnalyzer>>,
    ) -> Self {
        let config = Arc::new(config);
        let context = AnalyzerContext::new(config.clone(), invoker, ai);
        Self {
            fallback: FallbackService::new(config.fallback.clone()),
            factory: AnalyzerFactory::new(platforms, context),
            config,
        }
    }

    /// Engine running real processes, with the HTTP ensemble when a key is set
    pub fn from_config(config: ArgusConfig) -> Self {
        let ai = if config.general.enable_ai {
            match HttpCompletionClient::from_config(&config.ai) {
                Ok(client) => {
                    info!("AI ensemble enabled with {} model(s)", config.ai.models.len());
                    Some(Arc::new(AiEnsembleAnalyzer::new(
                        Arc::new(client),
                        config.ai.clone(),
                    )))
                }
                Err(err) => {
                    warn!("{}; running static analysis only", err);
                    None
                }
            }
        } else {
            None
        };

        Self::new(config, Arc::new(ProcessInvoker::new()), ai)
    }

    pub fn config(&self) -> &ArgusConfig {
        &self.config
    }

    pub fn factory(&self) -> &AnalyzerFactory {
        &self.factory
    }

    /// Analyze contracts for one platform.
    ///
    /// Only an unusable platform id is an error; tool and model failures
    /// come back as a degraded result.
    pub async fn analyze(
        &self,
        platform_id: &str,
        contracts: &[ContractInput],
    ) -> Result<AnalysisResult, PlatformError> {
        let analyzer = self.factory.get_analyzer(platform_id)?;
        info!(
            "Analyzing {} contract(s) for {}",
            contracts.len(),
            analyzer.platform().id
        );
        Ok(self.fallback.analyze(analyzer.as_ref(), contracts).await)
    }

    /// Validate one contract with the platform's analyzer
    pub async fn validate_contract(
        &self,
        platform_id: &str,
        contract: &ContractInput,
    ) -> Result<ValidationResult, PlatformError> {
        let analyzer = self.factory.get_analyzer(platform_id)?;
        Ok(analyzer.validate_contract(contract).await)
    }

    pub async fn check_health(&self) -> BTreeMap<String, InstallationCheckResult> {
        self.factory.check_all_analyzers_health().await
    }

    pub async fn health_summary(&self) -> PlatformHealthSummary {
        self.factory.get_platform_health_summary().await
    }

    pub async fn validate_analyzer(&self, platform_id: &str) -> AnalyzerValidation {
        self.factory.validate_analyzer(platform_id).await
    }
}

//! Platform id to analyzer dispatch
//!
//! [`AnalyzerFactory`] builds one analyzer per platform on first use and
//! keeps it for the life of the factory. The cache is the only mutable state
//! shared between requests and sits behind an `RwLock`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use log::{debug, info, warn};

use crate::analyzers::{
    AikenAnalyzer, AnalyzerContext, AptosMoveAnalyzer, PlatformAnalyzer, SolidityAnalyzer,
    SuiMoveAnalyzer,
};
use crate::errors::PlatformError;
use crate::models::{
    AnalyzerValidation, HealthStatus, InstallationCheckResult, PlatformFamily, PlatformHealth,
    PlatformHealthSummary, PlatformInfo,
};
use crate::platforms::PlatformRegistry;

/// Lazily constructs and caches platform analyzers
pub struct AnalyzerFactory {
    platforms: PlatformRegistry,
    context: AnalyzerContext,
    cache: RwLock<HashMap<String, Arc<dyn PlatformAnalyzer>>>,
}

impl AnalyzerFactory {
    /// Create a factory over the given platforms
    pub fn new(platforms: PlatformRegistry, context: AnalyzerContext) -> Self {
        Self {
            platforms,
            context,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Platform descriptors known to the factory
    pub fn platforms(&self) -> &PlatformRegistry {
        &self.platforms
    }

    /// Ids of platforms that can currently be analyzed
    pub fn supported_platforms(&self) -> Vec<String> {
        self.platforms
            .implemented()
            .filter(|p| self.context.config.platform(&p.id).enabled)
            .map(|p| p.id.clone())
            .collect()
    }

    /// Get the analyzer for a platform, building it on first use
    pub fn get_analyzer(
        &self,
        platform_id: &str,
    ) -> Result<Arc<dyn PlatformAnalyzer>, PlatformError> {
        let info = self.resolve(platform_id)?;

        if let Ok(cache) = self.cache.read() {
            if let Some(analyzer) = cache.get(&info.id) {
                return Ok(analyzer.clone());
            }
        }

        let mut cache = self.cache.write().map_err(|_| {
            PlatformError::unavailable(&info.id, "Analyzer cache is poisoned")
        })?;
        // another caller may have built it while we waited for the lock
        if let Some(analyzer) = cache.get(&info.id) {
            return Ok(analyzer.clone());
        }

        let analyzer = self.create_analyzer(info.clone())?;
        info!("Created {} analyzer for {}", info.family, info.id);
        cache.insert(info.id.clone(), analyzer.clone());
        Ok(analyzer)
    }

    /// Check that a platform id refers to something we can analyze
    fn resolve(&self, platform_id: &str) -> Result<&PlatformInfo, PlatformError> {
        let info = self.platforms.get(platform_id).ok_or_else(|| {
            PlatformError::unavailable(
                platform_id,
                format!("Unknown platform '{}'", platform_id),
            )
        })?;

        if !info.is_active {
            return Err(PlatformError::unavailable(
                &info.id,
                format!("Platform '{}' is not active", info.id),
            )
            .with_context("active", false));
        }

        if !info.family.is_implemented() {
            return Err(PlatformError::unavailable(
                &info.id,
                format!("No analyzer is implemented for platform '{}'", info.id),
            )
            .with_context("implemented", false));
        }

        if !self.context.config.platform(&info.id).enabled {
            return Err(PlatformError::unavailable(
                &info.id,
                format!("Platform '{}' is disabled in configuration", info.id),
            )
            .with_context("enabled", false));
        }

        Ok(info)
    }

    fn create_analyzer(
        &self,
        info: PlatformInfo,
    ) -> Result<Arc<dyn PlatformAnalyzer>, PlatformError> {
        let context = &self.context;
        let analyzer: Arc<dyn PlatformAnalyzer> = match info.family {
            PlatformFamily::Evm => Arc::new(SolidityAnalyzer::new(info, context)),
            PlatformFamily::Cardano => Arc::new(AikenAnalyzer::new(info, context)),
            PlatformFamily::Sui => Arc::new(SuiMoveAnalyzer::new(info, context)),
            PlatformFamily::Aptos => Arc::new(AptosMoveAnalyzer::new(info, context)),
            PlatformFamily::Solana | PlatformFamily::Tezos => {
                return Err(PlatformError::unavailable(
                    &info.id,
                    format!("No analyzer is implemented for platform '{}'", info.id),
                )
                .with_context("implemented", false))
            }
        };
        Ok(analyzer)
    }

    /// Analyzers for every platform that can be analyzed, building them as needed
    pub fn get_all_analyzers(&self) -> Vec<Arc<dyn PlatformAnalyzer>> {
        self.supported_platforms()
            .iter()
            .filter_map(|id| match self.get_analyzer(id) {
                Ok(analyzer) => Some(analyzer),
                Err(err) => {
                    warn!("Skipping {}: {}", id, err);
                    None
                }
            })
            .collect()
    }

    /// Run every analyzer's health check concurrently.
    ///
    /// A check that outlives its budget is reported as not installed.
    pub async fn check_all_analyzers_health(&self) -> BTreeMap<String, InstallationCheckResult> {
        let analyzers = self.get_all_analyzers();
        let checks = analyzers.iter().map(|analyzer| async move {
            let result = bounded_health_check(analyzer.as_ref())
                .await
                .unwrap_or_else(|budget| {
                    InstallationCheckResult::missing(format!(
                        "Health check did not finish in {:?}",
                        budget
                    ))
                });
            (analyzer.platform().id.clone(), result)
        });
        join_all(checks).await.into_iter().collect()
    }

    /// Composite readiness check that reports problems instead of failing
    pub async fn validate_analyzer(&self, platform_id: &str) -> AnalyzerValidation {
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();

        let Some(info) = self.platforms.get(platform_id) else {
            issues.push(format!("Platform '{}' is not registered", platform_id));
            recommendations.push(format!(
                "Use one of the supported platforms: {}",
                self.supported_platforms().join(", ")
            ));
            return AnalyzerValidation {
                valid: false,
                issues,
                recommendations,
            };
        };

        if !info.is_active {
            issues.push(format!("Platform '{}' is not active", info.id));
            recommendations.push("Choose an active platform".to_string());
        }
        if !info.family.is_implemented() {
            issues.push(format!("No analyzer is implemented for '{}'", info.id));
        }
        if !self.context.config.platform(&info.id).enabled {
            issues.push(format!("Platform '{}' is disabled in configuration", info.id));
            recommendations.push(format!(
                "Set [platforms.{}] enabled = true in .argus.toml",
                info.id
            ));
        }

        if issues.is_empty() {
            match self.get_analyzer(&info.id) {
                Ok(analyzer) => {
                    let health = analyzer.check_health().await;
                    if !health.installed {
                        let tool = &analyzer.base().tool;
                        issues.push(format!(
                            "{} is not available: {}",
                            tool,
                            health.error.unwrap_or_default()
                        ));
                        recommendations.push(install_hint(tool));
                        if analyzer.base().has_ai() {
                            recommendations.push(
                                "AI-only analysis remains available until the tool is installed"
                                    .to_string(),
                            );
                        }
                    }
                }
                Err(err) => issues.push(err.message),
            }
        }

        AnalyzerValidation {
            valid: issues.is_empty(),
            issues,
            recommendations,
        }
    }

    /// Health of every known platform, including ones that cannot be analyzed
    pub async fn get_platform_health_summary(&self) -> PlatformHealthSummary {
        let checks = self
            .platforms
            .all()
            .iter()
            .filter(|p| p.is_active)
            .map(|info| self.platform_health(info));
        PlatformHealthSummary::from_platforms(join_all(checks).await)
    }

    async fn platform_health(&self, info: &PlatformInfo) -> PlatformHealth {
        let mut health = PlatformHealth {
            platform: info.id.clone(),
            name: info.name.clone(),
            status: HealthStatus::Unknown,
            version: None,
            error: None,
            checked_at: String::new(),
        };

        match self.get_analyzer(&info.id) {
            Ok(analyzer) => {
                match bounded_health_check(analyzer.as_ref()).await {
                    Ok(result) if result.installed => {
                        health.status = HealthStatus::Healthy;
                        health.version = result.version;
                    }
                    Ok(result) => {
                        health.status = if analyzer.base().has_ai() {
                            HealthStatus::Degraded
                        } else {
                            HealthStatus::Unhealthy
                        };
                        health.error = result.error;
                    }
                    Err(budget) => {
                        health.error = Some(format!("Health check did not finish in {:?}", budget));
                    }
                }
            }
            Err(err) => {
                debug!("No health check for {}: {}", info.id, err);
                health.error = Some(err.message);
            }
        }

        health.checked_at = Utc::now().to_rfc3339();
        health
    }

    /// Drop every cached analyzer
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.write() {
            info!("Clearing {} cached analyzer(s)", cache.len());
            cache.clear();
        }
    }

    /// Drop one cached analyzer; returns whether it was cached
    pub fn remove_analyzer(&self, platform_id: &str) -> bool {
        let id = platform_id.trim().to_lowercase();
        self.cache
            .write()
            .map(|mut cache| cache.remove(&id).is_some())
            .unwrap_or(false)
    }

    /// Number of cached analyzers
    pub fn cached_count(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }
}

/// Run a health check bounded by twice the analyzer's health timeout.
///
/// The version query has its own timeout; this bounds the whole task.
async fn bounded_health_check(
    analyzer: &dyn PlatformAnalyzer,
) -> Result<InstallationCheckResult, Duration> {
    let budget = analyzer.base().health_timeout * 2;
    tokio::time::timeout(budget, analyzer.check_health())
        .await
        .map_err(|_| budget)
}

/// How to install a static tool
fn install_hint(tool: &str) -> String {
    let hint = match tool {
        "slither" => {
            "Install Slither with `pip3 install slither-analyzer` and make sure solc is on PATH"
        }
        "aiken" => "Install Aiken with `cargo install aiken` or the aikup installer",
        "sui" => "Install the Sui CLI with `cargo install --locked --git https://github.com/MystenLabs/sui.git sui`",
        "aptos" => "Install the Aptos CLI with `curl -fsSL https://aptos.dev/scripts/install_cli.py | python3`",
        other => {
            return format!(
                "Install {} and make sure it is on PATH, or set executable_path in .argus.toml",
                other
            )
        }
    };
    hint.to_string()
}

//! Platform analyzers
//!
//! Every platform exposes the same capability set through [`PlatformAnalyzer`].
//! The shared pipeline (input validation, timeout-wrapped tool calls, the AI
//! stage and result merging) lives on [`AnalyzerBase`], which each platform
//! analyzer owns and delegates to.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, info, warn};
use tempfile::TempDir;

use crate::ai::{AiEnsembleAnalyzer, AiVulnerability, AnalysisOptions};
use crate::config::ArgusConfig;
use crate::errors::{AiError, PlatformError};
use crate::invoker::{extract_version, run_with_timeout, ToolInvocation, ToolInvoker, ToolOutput};
use crate::models::{
    merge_results, AnalysisResult, ContractInput, InstallationCheckResult, Location, PlatformInfo,
    PlatformVulnerability, ValidationResult, VulnerabilitySource,
};

mod aptos;
mod cardano;
mod move_framework;
pub mod patterns;
mod solidity;
mod sui;

pub use aptos::AptosMoveAnalyzer;
pub use cardano::{parse_aiken_diagnostics, parse_aiken_output, AikenAnalyzer, AikenDiagnostic};
pub use move_framework::{
    named_addresses, parse_move_diagnostics, parse_move_output, MoveDiagnostic, MoveFlavor,
    MoveFramework,
};
pub use solidity::{parse_slither_output, SolidityAnalyzer};
pub use sui::SuiMoveAnalyzer;

/// Warning added when the AI stage fails but static analysis succeeded
pub const AI_UNAVAILABLE_WARNING: &str =
    "AI analysis unavailable - continuing with static analysis only";

/// Warning added when AI is enabled but no completion client is available
pub const AI_NOT_CONFIGURED_WARNING: &str =
    "AI analysis not configured - static analysis only";

/// Shared collaborators handed to every analyzer
#[derive(Clone)]
pub struct AnalyzerContext {
    pub config: Arc<ArgusConfig>,
    pub invoker: Arc<dyn ToolInvoker>,
    pub ai: Option<Arc<AiEnsembleAnalyzer>>,
}

impl AnalyzerContext {
    pub fn new(
        config: Arc<ArgusConfig>,
        invoker: Arc<dyn ToolInvoker>,
        ai: Option<Arc<AiEnsembleAnalyzer>>,
    ) -> Self {
        Self {
            config,
            invoker,
            ai,
        }
    }
}

/// Common state and behaviour for platform analyzers
pub struct AnalyzerBase {
    /// Platform descriptor
    pub platform: PlatformInfo,

    /// Static tool executable
    pub tool: String,

    /// Additional arguments from configuration
    pub extra_args: Vec<String>,

    pub max_file_size: usize,
    pub tool_timeout: Duration,
    pub health_timeout: Duration,
    temp_root: Option<PathBuf>,
    invoker: Arc<dyn ToolInvoker>,
    ai: Option<Arc<AiEnsembleAnalyzer>>,
    ai_requested: bool,
    known_version: RwLock<Option<String>>,
}

impl AnalyzerBase {
    /// Build the base for a platform, applying per-platform overrides
    pub fn new(platform: PlatformInfo, default_tool: &str, context: &AnalyzerContext) -> Self {
        let config = &context.config;
        let overrides = config.platform(&platform.id);

        let tool = overrides
            .executable_path
            .clone()
            .or_else(|| platform.static_tool.clone())
            .unwrap_or_else(|| default_tool.to_string());

        let tool_timeout = overrides
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.general.tool_timeout());

        let ai = if config.general.enable_ai {
            context.ai.clone()
        } else {
            None
        };

        Self {
            platform,
            tool,
            extra_args: overrides.extra_args,
            max_file_size: config.general.max_file_size,
            tool_timeout,
            health_timeout: config.general.health_check_timeout(),
            temp_root: config.general.temp_dir.clone(),
            invoker: context.invoker.clone(),
            ai,
            ai_requested: config.general.enable_ai,
            known_version: RwLock::new(None),
        }
    }

    /// Platform id
    pub fn id(&self) -> &str {
        &self.platform.id
    }

    /// Whether the AI stage is available
    pub fn has_ai(&self) -> bool {
        self.ai.is_some()
    }

    /// Whether the invoker can find the static tool
    pub fn tool_available(&self) -> bool {
        self.invoker.is_installed(&self.tool)
    }

    /// Tool version seen by the last successful health check
    pub fn known_version(&self) -> Option<String> {
        self.known_version.read().ok().and_then(|v| v.clone())
    }

    fn remember_version(&self, version: &str) {
        if let Ok(mut slot) = self.known_version.write() {
            *slot = Some(version.to_string());
        }
    }

    /// Cheap local checks: non-empty, size limit, platform and extension match
    pub fn validate_input(&self, contract: &ContractInput) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if contract.filename.trim().is_empty() {
            errors.push("Contract filename cannot be empty".to_string());
        }

        if contract.code.trim().is_empty() {
            errors.push(format!("Contract {} code cannot be empty", contract.filename));
        } else if contract.code.len() > self.max_file_size {
            errors.push(format!(
                "Contract {} is {} bytes, exceeding the maximum of {} bytes",
                contract.filename,
                contract.code.len(),
                self.max_file_size
            ));
        }

        if !contract.platform.eq_ignore_ascii_case(&self.platform.id) {
            warnings.push(format!(
                "Contract {} targets platform '{}' but is analyzed by the {} analyzer",
                contract.filename, contract.platform, self.platform.id
            ));
        }

        if !contract.filename.trim().is_empty()
            && !self
                .platform
                .accepts_extension(contract.extension().as_deref())
        {
            warnings.push(format!(
                "Contract {} does not have a {} file extension ({})",
                contract.filename,
                self.platform.name,
                self.platform.file_extensions.join(", ")
            ));
        }

        ValidationResult::from_messages(errors, warnings)
    }

    /// Validate every contract and aggregate the messages
    pub fn validate_inputs(&self, contracts: &[ContractInput]) -> ValidationResult {
        if contracts.is_empty() {
            return ValidationResult::from_messages(
                vec!["No contracts provided for analysis".to_string()],
                Vec::new(),
            );
        }

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for contract in contracts {
            let result = self.validate_input(contract);
            errors.extend(result.errors);
            warnings.extend(result.warnings);
        }
        ValidationResult::from_messages(errors, warnings)
    }

    /// Run an external tool, bounded by the invocation's timeout.
    ///
    /// Invoker errors are translated into the platform taxonomy, tagged with
    /// the contracts being processed.
    pub async fn invoke(
        &self,
        invocation: ToolInvocation,
        contracts: &[String],
    ) -> Result<ToolOutput, PlatformError> {
        let program = invocation.program.clone();
        let timeout = invocation.timeout;
        run_with_timeout(&program, timeout, self.invoker.invoke(invocation))
            .await
            .map_err(|e| PlatformError::from_tool_error(&self.platform.id, e, contracts))
    }

    /// Invocation of this analyzer's tool with the analysis timeout
    pub fn tool_invocation(&self) -> ToolInvocation {
        ToolInvocation::new(&self.tool, self.tool_timeout)
    }

    /// Create a scratch directory, removed when the guard drops
    pub fn scratch_dir(&self) -> Result<TempDir, PlatformError> {
        let prefix = format!("argus-{}-", self.platform.id);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let dir = match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        dir.map_err(|e| {
            PlatformError::execution_failed(
                &self.platform.id,
                &self.tool,
                format!("Failed to create scratch directory: {}", e),
            )
        })
    }

    /// Write a source file under `dir` at its relative path, so imports
    /// between contracts and their dependencies still resolve
    pub fn write_source(
        &self,
        dir: &Path,
        contract: &ContractInput,
    ) -> Result<PathBuf, PlatformError> {
        let path = dir.join(scratch_path(&contract.filename));
        if let Some(parent) = path.parent() {
            self.create_dir(parent)?;
        }
        fs::write(&path, &contract.code).map_err(|e| {
            PlatformError::execution_failed(
                &self.platform.id,
                &self.tool,
                format!("Failed to write {}: {}", path.display(), e),
            )
        })?;
        debug!("Wrote {} ({} bytes)", path.display(), contract.code.len());
        Ok(path)
    }

    /// Create a directory inside a scratch project
    pub fn create_dir(&self, dir: &Path) -> Result<(), PlatformError> {
        fs::create_dir_all(dir).map_err(|e| {
            PlatformError::execution_failed(
                &self.platform.id,
                &self.tool,
                format!("Failed to create {}: {}", dir.display(), e),
            )
        })
    }

    /// Run the AI ensemble over every contract.
    ///
    /// Fails only when no contract could be analyzed by any model.
    pub async fn run_ai_stage(
        &self,
        contracts: &[ContractInput],
    ) -> Result<AnalysisResult, AiError> {
        let ai = self
            .ai
            .as_ref()
            .ok_or_else(|| AiError::NotConfigured("no AI ensemble configured".to_string()))?;

        let start = Instant::now();
        let mut result = AnalysisResult::succeeded();
        let mut failures = Vec::new();
        let mut analyzed = 0usize;

        for contract in contracts {
            let options = AnalysisOptions {
                platform: self.platform.id.clone(),
                language: contract
                    .language
                    .clone()
                    .or_else(|| Some(self.platform.language.clone())),
                focus_areas: self
                    .platform
                    .family
                    .focus_areas()
                    .iter()
                    .map(|area| area.to_string())
                    .collect(),
            };

            match ai
                .analyze_contract(&contract.code, &contract.filename, &options)
                .await
            {
                Ok(response) => {
                    analyzed += 1;
                    result.set_meta(
                        format!("ai_confidence:{}", contract.filename),
                        response.confidence,
                    );
                    result.set_meta(
                        format!("ai_quality:{}", contract.filename),
                        serde_json::to_value(response.quality_metrics).unwrap_or_default(),
                    );
                    result.vulnerabilities.extend(
                        response
                            .vulnerabilities
                            .iter()
                            .map(|v| self.ai_finding(v, &contract.filename)),
                    );
                }
                Err(err) => {
                    warn!("AI analysis failed for {}: {}", contract.filename, err);
                    failures.push(format!("{}: {}", contract.filename, err));
                }
            }
        }

        if analyzed == 0 {
            return Err(AiError::AllModelsFailed { failures });
        }

        for failure in failures {
            result
                .warnings
                .push(format!("AI analysis skipped for {}", failure));
        }

        result.set_meta("ai_models", ai.config().models.clone());
        result.execution_time = start.elapsed();
        Ok(result)
    }

    /// Convert an AI finding into a platform vulnerability
    pub fn ai_finding(
        &self,
        vulnerability: &AiVulnerability,
        filename: &str,
    ) -> PlatformVulnerability {
        PlatformVulnerability::new(
            vulnerability.vuln_type.to_string(),
            vulnerability.severity,
            vulnerability.title.clone(),
            vulnerability.description.clone(),
            Location::new(
                filename,
                vulnerability.location.line,
                vulnerability.location.column,
            ),
            vulnerability.recommendation.clone(),
            vulnerability.confidence,
            VulnerabilitySource::Ai,
            &self.platform.id,
        )
    }

    /// Stamp common metadata on a static stage result
    pub fn annotate_static(&self, result: &mut AnalysisResult, contracts: &[ContractInput]) {
        result.set_meta("tool", self.tool.clone());
        if let Some(version) = self.known_version() {
            result.set_meta("tool_version", version);
        }
        result.set_meta("contracts_analyzed", contracts.len());
        result.set_meta(
            "lines_analyzed",
            contracts.iter().map(ContractInput::line_count).sum::<usize>(),
        );
    }
}

/// Relative path of a contract inside a scratch dir.
///
/// Only normal components are kept, so `..`, roots and prefixes cannot
/// escape the directory.
pub fn scratch_path(filename: &str) -> PathBuf {
    let path: PathBuf = Path::new(filename)
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    if path.as_os_str().is_empty() {
        PathBuf::from("contract")
    } else {
        path
    }
}

/// Final path component of a contract name
pub fn safe_file_name(filename: &str) -> String {
    Path::new(filename)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .last()
        .unwrap_or("contract")
        .to_string()
}

/// Capability set shared by every platform analyzer
#[async_trait]
pub trait PlatformAnalyzer: Send + Sync {
    /// Shared analyzer state
    fn base(&self) -> &AnalyzerBase;

    /// Platform descriptor
    fn platform(&self) -> &PlatformInfo {
        &self.base().platform
    }

    /// Run the platform's static tool (and pattern checks) over the contracts.
    ///
    /// Contracts are processed sequentially. A tool that runs but reports
    /// compilation problems yields `Ok` with `success = false`; `Err` is
    /// reserved for tool-level failures.
    async fn run_static_analysis(
        &self,
        contracts: &[ContractInput],
    ) -> Result<AnalysisResult, PlatformError>;

    /// Lightweight syntax check; returned diagnostics become warnings
    async fn syntax_check(&self, _contract: &ContractInput) -> Result<Vec<String>, PlatformError> {
        Ok(Vec::new())
    }

    /// Arguments that make the tool print its version
    fn version_args(&self) -> Vec<String> {
        vec!["--version".to_string()]
    }

    /// Validate, run static analysis, run AI analysis, merge.
    ///
    /// Input validation failures return `Ok` with `success = false` before
    /// any tool runs. AI failures are downgraded to a warning.
    async fn analyze(&self, contracts: &[ContractInput]) -> Result<AnalysisResult, PlatformError> {
        let base = self.base();
        let start = Instant::now();

        let validation = base.validate_inputs(contracts);
        if !validation.is_valid {
            info!(
                "Rejecting {} contract(s) for {}: {} validation error(s)",
                contracts.len(),
                base.id(),
                validation.errors.len()
            );
            return Ok(AnalysisResult {
                success: false,
                errors: validation.errors,
                warnings: validation.warnings,
                execution_time: start.elapsed(),
                ..Default::default()
            });
        }

        let mut static_result = self.run_static_analysis(contracts).await?;
        base.annotate_static(&mut static_result, contracts);
        let mut warnings = validation.warnings;
        warnings.append(&mut static_result.warnings);
        static_result.warnings = warnings;

        let ai_result = if base.has_ai() {
            match base.run_ai_stage(contracts).await {
                Ok(result) => result,
                Err(err) => {
                    warn!("AI stage failed for {}: {}", base.id(), err);
                    AnalysisResult {
                        success: false,
                        warnings: vec![format!("{}: {}", AI_UNAVAILABLE_WARNING, err)],
                        ..Default::default()
                    }
                }
            }
        } else if base.ai_requested {
            debug!("No AI ensemble configured for {}", base.id());
            AnalysisResult {
                success: true,
                warnings: vec![AI_NOT_CONFIGURED_WARNING.to_string()],
                ..Default::default()
            }
        } else {
            debug!("AI analysis disabled for {}", base.id());
            AnalysisResult::succeeded()
        };

        let merged = merge_results(static_result, ai_result);
        info!(
            "{} analysis of {} contract(s) finished: success={}, {} finding(s)",
            base.id(),
            contracts.len(),
            merged.success,
            merged.vulnerabilities.len()
        );
        Ok(merged)
    }

    /// Validate and run only the AI stage
    async fn analyze_ai_only(
        &self,
        contracts: &[ContractInput],
    ) -> Result<AnalysisResult, PlatformError> {
        let base = self.base();
        let start = Instant::now();

        let validation = base.validate_inputs(contracts);
        if !validation.is_valid {
            return Ok(AnalysisResult {
                success: false,
                errors: validation.errors,
                warnings: validation.warnings,
                execution_time: start.elapsed(),
                ..Default::default()
            });
        }

        if !base.has_ai() {
            return Err(PlatformError::unavailable(
                base.id(),
                "AI analysis is not configured",
            ));
        }

        let mut result = base.run_ai_stage(contracts).await.map_err(|e| {
            PlatformError::execution_failed(base.id(), "ai-ensemble", e.to_string())
        })?;
        let mut warnings = validation.warnings;
        warnings.append(&mut result.warnings);
        result.warnings = warnings;
        result.set_meta("analysis_mode", "ai_only");
        Ok(result)
    }

    /// Local checks plus the syntax check, whose failures are only warnings
    async fn validate_contract(&self, contract: &ContractInput) -> ValidationResult {
        let mut result = self.base().validate_input(contract);
        if !result.is_valid {
            return result;
        }

        match self.syntax_check(contract).await {
            Ok(diagnostics) => result.warnings.extend(diagnostics),
            Err(err) => result
                .warnings
                .push(format!("Syntax check skipped: {}", err.message)),
        }
        result
    }

    /// Query the tool's version within the health timeout
    async fn check_health(&self) -> InstallationCheckResult {
        let base = self.base();
        if !base.tool_available() {
            return InstallationCheckResult::missing(format!("{} was not found on PATH", base.tool));
        }

        let invocation =
            ToolInvocation::new(&base.tool, base.health_timeout).args(self.version_args());

        match base.invoke(invocation, &[]).await {
            Ok(output) if output.success() => match extract_version(&output.combined()) {
                Some(version) => {
                    base.remember_version(&version);
                    InstallationCheckResult::installed(version)
                }
                None => InstallationCheckResult::missing(format!(
                    "{} did not report a recognizable version",
                    base.tool
                )),
            },
            Ok(output) => InstallationCheckResult::missing(format!(
                "{} exited with {:?}: {}",
                base.tool,
                output.exit_code,
                output.stderr.trim()
            )),
            Err(err) => InstallationCheckResult::missing(err.message),
        }
    }
}

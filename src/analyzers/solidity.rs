//! Solidity analyzer for EVM chains, backed by Slither

use std::time::Instant;

use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::json;

use crate::analyzers::patterns::{checks_for, run_pattern_checks};
use crate::analyzers::{scratch_path, AnalyzerBase, AnalyzerContext, PlatformAnalyzer};
use crate::errors::PlatformError;
use crate::invoker::{ToolInvocation, ToolOutput};
use crate::models::{
    AnalysisResult, ContractInput, Location, PlatformInfo, PlatformVulnerability, Severity,
    VulnerabilitySource,
};

/// Slither impact labels
const IMPACT_TABLE: &[(&str, Severity)] = &[
    ("high", Severity::High),
    ("medium", Severity::Medium),
    ("low", Severity::Low),
    ("informational", Severity::Informational),
    ("optimization", Severity::Informational),
];

/// Parser-only compiler pass used to check syntax without a full analysis
const SOLC: &str = "solc";

#[derive(Debug, Deserialize)]
struct SlitherReport {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    results: Option<SlitherResults>,
}

#[derive(Debug, Default, Deserialize)]
struct SlitherResults {
    #[serde(default)]
    detectors: Vec<SlitherDetector>,
}

#[derive(Debug, Deserialize)]
struct SlitherDetector {
    check: String,
    #[serde(default)]
    impact: String,
    #[serde(default)]
    confidence: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    elements: Vec<SlitherElement>,
}

#[derive(Debug, Deserialize)]
struct SlitherElement {
    #[serde(default)]
    source_mapping: Option<SourceMapping>,
}

#[derive(Debug, Deserialize)]
struct SourceMapping {
    #[serde(default)]
    lines: Vec<usize>,
    #[serde(default)]
    starting_column: Option<usize>,
    #[serde(default)]
    length: Option<usize>,
}

/// Solidity analyzer
pub struct SolidityAnalyzer {
    base: AnalyzerBase,
}

impl SolidityAnalyzer {
    /// Create an analyzer for one EVM platform
    pub fn new(platform: PlatformInfo, context: &AnalyzerContext) -> Self {
        Self {
            base: AnalyzerBase::new(platform, "slither", context),
        }
    }

    async fn analyze_contract(
        &self,
        contract: &ContractInput,
    ) -> Result<AnalysisResult, PlatformError> {
        let base = &self.base;
        let start = Instant::now();
        let dir = base.scratch_dir()?;

        for dependency in &contract.dependencies {
            base.write_source(dir.path(), dependency)?;
        }
        base.write_source(dir.path(), contract)?;

        let invocation = base
            .tool_invocation()
            .arg(scratch_path(&contract.filename).to_string_lossy())
            .args(["--json", "-"])
            .args(base.extra_args.iter().cloned())
            .current_dir(dir.path());

        let output = base
            .invoke(invocation, &[contract.filename.clone()])
            .await?;

        let mut result = parse_slither_output(&output, contract, base.id())?;
        result
            .vulnerabilities
            .extend(run_pattern_checks(checks_for(base.platform.family), contract, base.id()));
        result.execution_time = start.elapsed();
        Ok(result)
    }
}

/// Map a Slither check name onto the shared vulnerability vocabulary
fn normalize_check(check: &str) -> String {
    let mapped = match check {
        c if c.starts_with("reentrancy") => "reentrancy",
        "arbitrary-send-eth" | "arbitrary-send-erc20" | "suicidal" | "unprotected-upgrade"
        | "controlled-delegatecall" | "tx-origin" | "missing-modifier" => "access_control",
        "unchecked-transfer" | "unchecked-lowlevel" | "unchecked-send" | "low-level-calls" => {
            "unchecked_call"
        }
        "timestamp" => "timestamp_dependence",
        "calls-loop" | "msg-value-loop" | "costly-loop" => "denial_of_service",
        "divide-before-multiply" | "incorrect-equality" | "tautology" | "boolean-cst" => {
            "logic_error"
        }
        "weak-prng" => "front_running",
        "constable-states" | "immutable-states" | "external-function" => "gas_optimization",
        other => return other.replace('-', "_"),
    };
    mapped.to_string()
}

fn confidence_score(label: &str) -> f64 {
    match label.trim().to_lowercase().as_str() {
        "high" => 0.9,
        "medium" => 0.7,
        "low" => 0.5,
        _ => 0.6,
    }
}

/// Turn Slither's `--json -` output into a stage result.
///
/// Slither exits non-zero whenever it reports findings, so the JSON on stdout
/// decides the outcome; the exit code only matters when stdout is unusable.
pub fn parse_slither_output(
    output: &ToolOutput,
    contract: &ContractInput,
    platform: &str,
) -> Result<AnalysisResult, PlatformError> {
    let stdout = output.stdout.trim();

    if stdout.is_empty() {
        if output.success() {
            debug!("slither printed nothing for {}, treating as clean", contract.filename);
            return Ok(AnalysisResult::succeeded());
        }
        return Err(PlatformError::execution_failed(
            platform,
            "slither",
            format!(
                "slither exited with {:?} without output: {}",
                output.exit_code,
                output.stderr.trim()
            ),
        )
        .with_context("contracts", vec![contract.filename.clone()]));
    }

    let report: SlitherReport = serde_json::from_str(stdout).map_err(|e| {
        PlatformError::execution_failed(
            platform,
            "slither",
            format!("Unparseable slither output: {}", e),
        )
        .with_context("contracts", vec![contract.filename.clone()])
    })?;

    if !report.success {
        let message = report
            .error
            .unwrap_or_else(|| "slither reported failure without details".to_string());
        warn!("slither could not analyze {}: {}", contract.filename, message);
        return Ok(AnalysisResult::failed(vec![format!(
            "{}: {}",
            contract.filename,
            message.trim()
        )]));
    }

    let detectors = report.results.unwrap_or_default().detectors;
    let mut result = AnalysisResult::succeeded();

    for detector in detectors {
        let mapping = detector
            .elements
            .iter()
            .find_map(|e| e.source_mapping.as_ref());
        let line = mapping
            .and_then(|m| m.lines.first().copied())
            .unwrap_or(1)
            .max(1);
        let column = mapping
            .and_then(|m| m.starting_column)
            .unwrap_or(1)
            .max(1);

        let mut location = Location::new(&contract.filename, line, column);
        location.length = mapping.and_then(|m| m.length);

        let description = detector.description.trim().to_string();
        let title = description
            .lines()
            .next()
            .unwrap_or(&detector.check)
            .chars()
            .take(120)
            .collect::<String>();

        result.vulnerabilities.push(
            PlatformVulnerability::new(
                normalize_check(&detector.check),
                Severity::from_tool_label(&detector.impact, IMPACT_TABLE),
                title,
                description,
                location,
                format!(
                    "Review the '{}' finding against the Slither detector documentation.",
                    detector.check
                ),
                confidence_score(&detector.confidence),
                VulnerabilitySource::Static,
                platform,
            )
            .with_platform_data(json!({
                "detector": detector.check,
                "impact": detector.impact,
                "confidence": detector.confidence,
            })),
        );
    }

    Ok(result)
}

#[async_trait]
impl PlatformAnalyzer for SolidityAnalyzer {
    fn base(&self) -> &AnalyzerBase {
        &self.base
    }

    async fn run_static_analysis(
        &self,
        contracts: &[ContractInput],
    ) -> Result<AnalysisResult, PlatformError> {
        let mut combined = AnalysisResult::succeeded();
        for contract in contracts {
            let result = self.analyze_contract(contract).await?;
            combined.success &= result.success;
            combined.absorb(result);
        }
        Ok(combined)
    }

    async fn syntax_check(&self, contract: &ContractInput) -> Result<Vec<String>, PlatformError> {
        let base = &self.base;
        let dir = base.scratch_dir()?;
        for dependency in &contract.dependencies {
            base.write_source(dir.path(), dependency)?;
        }
        base.write_source(dir.path(), contract)?;

        let invocation = ToolInvocation::new(SOLC, base.tool_timeout)
            .args(["--stop-after", "parsing"])
            .arg(scratch_path(&contract.filename).to_string_lossy())
            .current_dir(dir.path());

        let output = base
            .invoke(invocation, &[contract.filename.clone()])
            .await?;

        if output.success() {
            return Ok(Vec::new());
        }

        Ok(output
            .stderr
            .lines()
            .filter(|l| l.contains("Error"))
            .map(|l| format!("{}: {}", contract.filename, l.trim()))
            .collect())
    }
}

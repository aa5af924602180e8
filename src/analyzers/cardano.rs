//! Cardano validator analyzer, backed by the Aiken compiler

use std::time::Instant;

use async_trait::async_trait;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::analyzers::patterns::{checks_for, run_pattern_checks};
use crate::analyzers::{safe_file_name, AnalyzerBase, AnalyzerContext, PlatformAnalyzer};
use crate::errors::PlatformError;
use crate::invoker::ToolOutput;
use crate::models::{
    AnalysisResult, ContractInput, Location, PlatformInfo, PlatformVulnerability, Severity,
    VulnerabilitySource,
};

static DIAGNOSTIC_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(Error|Warning)\s+(aiken::[\w:]+)").expect("valid regex"));
static DIAGNOSTIC_LOCATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"╭─\[\s*([^:\]]+):(\d+):(\d+)\s*\]").expect("valid regex"));
static DIAGNOSTIC_MESSAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[×⚠]\s*(.+)$").expect("valid regex"));

/// One diagnostic printed by `aiken check`
#[derive(Debug, Clone, PartialEq)]
pub struct AikenDiagnostic {
    pub is_error: bool,
    pub code: String,
    pub message: String,
    pub file: Option<String>,
    pub line: usize,
    pub column: usize,
}

/// Split `aiken check` output into diagnostics.
///
/// Each diagnostic starts at an `Error aiken::...` or `Warning aiken::...`
/// header; its message (`×` or `⚠`) and location (`╭─[file:line:col]`) are
/// taken from the lines up to the next header.
pub fn parse_aiken_diagnostics(output: &str) -> Vec<AikenDiagnostic> {
    let mut diagnostics: Vec<AikenDiagnostic> = Vec::new();

    for line in output.lines() {
        if let Some(caps) = DIAGNOSTIC_HEADER.captures(line) {
            diagnostics.push(AikenDiagnostic {
                is_error: &caps[1] == "Error",
                code: caps[2].to_string(),
                message: String::new(),
                file: None,
                line: 1,
                column: 1,
            });
            continue;
        }

        let Some(current) = diagnostics.last_mut() else {
            continue;
        };

        if current.file.is_none() {
            if let Some(caps) = DIAGNOSTIC_LOCATION.captures(line) {
                current.file = Some(caps[1].trim().to_string());
                current.line = caps[2].parse().unwrap_or(1);
                current.column = caps[3].parse().unwrap_or(1);
                continue;
            }
        }

        if current.message.is_empty() {
            if let Some(caps) = DIAGNOSTIC_MESSAGE.captures(line) {
                current.message = caps[1].trim().to_string();
            }
        }
    }

    for diagnostic in &mut diagnostics {
        if diagnostic.message.is_empty() {
            diagnostic.message = diagnostic.code.clone();
        }
    }
    diagnostics
}

/// `aiken::check::unused::variable` becomes `unused_variable`
fn finding_type(code: &str) -> String {
    let segments: Vec<&str> = code.split("::").collect();
    let tail = if segments.len() > 2 {
        &segments[segments.len() - 2..]
    } else {
        &segments[..]
    };
    tail.join("_")
}

/// Cardano analyzer
pub struct AikenAnalyzer {
    base: AnalyzerBase,
}

impl AikenAnalyzer {
    pub fn new(platform: PlatformInfo, context: &AnalyzerContext) -> Self {
        Self {
            base: AnalyzerBase::new(platform, "aiken", context),
        }
    }

    /// Lay out a throwaway Aiken project and run `aiken check` in it
    async fn check_project(
        &self,
        contract: &ContractInput,
        extra: &[&str],
    ) -> Result<ToolOutput, PlatformError> {
        let base = &self.base;
        let dir = base.scratch_dir()?;
        let root = dir.path();

        let manifest = ContractInput::new(
            "aiken.toml",
            format!(
                "name = \"argus/{}\"\nversion = \"0.0.0\"\nplutus = \"v3\"\n",
                project_name(&contract.stem())
            ),
            base.id(),
        );
        base.write_source(root, &manifest)?;

        let validators = root.join("validators");
        base.create_dir(&validators)?;
        base.write_source(&validators, contract)?;

        if !contract.dependencies.is_empty() {
            let lib = root.join("lib");
            base.create_dir(&lib)?;
            for dependency in &contract.dependencies {
                base.write_source(&lib, dependency)?;
            }
        }

        let invocation = base
            .tool_invocation()
            .arg("check")
            .args(extra.iter().copied())
            .args(base.extra_args.iter().cloned())
            .current_dir(root);

        base.invoke(invocation, &[contract.filename.clone()]).await
    }

    async fn analyze_contract(
        &self,
        contract: &ContractInput,
    ) -> Result<AnalysisResult, PlatformError> {
        let start = Instant::now();
        let output = self.check_project(contract, &[]).await?;
        let mut result = parse_aiken_output(&output, contract, self.base.id())?;
        result.vulnerabilities.extend(run_pattern_checks(
            checks_for(self.base.platform.family),
            contract,
            self.base.id(),
        ));
        result.execution_time = start.elapsed();
        Ok(result)
    }
}

/// Aiken project names allow lowercase letters, digits, `-` and `_`
fn project_name(stem: &str) -> String {
    let name: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() {
        "contract".to_string()
    } else {
        name
    }
}

/// Turn `aiken check` output into a stage result.
///
/// Warnings become low-severity findings; errors make the result
/// unsuccessful. A failing exit with nothing recognisable is a tool failure.
pub fn parse_aiken_output(
    output: &ToolOutput,
    contract: &ContractInput,
    platform: &str,
) -> Result<AnalysisResult, PlatformError> {
    let diagnostics = parse_aiken_diagnostics(&output.combined());
    debug!(
        "aiken reported {} diagnostic(s) for {}",
        diagnostics.len(),
        contract.filename
    );

    let mut result = AnalysisResult::succeeded();
    for diagnostic in diagnostics {
        let file = diagnostic
            .file
            .as_deref()
            .map(safe_file_name)
            .unwrap_or_else(|| contract.filename.clone());

        if diagnostic.is_error {
            result.success = false;
            result.errors.push(format!(
                "{}:{}:{}: {} ({})",
                file, diagnostic.line, diagnostic.column, diagnostic.message, diagnostic.code
            ));
            continue;
        }

        let location = Location::new(
            // findings in the validator keep the caller's name
            if file == safe_file_name(&contract.filename) {
                contract.filename.clone()
            } else {
                file
            },
            diagnostic.line,
            diagnostic.column,
        );
        result.vulnerabilities.push(
            PlatformVulnerability::new(
                finding_type(&diagnostic.code),
                Severity::Low,
                diagnostic.message.clone(),
                format!("Aiken compiler warning {}: {}", diagnostic.code, diagnostic.message),
                location,
                "Address the warning; unused or shadowed bindings often hide validation gaps.",
                0.9,
                VulnerabilitySource::Static,
                platform,
            )
            .with_platform_data(json!({ "code": diagnostic.code })),
        );
    }

    if !output.success() && result.errors.is_empty() {
        warn!(
            "aiken exited with {:?} without diagnostics for {}",
            output.exit_code, contract.filename
        );
        return Err(PlatformError::execution_failed(
            platform,
            "aiken",
            format!(
                "aiken check exited with {:?}: {}",
                output.exit_code,
                output.stderr.trim()
            ),
        )
        .with_context("contracts", vec![contract.filename.clone()]));
    }

    Ok(result)
}

#[async_trait]
impl PlatformAnalyzer for AikenAnalyzer {
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
        let output = self.check_project(contract, &["--skip-tests"]).await?;
        Ok(parse_aiken_diagnostics(&output.combined())
            .into_iter()
            .filter(|d| d.is_error)
            .map(|d| format!("{}:{}: {}", contract.filename, d.line, d.message))
            .collect())
    }
}

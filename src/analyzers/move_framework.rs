//! Shared driver for the Move-based chains
//!
//! Sui and Aptos both compile Move packages with their own CLI. They differ
//! in the manifest they need and the build subcommand, which [`MoveFlavor`]
//! captures; diagnostics use the same codespan layout on both.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Instant;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use strum_macros::Display;

use crate::analyzers::patterns::{checks_for, run_pattern_checks};
use crate::analyzers::{safe_file_name, AnalyzerBase};
use crate::errors::PlatformError;
use crate::invoker::ToolOutput;
use crate::models::{
    AnalysisResult, ContractInput, Location, PlatformVulnerability, Severity, VulnerabilitySource,
};

static MODULE_DECL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bmodule\s+([A-Za-z_]\w*)::\w+").expect("valid regex"));
static DIAGNOSTIC_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(error|warning)(?:\[(\w+)\])?:\s*(.+?)\s*$").expect("valid regex")
});
static DIAGNOSTIC_LOCATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"┌─\s*(.+?):(\d+):(\d+)").expect("valid regex"));

/// Addresses the frameworks already bind
const RESERVED_ADDRESSES: &[&str] = &["std", "sui", "aptos_framework", "aptos_std", "aptos_token"];

/// Which Move toolchain a package is built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum MoveFlavor {
    Sui,
    Aptos,
}

impl MoveFlavor {
    /// Arguments that build the package at `dir`
    pub fn build_args(&self, dir: &Path) -> Vec<String> {
        let dir = dir.display().to_string();
        match self {
            MoveFlavor::Sui => vec!["move".into(), "build".into(), "--path".into(), dir],
            MoveFlavor::Aptos => vec![
                "move".into(),
                "compile".into(),
                "--package-dir".into(),
                dir,
            ],
        }
    }

    /// Address given to every named address the sources declare
    fn placeholder_address(&self) -> &'static str {
        match self {
            MoveFlavor::Sui => "0x0",
            MoveFlavor::Aptos => "0xcafe",
        }
    }

    /// `Move.toml` for a scratch package
    pub fn manifest(&self, package: &str, addresses: &BTreeSet<String>) -> String {
        let mut manifest = match self {
            MoveFlavor::Sui => format!(
                "[package]\n\
                 name = \"{package}\"\n\
                 edition = \"2024.beta\"\n\n\
                 [dependencies]\n\
                 Sui = {{ git = \"https://github.com/MystenLabs/sui.git\", \
                 subdir = \"crates/sui-framework/packages/sui-framework\", \
                 rev = \"framework/mainnet\" }}\n"
            ),
            MoveFlavor::Aptos => format!(
                "[package]\n\
                 name = \"{package}\"\n\
                 version = \"0.0.0\"\n\n\
                 [dependencies.AptosFramework]\n\
                 git = \"https://github.com/aptos-labs/aptos-core.git\"\n\
                 rev = \"mainnet\"\n\
                 subdir = \"aptos-move/framework/aptos-framework\"\n"
            ),
        };

        manifest.push_str("\n[addresses]\n");
        for address in addresses {
            manifest.push_str(&format!(
                "{} = \"{}\"\n",
                address,
                self.placeholder_address()
            ));
        }
        manifest
    }
}

/// Named addresses used by `module addr::name` declarations
pub fn named_addresses<'a>(sources: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    sources
        .into_iter()
        .flat_map(|source| MODULE_DECL.captures_iter(source))
        .map(|caps| caps[1].to_string())
        .filter(|name| !RESERVED_ADDRESSES.contains(&name.as_str()))
        .collect()
}

/// One compiler diagnostic
#[derive(Debug, Clone, PartialEq)]
pub struct MoveDiagnostic {
    pub is_error: bool,
    pub code: Option<String>,
    pub message: String,
    pub file: Option<String>,
    pub line: usize,
    pub column: usize,
}

/// Parse `error[E..]:` / `warning[W..]:` blocks and their `┌─ file:line:col` locations
pub fn parse_move_diagnostics(output: &str) -> Vec<MoveDiagnostic> {
    let mut diagnostics: Vec<MoveDiagnostic> = Vec::new();

    for line in output.lines() {
        if let Some(caps) = DIAGNOSTIC_HEADER.captures(line) {
            diagnostics.push(MoveDiagnostic {
                is_error: &caps[1] == "error",
                code: caps.get(2).map(|m| m.as_str().to_string()),
                message: caps[3].to_string(),
                file: None,
                line: 1,
                column: 1,
            });
            continue;
        }

        if let Some(current) = diagnostics.last_mut() {
            if current.file.is_none() {
                if let Some(caps) = DIAGNOSTIC_LOCATION.captures(line) {
                    current.file = Some(caps[1].trim().to_string());
                    current.line = caps[2].parse().unwrap_or(1);
                    current.column = caps[3].parse().unwrap_or(1);
                }
            }
        }
    }

    diagnostics
}

/// The `{"Error": "..."}` object the Aptos CLI prints on failure
fn json_error(stdout: &str) -> Option<String> {
    let value: Value = serde_json::from_str(stdout.trim()).ok()?;
    value.get("Error")?.as_str().map(str::to_string)
}

/// Builds a scratch package per contract and runs the flavor's compiler
#[derive(Debug, Clone, Copy)]
pub struct MoveFramework {
    flavor: MoveFlavor,
}

impl MoveFramework {
    pub fn new(flavor: MoveFlavor) -> Self {
        Self { flavor }
    }

    pub fn flavor(&self) -> MoveFlavor {
        self.flavor
    }

    /// Compile each contract in turn and collect findings
    pub async fn run(
        &self,
        base: &AnalyzerBase,
        contracts: &[ContractInput],
    ) -> Result<AnalysisResult, PlatformError> {
        let mut combined = AnalysisResult::succeeded();
        for contract in contracts {
            let start = Instant::now();
            let output = self.build(base, contract).await?;
            let mut result = parse_move_output(&output, contract, base.id(), &base.tool)?;
            result.vulnerabilities.extend(run_pattern_checks(
                checks_for(base.platform.family),
                contract,
                base.id(),
            ));
            result.execution_time = start.elapsed();
            combined.success &= result.success;
            combined.absorb(result);
        }
        Ok(combined)
    }

    /// Compile a single contract and return only its errors
    pub async fn syntax_check(
        &self,
        base: &AnalyzerBase,
        contract: &ContractInput,
    ) -> Result<Vec<String>, PlatformError> {
        let output = self.build(base, contract).await?;
        Ok(parse_move_diagnostics(&output.combined())
            .into_iter()
            .filter(|d| d.is_error)
            .map(|d| format!("{}:{}: {}", contract.filename, d.line, d.message))
            .collect())
    }

    async fn build(
        &self,
        base: &AnalyzerBase,
        contract: &ContractInput,
    ) -> Result<ToolOutput, PlatformError> {
        let dir = base.scratch_dir()?;
        let root = dir.path();

        let addresses = named_addresses(
            std::iter::once(contract.code.as_str())
                .chain(contract.dependencies.iter().map(|d| d.code.as_str())),
        );
        let manifest = ContractInput::new(
            "Move.toml",
            self.flavor.manifest(&package_name(&contract.stem()), &addresses),
            base.id(),
        );
        base.write_source(root, &manifest)?;

        let sources = root.join("sources");
        base.create_dir(&sources)?;
        for dependency in &contract.dependencies {
            base.write_source(&sources, dependency)?;
        }
        base.write_source(&sources, contract)?;

        debug!(
            "Building {} package with named addresses {:?}",
            self.flavor, addresses
        );

        let invocation = base
            .tool_invocation()
            .args(self.flavor.build_args(root))
            .args(base.extra_args.iter().cloned())
            .current_dir(root);

        base.invoke(invocation, &[contract.filename.clone()]).await
    }
}

/// Move package names are identifiers
fn package_name(stem: &str) -> String {
    let mut name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        name.insert_str(0, "Pkg");
    }
    name
}

/// Turn compiler output into a stage result.
///
/// Warnings become low-severity findings and errors make the result
/// unsuccessful. A failing exit with no diagnostics at all is a tool failure.
pub fn parse_move_output(
    output: &ToolOutput,
    contract: &ContractInput,
    platform: &str,
    tool: &str,
) -> Result<AnalysisResult, PlatformError> {
    let mut result = AnalysisResult::succeeded();
    let own_file = safe_file_name(&contract.filename);

    for diagnostic in parse_move_diagnostics(&output.combined()) {
        let file = diagnostic
            .file
            .as_deref()
            .map(safe_file_name)
            .unwrap_or_else(|| own_file.clone());
        let code = diagnostic.code.clone().unwrap_or_default();

        if diagnostic.is_error {
            result.success = false;
            result.errors.push(format!(
                "{}:{}:{}: {} {}",
                file, diagnostic.line, diagnostic.column, code, diagnostic.message
            ));
            continue;
        }

        let file = if file == own_file {
            contract.filename.clone()
        } else {
            file
        };
        result.vulnerabilities.push(
            PlatformVulnerability::new(
                "best_practice",
                Severity::Low,
                diagnostic.message.clone(),
                format!("Move compiler warning {}: {}", code, diagnostic.message),
                Location::new(file, diagnostic.line, diagnostic.column),
                "Resolve the compiler warning.",
                0.9,
                VulnerabilitySource::Static,
                platform,
            )
            .with_platform_data(json!({ "code": code })),
        );
    }

    if result.errors.is_empty() {
        if let Some(message) = json_error(&output.stdout) {
            result.success = false;
            result
                .errors
                .push(format!("{}: {}", contract.filename, message));
        }
    }

    if !output.success() && result.errors.is_empty() {
        warn!(
            "{} exited with {:?} without diagnostics for {}",
            tool, output.exit_code, contract.filename
        );
        return Err(PlatformError::execution_failed(
            platform,
            tool,
            format!(
                "{} exited with {:?}: {}",
                tool,
                output.exit_code,
                output.stderr.trim()
            ),
        )
        .with_context("contracts", vec![contract.filename.clone()]));
    }

    Ok(result)
}

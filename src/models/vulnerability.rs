use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use strum_macros::{Display, EnumIter, EnumString};

/// Severity levels for findings, ordered from least to most severe
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational notes
    Informational,

    /// Low impact
    Low,

    /// Medium impact
    Medium,

    /// High impact
    High,

    /// Critical, likely exploitable
    Critical,
}

impl Severity {
    /// Normalize a tool's native severity vocabulary through a lookup table.
    ///
    /// Unknown values map to [`Severity::Medium`].
    pub fn from_tool_label(label: &str, table: &[(&str, Severity)]) -> Self {
        let label = label.trim().to_lowercase();
        table
            .iter()
            .find(|(name, _)| *name == label)
            .map(|(_, severity)| *severity)
            .unwrap_or(Severity::Medium)
    }

    /// Get the color name for this severity
    pub fn color_name(&self) -> &'static str {
        match self {
            Severity::Critical => "magenta",
            Severity::High => "red",
            Severity::Medium => "yellow",
            Severity::Low => "blue",
            Severity::Informational => "white",
        }
    }
}

/// Where a finding came from
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VulnerabilitySource {
    /// External static analysis tool or pattern checks
    Static,

    /// AI ensemble
    Ai,

    /// Merged from several sources upstream
    Combined,
}

/// Source location of a finding (1-indexed)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub column: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
}

impl Location {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            length: None,
        }
    }
}

/// A single vulnerability reported for a platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformVulnerability {
    /// Stable hash of type, location and description
    pub id: String,

    /// Free-text category (e.g. `reentrancy`)
    #[serde(rename = "type")]
    pub vuln_type: String,

    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub location: Location,
    pub recommendation: String,

    /// Confidence in [0, 1]
    pub confidence: f64,

    pub source: VulnerabilitySource,
    pub platform: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_specific_data: Option<Value>,
}

impl PlatformVulnerability {
    /// Create a vulnerability with its id assigned
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vuln_type: impl Into<String>,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
        location: Location,
        recommendation: impl Into<String>,
        confidence: f64,
        source: VulnerabilitySource,
        platform: impl Into<String>,
    ) -> Self {
        let mut vulnerability = Self {
            id: String::new(),
            vuln_type: vuln_type.into(),
            severity,
            title: title.into(),
            description: description.into(),
            location,
            recommendation: recommendation.into(),
            confidence: confidence.clamp(0.0, 1.0),
            source,
            platform: platform.into(),
            platform_specific_data: None,
        };
        vulnerability.id = vulnerability_id(&vulnerability);
        vulnerability
    }

    /// Attach tool-specific metadata
    pub fn with_platform_data(mut self, data: Value) -> Self {
        self.platform_specific_data = Some(data);
        self
    }

    /// Key used to decide whether two findings are the same
    pub fn dedup_key(&self) -> (String, String, usize, usize) {
        (
            self.vuln_type.clone(),
            self.location.file.clone(),
            self.location.line,
            self.location.column,
        )
    }
}

/// Stable id derived from type, location and description
pub fn vulnerability_id(vulnerability: &PlatformVulnerability) -> String {
    let mut hasher = Sha256::new();
    hasher.update(vulnerability.vuln_type.as_bytes());
    hasher.update(b"\0");
    hasher.update(
        format!(
            "{}:{}:{}",
            vulnerability.location.file, vulnerability.location.line, vulnerability.location.column
        )
        .as_bytes(),
    );
    hasher.update(b"\0");
    hasher.update(vulnerability.description.as_bytes());
    let digest = hasher.finalize();
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Remove findings sharing (type, file, line, column), keeping the first occurrence
pub fn deduplicate_vulnerabilities(
    vulnerabilities: Vec<PlatformVulnerability>,
) -> Vec<PlatformVulnerability> {
    let mut seen = HashSet::new();
    vulnerabilities
        .into_iter()
        .filter(|vulnerability| seen.insert(vulnerability.dedup_key()))
        .collect()
}

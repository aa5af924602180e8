use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::vulnerability::{deduplicate_vulnerabilities, PlatformVulnerability};

/// Outcome of validating a single contract
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Build a result whose validity follows from the error list
    pub fn from_messages(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// The unit returned by every `analyze` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Whether the analysis ran successfully, even if issues were found
    pub success: bool,

    pub vulnerabilities: Vec<PlatformVulnerability>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,

    /// Time spent across all stages
    #[serde(with = "duration_millis")]
    pub execution_time: Duration,

    /// Tool versions, lines analyzed and similar metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_specific: Option<Map<String, Value>>,
}

impl AnalysisResult {
    /// An empty successful result
    pub fn succeeded() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    /// A failed result carrying the given errors
    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            success: false,
            errors,
            ..Default::default()
        }
    }

    /// Insert a metadata entry
    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.platform_specific
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
    }

    /// Read a metadata entry
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.platform_specific.as_ref().and_then(|m| m.get(key))
    }

    /// Fold another stage's result into this one without touching `success`
    pub fn absorb(&mut self, other: AnalysisResult) {
        self.vulnerabilities.extend(other.vulnerabilities);
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.execution_time += other.execution_time;
        if let Some(meta) = other.platform_specific {
            let target = self.platform_specific.get_or_insert_with(Map::new);
            for (key, value) in meta {
                target.entry(key).or_insert(value);
            }
        }
    }
}

/// Merge the static and AI stage results.
///
/// Static findings are concatenated first, so a static finding wins any
/// deduplication collision. `success` is the static stage's.
pub fn merge_results(static_result: AnalysisResult, ai_result: AnalysisResult) -> AnalysisResult {
    let success = static_result.success;
    let mut merged = static_result;
    merged.absorb(ai_result);
    merged.vulnerabilities = deduplicate_vulnerabilities(merged.vulnerabilities);
    merged.success = success;
    merged
}

/// Result of probing an external tool installation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationCheckResult {
    pub installed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InstallationCheckResult {
    pub fn installed(version: impl Into<String>) -> Self {
        Self {
            installed: true,
            version: Some(version.into()),
            error: None,
        }
    }

    pub fn missing(error: impl Into<String>) -> Self {
        Self {
            installed: false,
            version: None,
            error: Some(error.into()),
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

//! AI ensemble analysis
//!
//! Several independently configured models audit the same contract; their
//! answers are repaired into a fixed schema and reduced to one opinion by
//! consensus voting and averaging.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::models::Severity;

mod client;
mod ensemble;
mod parser;
mod prompt;

pub use client::{CompletionClient, CompletionRequest, HttpCompletionClient};
pub use ensemble::{combine_responses, consensus_threshold, AiEnsembleAnalyzer};
pub use parser::{parse_model_output, validate_response, FALLBACK_CONFIDENCE};
pub use prompt::{build_analysis_prompt, SYSTEM_PROMPT};

/// Vulnerability categories a model may report
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum AiVulnerabilityType {
    Reentrancy,
    AccessControl,
    IntegerOverflow,
    UncheckedCall,
    DenialOfService,
    FrontRunning,
    TimestampDependence,
    OracleManipulation,
    LogicError,
    ResourceSafety,
    BestPractice,
    GasOptimization,
}

/// Recommendation categories a model may report
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    Security,
    GasOptimization,
    BestPractice,
    CodeQuality,
    Maintainability,
}

/// Recommendation priority
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Position reported by a model (1-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AiLocation {
    pub line: usize,
    pub column: usize,
}

/// A vulnerability as reported by one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiVulnerability {
    #[serde(rename = "type")]
    pub vuln_type: AiVulnerabilityType,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub location: AiLocation,
    pub recommendation: String,
    pub confidence: f64,
}

/// A general recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiRecommendation {
    pub category: RecommendationCategory,
    pub priority: Priority,
    pub description: String,
    pub implementation: String,
}

/// Quality scores, each in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub code_quality_score: f64,
    pub maintainability_index: f64,
    pub test_coverage_estimate: f64,
}

impl Default for QualityMetrics {
    fn default() -> Self {
        Self {
            code_quality_score: 50.0,
            maintainability_index: 50.0,
            test_coverage_estimate: 0.0,
        }
    }
}

/// One model's validated opinion, or the ensemble's combined one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub model: String,
    pub vulnerabilities: Vec<AiVulnerability>,
    pub recommendations: Vec<AiRecommendation>,
    pub quality_metrics: QualityMetrics,
    pub confidence: f64,
    #[serde(skip)]
    pub execution_time: Duration,
}

/// Per-request context for the prompt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub platform: String,
    pub language: Option<String>,
    pub focus_areas: Vec<String>,
}

//! Recovery parsing and schema repair for model output

use std::str::FromStr;
use std::time::Duration;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::{
    AiLocation, AiRecommendation, AiVulnerability, AiVulnerabilityType, ModelResponse, Priority,
    QualityMetrics, RecommendationCategory,
};
use crate::models::Severity;

/// Confidence given to a response whose content could not be recovered
pub const FALLBACK_CONFIDENCE: f64 = 0.1;

const DEFAULT_CONFIDENCE: f64 = 0.5;

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("valid regex"));

type Strategy = fn(&str) -> Option<Value>;

/// Tried in order until one yields a JSON object
const STRATEGIES: &[(&str, Strategy)] = &[
    ("direct", parse_direct),
    ("fenced block", parse_fenced_block),
    ("bounded object", parse_bounded_object),
];

fn parse_direct(text: &str) -> Option<Value> {
    serde_json::from_str(text.trim()).ok()
}

fn parse_fenced_block(text: &str) -> Option<Value> {
    FENCED_BLOCK
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .find_map(|m| serde_json::from_str(m.as_str().trim()).ok())
}

fn parse_bounded_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Parse and repair a model's raw text into a [`ModelResponse`].
///
/// Never fails: content that no strategy can recover yields an empty,
/// low-confidence response.
pub fn parse_model_output(model: &str, text: &str) -> ModelResponse {
    for (name, strategy) in STRATEGIES {
        if let Some(value) = strategy(text) {
            if let Some(response) = validate_response(model, &value) {
                debug!("Parsed response from {} using {} strategy", model, name);
                return response;
            }
        }
    }

    warn!(
        "Could not recover structured output from {}, using empty response",
        model
    );
    fallback_response(model)
}

fn fallback_response(model: &str) -> ModelResponse {
    ModelResponse {
        model: model.to_string(),
        vulnerabilities: Vec::new(),
        recommendations: Vec::new(),
        quality_metrics: QualityMetrics::default(),
        confidence: FALLBACK_CONFIDENCE,
        execution_time: Duration::ZERO,
    }
}

/// Validate a parsed value against the response schema.
///
/// Out-of-range numbers are clamped and invalid enum values replaced with safe
/// defaults; only a non-object value is rejected.
pub fn validate_response(model: &str, value: &Value) -> Option<ModelResponse> {
    let object = value.as_object()?;

    let vulnerabilities = object
        .get("vulnerabilities")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .map(validate_vulnerability)
                .collect()
        })
        .unwrap_or_default();

    let recommendations = object
        .get("recommendations")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .map(validate_recommendation)
                .collect()
        })
        .unwrap_or_default();

    let metrics = object
        .get("quality_metrics")
        .or_else(|| object.get("qualityMetrics"))
        .and_then(Value::as_object);
    let defaults = QualityMetrics::default();
    let metric = |key: &str, default: f64| {
        metrics
            .and_then(|m| m.get(key))
            .and_then(number)
            .map(|n| n.clamp(0.0, 100.0))
            .unwrap_or(default)
    };
    let quality_metrics = QualityMetrics {
        code_quality_score: metric("code_quality_score", defaults.code_quality_score),
        maintainability_index: metric("maintainability_index", defaults.maintainability_index),
        test_coverage_estimate: metric("test_coverage_estimate", defaults.test_coverage_estimate),
    };

    Some(ModelResponse {
        model: model.to_string(),
        vulnerabilities,
        recommendations,
        quality_metrics,
        confidence: unit_interval(object.get("confidence")),
        execution_time: Duration::ZERO,
    })
}

fn validate_vulnerability(item: &Map<String, Value>) -> AiVulnerability {
    let location = item.get("location").and_then(Value::as_object);
    let position = |key: &str| {
        location
            .and_then(|l| l.get(key))
            .or_else(|| item.get(key))
            .map(positive_int)
            .unwrap_or(1)
    };

    AiVulnerability {
        vuln_type: enum_or(item.get("type"), AiVulnerabilityType::BestPractice),
        severity: enum_or(item.get("severity"), Severity::Low),
        title: text(item.get("title")),
        description: text(item.get("description")),
        location: AiLocation {
            line: position("line"),
            column: position("column"),
        },
        recommendation: text(item.get("recommendation")),
        confidence: unit_interval(item.get("confidence")),
    }
}

fn validate_recommendation(item: &Map<String, Value>) -> AiRecommendation {
    AiRecommendation {
        category: enum_or(item.get("category"), RecommendationCategory::BestPractice),
        priority: enum_or(item.get("priority"), Priority::Low),
        description: text(item.get("description")),
        implementation: text(item.get("implementation")),
    }
}

fn enum_or<T: FromStr>(value: Option<&Value>, default: T) -> T {
    value
        .and_then(Value::as_str)
        .and_then(|s| T::from_str(s.trim()).ok())
        .unwrap_or(default)
}

fn text(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

fn unit_interval(value: Option<&Value>) -> f64 {
    value
        .and_then(number)
        .map(|n| n.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_CONFIDENCE)
}

fn positive_int(value: &Value) -> usize {
    match number(value) {
        Some(n) if n >= 1.0 => n.floor() as usize,
        _ => 1,
    }
}

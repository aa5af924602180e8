use std::time::Duration;

use pretty_assertions::assert_eq;
use rstest::rstest;

use argus::models::{
    deduplicate_vulnerabilities, merge_results, AnalysisResult, Location, PlatformVulnerability,
    Severity, VulnerabilitySource,
};

const TOOL_TABLE: &[(&str, Severity)] = &[
    ("high", Severity::High),
    ("medium", Severity::Medium),
    ("low", Severity::Low),
    ("informational", Severity::Informational),
];

fn finding(
    vuln_type: &str,
    line: usize,
    column: usize,
    description: &str,
    source: VulnerabilitySource,
) -> PlatformVulnerability {
    PlatformVulnerability::new(
        vuln_type,
        Severity::High,
        format!("{} finding", vuln_type),
        description,
        Location::new("Vault.sol", line, column),
        "Fix it",
        0.8,
        source,
        "ethereum",
    )
}

#[test]
fn test_dedup_keeps_first_occurrence() {
    let first = finding("reentrancy", 8, 5, "from the tool", VulnerabilitySource::Static);
    let second = finding("reentrancy", 8, 5, "from a model", VulnerabilitySource::Ai);
    let other = finding("reentrancy", 9, 5, "next line", VulnerabilitySource::Ai);

    let deduped = deduplicate_vulnerabilities(vec![first.clone(), second, other.clone()]);

    assert_eq!(deduped, vec![first, other]);
}

#[test]
fn test_dedup_distinguishes_columns_and_files() {
    let a = finding("reentrancy", 8, 5, "a", VulnerabilitySource::Static);
    let b = finding("reentrancy", 8, 6, "b", VulnerabilitySource::Static);
    let mut c = finding("reentrancy", 8, 5, "c", VulnerabilitySource::Static);
    c.location.file = "Token.sol".to_string();

    assert_eq!(deduplicate_vulnerabilities(vec![a, b, c]).len(), 3);
}

#[test]
fn test_vulnerability_id_is_stable() {
    let a = finding("reentrancy", 8, 5, "same", VulnerabilitySource::Static);
    let b = finding("reentrancy", 8, 5, "same", VulnerabilitySource::Ai);
    let c = finding("reentrancy", 8, 5, "different", VulnerabilitySource::Static);

    assert_eq!(a.id, b.id);
    assert_ne!(a.id, c.id);
    assert_eq!(a.id.len(), 16);
}

#[test]
fn test_confidence_is_clamped_on_creation() {
    let mut vulnerability = finding("logic_error", 1, 1, "x", VulnerabilitySource::Ai);
    assert_eq!(vulnerability.confidence, 0.8);

    vulnerability = PlatformVulnerability::new(
        "logic_error",
        Severity::Low,
        "t",
        "d",
        Location::new("a.sol", 1, 1),
        "r",
        1.7,
        VulnerabilitySource::Ai,
        "ethereum",
    );
    assert_eq!(vulnerability.confidence, 1.0);
}

#[rstest]
#[case("High", Severity::High)]
#[case("MEDIUM", Severity::Medium)]
#[case(" low ", Severity::Low)]
#[case("Informational", Severity::Informational)]
#[case("Optimization", Severity::Medium)]
#[case("", Severity::Medium)]
fn test_tool_labels_map_through_table(#[case] label: &str, #[case] expected: Severity) {
    assert_eq!(Severity::from_tool_label(label, TOOL_TABLE), expected);
}

#[test]
fn test_severity_ordering() {
    assert!(Severity::Informational < Severity::Low);
    assert!(Severity::Low < Severity::Medium);
    assert!(Severity::Medium < Severity::High);
    assert!(Severity::High < Severity::Critical);
}

#[test]
fn test_merge_prefers_static_findings() {
    let mut static_result = AnalysisResult::succeeded();
    static_result
        .vulnerabilities
        .push(finding("reentrancy", 8, 5, "tool", VulnerabilitySource::Static));
    static_result.execution_time = Duration::from_millis(30);
    static_result.set_meta("tool", "slither");

    let mut ai_result = AnalysisResult::succeeded();
    ai_result
        .vulnerabilities
        .push(finding("reentrancy", 8, 5, "model", VulnerabilitySource::Ai));
    ai_result
        .vulnerabilities
        .push(finding("access_control", 3, 1, "model", VulnerabilitySource::Ai));
    ai_result.warnings.push("partial".to_string());
    ai_result.execution_time = Duration::from_millis(20);
    ai_result.set_meta("tool", "overwritten?");
    ai_result.set_meta("ai_models", "m");

    let merged = merge_results(static_result, ai_result);

    assert!(merged.success);
    assert_eq!(merged.vulnerabilities.len(), 2);
    assert_eq!(merged.vulnerabilities[0].source, VulnerabilitySource::Static);
    assert_eq!(merged.vulnerabilities[1].vuln_type, "access_control");
    assert_eq!(merged.warnings, vec!["partial".to_string()]);
    assert_eq!(merged.execution_time, Duration::from_millis(50));
    assert_eq!(merged.meta("tool").and_then(|v| v.as_str()), Some("slither"));
    assert_eq!(merged.meta("ai_models").and_then(|v| v.as_str()), Some("m"));
}

#[test]
fn test_merge_never_fails_a_successful_static_run() {
    let ai_result = AnalysisResult {
        success: false,
        warnings: vec!["AI down".to_string()],
        ..Default::default()
    };

    let merged = merge_results(AnalysisResult::succeeded(), ai_result);
    assert!(merged.success);

    let merged = merge_results(
        AnalysisResult::failed(vec!["boom".into()]),
        AnalysisResult::succeeded(),
    );
    assert!(!merged.success);
}

#[test]
fn test_analysis_result_serializes_camel_case() {
    let mut result = AnalysisResult::succeeded();
    result
        .vulnerabilities
        .push(finding("reentrancy", 8, 5, "tool", VulnerabilitySource::Static));
    result.execution_time = Duration::from_millis(1500);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["executionTime"], 1500);
    assert_eq!(json["vulnerabilities"][0]["type"], "reentrancy");
    assert_eq!(json["vulnerabilities"][0]["severity"], "high");
    assert_eq!(json["vulnerabilities"][0]["source"], "static");
}

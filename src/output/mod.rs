//! Output formatting for Argus

use colored::Colorize;
use serde::Serialize;

use argus::models::{
    AnalysisResult, AnalyzerValidation, HealthStatus, PlatformHealthSummary, PlatformInfo,
    Severity, ValidationResult,
};

/// Trait for formatting output
pub trait OutputFormatter {
    /// Format an analysis result
    fn format_analysis(&self, platform: &str, result: &AnalysisResult) -> String;

    /// Format per-file validation results
    fn format_validation(&self, results: &[(String, ValidationResult)]) -> String;

    /// Format the platform health summary
    fn format_health(&self, summary: &PlatformHealthSummary) -> String;

    /// Format a single analyzer's readiness
    fn format_analyzer_validation(&self, platform: &str, validation: &AnalyzerValidation) -> String;

    /// Format the platform table
    fn format_platforms(&self, platforms: &[PlatformInfo]) -> String;
}

/// Pick a formatter by name
pub fn formatter_for(format: &str) -> Option<Box<dyn OutputFormatter>> {
    match format.to_lowercase().as_str() {
        "pretty" | "text" => Some(Box::new(PrettyFormatter::new())),
        "json" => Some(Box::new(JsonFormatter)),
        _ => None,
    }
}

/// Colored, human-readable output
#[derive(Clone, Default)]
pub struct PrettyFormatter;

impl PrettyFormatter {
    pub fn new() -> Self {
        Self
    }

    fn severity_label(severity: Severity) -> String {
        let label = format!("{:<13}", severity.to_string().to_uppercase())
            .color(severity.color_name());
        if severity >= Severity::High {
            label.bold().to_string()
        } else {
            label.to_string()
        }
    }

    fn status_label(status: HealthStatus) -> String {
        let label = format!("{:<9}", status.to_string());
        match status {
            HealthStatus::Healthy => label.green().to_string(),
            HealthStatus::Degraded => label.yellow().to_string(),
            HealthStatus::Unhealthy => label.red().to_string(),
            HealthStatus::Unknown => label.dimmed().to_string(),
        }
    }
}

impl OutputFormatter for PrettyFormatter {
    fn format_analysis(&self, platform: &str, result: &AnalysisResult) -> String {
        let mut output = String::new();

        let status = if result.success {
            "completed".green().bold()
        } else {
            "incomplete".red().bold()
        };
        output.push_str(&format!(
            "{} analysis {} in {:.2}s\n\n",
            platform.bold(),
            status,
            result.execution_time.as_secs_f64()
        ));

        let mut findings: Vec<_> = result.vulnerabilities.iter().collect();
        findings.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.location.file.cmp(&b.location.file))
                .then_with(|| a.location.line.cmp(&b.location.line))
        });

        for finding in &findings {
            output.push_str(&format!(
                "{} {} {}\n",
                Self::severity_label(finding.severity),
                finding.title.bold(),
                format!("[{}, {}]", finding.vuln_type, finding.source).dimmed()
            ));
            output.push_str(&format!(
                "              {}:{}:{}  confidence {:.2}\n",
                finding.location.file,
                finding.location.line,
                finding.location.column,
                finding.confidence
            ));
            if !finding.recommendation.is_empty() {
                output.push_str(&format!("              {}\n", finding.recommendation.italic()));
            }
            output.push('\n');
        }

        for error in &result.errors {
            output.push_str(&format!("{} {}\n", "error:".red().bold(), error));
        }
        for warning in &result.warnings {
            output.push_str(&format!("{} {}\n", "warning:".yellow().bold(), warning));
        }
        if let Some(mode) = result.meta("fallback").and_then(|v| v.as_str()) {
            output.push_str(&format!("{} {}\n", "fallback:".magenta().bold(), mode));
        }

        let count = |severity: Severity| findings.iter().filter(|v| v.severity == severity).count();
        output.push_str(&format!(
            "\n{} finding(s): {} critical, {} high, {} medium, {} low, {} informational\n",
            findings.len(),
            count(Severity::Critical),
            count(Severity::High),
            count(Severity::Medium),
            count(Severity::Low),
            count(Severity::Informational)
        ));

        output
    }

    fn format_validation(&self, results: &[(String, ValidationResult)]) -> String {
        let mut output = String::new();
        for (file, result) in results {
            let mark = if result.is_valid {
                "✓".green()
            } else {
                "✗".red()
            };
            output.push_str(&format!("{} {}\n", mark, file.bold()));
            for error in &result.errors {
                output.push_str(&format!("    {} {}\n", "error:".red(), error));
            }
            for warning in &result.warnings {
                output.push_str(&format!("    {} {}\n", "warning:".yellow(), warning));
            }
        }
        output
    }

    fn format_health(&self, summary: &PlatformHealthSummary) -> String {
        let mut output = String::new();
        for platform in &summary.platforms {
            output.push_str(&format!(
                "{:<10} {} {}\n",
                platform.platform,
                Self::status_label(platform.status),
                platform
                    .version
                    .as_deref()
                    .or(platform.error.as_deref())
                    .unwrap_or("")
                    .dimmed()
            ));
        }
        output.push_str(&format!(
            "\n{} platform(s): {} healthy, {} degraded, {} unhealthy, {} unknown\n",
            summary.total, summary.healthy, summary.degraded, summary.unhealthy, summary.unknown
        ));
        output
    }

    fn format_analyzer_validation(
        &self,
        platform: &str,
        validation: &AnalyzerValidation,
    ) -> String {
        let mut output = if validation.valid {
            format!("{} {} is ready\n", "✓".green(), platform.bold())
        } else {
            format!("{} {} is not ready\n", "✗".red(), platform.bold())
        };
        for issue in &validation.issues {
            output.push_str(&format!("    {} {}\n", "issue:".red(), issue));
        }
        for recommendation in &validation.recommendations {
            output.push_str(&format!("    {} {}\n", "hint:".cyan(), recommendation));
        }
        output
    }

    fn format_platforms(&self, platforms: &[PlatformInfo]) -> String {
        let mut output = String::new();
        for platform in platforms {
            let state = if !platform.is_active {
                "inactive".dimmed()
            } else if !platform.family.is_implemented() {
                "planned".yellow()
            } else {
                "active".green()
            };
            output.push_str(&format!(
                "{:<10} {:<18} {:<9} .{:<12} {}\n",
                platform.id,
                platform.name,
                state,
                platform.file_extensions.join(", ."),
                platform.static_tool.as_deref().unwrap_or("-").dimmed()
            ));
        }
        output
    }
}

/// Machine-readable output
#[derive(Clone, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    fn render<T: Serialize + ?Sized>(value: &T) -> String {
        serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize output: {}\"}}", e))
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_analysis(&self, _platform: &str, result: &AnalysisResult) -> String {
        Self::render(result)
    }

    fn format_validation(&self, results: &[(String, ValidationResult)]) -> String {
        let map: serde_json::Map<String, serde_json::Value> = results
            .iter()
            .map(|(file, result)| {
                (
                    file.clone(),
                    serde_json::to_value(result).unwrap_or_default(),
                )
            })
            .collect();
        Self::render(&map)
    }

    fn format_health(&self, summary: &PlatformHealthSummary) -> String {
        Self::render(summary)
    }

    fn format_analyzer_validation(
        &self,
        _platform: &str,
        validation: &AnalyzerValidation,
    ) -> String {
        Self::render(validation)
    }

    fn format_platforms(&self, platforms: &[PlatformInfo]) -> String {
        Self::render(platforms)
    }
}

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Health status of one platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Static tool installed with a recognised version
    Healthy,

    /// Static tool missing, AI-only analysis still possible
    Degraded,

    /// Static tool missing and no AI configured
    Unhealthy,

    /// No implementation, or the check did not complete
    Unknown,
}

/// Health of a single platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformHealth {
    pub platform: String,
    pub name: String,
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: String,
}

/// Aggregate health across every known platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformHealthSummary {
    pub total: usize,
    pub healthy: usize,
    pub degraded: usize,
    pub unhealthy: usize,
    pub unknown: usize,
    pub platforms: Vec<PlatformHealth>,
}

impl PlatformHealthSummary {
    /// Build the counters from per-platform entries
    pub fn from_platforms(platforms: Vec<PlatformHealth>) -> Self {
        let count = |status: HealthStatus| platforms.iter().filter(|p| p.status == status).count();
        Self {
            total: platforms.len(),
            healthy: count(HealthStatus::Healthy),
            degraded: count(HealthStatus::Degraded),
            unhealthy: count(HealthStatus::Unhealthy),
            unknown: count(HealthStatus::Unknown),
            platforms,
        }
    }
}

/// Composite readiness report for one analyzer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerValidation {
    pub valid: bool,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

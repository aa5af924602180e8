//! Retry and degradation policy around `analyze`
//!
//! ```text
//! Static --ok--------------------------------------------> Done
//! Static --transient, attempts left--> Retry --> Static
//! Static --exhausted or terminal--> AiFallback --ok------> Done
//! AiFallback --failed--> BasicValidation ----------------> Done
//! ```

use std::time::{Duration, Instant};

use log::{info, warn};
use strum_macros::Display;

use crate::analyzers::PlatformAnalyzer;
use crate::config::FallbackConfig;
use crate::errors::{ErrorCode, PlatformError};
use crate::models::{AnalysisResult, ContractInput};

/// Stages of the fallback state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FallbackStage {
    Static,
    Retry,
    AiFallback,
    BasicValidation,
    Done,
}

/// Whether an error is worth retrying.
///
/// Timeouts and execution failures may clear up on their own; a missing
/// tool or an unavailable analyzer will not.
pub fn is_transient(error: &PlatformError) -> bool {
    matches!(
        error.code,
        ErrorCode::ToolExecutionTimeout | ErrorCode::ToolExecutionFailed
    )
}

/// Wraps an analyzer's `analyze` with retries and fallbacks
#[derive(Debug, Clone, Default)]
pub struct FallbackService {
    config: FallbackConfig,
}

impl FallbackService {
    pub fn new(config: FallbackConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FallbackConfig {
        &self.config
    }

    /// Delay before the given retry, growing linearly
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.config.retry_delay_ms.saturating_mul(u64::from(attempt)))
    }

    fn transition(
        &self,
        platform: &str,
        from: FallbackStage,
        to: FallbackStage,
        error: &PlatformError,
    ) {
        warn!("{}: {} -> {} after {}", platform, from, to, error);
    }

    /// Analyze, retrying transient failures and degrading when they persist.
    ///
    /// Always returns a well-formed result; a degraded one has
    /// `platformSpecific.fallback` set and explains itself in `warnings`.
    pub async fn analyze(
        &self,
        analyzer: &dyn PlatformAnalyzer,
        contracts: &[ContractInput],
    ) -> AnalysisResult {
        let platform = analyzer.platform().id.clone();
        let start = Instant::now();
        let max_attempts = self.config.max_retries.max(1);
        let mut attempt = 1;

        let cause = loop {
            match analyzer.analyze(contracts).await {
                Ok(mut result) => {
                    if attempt > 1 {
                        info!("{}: static analysis succeeded on attempt {}", platform, attempt);
                        result.set_meta("attempts", attempt);
                    }
                    return result;
                }
                Err(err) if is_transient(&err) && attempt < max_attempts => {
                    self.transition(&platform, FallbackStage::Static, FallbackStage::Retry, &err);
                    let delay = self.retry_delay(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(err) => break err,
            }
        };

        if self.config.enable_ai_fallback {
            self.transition(&platform, FallbackStage::Static, FallbackStage::AiFallback, &cause);
            match analyzer.analyze_ai_only(contracts).await {
                Ok(mut result) => {
                    result.warnings.push(format!(
                        "Static analysis failed, results are from AI analysis only: {}",
                        cause
                    ));
                    result.set_meta("fallback", "ai_only");
                    result.set_meta("fallback_cause", cause.code.to_string());
                    result.set_meta("attempts", attempt);
                    result.execution_time = start.elapsed();
                    self.log_done(&platform, FallbackStage::AiFallback);
                    return result;
                }
                Err(err) => {
                    self.transition(
                        &platform,
                        FallbackStage::AiFallback,
                        FallbackStage::BasicValidation,
                        &err,
                    );
                }
            }
        }

        if self.config.enable_basic_validation {
            let mut result = basic_validation(analyzer, contracts, &cause);
            result.set_meta("attempts", attempt);
            result.execution_time = start.elapsed();
            self.log_done(&platform, FallbackStage::BasicValidation);
            return result;
        }

        warn!("{}: every fallback is disabled, reporting {}", platform, cause);
        let mut result = AnalysisResult::failed(vec![cause.to_string()]);
        result.set_meta("fallback_cause", cause.code.to_string());
        result.set_meta("attempts", attempt);
        result.execution_time = start.elapsed();
        result
    }

    fn log_done(&self, platform: &str, from: FallbackStage) {
        info!("{}: {} -> {}", platform, from, FallbackStage::Done);
    }
}

/// Local checks only, so a broken tool is not invoked again
fn basic_validation(
    analyzer: &dyn PlatformAnalyzer,
    contracts: &[ContractInput],
    cause: &PlatformError,
) -> AnalysisResult {
    let validation = analyzer.base().validate_inputs(contracts);

    let mut errors = vec![cause.to_string()];
    errors.extend(validation.errors);

    let mut warnings = validation.warnings;
    warnings.push(
        "Static and AI analysis unavailable - only basic validation was performed".to_string(),
    );

    let mut result = AnalysisResult {
        success: false,
        errors,
        warnings,
        ..Default::default()
    };
    result.set_meta("fallback", "basic_validation");
    result.set_meta("fallback_cause", cause.code.to_string());
    result
}

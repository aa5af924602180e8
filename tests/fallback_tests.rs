mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

use argus::analyzers::SolidityAnalyzer;
use argus::config::{ArgusConfig, FallbackConfig};
use argus::errors::{ErrorCode, PlatformError};
use argus::fallback::{is_transient, FallbackService};
use argus::models::{ContractInput, VulnerabilitySource};
use argus::platforms::PlatformRegistry;

use common::{
    context, ensemble, fast_config, model_answer, MockCompletionClient, MockInvoker, MockResponse,
};

const VAULT: &str = "contract Vault {\n    uint256 public total;\n}\n";

fn vault() -> Vec<ContractInput> {
    vec![ContractInput::new("Vault.sol", VAULT, "ethereum")]
}

fn analyzer(
    config: ArgusConfig,
    invoker: &Arc<MockInvoker>,
    ai: Option<MockCompletionClient>,
) -> SolidityAnalyzer {
    let ai = ai.map(|client| ensemble(client, &["model-a"], 0.6));
    let platform = PlatformRegistry::default().get("ethereum").cloned().unwrap();
    SolidityAnalyzer::new(platform, &context(config, invoker.clone(), ai))
}

fn answering_model() -> MockCompletionClient {
    MockCompletionClient::new().answer(
        "model-a",
        model_answer(&[("access_control", 2, "high", 0.9)], 0.8),
    )
}

#[rstest]
#[case(PlatformError::timeout("ethereum", "slither", Duration::from_secs(1), &[]), true)]
#[case(PlatformError::execution_failed("ethereum", "slither", "boom"), true)]
#[case(PlatformError::installation_missing("ethereum", "slither"), false)]
#[case(PlatformError::unavailable("tezos", "inactive"), false)]
fn test_transient_errors(#[case] error: PlatformError, #[case] expected: bool) {
    assert_eq!(is_transient(&error), expected);
}

#[test]
fn test_retry_delay_grows_linearly() {
    let service = FallbackService::default();
    assert_eq!(service.retry_delay(1), Duration::from_millis(1000));
    assert_eq!(service.retry_delay(3), Duration::from_millis(3000));

    let service = FallbackService::new(FallbackConfig {
        retry_delay_ms: 0,
        ..Default::default()
    });
    assert!(service.retry_delay(5).is_zero());
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let invoker = Arc::new(
        MockInvoker::new()
            .then(MockResponse::Failed("resource temporarily unavailable".into()))
            .always(MockResponse::stdout("", 0)),
    );
    let mut config = fast_config();
    config.general.enable_ai = false;
    let analyzer = analyzer(config.clone(), &invoker, None);

    let result = FallbackService::new(config.fallback)
        .analyze(&analyzer, &vault())
        .await;

    assert!(result.success);
    assert_eq!(invoker.call_count(), 2);
    assert_eq!(result.meta("attempts"), Some(&json!(2)));
    assert_eq!(result.meta("fallback"), None);
}

#[tokio::test]
async fn test_exhausted_retries_fall_back_to_ai() {
    let invoker = Arc::new(MockInvoker::new().always(MockResponse::Failed("segfault".into())));
    let config = fast_config();
    let analyzer = analyzer(config.clone(), &invoker, Some(answering_model()));

    let result = FallbackService::new(config.fallback)
        .analyze(&analyzer, &vault())
        .await;

    assert_eq!(invoker.call_count(), 3);
    assert!(result.success);
    assert_eq!(result.meta("fallback"), Some(&json!("ai_only")));
    assert_eq!(result.meta("fallback_cause"), Some(&json!("TOOL_EXECUTION_FAILED")));
    assert_eq!(result.meta("attempts"), Some(&json!(3)));
    assert_eq!(result.vulnerabilities.len(), 1);
    assert_eq!(result.vulnerabilities[0].source, VulnerabilitySource::Ai);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.starts_with("Static analysis failed, results are from AI analysis only")));
}

#[tokio::test]
async fn test_missing_tool_is_not_retried() {
    let invoker = Arc::new(MockInvoker::new().missing());
    let config = fast_config();
    let analyzer = analyzer(config.clone(), &invoker, Some(answering_model()));

    let result = FallbackService::new(config.fallback)
        .analyze(&analyzer, &vault())
        .await;

    assert_eq!(invoker.call_count(), 1);
    assert_eq!(result.meta("fallback"), Some(&json!("ai_only")));
    assert_eq!(
        result.meta("fallback_cause"),
        Some(&json!("TOOL_INSTALLATION_MISSING"))
    );
    assert_eq!(result.meta("attempts"), Some(&json!(1)));
}

#[tokio::test]
async fn test_basic_validation_when_ai_also_fails() {
    let invoker = Arc::new(MockInvoker::new().missing());
    let config = fast_config();
    let analyzer = analyzer(
        config.clone(),
        &invoker,
        Some(MockCompletionClient::new().fail("model-a")),
    );

    let result = FallbackService::new(config.fallback)
        .analyze(&analyzer, &vault())
        .await;

    assert!(!result.success);
    assert!(result.vulnerabilities.is_empty());
    assert_eq!(result.meta("fallback"), Some(&json!("basic_validation")));
    assert!(result.errors[0].contains("not installed"));
    assert!(result.warnings.iter().any(|w| w
        == "Static and AI analysis unavailable - only basic validation was performed"));
    assert_eq!(invoker.call_count(), 1);
}

#[tokio::test]
async fn test_basic_validation_without_ai() {
    let invoker = Arc::new(MockInvoker::new().always(MockResponse::Failed("crash".into())));
    let mut config = fast_config();
    config.fallback.max_retries = 2;
    let analyzer = analyzer(config.clone(), &invoker, None);

    let result = FallbackService::new(config.fallback)
        .analyze(&analyzer, &vault())
        .await;

    assert_eq!(invoker.call_count(), 2);
    assert!(!result.success);
    assert_eq!(result.meta("fallback"), Some(&json!("basic_validation")));
    assert_eq!(result.meta("attempts"), Some(&json!(2)));
}

#[tokio::test]
async fn test_disabled_fallbacks_report_the_cause() {
    let invoker = Arc::new(MockInvoker::new().missing());
    let mut config = fast_config();
    config.fallback.enable_ai_fallback = false;
    config.fallback.enable_basic_validation = false;
    let analyzer = analyzer(config.clone(), &invoker, Some(answering_model()));

    let result = FallbackService::new(config.fallback)
        .analyze(&analyzer, &vault())
        .await;

    assert!(!result.success);
    assert_eq!(
        result.errors,
        vec![
            "[TOOL_INSTALLATION_MISSING] ethereum: Tool 'slither' is not installed or not on PATH"
                .to_string()
        ]
    );
    assert_eq!(result.meta("fallback"), None);
    assert_eq!(
        result.meta("fallback_cause"),
        Some(&json!("TOOL_INSTALLATION_MISSING"))
    );
}

#[tokio::test]
async fn test_invalid_input_skips_the_fallback_chain() {
    let invoker = Arc::new(MockInvoker::new());
    let config = fast_config();
    let analyzer = analyzer(config.clone(), &invoker, Some(answering_model()));

    let result = FallbackService::new(config.fallback)
        .analyze(&analyzer, &[ContractInput::new("Vault.sol", "", "ethereum")])
        .await;

    assert!(!result.success);
    assert_eq!(invoker.call_count(), 0);
    assert_eq!(result.meta("fallback"), None);
}

#[test]
fn test_error_codes_serialize_screaming_snake_case() {
    let error = PlatformError::installation_missing("cardano", "aiken");
    let value = serde_json::to_value(&error).unwrap();

    assert_eq!(value["code"], "TOOL_INSTALLATION_MISSING");
    assert_eq!(value["platform"], "cardano");
    assert_eq!(value["context"]["tool"], "aiken");
    assert_eq!(ErrorCode::AnalyzerUnavailable.to_string(), "ANALYZER_UNAVAILABLE");
}

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use rstest::rstest;

use argus::analyzers::{PlatformAnalyzer, SolidityAnalyzer};
use argus::errors::{ErrorCode, ToolError};
use argus::invoker::{
    extract_version, run_with_timeout, ProcessInvoker, ToolInvocation, ToolInvoker,
};
use argus::platforms::PlatformRegistry;

use common::{context, fast_config, MockInvoker, MockResponse};

#[tokio::test]
async fn test_timeout_wins_against_slow_tool() {
    let invoker = MockInvoker::new().slow(Duration::from_secs(10));
    let invocation = ToolInvocation::new("slither", Duration::from_millis(1));

    let start = Instant::now();
    let result = run_with_timeout(
        "slither",
        Duration::from_millis(1),
        invoker.invoke(invocation),
    )
    .await;

    assert!(start.elapsed() < Duration::from_millis(100));
    match result {
        Err(ToolError::Timeout { name, timeout }) => {
            assert_eq!(name, "slither");
            assert_eq!(timeout, Duration::from_millis(1));
        }
        other => panic!("expected timeout, got {:?}", other.map(|o| o.exit_code)),
    }
}

#[tokio::test]
async fn test_analyzer_invocation_timeout_is_a_platform_error() {
    let invoker = Arc::new(MockInvoker::new().slow(Duration::from_secs(10)));
    let ctx = context(fast_config(), invoker.clone(), None);
    let platform = PlatformRegistry::default().get("ethereum").cloned().unwrap();
    let analyzer = SolidityAnalyzer::new(platform, &ctx);

    let start = Instant::now();
    let err = analyzer
        .base()
        .invoke(
            ToolInvocation::new("slither", Duration::from_millis(1)),
            &["Vault.sol".to_string()],
        )
        .await
        .unwrap_err();

    assert!(start.elapsed() < Duration::from_millis(100));
    assert_eq!(err.code, ErrorCode::ToolExecutionTimeout);
    assert_eq!(err.platform, "ethereum");
    assert_eq!(err.context["timeout_ms"], 1);
    assert_eq!(err.context["contracts"], serde_json::json!(["Vault.sol"]));
}

#[tokio::test]
async fn test_missing_tool_maps_to_installation_missing() {
    let invoker = Arc::new(MockInvoker::new().missing());
    let ctx = context(fast_config(), invoker, None);
    let platform = PlatformRegistry::default().get("ethereum").cloned().unwrap();
    let analyzer = SolidityAnalyzer::new(platform, &ctx);

    let err = analyzer
        .base()
        .invoke(analyzer.base().tool_invocation(), &[])
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::ToolInstallationMissing);
    assert_eq!(err.context["tool"], "slither");
}

#[tokio::test]
async fn test_execution_failure_keeps_contract_names() {
    let invoker =
        Arc::new(MockInvoker::new().always(MockResponse::Failed("permission denied".into())));
    let ctx = context(fast_config(), invoker, None);
    let platform = PlatformRegistry::default().get("ethereum").cloned().unwrap();
    let analyzer = SolidityAnalyzer::new(platform, &ctx);

    let err = analyzer
        .base()
        .invoke(analyzer.base().tool_invocation(), &["A.sol".to_string()])
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::ToolExecutionFailed);
    assert!(err.message.contains("permission denied"));
    assert_eq!(err.context["contracts"], serde_json::json!(["A.sol"]));
}

#[tokio::test]
async fn test_process_invoker_reports_missing_program() {
    let invoker = ProcessInvoker::new();
    let invocation = ToolInvocation::new("argus-no-such-tool-xyz", Duration::from_secs(5));

    match invoker.invoke(invocation).await {
        Err(ToolError::NotFound(name)) => assert_eq!(name, "argus-no-such-tool-xyz"),
        other => panic!("expected NotFound, got {:?}", other.map(|o| o.exit_code)),
    }
    assert!(!invoker.is_installed("argus-no-such-tool-xyz"));
}

#[rstest]
#[case("0.10.4", Some("0.10.4"))]
#[case("aiken v1.1.2+0f5c3b0", Some("1.1.2+0f5c3b0"))]
#[case("sui 1.30.1-a6b2cb0", Some("1.30.1-a6b2cb0"))]
#[case("aptos 4.2.0", Some("4.2.0"))]
#[case("command not found", None)]
fn test_extract_version(#[case] output: &str, #[case] expected: Option<&str>) {
    assert_eq!(extract_version(output).as_deref(), expected);
}

#[test]
fn test_invocation_builder() {
    let invocation = ToolInvocation::new("aiken", Duration::from_secs(3))
        .arg("check")
        .args(["--skip-tests"])
        .current_dir("/tmp/project")
        .env("NO_COLOR", "1");

    assert_eq!(invocation.args, vec!["check", "--skip-tests"]);
    assert_eq!(
        invocation.working_dir.as_deref(),
        Some(std::path::Path::new("/tmp/project"))
    );
    assert_eq!(invocation.env.get("NO_COLOR").map(String::as_str), Some("1"));
    assert!(invocation.display().starts_with("aiken check --skip-tests"));
}

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use rstest::rstest;

use argus::analyzers::PlatformAnalyzer;
use argus::config::PlatformToolConfig;
use argus::errors::ErrorCode;
use argus::models::{HealthStatus, PlatformFamily, PlatformInfo};
use argus::platforms::PlatformRegistry;
use argus::registry::AnalyzerFactory;

use common::{context, ensemble, fast_config, MockCompletionClient, MockInvoker, MockResponse};

const IMPLEMENTED: &[&str] = &["aptos", "arbitrum", "bsc", "cardano", "ethereum", "polygon", "sui"];

fn factory(invoker: MockInvoker, with_ai: bool) -> AnalyzerFactory {
    let ai = with_ai.then(|| ensemble(MockCompletionClient::new(), &["model-a"], 0.6));
    AnalyzerFactory::new(
        PlatformRegistry::default(),
        context(fast_config(), Arc::new(invoker), ai),
    )
}

#[test]
fn test_default_platform_table() {
    let registry = PlatformRegistry::default();

    assert_eq!(registry.all().len(), 9);
    assert_eq!(registry.get("Ethereum").map(|p| p.family), Some(PlatformFamily::Evm));
    assert_eq!(registry.get(" sui ").map(|p| p.id.as_str()), Some("sui"));
    assert!(!registry.get("tezos").unwrap().is_active);
    assert_eq!(registry.implemented().count(), 7);
}

#[test]
fn test_register_replaces_existing_entry() {
    let mut registry = PlatformRegistry::new();
    for name in ["Evmos", "Evmos 2"] {
        registry.register(PlatformInfo::new(
            "evmos",
            name,
            PlatformFamily::Evm,
            "solidity",
            &["sol"],
            None,
        ));
    }

    assert_eq!(registry.all().len(), 1);
    assert_eq!(registry.get("evmos").unwrap().name, "Evmos 2");
}

#[test]
fn test_supported_platforms_exclude_planned_and_disabled() {
    let mut config = fast_config();
    config.platforms.insert(
        "bsc".to_string(),
        PlatformToolConfig {
            enabled: false,
            ..Default::default()
        },
    );
    let factory = AnalyzerFactory::new(
        PlatformRegistry::default(),
        context(config, Arc::new(MockInvoker::new()), None),
    );

    let mut supported = factory.supported_platforms();
    supported.sort();
    assert_eq!(
        supported,
        vec!["aptos", "arbitrum", "cardano", "ethereum", "polygon", "sui"]
    );
}

#[rstest]
#[case("near", None)]
#[case("tezos", Some("active"))]
#[case("solana", Some("implemented"))]
fn test_unusable_platforms_are_unavailable(#[case] id: &str, #[case] context_key: Option<&str>) {
    let factory = factory(MockInvoker::new(), false);

    let err = match factory.get_analyzer(id) {
        Ok(_) => panic!("{} should not have an analyzer", id),
        Err(err) => err,
    };

    assert_eq!(err.code, ErrorCode::AnalyzerUnavailable);
    assert_eq!(err.platform, id);
    if let Some(key) = context_key {
        assert_eq!(err.context.get(key), Some(&serde_json::Value::Bool(false)));
    }
    assert_eq!(factory.cached_count(), 0);
}

#[test]
fn test_disabled_platform_is_unavailable() {
    let mut config = fast_config();
    config.platforms.insert(
        "cardano".to_string(),
        PlatformToolConfig {
            enabled: false,
            ..Default::default()
        },
    );
    let factory = AnalyzerFactory::new(
        PlatformRegistry::default(),
        context(config, Arc::new(MockInvoker::new()), None),
    );

    let err = factory.get_analyzer("cardano").err().unwrap();
    assert_eq!(err.code, ErrorCode::AnalyzerUnavailable);
    assert!(err.message.contains("disabled"));
}

#[test]
fn test_analyzers_are_cached() {
    let factory = factory(MockInvoker::new(), false);

    let first = factory.get_analyzer("ethereum").unwrap();
    let second = factory.get_analyzer("ETHEREUM").unwrap();

    assert!(std::ptr::addr_eq(Arc::as_ptr(&first), Arc::as_ptr(&second)));
    assert_eq!(factory.cached_count(), 1);
    assert_eq!(first.platform().id, "ethereum");
    assert_eq!(first.base().tool, "slither");

    factory.get_analyzer("sui").unwrap();
    assert_eq!(factory.cached_count(), 2);
}

#[test]
fn test_cache_can_be_cleared() {
    let factory = factory(MockInvoker::new(), false);
    let first = factory.get_analyzer("cardano").unwrap();
    factory.get_analyzer("aptos").unwrap();

    assert!(factory.remove_analyzer("cardano"));
    assert!(!factory.remove_analyzer("cardano"));
    assert_eq!(factory.cached_count(), 1);

    let rebuilt = factory.get_analyzer("cardano").unwrap();
    assert!(!std::ptr::addr_eq(Arc::as_ptr(&first), Arc::as_ptr(&rebuilt)));

    factory.clear_cache();
    assert_eq!(factory.cached_count(), 0);
}

#[tokio::test]
async fn test_health_of_every_analyzer() {
    let factory = factory(
        MockInvoker::new().always(MockResponse::stdout("tool 1.2.3", 0)),
        false,
    );

    let health = factory.check_all_analyzers_health().await;

    assert_eq!(health.keys().map(String::as_str).collect::<Vec<_>>(), IMPLEMENTED);
    assert!(health.values().all(|h| h.installed));
    assert_eq!(health["cardano"].version.as_deref(), Some("1.2.3"));
}

#[tokio::test]
async fn test_hanging_tools_do_not_stall_health_checks() {
    let mut config = fast_config();
    config.general.health_check_timeout_secs = 1;
    let invoker = MockInvoker::new().slow(Duration::from_secs(30));
    let factory = AnalyzerFactory::new(
        PlatformRegistry::default(),
        context(config, Arc::new(invoker), None),
    );

    let start = Instant::now();
    let health = factory.check_all_analyzers_health().await;

    // checks run concurrently, each bounded by twice the health timeout
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(health.len(), IMPLEMENTED.len());
    assert!(health.values().all(|h| !h.installed && h.error.is_some()));
}

#[tokio::test]
async fn test_health_summary_when_tools_are_missing() {
    let summary = factory(MockInvoker::new().missing(), true)
        .get_platform_health_summary()
        .await;

    // tezos is inactive and left out
    assert_eq!(summary.total, 8);
    assert_eq!(summary.degraded, 7);
    assert_eq!(summary.unknown, 1);
    assert_eq!(summary.healthy, 0);

    let solana = summary.platforms.iter().find(|p| p.platform == "solana").unwrap();
    assert_eq!(solana.status, HealthStatus::Unknown);
    assert!(solana.error.is_some());
    assert!(!solana.checked_at.is_empty());

    let summary = factory(MockInvoker::new().missing(), false)
        .get_platform_health_summary()
        .await;
    assert_eq!(summary.unhealthy, 7);
    assert_eq!(summary.degraded, 0);
}

#[tokio::test]
async fn test_health_summary_when_tools_are_installed() {
    let summary = factory(
        MockInvoker::new().always(MockResponse::stdout("aiken v1.1.2", 0)),
        false,
    )
    .get_platform_health_summary()
    .await;

    assert_eq!(summary.healthy, 7);
    let cardano = summary.platforms.iter().find(|p| p.platform == "cardano").unwrap();
    assert_eq!(cardano.status, HealthStatus::Healthy);
    assert_eq!(cardano.version.as_deref(), Some("1.1.2"));
}

#[tokio::test]
async fn test_validate_unknown_platform() {
    let validation = factory(MockInvoker::new(), false)
        .validate_analyzer("near")
        .await;

    assert!(!validation.valid);
    assert_eq!(validation.issues, vec!["Platform 'near' is not registered".to_string()]);
    assert!(validation.recommendations[0].contains("ethereum"));
}

#[tokio::test]
async fn test_validate_planned_platform() {
    let validation = factory(MockInvoker::new(), false)
        .validate_analyzer("solana")
        .await;

    assert!(!validation.valid);
    assert!(validation.issues[0].contains("No analyzer is implemented"));
}

#[tokio::test]
async fn test_validate_platform_with_missing_tool() {
    let validation = factory(MockInvoker::new().missing(), true)
        .validate_analyzer("ethereum")
        .await;

    assert!(!validation.valid);
    assert!(validation.issues[0].starts_with("slither is not available"));
    assert!(validation.recommendations[0].contains("pip3 install slither-analyzer"));
    assert!(validation.recommendations[1].starts_with("AI-only analysis remains available"));
}

#[tokio::test]
async fn test_validate_ready_platform() {
    let validation = factory(
        MockInvoker::new().always(MockResponse::stdout("sui 1.30.1", 0)),
        false,
    )
    .validate_analyzer("sui")
    .await;

    assert!(validation.valid);
    assert!(validation.issues.is_empty());
}

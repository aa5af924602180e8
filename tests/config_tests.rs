mod common;

use std::fs::{self, File};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

use argus::analyzers::{PlatformAnalyzer, SolidityAnalyzer};
use argus::config::{ArgusConfig, ConfigProvider, TomlConfigProvider, DEFAULT_MAX_FILE_SIZE};
use argus::errors::ConfigError;
use argus::models::ContractInput;
use argus::platforms::PlatformRegistry;

use common::{context, MockInvoker};

/// Creates a temporary directory holding `.argus.toml` with the given content
fn create_temp_config(content: &str) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join(".argus.toml");

    let mut file = File::create(&config_path).expect("Failed to create config file");
    file.write_all(content.as_bytes())
        .expect("Failed to write config content");

    temp_dir
}

#[test]
fn test_default_config() {
    let config = ArgusConfig::default();

    assert_eq!(config.general.max_file_size, DEFAULT_MAX_FILE_SIZE);
    assert_eq!(config.general.tool_timeout(), Duration::from_secs(300));
    assert_eq!(config.general.health_check_timeout(), Duration::from_secs(5));
    assert!(config.general.enable_ai);

    assert_eq!(config.ai.models.len(), 2);
    assert_eq!(config.ai.ensemble_threshold, 0.6);
    assert_eq!(config.ai.max_tokens, 4000);

    assert_eq!(config.fallback.max_retries, 3);
    assert_eq!(config.fallback.retry_delay_ms, 1000);
    assert!(config.fallback.enable_ai_fallback);
    assert!(config.fallback.enable_basic_validation);

    assert!(config.platforms.is_empty());
    assert!(config.platform("ethereum").enabled);
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_toml_config() {
    let temp_dir = create_temp_config(
        r#"
    [general]
    tool_timeout_secs = 60
    enable_ai = false

    [ai]
    models = ["claude", "gpt-4o", "gemini"]
    ensemble_threshold = 0.5

    [fallback]
    max_retries = 5
    enable_basic_validation = false

    [platforms.ethereum]
    executable_path = "/opt/slither/bin/slither"
    extra_args = ["--exclude-informational"]
    timeout_secs = 42

    [platforms.sui]
    enabled = false
    "#,
    );

    let config = TomlConfigProvider::new()
        .load_config(temp_dir.path())
        .expect("Failed to load config");

    assert_eq!(config.general.tool_timeout_secs, 60);
    assert!(!config.general.enable_ai);
    assert_eq!(config.general.max_file_size, DEFAULT_MAX_FILE_SIZE);
    assert_eq!(config.ai.models, vec!["claude", "gpt-4o", "gemini"]);
    assert_eq!(config.ai.ensemble_threshold, 0.5);
    assert_eq!(config.fallback.max_retries, 5);
    assert_eq!(config.fallback.retry_delay_ms, 1000);
    assert!(!config.fallback.enable_basic_validation);

    let ethereum = config.platform("ethereum");
    assert_eq!(ethereum.executable_path.as_deref(), Some("/opt/slither/bin/slither"));
    assert_eq!(ethereum.extra_args, vec!["--exclude-informational"]);
    assert_eq!(ethereum.timeout_secs, Some(42));
    assert!(ethereum.enabled);
    assert!(!config.platform("sui").enabled);
}

#[test]
fn test_config_found_in_parent_directory() {
    let temp_dir = create_temp_config("[fallback]\nmax_retries = 7\n");
    let nested = temp_dir.path().join("contracts").join("tokens");
    fs::create_dir_all(&nested).unwrap();

    let config = TomlConfigProvider::new().load_config(&nested).unwrap();

    assert_eq!(config.fallback.max_retries, 7);
}

#[test]
fn test_plain_argus_toml_is_found() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("argus.toml"), "[general]\nmax_file_size = 2048\n").unwrap();

    let config = TomlConfigProvider::new().load_config(temp_dir.path()).unwrap();

    assert_eq!(config.general.max_file_size, 2048);
}

#[test]
fn test_explicit_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ci.toml");
    fs::write(&path, "[ai]\nmodels = [\"only-one\"]\n").unwrap();

    let config = TomlConfigProvider::new()
        .with_config_file(path)
        .load_config(temp_dir.path())
        .unwrap();

    assert_eq!(config.ai.models, vec!["only-one"]);
}

#[test]
fn test_missing_explicit_file_is_a_load_error() {
    let temp_dir = TempDir::new().unwrap();

    let err = TomlConfigProvider::new()
        .with_config_file(temp_dir.path().join("nope.toml"))
        .load_config(temp_dir.path())
        .unwrap_err();

    assert!(matches!(err, ConfigError::LoadError { .. }));
}

#[test]
fn test_malformed_config_is_rejected() {
    let temp_dir = create_temp_config("[general\nmax_file_size = ");

    let err = TomlConfigProvider::new()
        .load_config(temp_dir.path())
        .unwrap_err();

    assert!(matches!(err, ConfigError::Toml(_)));
}

#[test]
fn test_out_of_range_values_are_rejected() {
    let temp_dir = create_temp_config("[ai]\nensemble_threshold = 0.0\n");

    match TomlConfigProvider::new().load_config(temp_dir.path()) {
        Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "ai.ensemble_threshold"),
        other => panic!("expected invalid value, got {:?}", other),
    }

    let mut config = ArgusConfig::default();
    config.ai.models.clear();
    assert!(config.validate().is_err());

    let mut config = ArgusConfig::default();
    config.general.max_file_size = 0;
    assert!(config.validate().is_err());
}

#[rstest]
#[case("[general]\ntool_timeout_secs = 0\n", "general.tool_timeout_secs")]
#[case("[general]\nhealth_check_timeout_secs = 0\n", "general.health_check_timeout_secs")]
#[case("[ai]\ntimeout_secs = 0\n", "ai.timeout_secs")]
#[case("[platforms.ethereum]\ntimeout_secs = 0\n", "platforms.ethereum.timeout_secs")]
fn test_zero_timeouts_are_rejected(#[case] content: &str, #[case] expected_key: &str) {
    let temp_dir = create_temp_config(content);

    match TomlConfigProvider::new().load_config(temp_dir.path()) {
        Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, expected_key),
        other => panic!("expected invalid value, got {:?}", other),
    }
}

#[test]
fn test_health_timeout_is_capped() {
    let mut config = ArgusConfig::default();
    config.general.health_check_timeout_secs = 60;
    assert_eq!(config.general.health_check_timeout(), Duration::from_secs(5));
}

#[tokio::test]
async fn test_platform_overrides_reach_the_analyzer() {
    let temp_dir = create_temp_config(
        r#"
    [general]
    enable_ai = false

    [platforms.ethereum]
    executable_path = "/opt/slither/bin/slither"
    extra_args = ["--exclude-informational"]
    timeout_secs = 42
    "#,
    );
    let config = TomlConfigProvider::new().load_config(temp_dir.path()).unwrap();
    let invoker = Arc::new(MockInvoker::new());
    let platform = PlatformRegistry::default().get("ethereum").cloned().unwrap();
    let analyzer = SolidityAnalyzer::new(platform, &context(config, invoker.clone(), None));

    analyzer
        .analyze(&[ContractInput::new("Vault.sol", "contract Vault {}\n", "ethereum")])
        .await
        .unwrap();

    let invocation = &invoker.invocations()[0];
    assert_eq!(invocation.program, "/opt/slither/bin/slither");
    assert_eq!(invocation.timeout, Duration::from_secs(42));
    assert_eq!(invocation.args.last().map(String::as_str), Some("--exclude-informational"));
}

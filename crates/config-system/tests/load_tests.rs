//! File-based config loading

use std::io::Write;

use tally_config::{ConfigError, ConfigSerializer, EngineConfig, StoreFailurePolicy};
use tempfile::Builder;

#[test]
fn test_load_yaml_file() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        "aggregator:\n  failure_policy: terminate\n  offload_recompute: false\n"
    )
    .unwrap();

    let config = EngineConfig::load(file.path()).unwrap();
    assert_eq!(config.aggregator.failure_policy, StoreFailurePolicy::Terminate);
    assert!(!config.aggregator.offload_recompute);
    assert_eq!(config.allocator.max_attempts, 1000);
}

#[test]
fn test_load_rejects_invalid_values() {
    let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[allocator]\nmax_attempts = 0").unwrap();

    assert!(matches!(
        EngineConfig::load(file.path()),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn test_load_expands_environment() {
    std::env::set_var("TALLY_LOAD_TEST_PADDING", "120");

    let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        "[aggregator]\ndegenerate_domain_padding_secs = ${{TALLY_LOAD_TEST_PADDING}}"
    )
    .unwrap();

    let config = EngineConfig::load(file.path()).unwrap();
    assert_eq!(config.aggregator.degenerate_domain_padding_secs, 120);
}

#[test]
fn test_serialize_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.json");

    let mut config = EngineConfig::default();
    config.allocator.max_attempts = 25;
    ConfigSerializer::serialize_file(&config, &path).unwrap();

    assert_eq!(EngineConfig::load(&path).unwrap(), config);
}

#[test]
fn test_missing_file_is_io_error() {
    assert!(matches!(
        EngineConfig::load("/nonexistent/tally/engine.yaml"),
        Err(ConfigError::Io(_))
    ));
}

//! Unit tests for configuration loading and validation

use snapshotter::config::{load_config, ConfigError, LogFormat, TargetConfig, TargetKind};
use std::path::PathBuf;
use test_utils::{full_config_yaml, ConfigBuilder, ResultAssertions, TestContext};

#[test]
fn test_full_config_loads() {
    let ctx = TestContext::new();
    let yaml = full_config_yaml(
        &ctx.temp_dir().join("backups"),
        &ctx.temp_dir().join("etc"),
        &ctx.temp_dir().join("prom"),
    );
    let path = ctx.create_file("snapshotter-config.yaml", &yaml);

    let config = load_config(&path).assert_ok();

    let kinds: Vec<_> = config.backups.iter().map(|b| b.kind()).collect();
    assert_eq!(
        kinds,
        vec![TargetKind::Database, TargetKind::Prometheus, TargetKind::Filesystem]
    );
    assert_eq!(config.backups[1].name(), "metrics");
    assert_eq!(config.retention_days(TargetKind::Prometheus), Some(14));
    assert_eq!(
        config.notifications.webhook.as_ref().unwrap().timeout_seconds,
        30
    );
    assert_eq!(config.logging.format, LogFormat::Text);
    assert_eq!(config.log_directory(), ctx.temp_dir().join("backups/logs"));
}

#[test]
fn test_missing_file() {
    let result = load_config("/nonexistent/snapshotter-config.yaml");
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[test]
fn test_invalid_yaml() {
    let ctx = TestContext::new();
    let path = ctx.create_file("bad.yaml", "backups: [unclosed\n");
    assert!(matches!(load_config(&path), Err(ConfigError::YamlError(_))));
}

#[test]
fn test_invalid_toml() {
    let ctx = TestContext::new();
    let path = ctx.create_file("bad.toml", "invalid { toml content");
    assert!(matches!(load_config(&path), Err(ConfigError::TomlError(_))));
}

#[test]
fn test_wrong_field_type() {
    let ctx = TestContext::new();
    let path = ctx.create_file(
        "config.yaml",
        "backups:\n  - type: filesystem\n    paths: not-a-list\n",
    );
    assert!(matches!(load_config(&path), Err(ConfigError::SchemaError(_))));
}

#[test]
fn test_target_field_errors_are_not_config_errors() {
    // Per-target problems surface when the target runs, not at load time
    let ctx = TestContext::new();
    let path = ctx.create_file(
        "config.yaml",
        "backups:\n  - type: database\n  - type: prometheus\n    url: nonsense\n",
    );

    let config = load_config(&path).assert_ok();
    assert_eq!(config.backups.len(), 2);
}

#[test]
fn test_webhook_requires_url() {
    let ctx = TestContext::new();
    let path = ctx.create_file(
        "config.yaml",
        "backups:\n  - type: filesystem\n    paths: [/etc]\nnotifications:\n  webhook:\n    url: \"\"\n",
    );
    load_config(&path).assert_err_contains("url");
}

#[test]
fn test_builder_written_config_loads() {
    let builder = ConfigBuilder::minimal()
        .add_prometheus("metrics", "http://localhost:9090")
        .with_retention(TargetKind::Filesystem, 30)
        .with_webhook("http://127.0.0.1:9/hook");
    let path = builder.write_yaml("snapshotter-config.yaml");

    let config = load_config(&path).assert_ok();
    match &config.backups[1] {
        TargetConfig::Prometheus(m) => {
            assert_eq!(m.url, "http://localhost:9090");
            assert_eq!(m.data_dir, builder.prometheus_data_dir());
        }
        other => panic!("unexpected target {:?}", other),
    }
    assert_eq!(config.backup_dir, builder.backup_dir());
    assert_ne!(config.log_directory(), PathBuf::from("/srv/backups/logs"));
}

//! `${VAR}` substitution while loading configuration
//!
//! These tests mutate the process environment and run serially.

use serial_test::serial;
use snapshotter::config::parse_yaml;
use test_utils::TargetConfig;

#[test]
#[serial]
fn test_variables_substituted() {
    std::env::set_var("SNAPSHOTTER_TEST_PG_CONTAINER", "pg-prod");
    std::env::set_var("SNAPSHOTTER_TEST_HOOK", "https://n8n.example/webhook/abc");

    let config = parse_yaml(
        r#"
backups:
  - type: database
    container: ${SNAPSHOTTER_TEST_PG_CONTAINER}
notifications:
  webhook:
    url: ${SNAPSHOTTER_TEST_HOOK}
"#,
    )
    .unwrap();

    match &config.backups[0] {
        TargetConfig::Database(db) => assert_eq!(db.container, "pg-prod"),
        other => panic!("unexpected target {:?}", other),
    }
    assert_eq!(
        config.notifications.webhook.unwrap().url,
        "https://n8n.example/webhook/abc"
    );

    std::env::remove_var("SNAPSHOTTER_TEST_PG_CONTAINER");
    std::env::remove_var("SNAPSHOTTER_TEST_HOOK");
}

#[test]
#[serial]
fn test_unset_variable_left_verbatim() {
    std::env::remove_var("SNAPSHOTTER_TEST_UNSET");

    let config = parse_yaml(
        "backups:\n  - type: filesystem\n    paths: [\"/data/${SNAPSHOTTER_TEST_UNSET}/etc\"]\n",
    )
    .unwrap();

    match &config.backups[0] {
        TargetConfig::Filesystem(fs) => {
            assert_eq!(fs.paths[0].to_string_lossy(), "/data/${SNAPSHOTTER_TEST_UNSET}/etc")
        }
        other => panic!("unexpected target {:?}", other),
    }
}

#[test]
#[serial]
fn test_variable_inside_larger_string() {
    std::env::set_var("SNAPSHOTTER_TEST_HOST", "prom.internal");

    let config = parse_yaml(
        "backups:\n  - type: prometheus\n    url: http://${SNAPSHOTTER_TEST_HOST}:9090\n    data_dir: /var/lib/prometheus\n",
    )
    .unwrap();

    match &config.backups[0] {
        TargetConfig::Prometheus(m) => assert_eq!(m.url, "http://prom.internal:9090"),
        other => panic!("unexpected target {:?}", other),
    }

    std::env::remove_var("SNAPSHOTTER_TEST_HOST");
}

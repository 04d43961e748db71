//! A run where one of three targets fails

use snapshotter::managers::backup::summary_lines;
use snapshotter::utils::archive::list_archive;
use snapshotter::utils::checksum::verify_sidecar;
use std::path::PathBuf;
use test_utils::{
    artifacts_in, BackupManager, ConfigBuilder, EventKind, MockExecutor, MockResponse,
    MockSnapshotApi, Outcome, RecordingNotifier, TargetKind,
};

#[test]
fn test_database_failure_is_partial() {
    let builder = ConfigBuilder::minimal()
        .add_database("postgres-main", "postgres")
        .add_prometheus("metrics", "http://localhost:9090");
    let snapshot_api = MockSnapshotApi::creating(builder.prometheus_data_dir(), "20250101T000000Z-abc");
    let (config, _temp) = builder.persist();

    let executor = MockExecutor::new()
        .expect("docker", MockResponse::failure("Error: No such container: postgres", 1));
    let notifier = RecordingNotifier::new();

    let report = BackupManager::new(&config, false)
        .with_executor(executor.clone())
        .with_snapshot_api(snapshot_api.clone())
        .with_notifier(notifier.clone())
        .run();

    // Configuration order is kept
    let names: Vec<_> = report.summary.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["configs", "postgres-main", "metrics"]);

    let database = &report.summary.results[1];
    assert!(!database.success);
    assert!(database
        .error_message
        .as_deref()
        .unwrap()
        .contains("No such container"));
    assert!(artifacts_in(&config.type_dir(TargetKind::Database)).is_empty());

    for result in [&report.summary.results[0], &report.summary.results[2]] {
        assert!(result.success, "{:?}", result.error_message);
        let artifact = result.artifact_path.as_ref().unwrap();
        assert!(verify_sidecar(artifact));
        assert!(result.size_bytes > 0);
    }

    let metrics_members = list_archive(report.summary.results[2].artifact_path.as_ref().unwrap()).unwrap();
    assert!(metrics_members
        .iter()
        .any(|m| m.ends_with(PathBuf::from("meta.json"))));

    assert_eq!(report.outcome(), Some(Outcome::PartialFailure));
    assert!(!report.process_exit_ok);
    assert_eq!(notifier.last_kind(), Some(EventKind::BackupPartialFailure));
    assert_eq!(notifier.events().len(), 1);
    assert_eq!(snapshot_api.call_count(), 1);
    assert_eq!(executor.call_count("docker"), 1);

    let lines = summary_lines(&report.summary);
    assert!(lines.contains(&"Total backups: 3".to_string()));
    assert!(lines.contains(&"Successful: 2".to_string()));
    assert!(lines.contains(&"Failed: 1".to_string()));
}

#[test]
fn test_every_target_failing_is_critical() {
    let builder = ConfigBuilder::new()
        .add_database("postgres-main", "postgres")
        .add_prometheus("metrics", "http://localhost:9090")
        .add_filesystem("gone", vec![PathBuf::from("/nonexistent/snapshotter/path")]);
    let (config, _temp) = builder.persist();

    let notifier = RecordingNotifier::new();
    let report = BackupManager::new(&config, false)
        .with_executor(MockExecutor::new().with_default_response(MockResponse::failure("boom", 2)))
        .with_snapshot_api(MockSnapshotApi::failing("connection refused"))
        .with_notifier(notifier.clone())
        .run();

    assert_eq!(report.summary.failed(), 3);
    assert_eq!(report.outcome(), Some(Outcome::AllFailed));
    assert_eq!(notifier.last_kind(), Some(EventKind::BackupCriticalFailure));
    assert!(!report.process_exit_ok);
}

#[test]
fn test_orphan_snapshot_times_out() {
    let builder = ConfigBuilder::new().add_prometheus("metrics", "http://localhost:9090");
    let (config, _temp) = builder.persist();

    let report = BackupManager::new(&config, false)
        .with_snapshot_api(MockSnapshotApi::orphan("never-written"))
        .without_notifier()
        .run();

    let result = &report.summary.results[0];
    assert!(!result.success);
    assert!(result.error_message.as_deref().unwrap().contains("never-written"));
    assert!(!report.process_exit_ok);
}

//! Dry runs leave the filesystem untouched

use test_utils::{
    list_tree, BackupManager, ConfigBuilder, EventKind, MockExecutor, MockSnapshotApi,
    RecordingNotifier,
};

#[test]
fn test_dry_run_writes_nothing() {
    let builder = ConfigBuilder::minimal()
        .add_database("postgres-main", "postgres")
        .add_prometheus("metrics", "http://localhost:9090");
    let snapshot_api = MockSnapshotApi::creating(builder.prometheus_data_dir(), "unused");
    let (config, temp) = builder.persist();
    let before = list_tree(temp.path());

    let executor = MockExecutor::new();
    let notifier = RecordingNotifier::new();
    for _ in 0..2 {
        let report = BackupManager::new(&config, true)
            .with_executor(executor.clone())
            .with_snapshot_api(snapshot_api.clone())
            .with_notifier(notifier.clone())
            .run();

        assert!(report.process_exit_ok);
        assert!(report.summary.dry_run);
        assert!(report.retention.is_empty());
        assert!(report
            .summary
            .results
            .iter()
            .all(|r| r.success && r.artifact_path.is_none() && r.size_bytes == 0));
    }

    assert_eq!(list_tree(temp.path()), before);
    assert!(!config.backup_dir.exists());
    assert!(executor.get_calls().is_empty());
    assert_eq!(snapshot_api.call_count(), 0);

    let events = notifier.events();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.dry_run && e.kind == EventKind::BackupSuccess));
}

#[test]
fn test_dry_run_flags_invalid_target() {
    let builder = ConfigBuilder::minimal().add_prometheus("metrics", "not a url");
    let (config, _temp) = builder.persist();

    let report = BackupManager::new(&config, true).without_notifier().run();

    let metrics = &report.summary.results[1];
    assert!(metrics.success);
    assert!(metrics.metadata.contains_key("validation_error"));
    assert!(!report.summary.results[0].metadata.contains_key("validation_error"));
    assert!(report.process_exit_ok);
}

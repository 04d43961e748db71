//! Retention after a successful run

use snapshotter::utils::checksum::sidecar_path;
use snapshotter::utils::retention::RetentionReport;
use std::fs;
use test_utils::{
    artifacts_in, write_aged_artifact, BackupManager, ConfigBuilder, EventKind, MockExecutor,
    MockResponse, Outcome, RecordingNotifier, TargetKind,
};

#[test]
fn test_expired_artifact_removed_with_sidecar() {
    let builder = ConfigBuilder::minimal().with_retention(TargetKind::Filesystem, 7);
    let type_dir = builder.backup_dir().join("filesystem");
    let old = write_aged_artifact(&type_dir, "filesystem-backup-20240101-000000.tar.gz", 10);
    let recent = write_aged_artifact(&type_dir, "filesystem-backup-20240102-000000.tar.gz", 3);
    let (config, _temp) = builder.persist();

    let report = BackupManager::new(&config, false).without_notifier().run();

    assert!(report.process_exit_ok);
    assert!(!old.exists());
    assert!(!sidecar_path(&old).exists());
    assert!(recent.exists());

    let filesystem = &report.retention[&TargetKind::Filesystem];
    assert_eq!(filesystem.deleted_count, 1);
    assert_eq!(filesystem.freed_bytes, 1024);
    assert_eq!(report.retention.len(), 1);

    // The fresh artifact and the recent one remain
    assert_eq!(artifacts_in(&type_dir).len(), 2);
}

#[test]
fn test_types_without_policy_get_empty_report() {
    let builder = ConfigBuilder::minimal();
    let type_dir = builder.backup_dir().join("filesystem");
    let ancient = write_aged_artifact(&type_dir, "filesystem-backup-20200101-000000.tar.gz", 1000);
    let (config, _temp) = builder.persist();

    let report = BackupManager::new(&config, false).without_notifier().run();

    assert!(ancient.exists());
    let filesystem = &report.retention[&TargetKind::Filesystem];
    assert_eq!(filesystem.deleted_count, 0);
    assert_eq!(filesystem.freed_bytes, 0);
}

#[test]
fn test_failed_run_still_sweeps() {
    let builder = ConfigBuilder::new()
        .add_filesystem("gone", vec![std::path::PathBuf::from("/nonexistent/snapshotter/path")])
        .with_retention(TargetKind::Filesystem, 7);
    let type_dir = builder.backup_dir().join("filesystem");
    let old = write_aged_artifact(&type_dir, "filesystem-backup-20240101-000000.tar.gz", 30);
    let (config, _temp) = builder.persist();

    let report = BackupManager::new(&config, false).without_notifier().run();

    assert!(!report.process_exit_ok);
    assert!(!old.exists());
    assert_eq!(report.retention[&TargetKind::Filesystem].deleted_count, 1);
}

#[test]
fn test_unlistable_type_dir_is_only_a_warning() {
    let builder = ConfigBuilder::minimal()
        .add_database("postgres-main", "postgres")
        .with_retention(TargetKind::Database, 7)
        .with_retention(TargetKind::Filesystem, 7);
    let backup_dir = builder.backup_dir();

    // A regular file where the database type directory should be
    fs::create_dir_all(&backup_dir).unwrap();
    fs::write(backup_dir.join("database"), "not a directory").unwrap();
    let old = write_aged_artifact(
        &backup_dir.join("filesystem"),
        "filesystem-backup-20240101-000000.tar.gz",
        30,
    );
    let (config, _temp) = builder.persist();

    let notifier = RecordingNotifier::new();
    let report = BackupManager::new(&config, false)
        .with_executor(MockExecutor::new().with_default_response(MockResponse::stdout("-- dump\n")))
        .with_notifier(notifier.clone())
        .run();

    // The target fails on its own; the sweep of the same path does not add to that
    assert!(report.summary.results[0].success);
    assert!(!report.summary.results[1].success);
    assert_eq!(report.summary.failed(), 1);
    assert_eq!(report.outcome(), Outcome::classify(1, 1));

    assert_eq!(report.retention[&TargetKind::Database], RetentionReport::default());
    assert_eq!(report.retention[&TargetKind::Filesystem].deleted_count, 1);
    assert!(!old.exists());

    assert_eq!(notifier.last_kind(), Some(EventKind::BackupPartialFailure));
    assert!(report.notification.unwrap().success);
}

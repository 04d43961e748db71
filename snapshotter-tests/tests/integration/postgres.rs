//! PostgreSQL dump through a real container

use crate::common::{exec_sql, is_docker_available, start_postgres_container};
use snapshotter::utils::archive::{extract_archive, list_archive};
use snapshotter::utils::checksum::verify_sidecar;
use std::fs;
use std::path::PathBuf;
use test_utils::{list_tree, BackupManager, ConfigBuilder, TargetKind, TestResult};

#[test]
#[ignore] // Requires Docker
fn test_postgres_dump_archived() -> TestResult {
    if !is_docker_available() {
        eprintln!("Docker not available, skipping test");
        return Ok(());
    }

    let container = "snapshotter-test-postgres";
    let _guard = start_postgres_container(container)?;
    exec_sql(container, "CREATE TABLE marker (id SERIAL PRIMARY KEY, note TEXT)")?;
    exec_sql(container, "INSERT INTO marker (note) VALUES ('snapshotter-was-here')")?;

    let (config, temp) = ConfigBuilder::new()
        .add_database("postgres-main", container)
        .persist();

    let report = BackupManager::new(&config, false).without_notifier().run();
    assert!(report.process_exit_ok, "{:?}", report.summary.results[0].error_message);

    let result = &report.summary.results[0];
    let artifact = result.artifact_path.as_ref().unwrap();
    assert!(verify_sidecar(artifact));
    assert_eq!(list_archive(artifact)?, vec![PathBuf::from("database.sql")]);

    // The intermediate dump is removed after archiving
    let leftovers: Vec<_> = list_tree(&config.type_dir(TargetKind::Database))
        .into_iter()
        .filter(|p| p.extension().map(|e| e == "sql").unwrap_or(false))
        .collect();
    assert!(leftovers.is_empty(), "{:?}", leftovers);

    let restore = temp.path().join("restore");
    extract_archive(artifact, &restore)?;
    let dump = fs::read_to_string(restore.join("database.sql"))?;
    assert!(dump.contains("CREATE TABLE public.marker"));
    assert!(dump.contains("snapshotter-was-here"));

    Ok(())
}

#[test]
#[ignore] // Requires Docker
fn test_missing_container_fails_target() -> TestResult {
    if !is_docker_available() {
        eprintln!("Docker not available, skipping test");
        return Ok(());
    }

    let (config, _temp) = ConfigBuilder::minimal()
        .add_database("postgres-main", "snapshotter-test-no-such-container")
        .persist();

    let report = BackupManager::new(&config, false).without_notifier().run();

    assert!(report.summary.results[0].success);
    assert!(!report.summary.results[1].success);
    assert!(!report.process_exit_ok);
    assert!(list_tree(&config.type_dir(TargetKind::Database))
        .iter()
        .all(|p| !p.to_string_lossy().ends_with(".tar.gz")));

    Ok(())
}

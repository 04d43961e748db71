//! A filesystem target whose path contains the backup root

use snapshotter::utils::archive::list_archive;
use std::fs;
use std::path::PathBuf;
use test_utils::{artifacts_in, BackupManager, ConfigBuilder, TargetKind};

#[test]
fn test_backup_root_inside_source_is_not_archived() {
    let builder = ConfigBuilder::new();
    let root = builder.temp_dir().to_path_buf();
    fs::create_dir_all(root.join("app")).unwrap();
    fs::write(root.join("app/a_blob.bin"), vec![3u8; 512 * 1024]).unwrap();
    let (config, _temp) = builder.add_filesystem("everything", vec![root.clone()]).persist();

    // The second run finds the first run's artifact under the source path
    for _ in 0..2 {
        let report = BackupManager::new(&config, false).without_notifier().run();
        assert!(report.process_exit_ok, "{:?}", report.summary.results[0].error_message);
    }

    let artifacts = artifacts_in(&config.type_dir(TargetKind::Filesystem));
    assert_eq!(artifacts.len(), 2);

    let base = PathBuf::from(root.file_name().unwrap());
    for artifact in artifacts {
        let names = list_archive(&artifact).unwrap();
        assert!(names.contains(&base.join("app/a_blob.bin")));
        assert!(names.iter().all(|n| !n.starts_with(base.join("backups"))));
    }
}

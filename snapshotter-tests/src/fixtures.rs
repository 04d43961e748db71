//! Test fixtures and sample data

use snapshotter::utils::checksum::{digest, write_sidecar};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Back-date a file's modification time by `days`
pub fn set_mtime_days_ago(path: &Path, days: u64) {
    let mtime = SystemTime::now() - Duration::from_secs(days * SECONDS_PER_DAY);
    File::options()
        .write(true)
        .open(path)
        .and_then(|f| f.set_modified(mtime))
        .expect("Failed to set modification time");
}

/// Write an artifact plus its checksum sidecar, both aged by `days`
pub fn write_aged_artifact(dir: &Path, name: &str, days: u64) -> PathBuf {
    fs::create_dir_all(dir).expect("Failed to create artifact dir");
    let path = dir.join(name);
    fs::write(&path, vec![7u8; 1024]).expect("Failed to write artifact");

    let sum = digest(&path).expect("Failed to hash artifact");
    let sidecar = write_sidecar(&path, &sum).expect("Failed to write sidecar");

    set_mtime_days_ago(&path, days);
    set_mtime_days_ago(&sidecar, days);
    path
}

/// All files below `dir`, relative to it and sorted
pub fn list_tree(dir: &Path) -> Vec<PathBuf> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) {
        let Ok(entries) = fs::read_dir(dir) else { return };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(root, &path, out);
            } else if let Ok(relative) = path.strip_prefix(root) {
                out.push(relative.to_path_buf());
            }
        }
    }

    let mut files = Vec::new();
    walk(dir, dir, &mut files);
    files.sort();
    files
}

/// Artifacts (`*.tar.gz`) directly inside `dir`
pub fn artifacts_in(dir: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.to_string_lossy().ends_with(".tar.gz"))
                .collect()
        })
        .unwrap_or_default();
    found.sort();
    found
}

/// A complete YAML config using every target kind
pub fn full_config_yaml(backup_dir: &Path, source: &Path, data_dir: &Path) -> String {
    format!(
        r#"
backup_dir: "{backup_dir}"
backups:
  - type: database
    name: postgres-main
    container: postgres
  - type: prometheus
    name: metrics
    url: http://localhost:9090
    data_dir: "{data_dir}"
  - type: filesystem
    name: configs
    paths: ["{source}"]
retention:
  database: 7
  prometheus: 14
  filesystem: 30
notifications:
  webhook:
    url: http://127.0.0.1:9/hook
logging:
  level: INFO
"#,
        backup_dir = backup_dir.display(),
        data_dir = data_dir.display(),
        source = source.display(),
    )
}

//! Age-based cleanup of backup artifacts
//!
//! Only files whose name matches the pattern are ever deleted. A matched
//! artifact takes its checksum sidecar with it.

use super::checksum::sidecar_path;
use glob::{MatchOptions, Pattern};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Pattern for artifacts produced by the backup targets
pub const ARTIFACT_PATTERN: &str = "*.tar.gz";

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum RetentionError {
    #[error("Failed to list {path:?}: {source}")]
    ListError { path: PathBuf, source: io::Error },

    #[error("Invalid file pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },
}

/// Result of one sweep over a directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    pub deleted_count: usize,
    pub freed_bytes: u64,
    pub deleted_files: Vec<PathBuf>,
    /// Files that matched but could not be removed, with the reason
    pub failures: Vec<(PathBuf, String)>,
}

impl RetentionReport {
    pub fn freed_mb(&self) -> f64 {
        self.freed_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Delete artifacts in `directory` matching `pattern` older than `max_age_days`
pub fn sweep(directory: &Path, pattern: &str, max_age_days: u32) -> Result<RetentionReport, RetentionError> {
    sweep_at(directory, pattern, max_age_days, SystemTime::now())
}

/// [`sweep`] against an explicit clock
pub fn sweep_at(
    directory: &Path,
    pattern: &str,
    max_age_days: u32,
    now: SystemTime,
) -> Result<RetentionReport, RetentionError> {
    let mut report = RetentionReport::default();

    for (path, size) in find_expired(directory, pattern, max_age_days, now)? {
        if let Err(e) = fs::remove_file(&path) {
            warn!("Failed to delete {:?}: {}", path, e);
            report.failures.push((path, e.to_string()));
            continue;
        }

        report.deleted_count += 1;
        report.freed_bytes += size;

        let sidecar = sidecar_path(&path);
        if sidecar.exists() {
            match fs::remove_file(&sidecar) {
                Ok(()) => debug!("Deleted checksum sidecar {:?}", sidecar),
                Err(e) => {
                    warn!("Failed to delete {:?}: {}", sidecar, e);
                    report.failures.push((sidecar, e.to_string()));
                }
            }
        }

        debug!("Deleted expired artifact {:?}", path);
        report.deleted_files.push(path);
    }

    Ok(report)
}

/// Matching regular files whose mtime is older than the cutoff, sorted by path
///
/// A directory that does not exist yields an empty list.
pub fn find_expired(
    directory: &Path,
    pattern: &str,
    max_age_days: u32,
    now: SystemTime,
) -> Result<Vec<(PathBuf, u64)>, RetentionError> {
    if !directory.exists() {
        return Ok(Vec::new());
    }

    let pattern = Pattern::new(pattern).map_err(|source| RetentionError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;
    let max_age = Duration::from_secs(u64::from(max_age_days) * SECONDS_PER_DAY);
    let cutoff = now.checked_sub(max_age).unwrap_or(SystemTime::UNIX_EPOCH);

    let entries = fs::read_dir(directory).map_err(|source| RetentionError::ListError {
        path: directory.to_path_buf(),
        source,
    })?;

    let mut expired = Vec::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name();
        if !matches_pattern(&name.to_string_lossy(), &pattern) {
            continue;
        }

        // Skip anything we cannot stat
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        let Ok(modified) = meta.modified() else { continue };

        if modified < cutoff {
            expired.push((entry.path(), meta.len()));
        }
    }

    expired.sort();
    Ok(expired)
}

/// Shell-style wildcard match against a bare file name
pub fn matches_pattern(name: &str, pattern: &Pattern) -> bool {
    pattern.matches_with(
        name,
        MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        },
    )
}

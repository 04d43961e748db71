//! Backup targets
//!
//! A target performs one backup and reports a [`BackupResult`]. The set of
//! target kinds is closed: [`BackupTarget`] is an enum with one variant per
//! kind, dispatched in a single place.
//!
//! Targets never return errors to the caller. Every failure inside a target
//! is a [`TargetError`] that [`BackupTarget::execute`] turns into a failed
//! result, so one broken target cannot stop the others.

pub mod database;
pub mod filesystem;
pub mod metrics;

pub use database::DatabaseTarget;
pub use filesystem::FilesystemTarget;
pub use metrics::MetricsTarget;

use crate::config::{TargetConfig, TargetKind, MAX_TIMEOUT_SECONDS};
use crate::utils::archive;
use crate::utils::checksum;
use crate::utils::executor::CommandExecutor;
use crate::utils::snapshot_api::SnapshotApi;
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Errors raised while running a single target
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("{0}")]
    Process(String),

    #[error("Snapshot request failed: {0}")]
    Http(String),

    #[error("Snapshot directory not found after {seconds} seconds: {path:?}")]
    SnapshotTimeout { path: PathBuf, seconds: u64 },

    #[error("Data directory does not exist: {0:?}")]
    MissingDataDir(PathBuf),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Checksum error: {0}")]
    Checksum(String),

    #[error("No valid paths to backup: {0:?}")]
    NoValidPaths(Vec<PathBuf>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of one target execution
#[derive(Debug, Clone, Serialize)]
pub struct BackupResult {
    pub name: String,
    pub target_type: TargetKind,
    pub success: bool,
    /// Set only for a successful, non-dry-run execution
    pub artifact_path: Option<PathBuf>,
    /// Set only for a failed execution
    pub error_message: Option<String>,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub size_bytes: u64,
    pub metadata: BTreeMap<String, Value>,
}

impl BackupResult {
    pub fn succeeded(
        name: &str,
        kind: TargetKind,
        started_at: DateTime<Local>,
        artifact: Artifact,
    ) -> Self {
        Self {
            name: name.to_string(),
            target_type: kind,
            success: true,
            artifact_path: Some(artifact.path),
            error_message: None,
            started_at,
            finished_at: Local::now(),
            size_bytes: artifact.size_bytes,
            metadata: artifact.metadata,
        }
    }

    pub fn failed(name: &str, kind: TargetKind, started_at: DateTime<Local>, error: String) -> Self {
        Self {
            name: name.to_string(),
            target_type: kind,
            success: false,
            artifact_path: None,
            error_message: Some(error),
            started_at,
            finished_at: Local::now(),
            size_bytes: 0,
            metadata: BTreeMap::new(),
        }
    }

    /// Forced success with nothing produced
    pub fn dry_run(name: &str, kind: TargetKind, started_at: DateTime<Local>) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("dry_run".to_string(), Value::Bool(true));

        Self {
            name: name.to_string(),
            target_type: kind,
            success: true,
            artifact_path: None,
            error_message: None,
            started_at,
            finished_at: Local::now(),
            size_bytes: 0,
            metadata,
        }
    }

    /// Wall time of the execution, never negative
    pub fn duration_seconds(&self) -> f64 {
        (self.finished_at - self.started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// A verified artifact with its checksum sidecar in place
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub checksum: String,
    pub metadata: BTreeMap<String, Value>,
}

/// Collaborators and run-wide flags handed to every target
#[derive(Clone, Copy)]
pub struct TargetContext<'a> {
    pub executor: &'a dyn CommandExecutor,
    pub snapshot_api: &'a dyn SnapshotApi,
    pub dry_run: bool,
}

impl<'a> TargetContext<'a> {
    pub fn new(
        executor: &'a dyn CommandExecutor,
        snapshot_api: &'a dyn SnapshotApi,
        dry_run: bool,
    ) -> Self {
        Self {
            executor,
            snapshot_api,
            dry_run,
        }
    }
}

/// One configured target, resolved to its concrete kind
pub enum BackupTarget<'a> {
    Database(DatabaseTarget<'a>),
    Metrics(MetricsTarget<'a>),
    Filesystem(FilesystemTarget<'a>),
}

impl<'a> BackupTarget<'a> {
    pub fn from_config(config: &'a TargetConfig) -> Self {
        let name = config.name();
        match config {
            TargetConfig::Database(c) => BackupTarget::Database(DatabaseTarget::new(name, c)),
            TargetConfig::Prometheus(c) => BackupTarget::Metrics(MetricsTarget::new(name, c)),
            TargetConfig::Filesystem(c) => {
                BackupTarget::Filesystem(FilesystemTarget::new(name, c))
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            BackupTarget::Database(t) => &t.name,
            BackupTarget::Metrics(t) => &t.name,
            BackupTarget::Filesystem(t) => &t.name,
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            BackupTarget::Database(_) => TargetKind::Database,
            BackupTarget::Metrics(_) => TargetKind::Prometheus,
            BackupTarget::Filesystem(_) => TargetKind::Filesystem,
        }
    }

    /// Cheap local check of the target's own fields
    pub fn validate_config(&self) -> Result<(), TargetError> {
        match self {
            BackupTarget::Database(t) => t.validate_config(),
            BackupTarget::Metrics(t) => t.validate_config(),
            BackupTarget::Filesystem(t) => t.validate_config(),
        }
    }

    /// Run the backup into `type_dir`
    ///
    /// Under dry-run nothing is touched and the result is a forced success.
    pub fn execute(&self, type_dir: &Path, ctx: &TargetContext<'_>) -> BackupResult {
        let started_at = Local::now();

        if ctx.dry_run {
            info!("[DRY RUN] Would back up {} into {:?}", self.name(), type_dir);
            return BackupResult::dry_run(self.name(), self.kind(), started_at);
        }

        let outcome = match self {
            BackupTarget::Database(t) => t.backup(type_dir, ctx),
            BackupTarget::Metrics(t) => t.backup(type_dir, ctx),
            BackupTarget::Filesystem(t) => t.backup(type_dir, ctx),
        };

        match outcome {
            Ok(artifact) => BackupResult::succeeded(self.name(), self.kind(), started_at, artifact),
            Err(e) => BackupResult::failed(self.name(), self.kind(), started_at, e.to_string()),
        }
    }
}

/// Reject a per-target timeout above [`MAX_TIMEOUT_SECONDS`]
pub(crate) fn check_timeout(field: &str, seconds: u64) -> Result<(), TargetError> {
    if seconds > MAX_TIMEOUT_SECONDS {
        return Err(TargetError::Validation(format!(
            "'{}' must be at most {} seconds, got {}",
            field, MAX_TIMEOUT_SECONDS, seconds
        )));
    }
    Ok(())
}

/// `<type>-backup-<YYYYMMDD-HHMMSS>.tar.gz` in `dir`, with a numeric suffix
/// when an artifact from the same second already exists
pub fn artifact_path(dir: &Path, kind: TargetKind, at: DateTime<Local>) -> PathBuf {
    let stem = format!("{}-backup-{}", kind, at.format("%Y%m%d-%H%M%S"));
    let mut candidate = dir.join(format!("{}.tar.gz", stem));
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{}-{}.tar.gz", stem, n));
        n += 1;
    }
    candidate
}

/// Verify a freshly written archive and write its checksum sidecar
pub(crate) fn seal_artifact(
    path: PathBuf,
    mut metadata: BTreeMap<String, Value>,
) -> Result<Artifact, TargetError> {
    if !archive::verify_archive(&path) {
        return Err(TargetError::Archive(format!(
            "Archive verification failed: {:?}",
            path
        )));
    }

    let digest = checksum::digest(&path)
        .map_err(|e| TargetError::Checksum(format!("Failed to hash {:?}: {}", path, e)))?;
    let sidecar = checksum::write_sidecar(&path, &digest)
        .map_err(|e| TargetError::Checksum(format!("Failed to write sidecar for {:?}: {}", path, e)))?;
    debug!("Wrote checksum sidecar {:?}", sidecar);

    let size_bytes = std::fs::metadata(&path)?.len();
    metadata.insert("checksum".to_string(), Value::String(digest.clone()));

    Ok(Artifact {
        path,
        size_bytes,
        checksum: digest,
        metadata,
    })
}

//! Metrics TSDB snapshot through the admin API
//!
//! The snapshot is taken by the server itself, so no write lock or downtime
//! is involved. The resulting directory under `<data_dir>/snapshots` is
//! archived as-is and left in place on the server.

use super::{artifact_path, check_timeout, seal_artifact, Artifact, TargetContext, TargetError};
use crate::config::{MetricsTargetConfig, TargetKind};
use crate::utils::archive::{create_archive_from_entries, ArchiveEntry};
use chrono::Local;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct MetricsTarget<'a> {
    pub name: String,
    config: &'a MetricsTargetConfig,
}

impl<'a> MetricsTarget<'a> {
    pub fn new(name: String, config: &'a MetricsTargetConfig) -> Self {
        Self { name, config }
    }

    pub fn validate_config(&self) -> Result<(), TargetError> {
        if self.config.url.trim().is_empty() {
            return Err(TargetError::Validation("'url' not specified".to_string()));
        }

        let url = reqwest::Url::parse(&self.config.url).map_err(|e| {
            TargetError::Validation(format!("Invalid url '{}': {}", self.config.url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(TargetError::Validation(format!(
                "'url' must be an http(s) URL with a host, got '{}'",
                self.config.url
            )));
        }

        if self.config.data_dir.as_os_str().is_empty() {
            return Err(TargetError::Validation(
                "'data_dir' not specified".to_string(),
            ));
        }

        check_timeout("request_timeout_seconds", self.config.request_timeout_seconds)?;
        check_timeout("snapshot_timeout_seconds", self.config.snapshot_timeout_seconds)
    }

    pub fn backup(&self, dir: &Path, ctx: &TargetContext<'_>) -> Result<Artifact, TargetError> {
        let data_dir = &self.config.data_dir;
        if !data_dir.is_dir() {
            return Err(TargetError::MissingDataDir(data_dir.clone()));
        }

        fs::create_dir_all(dir)?;

        info!("Requesting TSDB snapshot from {}", self.config.url);
        let snapshot_id = ctx
            .snapshot_api
            .create_snapshot(
                &self.config.url,
                Duration::from_secs(self.config.request_timeout_seconds),
            )
            .map_err(|e| TargetError::Http(format!("{:#}", e)))?;

        let snapshot_path = data_dir.join("snapshots").join(&snapshot_id);
        let timeout = Duration::from_secs(self.config.snapshot_timeout_seconds);
        if !wait_for_path(&snapshot_path, timeout, POLL_INTERVAL) {
            return Err(TargetError::SnapshotTimeout {
                path: snapshot_path,
                seconds: self.config.snapshot_timeout_seconds,
            });
        }
        debug!("Snapshot {} available at {:?}", snapshot_id, snapshot_path);

        let archive_path = artifact_path(dir, TargetKind::Prometheus, Local::now());
        create_archive_from_entries(&[ArchiveEntry::named(&snapshot_path, &snapshot_id)], &archive_path)
            .map_err(|e| TargetError::Archive(format!("{:#}", e)))?;

        let mut metadata = BTreeMap::new();
        metadata.insert("url".to_string(), Value::String(self.config.url.clone()));
        metadata.insert("snapshot_dir".to_string(), Value::String(snapshot_id));
        seal_artifact(archive_path, metadata)
    }
}

/// Poll until `path` exists or `timeout` elapses
///
/// The path is always checked at least once, even with a zero timeout.
/// A timeout too large to represent as a deadline waits without bound.
pub fn wait_for_path(path: &Path, timeout: Duration, interval: Duration) -> bool {
    let deadline = Instant::now().checked_add(timeout);

    loop {
        if path.exists() {
            return true;
        }

        let pause = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return false;
                }
                interval.min(deadline - now)
            }
            None => interval,
        };
        std::thread::sleep(pause);
    }
}

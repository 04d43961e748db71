//! Archive of configured files and directories

use super::{artifact_path, seal_artifact, Artifact, TargetContext, TargetError};
use crate::config::{FilesystemTargetConfig, TargetKind};
use crate::utils::archive::{create_archive_excluding, ArchiveEntry};
use chrono::Local;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct FilesystemTarget<'a> {
    pub name: String,
    config: &'a FilesystemTargetConfig,
}

impl<'a> FilesystemTarget<'a> {
    pub fn new(name: String, config: &'a FilesystemTargetConfig) -> Self {
        Self { name, config }
    }

    pub fn validate_config(&self) -> Result<(), TargetError> {
        if self.config.paths.is_empty() {
            return Err(TargetError::Validation("'paths' not specified".to_string()));
        }
        if self.config.paths.iter().any(|p| p.as_os_str().is_empty()) {
            return Err(TargetError::Validation(
                "'paths' cannot contain empty entries".to_string(),
            ));
        }
        Ok(())
    }

    /// Archive every configured path that exists, each under its base name
    ///
    /// Missing paths are skipped with a warning recorded in the result.
    pub fn backup(&self, dir: &Path, _ctx: &TargetContext<'_>) -> Result<Artifact, TargetError> {
        let (included, missing): (Vec<PathBuf>, Vec<PathBuf>) =
            self.config.paths.iter().cloned().partition(|p| p.exists());

        let warnings: Vec<String> = missing
            .iter()
            .map(|p| {
                warn!("Path does not exist, skipping: {:?}", p);
                format!("Path does not exist: {}", p.display())
            })
            .collect();

        if included.is_empty() {
            return Err(TargetError::NoValidPaths(missing));
        }

        let entries = archive_entries(&included)?;
        fs::create_dir_all(dir)?;

        // Type directories sit directly under the backup root, which is never archived
        let backup_root = dir.parent().unwrap_or(dir).to_path_buf();

        let archive_path = artifact_path(dir, TargetKind::Filesystem, Local::now());
        info!("Archiving {} path(s) into {:?}", entries.len(), archive_path);
        create_archive_excluding(&entries, &archive_path, &[backup_root])
            .map_err(|e| TargetError::Archive(format!("{:#}", e)))?;

        let mut metadata = BTreeMap::new();
        metadata.insert("paths_backed_up".to_string(), json!(included.len()));
        metadata.insert("paths".to_string(), json!(display_paths(&included)));
        metadata.insert("missing_paths".to_string(), json!(display_paths(&missing)));
        if !warnings.is_empty() {
            metadata.insert("warnings".to_string(), json!(warnings));
        }

        seal_artifact(archive_path, metadata)
    }
}

/// One entry per path, renaming repeated base names to `<name>-2`, `<name>-3`...
fn archive_entries(paths: &[PathBuf]) -> Result<Vec<ArchiveEntry>, TargetError> {
    let mut used = HashSet::new();
    let mut entries = Vec::with_capacity(paths.len());

    for path in paths {
        let mut entry =
            ArchiveEntry::from_path(path).map_err(|e| TargetError::Archive(format!("{:#}", e)))?;

        let base = entry.name.to_string_lossy().into_owned();
        let mut n = 1;
        while !used.insert(entry.name.clone()) {
            n += 1;
            entry.name = PathBuf::from(format!("{}-{}", base, n));
        }
        entries.push(entry);
    }

    Ok(entries)
}

fn display_paths(paths: &[PathBuf]) -> Vec<Value> {
    paths
        .iter()
        .map(|p| Value::String(p.display().to_string()))
        .collect()
}

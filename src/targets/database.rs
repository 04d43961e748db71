//! PostgreSQL dump taken inside a container

use super::{artifact_path, check_timeout, seal_artifact, Artifact, TargetContext, TargetError};
use crate::config::{DatabaseTargetConfig, TargetKind};
use crate::utils::archive::{create_archive_from_entries, ArchiveEntry};
use chrono::Local;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Member name of the dump inside the artifact
pub const DUMP_MEMBER: &str = "database.sql";

pub struct DatabaseTarget<'a> {
    pub name: String,
    config: &'a DatabaseTargetConfig,
}

impl<'a> DatabaseTarget<'a> {
    pub fn new(name: String, config: &'a DatabaseTargetConfig) -> Self {
        Self { name, config }
    }

    pub fn validate_config(&self) -> Result<(), TargetError> {
        if self.config.container.trim().is_empty() {
            return Err(TargetError::Validation(
                "'container' not specified".to_string(),
            ));
        }
        if self.config.user.trim().is_empty() {
            return Err(TargetError::Validation("'user' cannot be empty".to_string()));
        }
        check_timeout("timeout_seconds", self.config.timeout_seconds)
    }

    /// Dump all databases, archive the dump as `database.sql` and seal it
    ///
    /// On failure the dump and any partial archive are left for inspection.
    pub fn backup(&self, dir: &Path, ctx: &TargetContext<'_>) -> Result<Artifact, TargetError> {
        fs::create_dir_all(dir)?;

        let now = Local::now();
        let dump_path = dir.join(format!("database-dump-{}.sql", now.format("%Y%m%d-%H%M%S")));
        let args = [
            "exec",
            self.config.container.as_str(),
            "pg_dumpall",
            "-U",
            self.config.user.as_str(),
        ];

        info!(
            "Dumping databases from container '{}' as '{}'",
            self.config.container, self.config.user
        );
        ctx.executor
            .run_command_to_file(
                &self.config.container_runtime,
                &args,
                &dump_path,
                Some(Duration::from_secs(self.config.timeout_seconds)),
            )
            .map_err(|e| TargetError::Process(format!("pg_dumpall failed: {:#}", e)))?;

        let dump_size = fs::metadata(&dump_path)?.len();
        if dump_size == 0 {
            return Err(TargetError::Process(
                "pg_dumpall produced no output".to_string(),
            ));
        }
        debug!("Dump written to {:?} ({} bytes)", dump_path, dump_size);

        let archive_path = artifact_path(dir, TargetKind::Database, now);
        create_archive_from_entries(&[ArchiveEntry::named(&dump_path, DUMP_MEMBER)], &archive_path)
            .map_err(|e| TargetError::Archive(format!("{:#}", e)))?;

        let mut metadata = BTreeMap::new();
        metadata.insert(
            "container".to_string(),
            Value::String(self.config.container.clone()),
        );
        metadata.insert(
            "database_type".to_string(),
            Value::String("postgresql".to_string()),
        );
        let artifact = seal_artifact(archive_path, metadata)?;

        if let Err(e) = fs::remove_file(&dump_path) {
            warn!("Failed to remove intermediate dump {:?}: {}", dump_path, e);
        }

        Ok(artifact)
    }
}

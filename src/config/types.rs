use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Root directory holding one subdirectory per target type
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Backup targets, executed in this order
    pub backups: Vec<TargetConfig>,

    /// Days to keep artifacts, per target type
    #[serde(default)]
    pub retention: BTreeMap<TargetKind, i64>,

    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Optional rsync mirror for produced artifacts
    #[serde(default)]
    pub remote_upload: Option<RemoteUploadConfig>,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// The three kinds of backup target
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Database,
    Prometheus,
    Filesystem,
}

impl TargetKind {
    pub const ALL: [TargetKind; 3] = [
        TargetKind::Database,
        TargetKind::Prometheus,
        TargetKind::Filesystem,
    ];

    /// Identifier used in config files, directory names and payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Database => "database",
            TargetKind::Prometheus => "prometheus",
            TargetKind::Filesystem => "filesystem",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == value)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured backup target, discriminated by its `type` key
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TargetConfig {
    Database(DatabaseTargetConfig),
    Prometheus(MetricsTargetConfig),
    Filesystem(FilesystemTargetConfig),
}

impl TargetConfig {
    pub fn kind(&self) -> TargetKind {
        match self {
            TargetConfig::Database(_) => TargetKind::Database,
            TargetConfig::Prometheus(_) => TargetKind::Prometheus,
            TargetConfig::Filesystem(_) => TargetKind::Filesystem,
        }
    }

    /// Configured name, falling back to the type identifier
    pub fn name(&self) -> String {
        let name = match self {
            TargetConfig::Database(c) => c.name.as_deref(),
            TargetConfig::Prometheus(c) => c.name.as_deref(),
            TargetConfig::Filesystem(c) => c.name.as_deref(),
        };

        match name {
            Some(n) if !n.trim().is_empty() => n.to_string(),
            _ => self.kind().as_str().to_string(),
        }
    }
}

/// PostgreSQL dump through `<runtime> exec <container> pg_dumpall`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatabaseTargetConfig {
    #[serde(default)]
    pub name: Option<String>,

    /// Container running the database server
    #[serde(default)]
    pub container: String,

    /// Database role passed to `pg_dumpall -U`
    #[serde(default = "default_db_user")]
    pub user: String,

    /// Container CLI used to exec into the container
    #[serde(default = "default_container_runtime")]
    pub container_runtime: String,

    #[serde(default = "default_dump_timeout")]
    pub timeout_seconds: u64,
}

/// TSDB snapshot via the Prometheus admin API
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsTargetConfig {
    #[serde(default)]
    pub name: Option<String>,

    /// Base URL of the metrics server, e.g. `http://localhost:9090`
    #[serde(default)]
    pub url: String,

    /// Data directory of the metrics server (snapshots land in `<data_dir>/snapshots`)
    #[serde(default)]
    pub data_dir: PathBuf,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Upper bound for waiting on the snapshot directory to appear
    #[serde(default = "default_snapshot_timeout")]
    pub snapshot_timeout_seconds: u64,
}

/// Archive of a set of files and directories
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilesystemTargetConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

/// Notification configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookConfig {
    pub url: String,

    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,
}

/// rsync daemon receiving copies of produced artifacts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteUploadConfig {
    pub host: String,
    #[serde(default = "default_rsync_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub remote_path: String,
    #[serde(default = "default_upload_timeout")]
    pub timeout_seconds: u64,
}

/// Logging section of the config file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Defaults to `<backup_dir>/logs`
    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_log_max_files")]
    pub max_files: u32,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
            max_files: default_log_max_files(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Largest value accepted for any `*timeout_seconds` setting (one week)
pub const MAX_TIMEOUT_SECONDS: u64 = 7 * 24 * 60 * 60;

// Default value functions

fn default_backup_dir() -> PathBuf { PathBuf::from("/srv/backups") }
fn default_db_user() -> String { "postgres".to_string() }
fn default_container_runtime() -> String { "docker".to_string() }
fn default_dump_timeout() -> u64 { 3600 }
fn default_request_timeout() -> u64 { 30 }
fn default_snapshot_timeout() -> u64 { 30 }
fn default_rsync_port() -> u16 { 873 }
fn default_upload_timeout() -> u64 { 60 }
fn default_log_level() -> String { "INFO".to_string() }
fn default_log_max_files() -> u32 { 5 }

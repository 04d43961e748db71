//! Fluent API for building test configurations
//!
//! Every builder owns a temporary directory; the backup root and the log
//! directory live inside it.

use snapshotter::config::{
    Config, DatabaseTargetConfig, FilesystemTargetConfig, LoggingSettings, MetricsTargetConfig,
    NotificationConfig, RemoteUploadConfig, TargetConfig, TargetKind, WebhookConfig,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    backups: Vec<TargetConfig>,
    retention: BTreeMap<TargetKind, i64>,
    notifications: NotificationConfig,
    remote_upload: Option<RemoteUploadConfig>,
    logging: LoggingSettings,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with no targets
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let logging = LoggingSettings {
            directory: Some(temp_dir.path().join("logs")),
            ..Default::default()
        };

        Self {
            temp_dir,
            backups: Vec::new(),
            retention: BTreeMap::new(),
            notifications: NotificationConfig::default(),
            remote_upload: None,
            logging,
        }
    }

    /// A config with one filesystem target over a small directory tree
    pub fn minimal() -> Self {
        let builder = Self::new();
        let source = builder.temp_dir.path().join("source");
        fs::create_dir_all(source.join("nested")).expect("Failed to create source dir");
        fs::write(source.join("app.conf"), "port = 8080\n").expect("Failed to write file");
        fs::write(source.join("nested/extra.conf"), "debug = false\n").expect("Failed to write file");

        builder.add_filesystem("configs", vec![source])
    }

    pub fn add_filesystem(mut self, name: &str, paths: Vec<PathBuf>) -> Self {
        self.backups.push(TargetConfig::Filesystem(FilesystemTargetConfig {
            name: Some(name.to_string()),
            paths,
        }));
        self
    }

    pub fn add_database(mut self, name: &str, container: &str) -> Self {
        self.backups.push(TargetConfig::Database(DatabaseTargetConfig {
            name: Some(name.to_string()),
            container: container.to_string(),
            user: "postgres".to_string(),
            container_runtime: "docker".to_string(),
            timeout_seconds: 60,
        }));
        self
    }

    /// Metrics target whose data directory is created inside the temp dir
    pub fn add_prometheus(mut self, name: &str, url: &str) -> Self {
        let data_dir = self.prometheus_data_dir();
        fs::create_dir_all(&data_dir).expect("Failed to create prometheus data dir");

        self.backups.push(TargetConfig::Prometheus(MetricsTargetConfig {
            name: Some(name.to_string()),
            url: url.to_string(),
            data_dir,
            request_timeout_seconds: 5,
            snapshot_timeout_seconds: 1,
        }));
        self
    }

    pub fn with_retention(mut self, kind: TargetKind, days: i64) -> Self {
        self.retention.insert(kind, days);
        self
    }

    pub fn with_webhook(mut self, url: &str) -> Self {
        self.notifications.webhook = Some(WebhookConfig {
            url: url.to_string(),
            timeout_seconds: 5,
        });
        self
    }

    pub fn with_remote_upload(mut self, remote: RemoteUploadConfig) -> Self {
        self.remote_upload = Some(remote);
        self
    }

    pub fn with_log_level(mut self, level: &str) -> Self {
        self.logging.level = level.to_string();
        self
    }

    /// Get the temp directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.temp_dir.path().join("backups")
    }

    /// Data directory used by [`ConfigBuilder::add_prometheus`]
    pub fn prometheus_data_dir(&self) -> PathBuf {
        self.temp_dir.path().join("prometheus-data")
    }

    fn to_config(&self) -> Config {
        Config {
            backup_dir: self.backup_dir(),
            backups: self.backups.clone(),
            retention: self.retention.clone(),
            notifications: self.notifications.clone(),
            remote_upload: self.remote_upload.clone(),
            logging: self.logging.clone(),
        }
    }

    /// Build the Config (the temp directory is deleted with the builder)
    pub fn build(self) -> Config {
        self.to_config()
    }

    /// Keep the temp directory alive alongside the Config
    pub fn persist(self) -> (Config, TempDir) {
        let config = self.to_config();
        (config, self.temp_dir)
    }

    /// Write the config as YAML into the temp dir and return its path
    pub fn write_yaml(&self, file_name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(file_name);
        let yaml = serde_yaml::to_string(&self.to_config()).expect("Failed to serialize config");
        fs::write(&path, yaml).expect("Failed to write config file");
        path
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

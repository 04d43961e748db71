//! Configuration module for snapshotter
//!
//! Loads the YAML (or TOML) configuration, substitutes `${VAR}` references from
//! the environment and validates the result. Anything that fails here is a
//! [`ConfigError`] and stops the process before a single backup is attempted.
//!
//! Per-target field checks (an empty container name, a malformed URL) are left
//! to the targets themselves, so one bad entry cannot prevent the others from
//! running.
//!
//! ## Example Usage
//!
//! ```no_run
//! use snapshotter::config;
//!
//! let config = config::load_config("snapshotter-config.yaml")?;
//!
//! for target in &config.backups {
//!     println!("{} ({})", target.name(), target.kind());
//! }
//! # Ok::<(), snapshotter::config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{
    is_valid_log_level, load_config, parse_toml, parse_yaml, substitute_env_vars, ConfigError,
    Result, LOG_LEVELS,
};
pub use types::*;

use std::path::{Path, PathBuf};

impl Config {
    /// Backup root with `~` expanded
    pub fn backup_root(&self) -> PathBuf {
        expand_tilde(&self.backup_dir)
    }

    /// Directory for one target type: `<backup_dir>/<type>`
    pub fn type_dir(&self, kind: TargetKind) -> PathBuf {
        self.backup_root().join(kind.as_str())
    }

    /// Configured days-to-keep for a target type
    pub fn retention_days(&self, kind: TargetKind) -> Option<u32> {
        self.retention
            .get(&kind)
            .and_then(|days| u32::try_from(*days).ok())
            .filter(|days| *days > 0)
    }

    /// Log directory, defaulting to `<backup_dir>/logs`
    pub fn log_directory(&self) -> PathBuf {
        match self.logging.directory {
            Some(ref dir) => expand_tilde(dir),
            None => self.backup_root().join("logs"),
        }
    }
}

/// Expand tilde (~) in path
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

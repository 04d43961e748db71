//! Snapshotter Library
//!
//! Runs database dumps, metrics snapshots and filesystem archives as one
//! backup run, then applies retention and reports the outcome.

pub mod config;
pub mod managers;
pub mod targets;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, Config, ConfigError, TargetConfig, TargetKind};
pub use managers::backup::{BackupManager, RunReport};
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use managers::notification::{NotificationEvent, NotificationResult, Notifier, WebhookNotifier};
pub use managers::summary::{Outcome, RunSummary};
pub use targets::{BackupResult, BackupTarget, TargetError};

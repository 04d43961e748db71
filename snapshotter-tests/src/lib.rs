//! Test utilities for snapshotter
//!
//! This crate provides shared test utilities, mock implementations,
//! and helper functions for testing the snapshotter application.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, MockExecutor, RecordingNotifier};
//! use snapshotter::BackupManager;
//!
//! #[test]
//! fn my_test() {
//!     let (config, _temp) = ConfigBuilder::minimal().persist();
//!     let report = BackupManager::new(&config, false)
//!         .with_executor(MockExecutor::new())
//!         .with_notifier(RecordingNotifier::new())
//!         .run();
//!     assert!(report.process_exit_ok);
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use test_context::{ResultAssertions, TestContext};

// Re-export types from the main crate for convenience
pub use snapshotter::config::{Config, RemoteUploadConfig, TargetConfig, TargetKind};
pub use snapshotter::managers::backup::{BackupManager, RunReport};
pub use snapshotter::managers::notification::EventKind;
pub use snapshotter::managers::summary::{Outcome, RunSummary};

// Re-export mock implementations from the main crate
pub use snapshotter::managers::notification::mock::RecordingNotifier;
pub use snapshotter::utils::executor::mock::{MockExecutor, MockResponse};
pub use snapshotter::utils::executor::CommandExecutor;
pub use snapshotter::utils::snapshot_api::mock::MockSnapshotApi;
pub use snapshotter::utils::snapshot_api::SnapshotApi;

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;

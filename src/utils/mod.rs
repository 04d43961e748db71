pub mod archive;
pub mod checksum;
pub mod command;
pub mod remote;
pub mod retention;

// Trait-based abstractions for testability
pub mod executor;
pub mod snapshot_api;

// Re-export commonly used types and traits (used by test crate)
pub use executor::{CommandExecutor, RealExecutor};
pub use snapshot_api::{HttpSnapshotApi, SnapshotApi};

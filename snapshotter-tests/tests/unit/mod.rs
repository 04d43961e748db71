//! Unit tests for snapshotter components
//!
//! Each module exercises one component through its public API.

mod archive;
mod config;

//! Integration tests for snapshotter
//!
//! These tests require Docker and run real `docker exec pg_dumpall` dumps.
//! Run with: `cargo test -p snapshotter-tests --test integration -- --ignored`

mod common;
mod postgres;

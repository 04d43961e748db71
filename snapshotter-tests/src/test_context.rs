//! Scratch directory for tests that build their own source trees

use std::fmt::{Debug, Display};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Owns a temp dir; paths passed to it are relative to that dir
pub struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn create_subdir(&self, relative: &str) -> PathBuf {
        let path = self.temp_dir.path().join(relative);
        fs::create_dir_all(&path).expect("Failed to create subdirectory");
        path
    }

    /// Write `content` to `relative`, creating parent directories
    pub fn create_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Panicking accessors that print the error instead of its Debug form
pub trait ResultAssertions<T> {
    fn assert_ok(self) -> T;
    fn assert_err_contains(self, needle: &str);
}

impl<T: Debug, E: Display> ResultAssertions<T> for Result<T, E> {
    fn assert_ok(self) -> T {
        self.unwrap_or_else(|e| panic!("unexpected error: {}", e))
    }

    fn assert_err_contains(self, needle: &str) {
        match self {
            Ok(v) => panic!("expected an error mentioning '{}', got {:?}", needle, v),
            Err(e) => assert!(e.to_string().contains(needle), "'{}' lacks '{}'", e, needle),
        }
    }
}

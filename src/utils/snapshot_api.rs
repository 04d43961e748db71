//! Client for the TSDB admin snapshot endpoint

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Path of the snapshot endpoint relative to the server's base URL
pub const SNAPSHOT_ENDPOINT: &str = "/api/v1/admin/tsdb/snapshot";

/// Abstraction over the snapshot HTTP call, enabling mocking in tests
pub trait SnapshotApi: Send + Sync {
    /// Ask the server at `base_url` for a snapshot and return its identifier
    fn create_snapshot(&self, base_url: &str, timeout: Duration) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    status: String,
    #[serde(default)]
    data: Option<SnapshotData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SnapshotData {
    #[serde(default)]
    name: Option<String>,
}

/// Extract the snapshot identifier from the endpoint's JSON body
pub fn parse_snapshot_response(body: &str) -> Result<String> {
    let response: SnapshotResponse =
        serde_json::from_str(body).context("Snapshot response is not valid JSON")?;

    if response.status != "success" {
        anyhow::bail!(
            "Snapshot request returned status '{}': {}",
            response.status,
            response.error.unwrap_or_default()
        );
    }

    response
        .data
        .and_then(|d| d.name)
        .filter(|name| !name.is_empty())
        .context("Snapshot response did not include a snapshot name")
}

/// Snapshot client backed by a blocking HTTP request
#[derive(Debug, Clone, Default)]
pub struct HttpSnapshotApi;

impl HttpSnapshotApi {
    pub fn new() -> Self {
        Self
    }
}

impl SnapshotApi for HttpSnapshotApi {
    fn create_snapshot(&self, base_url: &str, timeout: Duration) -> Result<String> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), SNAPSHOT_ENDPOINT);

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        debug!("Requesting snapshot: POST {}", url);
        let response = client
            .post(&url)
            .send()
            .with_context(|| format!("Snapshot request to {} failed", url))?;

        let status = response.status();
        let body = response.text().unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("Snapshot request failed with status {}: {}", status, body.trim());
        }

        parse_snapshot_response(&body)
    }
}

/// Fake snapshot endpoint for tests
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Debug)]
    enum Behavior {
        /// Return the id and create `<data_dir>/snapshots/<id>` with one file
        Create { data_dir: PathBuf },
        /// Return the id without creating anything on disk
        Orphan,
        Fail(String),
    }

    /// Mock snapshot API recording the URLs it was called with
    #[derive(Clone)]
    pub struct MockSnapshotApi {
        snapshot_id: String,
        behavior: Behavior,
        pub calls: Arc<Mutex<Vec<String>>>,
    }

    impl MockSnapshotApi {
        /// Succeed and materialise the snapshot directory under `data_dir`
        pub fn creating(data_dir: impl Into<PathBuf>, snapshot_id: &str) -> Self {
            Self {
                snapshot_id: snapshot_id.to_string(),
                behavior: Behavior::Create {
                    data_dir: data_dir.into(),
                },
                calls: Arc::default(),
            }
        }

        /// Succeed but never create the directory, so polling times out
        pub fn orphan(snapshot_id: &str) -> Self {
            Self {
                snapshot_id: snapshot_id.to_string(),
                behavior: Behavior::Orphan,
                calls: Arc::default(),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                snapshot_id: String::new(),
                behavior: Behavior::Fail(message.to_string()),
                calls: Arc::default(),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl SnapshotApi for MockSnapshotApi {
        fn create_snapshot(&self, base_url: &str, _timeout: Duration) -> Result<String> {
            self.calls.lock().unwrap().push(base_url.to_string());

            match &self.behavior {
                Behavior::Create { data_dir } => {
                    let dir = data_dir.join("snapshots").join(&self.snapshot_id);
                    std::fs::create_dir_all(&dir)?;
                    std::fs::write(dir.join("meta.json"), r#"{"ulid":"mock"}"#)?;
                    Ok(self.snapshot_id.clone())
                }
                Behavior::Orphan => Ok(self.snapshot_id.clone()),
                Behavior::Fail(message) => anyhow::bail!("{}", message),
            }
        }
    }
}

//! Mirroring artifacts to an rsync daemon

use super::executor::CommandExecutor;
use crate::config::RemoteUploadConfig;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Extra time given to the rsync process beyond its own `--timeout`
const PROCESS_GRACE: Duration = Duration::from_secs(10);

/// Outcome of uploading a single file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteUploadResult {
    pub success: bool,
    pub filename: String,
    pub error_message: Option<String>,
    pub bytes_transferred: u64,
}

impl RemoteUploadResult {
    fn failed(filename: String, message: String) -> Self {
        Self {
            success: false,
            filename,
            error_message: Some(message),
            bytes_transferred: 0,
        }
    }
}

/// `rsync://user@host:port/path/`
pub fn remote_url(config: &RemoteUploadConfig) -> String {
    format!(
        "rsync://{}@{}:{}/{}/",
        config.username,
        config.host,
        config.port,
        config.remote_path.trim_matches('/')
    )
}

/// Push one file to the configured rsync module
///
/// The password is handed over through `RSYNC_PASSWORD` so it never shows up
/// in the process list.
pub fn upload_via_rsync(
    executor: &dyn CommandExecutor,
    config: &RemoteUploadConfig,
    file: &Path,
) -> RemoteUploadResult {
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if !file.is_file() {
        return RemoteUploadResult::failed(filename, format!("Backup file not found: {:?}", file));
    }

    let url = remote_url(config);
    let timeout = config.timeout_seconds.to_string();
    let file_arg = file.to_string_lossy();
    let args = ["--timeout", timeout.as_str(), "-av", "--no-R", &file_arg, &url];

    debug!("Uploading {} to {}", filename, url);
    let result = executor.run_command(
        "rsync",
        &args,
        &[("RSYNC_PASSWORD", config.password.as_str())],
        Some(Duration::from_secs(config.timeout_seconds).saturating_add(PROCESS_GRACE)),
    );

    match result {
        Ok(output) => {
            let bytes = parse_rsync_output(&String::from_utf8_lossy(&output.stdout));
            info!("Uploaded {} to {} ({} bytes)", filename, config.host, bytes);
            RemoteUploadResult {
                success: true,
                filename,
                error_message: None,
                bytes_transferred: bytes,
            }
        }
        Err(e) => {
            warn!("Upload of {} failed: {:#}", filename, e);
            RemoteUploadResult::failed(filename, format!("Rsync upload failed: {:#}", e))
        }
    }
}

/// Read the byte count from rsync's "total transferred file size" line
pub fn parse_rsync_output(output: &str) -> u64 {
    output
        .lines()
        .find(|line| line.to_lowercase().contains("total transferred file size:"))
        .and_then(|line| {
            line.split_whitespace()
                .find_map(|part| part.replace(',', "").parse::<u64>().ok())
        })
        .unwrap_or(0)
}

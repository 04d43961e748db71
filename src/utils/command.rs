//! Utilities for running external commands with bounded run time

use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use tracing::{debug, error};

/// Run a command with optional extra environment and timeout, capturing output
///
/// A non-zero exit status is an error carrying the command's stderr.
pub fn run_command(
    program: &str,
    args: &[&str],
    envs: &[(&str, &str)],
    timeout: Option<Duration>,
) -> Result<Output> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.envs(envs.iter().copied());
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    debug!("Running command: {} {}", program, args.join(" "));

    let output = wait_for(cmd, program, timeout)?;
    check_status(program, args, &output)?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.is_empty() {
        debug!("Command output: {}", stdout);
    }

    Ok(output)
}

/// Run a command with stdout streamed into `stdout_path`
///
/// Used for dumps that may be far larger than memory. The file is created
/// (or truncated) before the command starts and left in place on failure.
pub fn run_command_to_file(
    program: &str,
    args: &[&str],
    stdout_path: &Path,
    timeout: Option<Duration>,
) -> Result<()> {
    let file = File::create(stdout_path)
        .with_context(|| format!("Failed to create output file: {:?}", stdout_path))?;

    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::from(file));
    cmd.stderr(Stdio::piped());

    debug!(
        "Running command: {} {} > {:?}",
        program,
        args.join(" "),
        stdout_path
    );

    let output = wait_for(cmd, program, timeout)?;
    check_status(program, args, &output)
}

fn wait_for(cmd: Command, program: &str, timeout: Option<Duration>) -> Result<Output> {
    let Some(timeout_duration) = timeout else {
        let mut cmd = cmd;
        return cmd
            .output()
            .with_context(|| format!("Failed to execute {}", program));
    };

    // Run on a private runtime so callers stay synchronous
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime for command timeout")?;

    runtime.block_on(async {
        let mut cmd = tokio::process::Command::from(cmd);
        cmd.kill_on_drop(true);
        let child = cmd
            .spawn()
            .with_context(|| format!("Failed to execute {}", program))?;

        match tokio::time::timeout(timeout_duration, child.wait_with_output()).await {
            Ok(output) => output.with_context(|| format!("Failed to execute {}", program)),
            Err(_) => Err(anyhow::anyhow!(
                "{} timed out after {:?}",
                program,
                timeout_duration
            )),
        }
    })
}

fn check_status(program: &str, args: &[&str], output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    error!("Command failed: {} {}", program, args.join(" "));
    error!("Stderr: {}", stderr.trim());
    anyhow::bail!(
        "Command failed with exit code {:?}: {}",
        output.status.code(),
        stderr.trim()
    )
}

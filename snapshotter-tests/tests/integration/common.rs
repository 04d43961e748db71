//! Common utilities for integration tests

use anyhow::Result;
use std::process::Command;
use std::thread;
use std::time::Duration;

/// Guard that ensures Docker container cleanup on drop (even on panic)
pub struct ContainerGuard {
    name: String,
}

impl ContainerGuard {
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        cleanup_container(&self.name);
    }
}

/// Stop and remove a container along with its anonymous volumes
fn cleanup_container(name: &str) {
    let _ = Command::new("docker").args(["stop", name]).output();
    let _ = Command::new("docker").args(["rm", "-v", name]).output();
}

pub fn is_docker_available() -> bool {
    Command::new("docker")
        .args(["ps"])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Start a PostgreSQL container and wait until it accepts connections
pub fn start_postgres_container(name: &str) -> Result<ContainerGuard> {
    let output = Command::new("docker")
        .args([
            "run",
            "-d",
            "--name",
            name,
            "-e",
            "POSTGRES_PASSWORD=testpass",
            "-e",
            "POSTGRES_DB=testdb",
            "postgres:15-alpine",
        ])
        .output()?;
    let guard = ContainerGuard::new(name.to_string());

    if !output.status.success() {
        anyhow::bail!(
            "docker run failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    for _ in 0..30 {
        let ready = Command::new("docker")
            .args(["exec", name, "pg_isready", "-U", "postgres"])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);

        if ready {
            return Ok(guard);
        }
        thread::sleep(Duration::from_secs(1));
    }

    anyhow::bail!("PostgreSQL failed to become ready")
}

/// Run a statement through psql inside the container
pub fn exec_sql(container: &str, sql: &str) -> Result<String> {
    let output = Command::new("docker")
        .args([
            "exec", container, "psql", "-U", "postgres", "-d", "testdb", "-t", "-c", sql,
        ])
        .output()?;

    if !output.status.success() {
        anyhow::bail!("psql failed: {}", String::from_utf8_lossy(&output.stderr));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

//! Command execution abstraction for testability
//!
//! Targets and the remote uploader run external programs through
//! [`CommandExecutor`], so tests can substitute [`mock::MockExecutor`].

use anyhow::Result;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

/// Abstraction for command execution, enabling mocking in tests
pub trait CommandExecutor: Send + Sync {
    /// Run a command with extra environment and optional timeout
    fn run_command(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Result<Output>;

    /// Run a command with stdout written to a file
    fn run_command_to_file(
        &self,
        program: &str,
        args: &[&str],
        stdout_path: &Path,
        timeout: Option<Duration>,
    ) -> Result<()>;
}

/// Default implementation using real subprocess calls
#[derive(Debug, Clone, Default)]
pub struct RealExecutor;

impl RealExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for RealExecutor {
    fn run_command(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Result<Output> {
        super::command::run_command(program, args, envs, timeout)
    }

    fn run_command_to_file(
        &self,
        program: &str,
        args: &[&str],
        stdout_path: &Path,
        timeout: Option<Duration>,
    ) -> Result<()> {
        super::command::run_command_to_file(program, args, stdout_path, timeout)
    }
}

/// A mock executor for testing that records calls and returns configured responses
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Recorded command invocation
    #[derive(Clone, Debug)]
    pub struct CommandCall {
        pub program: String,
        pub args: Vec<String>,
        pub envs: Vec<(String, String)>,
    }

    /// Response configuration for mock
    #[derive(Clone, Debug)]
    pub enum MockResponse {
        Success { stdout: String, stderr: String },
        Failure { stderr: String, exit_code: i32 },
        Timeout,
    }

    impl MockResponse {
        pub fn stdout(stdout: &str) -> Self {
            MockResponse::Success {
                stdout: stdout.to_string(),
                stderr: String::new(),
            }
        }

        pub fn failure(stderr: &str, exit_code: i32) -> Self {
            MockResponse::Failure {
                stderr: stderr.to_string(),
                exit_code,
            }
        }
    }

    impl Default for MockResponse {
        fn default() -> Self {
            MockResponse::Success {
                stdout: String::new(),
                stderr: String::new(),
            }
        }
    }

    /// Mock executor for testing
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        /// Recorded command invocations
        pub calls: Arc<Mutex<Vec<CommandCall>>>,
        /// Pre-configured responses: program name -> response
        responses: Arc<Mutex<HashMap<String, MockResponse>>>,
        /// Default response when no specific response is configured
        default_response: Arc<Mutex<MockResponse>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure a response for a specific program
        pub fn expect(self, program: &str, response: MockResponse) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(program.to_string(), response);
            self
        }

        /// Set the default response for unconfigured programs
        pub fn with_default_response(self, response: MockResponse) -> Self {
            *self.default_response.lock().unwrap() = response;
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<CommandCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Check if a program was called
        pub fn was_called(&self, program: &str) -> bool {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .any(|c| c.program == program)
        }

        /// Get number of calls to a specific program
        pub fn call_count(&self, program: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.program == program)
                .count()
        }

        fn record_call(&self, program: &str, args: &[&str], envs: &[(&str, &str)]) {
            self.calls.lock().unwrap().push(CommandCall {
                program: program.to_string(),
                args: args.iter().map(|s| s.to_string()).collect(),
                envs: envs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            });
        }

        fn get_response(&self, program: &str) -> MockResponse {
            self.responses
                .lock()
                .unwrap()
                .get(program)
                .cloned()
                .unwrap_or_else(|| self.default_response.lock().unwrap().clone())
        }

        fn execute_response(&self, response: MockResponse) -> Result<Output> {
            match response {
                MockResponse::Success { stdout, stderr } => Ok(Output {
                    status: std::process::ExitStatus::default(),
                    stdout: stdout.into_bytes(),
                    stderr: stderr.into_bytes(),
                }),
                MockResponse::Failure { stderr, exit_code } => {
                    anyhow::bail!("Command failed with exit code {:?}: {}", exit_code, stderr)
                }
                MockResponse::Timeout => {
                    anyhow::bail!("Command timed out")
                }
            }
        }
    }

    impl CommandExecutor for MockExecutor {
        fn run_command(
            &self,
            program: &str,
            args: &[&str],
            envs: &[(&str, &str)],
            _timeout: Option<Duration>,
        ) -> Result<Output> {
            self.record_call(program, args, envs);
            let response = self.get_response(program);
            self.execute_response(response)
        }

        fn run_command_to_file(
            &self,
            program: &str,
            args: &[&str],
            stdout_path: &Path,
            _timeout: Option<Duration>,
        ) -> Result<()> {
            self.record_call(program, args, &[]);
            std::fs::File::create(stdout_path)?;
            let output = self.execute_response(self.get_response(program))?;
            std::fs::write(stdout_path, output.stdout)?;
            Ok(())
        }
    }
}

/// Process execution for the Azure CLI backend
use async_trait::async_trait;
use std::ffi::OsStr;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::ProcessError;

/// Result from command execution with captured output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
    pub success: bool,
}

impl CommandOutput {
    /// Create from tokio Command output
    fn from_output(output: std::process::Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code(),
            success: output.status.success(),
        }
    }

    /// Stdout followed by stderr, the way a terminal would have shown them
    pub fn combined(&self) -> String {
        let mut combined = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&self.stderr);
        }
        combined
    }

    /// Return stdout if successful, otherwise the exit failure
    pub fn into_result(self, program: &str) -> Result<String, ProcessError> {
        if self.success {
            Ok(self.stdout)
        } else {
            Err(ProcessError::Failed {
                program: program.to_string(),
                code: self.code,
            })
        }
    }
}

/// How a long-running process shares the caller's standard streams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attach {
    /// stdin, stdout and stderr all inherited
    Interactive,
    /// stdout and stderr inherited, no stdin
    OutputOnly,
}

/// Builder for executing external commands with a deadline
pub struct CommandBuilder {
    program: String,
    command: Command,
    timeout: Option<Duration>,
}

impl CommandBuilder {
    /// Create a new command builder
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        let mut command = Command::new(&program);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Self {
            program,
            command,
            timeout: None,
        }
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.command.args(args);
        self
    }

    /// Abandon (and kill) the process once this much time has passed
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Bind the process to the caller's standard streams
    pub fn attach(mut self, attach: Attach) -> Self {
        if attach == Attach::Interactive {
            self.command.stdin(Stdio::inherit());
        }
        self.command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        self
    }

    /// Execute and return captured output, whatever the exit status
    pub async fn output(mut self) -> Result<CommandOutput, ProcessError> {
        let fut = self.command.output();
        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, fut).await.map_err(|_| {
                ProcessError::Timeout {
                    program: self.program.clone(),
                    timeout,
                }
            })?,
            None => fut.await,
        }
        .map_err(|source| ProcessError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        Ok(CommandOutput::from_output(output))
    }

    /// Spawn, wait for completion and report only success or failure
    pub async fn status(mut self) -> Result<(), ProcessError> {
        let mut child = self.command.spawn().map_err(|source| ProcessError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let status = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, child.wait())
                .await
                .map_err(|_| ProcessError::Timeout {
                    program: self.program.clone(),
                    timeout,
                })?,
            None => child.wait().await,
        }
        .map_err(|source| ProcessError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(ProcessError::Failed {
                program: self.program,
                code: status.code(),
            })
        }
    }
}

/// Check if a command-line tool is installed
pub async fn check_tool_installed(
    tool_name: &str,
    version_args: &[&str],
    install_url: &str,
) -> anyhow::Result<()> {
    let output = CommandBuilder::new(tool_name)
        .args(version_args)
        .timeout(Duration::from_secs(30))
        .output()
        .await;

    match output {
        Ok(out) if out.success => Ok(()),
        _ => anyhow::bail!(
            "{} is not installed or not in PATH. Please install from {}",
            tool_name,
            install_url
        ),
    }
}

/// Spawns the backend CLI on behalf of the core components
#[async_trait]
pub trait ProcessHost: Send + Sync {
    /// Run to completion with output captured. A non-zero exit is reported
    /// through `CommandOutput::success`, not as an error.
    async fn capture(&self, args: &[String], timeout: Duration)
        -> Result<CommandOutput, ProcessError>;

    /// Run to completion with output streamed to the caller's terminal
    async fn attach(
        &self,
        args: &[String],
        attach: Attach,
        timeout: Duration,
    ) -> Result<(), ProcessError>;
}

/// Process host backed by the real Azure CLI binary
pub struct SystemHost {
    program: String,
}

impl SystemHost {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Check that the Azure CLI can be launched
    pub async fn check_installed(&self) -> anyhow::Result<()> {
        check_tool_installed(
            &self.program,
            &["version"],
            "https://learn.microsoft.com/cli/azure/install-azure-cli",
        )
        .await
    }
}

#[async_trait]
impl ProcessHost for SystemHost {
    async fn capture(
        &self,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput, ProcessError> {
        debug!("Capturing {} with {} args", self.program, args.len());
        CommandBuilder::new(&self.program)
            .args(args)
            .timeout(timeout)
            .output()
            .await
    }

    async fn attach(
        &self,
        args: &[String],
        attach: Attach,
        timeout: Duration,
    ) -> Result<(), ProcessError> {
        CommandBuilder::new(&self.program)
            .args(args)
            .attach(attach)
            .timeout(timeout)
            .status()
            .await
    }
}

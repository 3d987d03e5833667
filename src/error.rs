/// Error types for xks
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::azure::cluster::LifecycleAction;

/// Failure of a single spawned process
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {} seconds", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("{program} exited with {}", exit_label(.code))]
    Failed { program: String, code: Option<i32> },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Errors surfaced by the xks core
#[derive(Debug, Error)]
pub enum XksError {
    #[error("configuration error: missing required value {key}")]
    Configuration { key: &'static str },

    #[error("configuration error: cannot read {}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: invalid YAML in {}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("login failed")]
    LoginFailed(#[source] ProcessError),

    #[error("failed to set subscription")]
    SubscriptionSetFailed(#[source] ProcessError),

    #[error("failed to fetch AKS credentials")]
    CredentialFetchFailed(#[source] ProcessError),

    #[error("failed to query cluster power state{}", render_output(.output))]
    QueryFailed {
        output: String,
        #[source]
        source: ProcessError,
    },

    #[error("failed to {action} AKS cluster{}", render_output(.output))]
    OperationFailed {
        action: LifecycleAction,
        output: String,
        #[source]
        source: ProcessError,
    },

    #[error("invalid command: {0}")]
    InvalidSpec(&'static str),

    #[error("command execution failed")]
    ExecutionFailed(#[source] ProcessError),

    #[error("failed to get command result")]
    ResultFetchFailed(#[source] ProcessError),

    #[error("invalid file detection pattern")]
    Pattern(#[from] regex::Error),
}

fn render_output(output: &str) -> String {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(" (Azure CLI output: {})", trimmed)
    }
}

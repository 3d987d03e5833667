/// AKS power state and idempotent start/stop
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::invocation::InvocationBuilder;
use crate::config::Timeouts;
use crate::error::{ProcessError, XksError};
use crate::utils::command::ProcessHost;

/// Power state reported by `az aks show`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerState {
    Running,
    Stopped,
    Stopping,
    Starting,
    Deallocated,
    /// Anything else the backend reports, kept verbatim
    Unrecognized(String),
}

impl PowerState {
    pub fn from_raw(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "stopped" => Self::Stopped,
            "stopping" => Self::Stopping,
            "starting" => Self::Starting,
            "deallocated" => Self::Deallocated,
            _ => Self::Unrecognized(raw.to_string()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Stopped and Deallocated both mean there is nothing left to stop
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped | Self::Deallocated)
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Starting | Self::Stopping)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Running => "Running",
            Self::Stopped => "Stopped",
            Self::Stopping => "Stopping",
            Self::Starting => "Starting",
            Self::Deallocated => "Deallocated",
            Self::Unrecognized(raw) => raw.as_str(),
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `--query powerState --output json` yields `{"code": "Running"}` or `null`
#[derive(Debug, Deserialize)]
struct PowerStateDocument {
    code: Option<String>,
}

fn parse_power_state(stdout: &str) -> PowerState {
    let trimmed = stdout.trim();
    let code = match serde_json::from_str::<Option<PowerStateDocument>>(trimmed) {
        Ok(Some(PowerStateDocument { code: Some(code) })) => code,
        Ok(_) => "null".to_string(),
        // tolerate tsv-style output from older CLI versions
        Err(_) => trimmed.trim_matches('"').to_string(),
    };
    PowerState::from_raw(&code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Start,
    Stop,
}

impl LifecycleAction {
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// What a start/stop call ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// Cluster was already in the requested state; nothing was sent
    AlreadyInState(PowerState),
    /// Backend accepted the call; holds its captured output
    Completed(String),
}

/// Cluster lifecycle controller
#[derive(Clone)]
pub struct ClusterManager {
    builder: InvocationBuilder,
    host: Arc<dyn ProcessHost>,
    timeouts: Timeouts,
}

impl ClusterManager {
    pub fn new(builder: InvocationBuilder, host: Arc<dyn ProcessHost>, timeouts: Timeouts) -> Self {
        Self {
            builder,
            host,
            timeouts,
        }
    }

    /// Single-shot power state query
    pub async fn status(&self) -> Result<PowerState, XksError> {
        let args = self.builder.power_state();
        debug!("{}", args);

        let output = self
            .host
            .capture(args.as_slice(), self.timeouts.status_timeout())
            .await
            .map_err(|source| XksError::QueryFailed {
                output: String::new(),
                source,
            })?;

        if !output.success {
            return Err(XksError::QueryFailed {
                output: output.combined(),
                source: ProcessError::Failed {
                    program: "az".to_string(),
                    code: output.code,
                },
            });
        }

        let state = parse_power_state(&output.stdout);
        if let PowerState::Unrecognized(raw) = &state {
            warn!("Unrecognized power state reported by Azure: '{}'", raw);
        }
        Ok(state)
    }

    /// Start the cluster unless it is already running
    pub async fn start(&self) -> Result<LifecycleOutcome, XksError> {
        let state = self.status().await?;
        let name = &self.builder.identity().cluster_name;

        if state.is_running() {
            info!("✓ AKS cluster '{}' is already running", name);
            return Ok(LifecycleOutcome::AlreadyInState(state));
        }

        if state.is_transitioning() {
            info!(
                "AKS cluster '{}' is {}, the start request may wait for that operation",
                name, state
            );
        }
        info!(
            "Starting AKS cluster '{}' in resource group '{}' (currently {})...",
            name,
            self.builder.identity().resource_group,
            state
        );
        self.transition(LifecycleAction::Start).await
    }

    /// Stop the cluster unless it is already stopped or deallocated
    pub async fn stop(&self) -> Result<LifecycleOutcome, XksError> {
        let state = self.status().await?;
        let name = &self.builder.identity().cluster_name;

        if state.is_stopped() {
            info!("✓ AKS cluster '{}' is already stopped ({})", name, state);
            return Ok(LifecycleOutcome::AlreadyInState(state));
        }

        if state.is_transitioning() {
            info!(
                "AKS cluster '{}' is {}, the stop request may wait for that operation",
                name, state
            );
        }
        info!(
            "Stopping AKS cluster '{}' in resource group '{}' (currently {})...",
            name,
            self.builder.identity().resource_group,
            state
        );
        self.transition(LifecycleAction::Stop).await
    }

    async fn transition(&self, action: LifecycleAction) -> Result<LifecycleOutcome, XksError> {
        let args = self.builder.lifecycle(action);
        debug!("{}", args);

        let output = self
            .host
            .capture(args.as_slice(), self.timeouts.lifecycle_timeout())
            .await
            .map_err(|source| XksError::OperationFailed {
                action,
                output: String::new(),
                source,
            })?;

        let combined = output.combined();
        if !output.success {
            return Err(XksError::OperationFailed {
                action,
                output: combined,
                source: ProcessError::Failed {
                    program: "az".to_string(),
                    code: output.code,
                },
            });
        }

        info!("✓ AKS cluster {} completed", action);
        Ok(LifecycleOutcome::Completed(combined))
    }
}

/// Orchestration of remote commands and lifecycle operations
use std::sync::Arc;
use tracing::debug;

use super::auth::{AuthSession, SessionScope};
use super::cluster::{ClusterManager, LifecycleAction, LifecycleOutcome, PowerState};
use super::invocation::{CommandOptions, CommandSpec, InvocationBuilder};
use crate::config::Timeouts;
use crate::error::XksError;
use crate::utils::command::{Attach, ProcessHost};

/// Entry point used by the CLI for every remote operation
pub struct CommandDispatcher {
    builder: InvocationBuilder,
    host: Arc<dyn ProcessHost>,
    timeouts: Timeouts,
    session: AuthSession,
    cluster: ClusterManager,
}

impl CommandDispatcher {
    pub fn new(builder: InvocationBuilder, host: Arc<dyn ProcessHost>, timeouts: Timeouts) -> Self {
        let session = AuthSession::new(builder.clone(), host.clone(), timeouts);
        let cluster = ClusterManager::new(builder.clone(), host.clone(), timeouts);
        Self {
            builder,
            host,
            timeouts,
            session,
            cluster,
        }
    }

    /// Run a command inside the cluster with the caller's terminal attached
    ///
    /// An empty command is rejected before any backend call; a failed login or
    /// setup aborts before the invocation is built.
    pub async fn execute(&self, spec: &CommandSpec) -> Result<(), XksError> {
        spec.command_text()?;

        self.session.establish(SessionScope::Cluster).await?;

        let args = self.builder.build(spec)?;
        debug!("Running command inside AKS cluster");
        debug!("{}", args);

        self.host
            .attach(
                args.as_slice(),
                Attach::Interactive,
                self.timeouts.command_timeout(),
            )
            .await
            .map_err(XksError::ExecutionFailed)
    }

    /// Fetch the result of an earlier `--no-wait` command
    ///
    /// No session is established here: the query relies on the login left
    /// behind by the `execute` call that issued the command.
    pub async fn fetch_result(
        &self,
        command_id: &str,
        options: &CommandOptions,
    ) -> Result<(), XksError> {
        let args = self.builder.build_result_query(command_id, options)?;
        debug!("Fetching command result for {}", command_id);
        debug!("{}", args);

        self.host
            .attach(
                args.as_slice(),
                Attach::OutputOnly,
                self.timeouts.result_timeout(),
            )
            .await
            .map_err(XksError::ResultFetchFailed)
    }

    /// Log in if needed, then start or stop the cluster
    pub async fn lifecycle(&self, action: LifecycleAction) -> Result<LifecycleOutcome, XksError> {
        self.session.establish(SessionScope::LoginOnly).await?;
        match action {
            LifecycleAction::Start => self.cluster.start().await,
            LifecycleAction::Stop => self.cluster.stop().await,
        }
    }

    /// Log in if needed, then query the power state
    pub async fn status(&self) -> Result<PowerState, XksError> {
        self.session.establish(SessionScope::LoginOnly).await?;
        self.cluster.status().await
    }
}

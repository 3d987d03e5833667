/// Service principal session against the Azure CLI
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::invocation::{InvocationArgs, InvocationBuilder};
use crate::config::Timeouts;
use crate::error::{ProcessError, XksError};
use crate::utils::command::ProcessHost;

/// How much of the session a flow needs before it can run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionScope {
    /// Power state operations only need a logged-in identity
    LoginOnly,
    /// Remote commands also need the subscription and cluster credentials
    Cluster,
}

/// Authentication session for one cluster identity
///
/// Nothing is cached: every call re-probes the CLI.
#[derive(Clone)]
pub struct AuthSession {
    builder: InvocationBuilder,
    host: Arc<dyn ProcessHost>,
    timeouts: Timeouts,
}

impl AuthSession {
    pub fn new(builder: InvocationBuilder, host: Arc<dyn ProcessHost>, timeouts: Timeouts) -> Self {
        Self {
            builder,
            host,
            timeouts,
        }
    }

    /// Any probe failure counts as "not logged in"
    pub async fn is_authenticated(&self) -> bool {
        let args = self.builder.auth_probe();
        debug!("{}", args);

        match self
            .host
            .capture(args.as_slice(), self.timeouts.probe_timeout())
            .await
        {
            Ok(output) if output.success => true,
            Ok(output) => {
                debug!("Authentication probe failed: {}", output.combined().trim());
                false
            }
            Err(e) => {
                debug!("Authentication probe failed: {}", e);
                false
            }
        }
    }

    pub async fn login(&self) -> Result<(), XksError> {
        info!("Logging in with service principal...");
        self.run_step(self.builder.login(), self.timeouts.login_timeout())
            .await
            .map_err(XksError::LoginFailed)
    }

    /// Select the subscription, then merge cluster credentials into kubeconfig
    pub async fn setup_cluster(&self) -> Result<(), XksError> {
        info!("Setting subscription...");
        self.run_step(self.builder.set_subscription(), self.timeouts.setup_timeout())
            .await
            .map_err(XksError::SubscriptionSetFailed)?;

        info!("Fetching AKS credentials...");
        self.run_step(self.builder.get_credentials(), self.timeouts.setup_timeout())
            .await
            .map_err(XksError::CredentialFetchFailed)
    }

    /// Probe, then log in (and set up the cluster for `SessionScope::Cluster`)
    /// when the probe fails. An authenticated session skips setup entirely.
    pub async fn establish(&self, scope: SessionScope) -> Result<(), XksError> {
        if self.is_authenticated().await {
            debug!("Already authenticated");
            return Ok(());
        }

        self.login().await?;
        if scope == SessionScope::Cluster {
            self.setup_cluster().await?;
        }
        Ok(())
    }

    async fn run_step(&self, args: InvocationArgs, timeout: Duration) -> Result<(), ProcessError> {
        debug!("{}", args);
        let output = self.host.capture(args.as_slice(), timeout).await?;
        if !output.success {
            debug!("Azure CLI output: {}", output.combined().trim());
        }
        output.into_result("az").map(|_| ())
    }
}

/// xks - kubectl and helm for private AKS clusters
///
/// Runs commands inside a network-isolated AKS cluster through
/// `az aks command invoke`, logging in with a service principal on demand,
/// and starts, stops or inspects the cluster's power state.
mod args;
mod azure;
mod config;
mod error;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::azure::{
    CommandDispatcher, CommandOptions, CommandSpec, FileReferenceScanner, InvocationBuilder,
    LifecycleAction, LifecycleOutcome,
};
use crate::config::{FileConfig, XksConfig, DEFAULT_CONFIG_PATH};
use crate::utils::command::{ProcessHost, SystemHost};

#[derive(Parser)]
#[command(name = "xks")]
#[command(
    about = "Run kubectl or helm inside a private AKS cluster via az aks command invoke",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Command words to run inside the cluster
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (defaults to ./xks.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Command or shell script to run (alternative to args)
    #[arg(long = "command", value_name = "COMMAND")]
    command_text: Option<String>,

    /// Files to attach, comma-separated or repeated (use '.' for current directory)
    #[arg(long, value_delimiter = ',')]
    file: Vec<String>,

    /// Don't wait for the remote command to finish
    #[arg(long)]
    no_wait: bool,

    /// Output format (json, table, yaml, tsv)
    #[arg(short, long)]
    output: Option<String>,

    /// Subscription name or ID
    #[arg(long)]
    subscription: Option<String>,

    /// Increase Azure CLI logging verbosity
    #[arg(long)]
    debug: bool,

    /// Only show errors, suppressing warnings
    #[arg(long)]
    only_show_errors: bool,

    /// JMESPath query string
    #[arg(long)]
    query: Option<String>,

    /// Get the result of a previous --no-wait command
    #[arg(long)]
    get_result: bool,

    /// Command ID to get the result for
    #[arg(long)]
    command_id: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the AKS cluster
    Start,

    /// Stop the AKS cluster
    Stop,

    /// Show the AKS cluster power state
    Status,

    /// Generate example configuration file
    Init,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse_from(args::split_forwarded(std::env::args().collect()));

    // Initialize tracing
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("xks={}", log_level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    // An interrupt drops the in-flight future, which kills its child process
    let result = tokio::select! {
        result = run(&cli) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    match result {
        Some(Ok(())) => {}
        Some(Err(e)) => {
            error!("Error: {:#}", e);
            std::process::exit(1);
        }
        None => {
            error!("Interrupted");
            std::process::exit(130);
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Init) => init_config(cli).await,
        Some(Commands::Start) => change_power_state(cli, LifecycleAction::Start).await,
        Some(Commands::Stop) => change_power_state(cli, LifecycleAction::Stop).await,
        Some(Commands::Status) => show_status(cli).await,
        None if cli.get_result => fetch_result(cli).await,
        None => run_remote_command(cli).await,
    }
}

/// Load configuration and wire the dispatcher to the real Azure CLI
async fn connect(cli: &Cli) -> Result<(XksConfig, CommandDispatcher)> {
    let config = XksConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    debug!("Using cluster identity: {:?}", config.identity);

    let host = SystemHost::new(config.az_binary.clone());
    host.check_installed().await.context("Azure CLI is required")?;
    let host: Arc<dyn ProcessHost> = Arc::new(host);

    let builder = InvocationBuilder::new(
        config.identity.clone(),
        FileReferenceScanner::with_default_rules()?,
    );
    let dispatcher = CommandDispatcher::new(builder, host, config.timeouts);

    Ok((config, dispatcher))
}

fn command_options(cli: &Cli) -> CommandOptions {
    CommandOptions {
        output: cli.output.clone(),
        subscription: cli.subscription.clone(),
        debug: cli.debug,
        only_errors: cli.only_show_errors,
        query: cli.query.clone(),
    }
}

/// Run a kubectl/helm (or any shell) command inside the cluster
async fn run_remote_command(cli: &Cli) -> Result<()> {
    if cli.args.is_empty() && cli.command_text.is_none() {
        anyhow::bail!(
            "usage: xks <kubectl|helm> ... OR xks --command 'your command' OR xks --get-result --command-id ID OR xks <start|stop|status|init>"
        );
    }

    let spec = CommandSpec {
        command: cli.command_text.clone(),
        args: cli.args.clone(),
        files: cli.file.clone(),
        no_wait: cli.no_wait,
        options: command_options(cli),
    };

    let (_, dispatcher) = connect(cli).await?;
    dispatcher.execute(&spec).await?;

    Ok(())
}

/// Fetch the output of an earlier --no-wait command
async fn fetch_result(cli: &Cli) -> Result<()> {
    let (_, dispatcher) = connect(cli).await?;
    dispatcher
        .fetch_result(
            cli.command_id.as_deref().unwrap_or_default(),
            &command_options(cli),
        )
        .await?;

    Ok(())
}

/// Start or stop the cluster, doing nothing if it is already there
async fn change_power_state(cli: &Cli, action: LifecycleAction) -> Result<()> {
    let (config, dispatcher) = connect(cli).await?;

    match dispatcher.lifecycle(action).await? {
        LifecycleOutcome::AlreadyInState(state) => {
            debug!(
                "No {} sent, cluster '{}' is {}",
                action, config.identity.cluster_name, state
            );
        }
        LifecycleOutcome::Completed(output) => {
            info!(
                "Cluster '{}' {} request accepted by Azure",
                config.identity.cluster_name, action
            );
            if !output.trim().is_empty() {
                debug!("Azure CLI output: {}", output.trim());
            }
        }
    }

    Ok(())
}

/// Show cluster power state
async fn show_status(cli: &Cli) -> Result<()> {
    let (config, dispatcher) = connect(cli).await?;
    let state = dispatcher.status().await?;

    if cli.verbose {
        info!(
            "AKS cluster '{}' status: {}",
            config.identity.cluster_name, state
        );
    } else {
        println!("{}", state);
    }

    Ok(())
}

/// Initialize example configuration file
async fn init_config(cli: &Cli) -> Result<()> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    if path.exists() {
        anyhow::bail!("Configuration file already exists: {}", path.display());
    }

    let yaml = serde_yaml::to_string(&FileConfig::example())?;

    tokio::fs::write(&path, yaml)
        .await
        .context("Failed to write configuration file")?;

    info!("Example configuration created: {}", path.display());
    info!("");
    info!("Next steps:");
    info!("  1. Edit the configuration file to match your cluster");
    info!("  2. Provide the service principal secret:");
    info!("     export AZURE_SECRETID=your-secret-here");
    info!("  3. Run a command inside the cluster:");
    info!("     xks kubectl get nodes");

    Ok(())
}

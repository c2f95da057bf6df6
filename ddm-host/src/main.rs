//! Digital data manager host
//!
//! Runs one coordinator behind an ingress channel and drives it with an
//! NDJSON script of host actions.

mod config;
mod script;
mod shutdown;
mod sink;

use clap::Parser;
use config::ConfigLoader;
use ddm_core::{Coordinator, CoordinatorService, ingress_channel};
use shutdown::spawn_shutdown_handler;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Digital data manager - event/data-layer coordinator host
#[derive(Parser, Debug)]
#[command(name = "ddm-host")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (defaults apply when omitted)
    #[arg(short, long, env = "DDM_CONFIG")]
    config: Option<PathBuf>,

    /// NDJSON script of host actions; `-` or omitted reads stdin
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Synthesize the gate event at initialize if none is queued
    #[arg(long, default_value = "false")]
    force_gate: bool,
}

fn main() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run());
    // A pending stdin read cannot be cancelled; don't wait for it.
    runtime.shutdown_background();
    result
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting ddm-host v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = ConfigLoader::new(args.config.as_deref(), args.force_gate);
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    if let Some(path) = &args.config {
        tracing::info!("Configuration loaded from {:?}", path);
    }

    // Build the coordinator with its adapters and log sinks
    let mut coordinator =
        Coordinator::with_config(loaded_config.state, Vec::new(), loaded_config.coordinator);
    coordinator.register_adapter_configs(loaded_config.adapters);
    coordinator.subscribe("event", sink::event_logger())?;
    coordinator.subscribe("change", sink::change_logger())?;

    // Wire channels and start the service
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (ingress_tx, ingress_rx) = ingress_channel();
    let script_shutdown = shutdown_rx.clone();
    let service = tokio::spawn(CoordinatorService::new(coordinator).run(shutdown_rx, ingress_rx));
    let signals = spawn_shutdown_handler(shutdown_tx);

    // Feed the script, then close the channel so the service drains and stops
    let fed = match args.script.as_deref() {
        Some(path) if path.as_os_str() != "-" => {
            let file = tokio::fs::File::open(path).await?;
            script::feed_until_shutdown(file, &ingress_tx, script_shutdown).await
        }
        _ => script::feed_until_shutdown(tokio::io::stdin(), &ingress_tx, script_shutdown).await,
    };
    drop(ingress_tx);
    if let Some(Err(e)) = &fed {
        tracing::error!("Script aborted: {}", e);
    }

    let coordinator = service.await?;
    signals.abort();

    tracing::info!(
        bootstrap = ?coordinator.bootstrap_state(),
        events = coordinator.state().events().len(),
        "Host shutdown complete"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&coordinator.state().to_value())?
    );

    match fed {
        Some(Err(e)) => Err(e.into()),
        _ => Ok(()),
    }
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

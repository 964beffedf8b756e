//! Bridge entry point: CLI, startup, shutdown.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sp_bridge::config;
use sp_bridge::device::DevicePair;
use sp_bridge::lifecycle::{shutdown, Shutdown};
use sp_bridge::BridgeServer;

#[derive(Parser)]
#[command(name = "sp-bridge", about = "HTTP bridge for a sampler/player device pair")]
struct Cli {
    /// TCP port to listen on
    port: u16,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the sampler (output) device name
    #[arg(long)]
    sampler: Option<String>,

    /// Override the player (input) device name
    #[arg(long)]
    player: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::try_parse().unwrap_or_else(|err| {
        let _ = err.print();
        process::exit(1);
    });

    let mut config = config::load_or_default(cli.config.as_deref()).unwrap_or_else(|err| {
        eprintln!("sp-bridge: {err}");
        process::exit(1);
    });
    if let Some(sampler) = cli.sampler {
        config.devices.sampler = sampler;
    }
    if let Some(player) = cli.player {
        config.devices.player = player;
    }

    init_tracing(&config.observability.log_level);

    tracing::info!("sp-bridge v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        sampler = %config.devices.sampler,
        player = %config.devices.player,
        completion_timeout_ms = config.run.completion_timeout_ms,
        "Configuration loaded"
    );

    let pair = DevicePair::open(
        &config.devices.player,
        &config.devices.sampler,
        Duration::from_millis(config.run.completion_timeout_ms),
    )
    .unwrap_or_else(|err| {
        tracing::error!(error = %err, "failed to open sampler/player pair");
        process::exit(1);
    });

    let bind_addr = format!("{}:{}", config.server.host, cli.port);
    let listener = TcpListener::bind(&bind_addr).await.unwrap_or_else(|err| {
        tracing::error!(address = %bind_addr, error = %err, "failed to bind");
        process::exit(1);
    });

    let coordinator = Shutdown::new();
    shutdown::spawn_triggers(&coordinator);

    let server = BridgeServer::new(pair);
    if let Err(err) = server.run(listener, coordinator.triggered()).await {
        tracing::error!(error = %err, "server error");
        process::exit(1);
    }

    tracing::info!("Shutdown complete");
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("sp_bridge={default_level},tower_http=info").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

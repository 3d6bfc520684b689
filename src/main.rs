//! session-gateway
//!
//! An HTTP gateway in front of independently deployed backend services.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                   SESSION GATEWAY                     │
//!                      │                                                      │
//!   Client Request     │  ┌───────────┐   ┌─────────┐   ┌──────────────────┐  │
//!   ───────────────────┼─▶│ admission │──▶│ routing │──▶│ auth + body limit │  │
//!                      │  └───────────┘   └─────────┘   └────────┬─────────┘  │
//!                      │                                         ▼            │
//!                      │                                ┌──────────────────┐  │
//!                      │                                │   session gate   │  │
//!                      │                                └────────┬─────────┘  │
//!                      │                                         ▼            │
//!   Client Response    │  ┌───────────┐   ┌─────────┐   ┌──────────────────┐  │
//!   ◀──────────────────┼──│ response  │◀──│observer │◀──│ proxy dispatcher │◀─┼── Backend
//!                      │  └───────────┘   └─────────┘   └──────────────────┘  │
//!                      │                                                      │
//!                      │  background: session sweeper, admin API, metrics     │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use session_gateway::config::{load_config, GatewayConfig};
use session_gateway::lifecycle::{spawn_signal_handler, Shutdown};
use session_gateway::observability::{logging, metrics};
use session_gateway::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "session-gateway", version, about = "Session-aware HTTP gateway")]
struct Args {
    /// Path to the TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Log fast, successful requests too.
    #[arg(short, long, env = "GATEWAY_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if args.verbose {
        config.observability.verbose = true;
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "session-gateway starting");

    tracing::info!(
        config = ?args.config,
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        verbose = config.observability.verbose,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

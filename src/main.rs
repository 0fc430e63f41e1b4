//! Origin relay.
//!
//! Relays a public-facing origin to one upstream application origin.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                 ORIGIN RELAY                  │
//!     Client Request      │  ┌────────┐   ┌──────────┐   ┌────────────┐  │
//!     ────────────────────┼─▶│  http  │──▶│ routing  │──▶│   proxy    │──┼──▶ Upstream
//!                         │  │ server │   │ reserved │   │ forwarder  │  │    origin
//!                         │  └────────┘   │   404    │   └─────┬──────┘  │
//!                         │               └──────────┘         │         │
//!     Client Response     │  ┌────────┐   ┌──────────┐         │         │
//!     ◀───────────────────┼──│response│◀──│ rewrite  │◀────────┘         │
//!                         │  └────────┘   └──────────┘                   │
//!                         │                                              │
//!                         │  config · observability · security ·        │
//!                         │  resilience (deadline) · lifecycle · admin   │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use origin_relay::config::{load_config, ProxyConfig};
use origin_relay::lifecycle::startup;
use origin_relay::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "origin-relay")]
#[command(about = "Relay a public origin to an upstream application origin", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path).map_err(|e| format!("{}: {}", path.display(), e))?,
        None => ProxyConfig::default(),
    };

    init_logging(&config.observability);

    tracing::info!("origin-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.origin,
        public = %config.upstream.public_origin,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

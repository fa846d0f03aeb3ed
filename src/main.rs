//! Caching forward HTTP proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌────────────────────────────────────────────────┐
//!                          │                 CACHING PROXY                  │
//!                          │                                                │
//!     Client GET           │  ┌─────────┐   ┌──────────┐   ┌────────────┐   │
//!     ─────────────────────┼─▶│   net   │──▶│   http   │──▶│   cache    │   │
//!                          │  │listener │   │ request  │   │ get(key)   │   │
//!                          │  └─────────┘   └──────────┘   └─────┬──────┘   │
//!                          │                                hit  │  miss    │
//!                          │                      ┌──────────────┤          │
//!                          │                      │              ▼          │
//!     Client Response      │                      │       ┌────────────┐    │
//!     ◀────────────────────┼──────────────────────┴───────│   http     │◀───┼──── Origin
//!                          │                              │  response  │    │     Server
//!                          │                              └─────┬──────┘    │
//!                          │                                    ▼           │
//!                          │                              cache put(key)    │
//!                          └────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use caching_proxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use caching_proxy::lifecycle::startup;
use caching_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "caching-proxy")]
#[command(about = "Caching forward proxy for HTTP GET requests", long_about = None)]
struct Cli {
    /// Port to listen on
    port: u16,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of connections served at once
    #[arg(long)]
    max_connections: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    config.listener.port = cli.port;
    if let Some(max_connections) = cli.max_connections {
        config.listener.max_connections = max_connections;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        port = config.listener.port,
        max_connections = config.listener.max_connections,
        max_cache_size = config.cache.max_cache_size,
        max_object_size = config.cache.max_object_size,
        "caching-proxy v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

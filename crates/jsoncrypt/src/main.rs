//! `jsoncrypt-svc` — HTTP service entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (JSON logs, optional OTLP spans).
//! 3. Load and validate column declarations into a [`ColumnRegistry`].
//! 4. Spawn the optional columns-file reload task.
//! 5. Build the Axum router and start the server.

mod config;
mod server;
mod telemetry;

use std::path::PathBuf;

use anyhow::Result;
use jsoncrypt::registry::{self, ColumnRegistry};
use tracing::info;

use config::Config;
use server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        "jsoncrypt-svc starting"
    );

    // -----------------------------------------------------------------------
    // 3. Column registry
    // -----------------------------------------------------------------------
    let columns_path = PathBuf::from(&cfg.columns_path);
    let registry = ColumnRegistry::new();
    registry::load_from_path(&columns_path, &registry).await?;

    // -----------------------------------------------------------------------
    // 4. Background tasks
    // -----------------------------------------------------------------------
    let _columns_refresh = cfg.columns_refresh_interval().map(|interval| {
        info!(interval_secs = interval.as_secs(), "columns file reload enabled");
        registry::refresh_task(columns_path.clone(), interval, registry.clone())
    });

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(registry, cfg.entity_header_name.clone());
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

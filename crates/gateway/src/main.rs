//! `gateway` - payload gateway binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (OTEL + tracing).
//! 3. Build the payload codec from `PAYLOAD_SECRET`.
//! 4. Build the Axum router and start the HTTP(S) server.

mod config;
mod server;
mod telemetry;

use std::time::Duration;

use anyhow::Result;
use codec::PayloadCodec;
use tracing::{info, warn};

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
    telemetry::init_telemetry(cfg.otlp_endpoint(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.listen_port,
        tls = cfg.tls_paths().is_some(),
        "payload-gateway starting"
    );

    // -----------------------------------------------------------------------
    // 3. Payload codec
    // -----------------------------------------------------------------------
    let codec = PayloadCodec::new(cfg.payload_secret());
    if !codec.is_ready() {
        warn!("PAYLOAD_SECRET is not set; responses will be sent as plaintext JSON");
    }

    // -----------------------------------------------------------------------
    // 4. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(codec, cfg.max_body_bytes);
    let router = server::router::build(state, Duration::from_secs(cfg.request_timeout_secs));

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "listening");

    match cfg.tls_paths() {
        Some((cert_path, key_path)) => {
            let tls_config = server::tls::load_server_config(cert_path, key_path)?;
            server::serve_tls(listener, router, tls_config).await?;
        }
        None => server::serve_plain(listener, router).await?,
    }

    telemetry::shutdown();
    Ok(())
}

//! `image-vault` — HTTP service storing envelope-encrypted images in S3.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (JSON logs, optional OTLP spans).
//! 3. Build the [`ImageCrypto`] orchestrator over AWS KMS and S3.
//! 4. Build the Axum router and serve until Ctrl-C / SIGTERM.

mod config;
mod server;
mod telemetry;

use anyhow::{Context, Result};
use envelope::ImageCrypto;
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
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        bucket = %cfg.s3_bucket,
        "image-vault starting"
    );

    // -----------------------------------------------------------------------
    // 3. Envelope encryption core
    // -----------------------------------------------------------------------
    let settings = cfg.envelope_settings()?;
    let crypto = ImageCrypto::connect(&settings).await;
    info!(algorithm = %crypto.algorithm(), "envelope encryption ready");

    // -----------------------------------------------------------------------
    // 4. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(crypto, cfg.retry_policy());
    let request_timeout = cfg.request_timeout();
    info!(
        operation_timeout_secs = cfg.aws_operation_timeout_secs,
        request_timeout_secs = request_timeout.as_secs(),
        "timeouts configured"
    );
    let router = server::router::build(state, cfg.max_object_bytes, request_timeout);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("image-vault stopped");
    telemetry::shutdown_telemetry();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}

//! kafkette broker binary
//!
//! Binds the listener, then serves ApiVersions and DescribeTopicPartitions
//! requests until Ctrl-C.

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::{info, warn};

use kafkette::args::Args;
use kafkette::Server;

/// Initialize tracing subscriber for structured logging
fn setup_logging(quiet: bool) {
    let default_level = if quiet { "error" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new(default_level)),
        )
        .init();
}

/// Resolves once the process receives Ctrl-C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C, running until killed: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.quiet);

    info!(
        "Starting kafkette - listen: {}, max frame: {} bytes",
        args.listen, args.max_frame_bytes
    );

    let server = Server::bind(&args.listen, args.max_frame_bytes)
        .await
        .map_err(|e| anyhow!("Failed to bind to {}: {}", args.listen, e))?;

    server.run_until(shutdown_signal()).await;

    info!("kafkette stopped");
    Ok(())
}

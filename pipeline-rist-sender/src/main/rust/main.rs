use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use pipeline_rist_sender::{serve, Config, OsProcessLauncher};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration
    let config = Config::parse();
    config.validate()?;

    // Initialize logging
    let filter = if config.verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    info!("Starting RIST sender manager v{}", env!("CARGO_PKG_VERSION"));
    info!("  Config:    {:?}", config.config_path);
    info!("  Relay:     {} {}", config.relay_bin, config.relay_config);
    info!("  Encoder:   {}", config.encoder_bin);
    info!("  Sender:    {}", config.sender_bin);
    info!("  HTTP port: {}", config.http_port);

    // Create infrastructure implementations (dependency injection)
    let controller = Arc::new(config.to_controller(Arc::new(OsProcessLauncher::new())));

    // Bring the pipeline up; a failure is reported but the control surface
    // still starts so the operator can fix the config and apply again
    let startup = controller.clone();
    match tokio::task::spawn_blocking(move || startup.startup()).await? {
        Ok(()) => info!("Pipeline running"),
        Err(e) => error!("Pipeline startup failed: {}", e),
    }

    serve(controller.clone(), config.http_port, shutdown_signal()).await?;

    // Children must not outlive the manager
    tokio::task::spawn_blocking(move || controller.shutdown()).await?;

    info!("Shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

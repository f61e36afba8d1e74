//! Accounting engine server binary

use accounting_core::{AccountingEngine, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting accounting server");

    // Load configuration: file if given, environment overrides otherwise
    let config = match std::env::var("ACCOUNTING_CONFIG") {
        Ok(path) => Config::from_file(path)?,
        Err(_) => Config::from_env()?,
    };

    let metrics_addr = config.metrics_listen_addr.clone();
    let engine = AccountingEngine::open(config).await?;
    tracing::info!(metrics_addr = %metrics_addr, "Engine opened successfully");

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down accounting server");
    engine.shutdown().await?;
    Ok(())
}

// src/main.rs - tokengate service entry point
use clap::Parser;
use std::path::PathBuf;
use tokengate::{config, server};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tokengate", version, about = "Credential and session-token service")]
struct Cli {
    /// Path to the TOML configuration file
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting tokengate");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match &cli.config {
        Some(path) => tracing::info!("Loading configuration from: {}", path.display()),
        None => tracing::info!("Loading configuration from: {}", config::DEFAULT_CONFIG_PATH),
    }

    let config = config::resolve_config(cli.config.as_deref()).map_err(|e| {
        tracing::error!("Failed to load config: {}", e);
        Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>
    })?;

    tracing::info!("Token lifetime: {}s", config.token.ttl_secs);
    if config.rate_limit.enabled {
        tracing::info!(
            "Rate limit: {} requests per {}s",
            config.rate_limit.max_requests,
            config.rate_limit.window_secs
        );
    }

    if let Err(e) = server::run(config).await {
        tracing::error!("Server failed: {}", e);
        return Err(e.into());
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

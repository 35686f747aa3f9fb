//! Sequence Server binary
//!
//! Loads configuration and the catalog, then serves the HTTP API until
//! Ctrl-C.

use anyhow::Result;
use tracing::info;

use sequence_server::config::ServerConfig;
use sequence_server::server::run_server;
use sequence_server::utils::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = ServerConfig::from_env()?;
    info!(
        "Starting with videos at {} (catalog: {})",
        config.videos_dir.display(),
        config
            .catalog_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in".to_string())
    );

    run_server(config).await
}

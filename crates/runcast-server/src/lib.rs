//!
//! Runcast Server - HTTP front end for long-running flows
//!
//! This module exports all the components of the Runcast Server.

// External dependencies
use std::sync::Arc;

use runcast_asset_store::{FileSystemAssetStore, FileSystemRunLogger, InMemoryAssetStore};
use runcast_core::{AssetStorage, Flow, RunLogger, TracingRunLogger};

/// API module
pub mod api;

/// Configuration module
pub mod config;

/// Demo flow module
pub mod demo;

/// Error module
pub mod error;

/// Server module
pub mod server;

// Re-export key types
pub use config::ServerConfig;
pub use demo::{DemoEvent, DemoFlow, DemoInput};
pub use error::{ServerError, ServerResult};
pub use server::{RuncastServer, SubmitResponse};

/// Run function
pub async fn run<F: Flow>(config: ServerConfig, flow: F) -> ServerResult<()> {
    // Initialize logging
    init_logging(&config);

    // Create dependencies
    let asset_storage = create_asset_storage(&config)?;
    let logger = create_run_logger(&config);

    // Create server
    let server = RuncastServer::new(config, flow, asset_storage, logger);

    // Run server
    server.run().await
}

/// Initialize logging
fn init_logging(config: &ServerConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    // Create filter based on config
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // Initialize subscriber
    let builder = fmt().with_env_filter(filter).with_target(true);
    let result = if config.log_format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(err) = result {
        eprintln!("Logging already initialized: {}", err);
    }
}

/// Create asset storage
pub fn create_asset_storage(config: &ServerConfig) -> ServerResult<Arc<dyn AssetStorage>> {
    if config.asset_store_url.starts_with("memory://") {
        tracing::info!("Using in-memory asset store");
        Ok(Arc::new(InMemoryAssetStore::new()))
    } else if let Some(root) = config.asset_store_url.strip_prefix("file://") {
        if root.is_empty() {
            return Err(ServerError::ConfigError(
                "Missing directory in file asset store URL".to_string(),
            ));
        }
        tracing::info!("Using file system asset store at {}", root);
        Ok(Arc::new(FileSystemAssetStore::new(root)))
    } else {
        Err(ServerError::ConfigError(format!(
            "Unsupported asset store URL: {}",
            config.asset_store_url
        )))
    }
}

/// Create run logger
pub fn create_run_logger(config: &ServerConfig) -> Arc<dyn RunLogger> {
    match &config.run_log_dir {
        Some(dir) => {
            tracing::info!("Writing run error logs to {}", dir);
            Arc::new(FileSystemRunLogger::new(dir))
        }
        None => Arc::new(TracingRunLogger),
    }
}

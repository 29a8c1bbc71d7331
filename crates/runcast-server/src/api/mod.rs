//! API module for the Runcast Server
//!
//! This module contains the API routes and handlers for the Runcast Server.

use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use runcast_core::Flow;

pub mod errors;
pub mod health;
pub mod runs;

use crate::server::RuncastServer;

/// Build the router for API endpoints
pub fn build_router<F: Flow>(server: Arc<RuncastServer<F>>) -> Router {
    let paths = server.paths().clone();

    Router::new()
        // Flow runs
        .route(paths.submit_path(), post(runs::submit_handler::<F>))
        .route(&paths.run_path_template(), get(runs::run_status_handler::<F>))
        .route(&paths.events_path_template(), get(runs::events_handler::<F>))
        .route(&paths.asset_path_template(), get(runs::asset_handler::<F>))

        // Health check
        .route("/health", get(health::health_check::<F>))

        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

// Re-export handlers for easier imports
pub use errors::*;
pub use health::*;
pub use runs::*;

//! Health check endpoint for the Runcast Server
//!
//! This module contains the health check handler.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use runcast_core::Flow;

use crate::server::RuncastServer;

/// Health check handler
///
/// Reports the server version, the number of registered runs and the
/// state of the asset storage.
pub async fn health_check<F: Flow>(
    State(server): State<Arc<RuncastServer<F>>>,
) -> impl IntoResponse {
    debug!("Health check requested");

    let asset_storage_status = match server.check_asset_storage_health().await {
        Ok(true) => "UP",
        Ok(false) => "DEGRADED",
        Err(_) => "DOWN",
    };

    let status = if asset_storage_status == "UP" { "UP" } else { "DEGRADED" };
    let response = json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "flow": server.flow().name(),
        "runs": server.registry().len(),
        "dependencies": {
            "assetStorage": {
                "status": asset_storage_status,
            },
        },
    });

    let status_code = if asset_storage_status == "DOWN" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status_code, Json(response))
}

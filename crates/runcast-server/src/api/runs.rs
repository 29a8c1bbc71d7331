//! Flow run endpoints
//!
//! This module contains the handlers for submitting runs, reading their
//! status, streaming their events and serving their assets.

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::{future, StreamExt};
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use runcast_core::Flow;

use crate::api::errors::api_error_response;
use crate::error::ServerError;
use crate::server::RuncastServer;

/// Handler for submitting a flow run
pub async fn submit_handler<F: Flow>(
    State(server): State<Arc<RuncastServer<F>>>,
    body: Bytes,
) -> impl IntoResponse {
    let body: Value = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(err) => {
            let err = ServerError::from(err);
            warn!(error = %err, "Rejected flow submission");
            return api_error_response(&err);
        }
    };

    match server.submit(body) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => {
            if matches!(err, ServerError::ValidationError(_)) {
                warn!(error = %err, "Rejected flow submission");
            } else {
                error!(?err, "Failed to submit flow run");
            }
            api_error_response(&err)
        }
    }
}

/// Handler for reading the status of a run
pub async fn run_status_handler<F: Flow>(
    State(server): State<Arc<RuncastServer<F>>>,
    Path(run_id): Path<String>,
) -> impl IntoResponse {
    match server.run_summary(&run_id) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => api_error_response(&err),
    }
}

/// Handler for streaming the events of a run as Server-Sent Events
///
/// Each event is sent as one `data:` frame holding its JSON. The stream
/// ends once the run has finished and every event has been delivered.
pub async fn events_handler<F: Flow>(
    State(server): State<Arc<RuncastServer<F>>>,
    Path(run_id): Path<String>,
) -> Response {
    let stream = match server.open_event_stream(&run_id) {
        Ok(stream) => stream,
        Err(err) => {
            warn!(%run_id, error = %err, "Event stream rejected");
            return api_error_response(&err);
        }
    };
    info!(%run_id, "Event stream opened");

    let log_run_id = run_id.clone();
    let events = stream.filter_map(move |event| {
        let frame = match serde_json::to_string(&event) {
            Ok(data) => Some(Ok::<Event, Infallible>(Event::default().data(data))),
            Err(err) => {
                warn!(
                    run_id = %log_run_id,
                    error = %err,
                    "Dropping event that failed to serialize"
                );
                None
            }
        };
        future::ready(frame)
    });

    let mut sse = Sse::new(events);
    if let Some(interval) = server.config.sse_keep_alive() {
        sse = sse.keep_alive(KeepAlive::new().interval(interval));
    }

    let headers = [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (header::CONNECTION, "keep-alive"),
        (header::CACHE_CONTROL, "no-cache"),
        (header::CONTENT_ENCODING, "none"),
    ];

    (headers, sse).into_response()
}

/// Handler for serving a named asset of a run
pub async fn asset_handler<F: Flow>(
    State(server): State<Arc<RuncastServer<F>>>,
    Path((run_id, asset_name)): Path<(String, String)>,
) -> Response {
    let asset = match server.read_asset(&run_id, &asset_name).await {
        Ok(asset) => asset,
        Err(err) => {
            if err.is_not_found() {
                debug!(%run_id, asset = %asset_name, "Asset not available");
            } else {
                error!(?err, %run_id, asset = %asset_name, "Failed to read asset");
            }
            return api_error_response(&err);
        }
    };

    // Create the response headers
    let mut headers = HeaderMap::new();
    let content_type = HeaderValue::from_str(&asset.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(asset.len()));
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    (StatusCode::OK, headers, Body::from(asset.data)).into_response()
}

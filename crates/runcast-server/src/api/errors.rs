//! Error handling for the Runcast Server API
//!
//! Every error answers with the same JSON shape:
//! `{ "error": ..., "errorDetails": { "errorCode": ..., "errorMessage": ... } }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::ServerError;

/// Status code and stable error code for a server error
pub fn error_status(err: &ServerError) -> (StatusCode, &'static str) {
    match err {
        ServerError::ValidationError(_) => (StatusCode::BAD_REQUEST, "ERR_VALIDATION_ERROR"),
        ServerError::RunNotFound(_) => (StatusCode::NOT_FOUND, "ERR_NOT_FOUND_RUN"),
        ServerError::AssetNotFound { .. } => (StatusCode::NOT_FOUND, "ERR_NOT_FOUND_ASSET"),
        ServerError::ConsumerConflict(_) => (StatusCode::CONFLICT, "ERR_STREAM_CONSUMER_CONFLICT"),
        ServerError::AssetStorageError(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "ERR_ASSET_STORAGE_ERROR")
        }
        ServerError::ConfigError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ERR_CONFIG_ERROR"),
        ServerError::InternalError(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "ERR_INTERNAL_SERVER_ERROR")
        }
    }
}

/// Convert a server error into a standardized API error response
pub fn api_error_response(err: &ServerError) -> Response {
    let (status, error_code) = error_status(err);
    let message = err.to_string();

    let body = Json(json!({
        "error": message,
        "errorDetails": {
            "errorCode": error_code,
            "errorMessage": message,
        }
    }));

    (status, body).into_response()
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        api_error_response(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_runs_and_assets_are_404() {
        let (status, code) = error_status(&ServerError::RunNotFound("xyz".to_string()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "ERR_NOT_FOUND_RUN");

        let (status, _) = error_status(&ServerError::AssetNotFound {
            run_id: "xyz".to_string(),
            asset_name: "foo".to_string(),
        });
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_client_errors() {
        assert_eq!(
            error_status(&ServerError::ValidationError("bad".to_string())).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&ServerError::ConsumerConflict("r1".to_string())).0,
            StatusCode::CONFLICT
        );
    }
}

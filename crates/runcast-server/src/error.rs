//! Error types for the Runcast Server
//!
//! This module contains the error types used throughout the server.

use runcast_core::{AssetStoreError, CoreError};
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    /// Request body rejected before any run was created
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// No run is registered under the id
    #[error("No run found for run ID {0}")]
    RunNotFound(String),

    /// The run exists but has no asset with that name
    #[error("Asset {asset_name} not found")]
    AssetNotFound {
        /// Run the asset was requested for
        run_id: String,
        /// Requested asset name
        asset_name: String,
    },

    /// The run's event stream is already being consumed
    #[error("Event stream for run {0} already has an active consumer")]
    ConsumerConflict(String),

    /// Asset storage error
    #[error("Asset storage error: {0}")]
    AssetStorageError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

// Implement conversions from other error types
impl From<CoreError> for ServerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidInput(msg) => ServerError::ValidationError(msg),
            CoreError::AssetStorage(err) => err.into(),
            CoreError::DuplicateRun(run_id) => {
                ServerError::InternalError(format!("Run id collision for {}", run_id))
            }
            other => ServerError::InternalError(other.to_string()),
        }
    }
}

impl From<AssetStoreError> for ServerError {
    fn from(err: AssetStoreError) -> Self {
        ServerError::AssetStorageError(err.to_string())
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::ValidationError(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::InternalError(format!("IO error: {}", err))
    }
}

impl ServerError {
    /// Check if the error refers to a missing run or asset
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServerError::RunNotFound(_) | ServerError::AssetNotFound { .. })
    }
}

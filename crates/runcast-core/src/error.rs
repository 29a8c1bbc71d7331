//! Error types for the Runcast core
//!
//! This module contains the error types used by the run lifecycle.

use thiserror::Error;

use crate::asset::AssetStoreError;
use crate::run::RunId;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// The event queue no longer accepts events
    #[error("Event queue is closed")]
    QueueClosed,

    /// Another consumer is already draining the event queue
    #[error("Event queue already has an active consumer")]
    ConsumerAlreadyAttached,

    /// A run with the same identifier is already registered
    #[error("Run {0} is already registered")]
    DuplicateRun(RunId),

    /// Flow input failed validation
    #[error("Invalid flow input: {0}")]
    InvalidInput(String),

    /// Asset storage failure
    #[error("Asset storage error: {0}")]
    AssetStorage(#[from] AssetStoreError),
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

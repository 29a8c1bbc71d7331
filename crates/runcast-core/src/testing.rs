//! Test doubles for the collaborator traits

use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

use crate::asset::{Asset, AssetStorage, AssetStoreResult};
use crate::logger::RunLogger;
use crate::run::RunId;

/// An error captured by [`RecordingRunLogger`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedError {
    pub run_id: Option<RunId>,
    pub message: String,
    pub error: String,
}

/// Logger that keeps every error in memory
#[derive(Debug, Default)]
pub struct RecordingRunLogger {
    entries: Mutex<Vec<LoggedError>>,
}

impl RecordingRunLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All errors logged so far
    pub fn entries(&self) -> Vec<LoggedError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RunLogger for RecordingRunLogger {
    async fn log_error(&self, run_id: Option<&RunId>, message: &str, error: &anyhow::Error) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LoggedError {
                run_id: run_id.cloned(),
                message: message.to_string(),
                error: format!("{:#}", error),
            });
    }
}

/// Storage that accepts and forgets everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAssetStorage;

#[async_trait]
impl AssetStorage for NullAssetStorage {
    async fn store_asset(&self, _run_id: &RunId, _asset: Asset) -> AssetStoreResult<()> {
        Ok(())
    }

    async fn read_asset(
        &self,
        _run_id: &RunId,
        _asset_name: &str,
    ) -> AssetStoreResult<Option<Asset>> {
        Ok(None)
    }
}

//! Asset storage contract
//!
//! Assets are named binary blobs produced by a run. Identity is the pair
//! (run id, asset name); the storage backend decides where they live.

use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

use crate::run::RunId;

/// A named binary artifact with its content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Asset name, unique within a run
    pub name: String,

    /// MIME type reported to clients
    pub content_type: String,

    /// Raw bytes
    pub data: Vec<u8>,
}

impl Asset {
    /// Create a new asset
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Size of the asset in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the asset has no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Reject names that are empty or could escape a run's asset namespace
pub fn validate_asset_name(name: &str) -> AssetStoreResult<()> {
    let invalid = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.chars().any(char::is_control);

    if invalid {
        return Err(AssetStoreError::InvalidAssetName(name.to_string()));
    }
    Ok(())
}

/// Errors that can occur during asset storage operations
#[derive(Error, Debug)]
pub enum AssetStoreError {
    #[error("Invalid asset name: {0:?}")]
    InvalidAssetName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result type for asset storage operations
pub type AssetStoreResult<T> = Result<T, AssetStoreError>;

/// Trait defining the contract for asset storage implementations
#[async_trait]
pub trait AssetStorage: Send + Sync + Debug {
    /// Store an asset for a run, replacing any asset with the same name
    async fn store_asset(&self, run_id: &RunId, asset: Asset) -> AssetStoreResult<()>;

    /// Read a named asset of a run, `None` if it does not exist
    async fn read_asset(
        &self,
        run_id: &RunId,
        asset_name: &str,
    ) -> AssetStoreResult<Option<Asset>>;

    /// Health check
    async fn health_check(&self) -> AssetStoreResult<bool> {
        Ok(true)
    }
}

//! In-memory implementation of AssetStorage
//!
//! This implementation is primarily intended for testing and development purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use runcast_core::{validate_asset_name, Asset, AssetStorage, AssetStoreResult, RunId};

/// In-memory implementation of AssetStorage
///
/// All data is lost when the last clone is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAssetStore {
    assets: Arc<RwLock<HashMap<RunId, HashMap<String, Asset>>>>,
}

impl InMemoryAssetStore {
    /// Create a new in-memory asset store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssetStorage for InMemoryAssetStore {
    async fn store_asset(&self, run_id: &RunId, asset: Asset) -> AssetStoreResult<()> {
        validate_asset_name(&asset.name)?;

        let mut store = self.assets.write().await;
        store
            .entry(run_id.clone())
            .or_default()
            .insert(asset.name.clone(), asset);
        Ok(())
    }

    async fn read_asset(
        &self,
        run_id: &RunId,
        asset_name: &str,
    ) -> AssetStoreResult<Option<Asset>> {
        validate_asset_name(asset_name)?;

        let store = self.assets.read().await;
        Ok(store
            .get(run_id)
            .and_then(|assets| assets.get(asset_name))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runcast_core::AssetStoreError;

    #[tokio::test]
    async fn test_store_and_read() {
        let store = InMemoryAssetStore::new();
        let run_id = RunId::generate();

        store
            .store_asset(&run_id, Asset::new("cover", "image/png", vec![0u8; 16]))
            .await
            .unwrap();

        let asset = store.read_asset(&run_id, "cover").await.unwrap().unwrap();
        assert_eq!(asset.content_type, "image/png");
        assert_eq!(asset.len(), 16);
    }

    #[tokio::test]
    async fn test_assets_are_scoped_to_their_run() {
        let store = InMemoryAssetStore::new();
        let owner = RunId::generate();
        let other = RunId::generate();

        store
            .store_asset(&owner, Asset::new("cover", "image/png", b"png".to_vec()))
            .await
            .unwrap();

        assert!(store.read_asset(&other, "cover").await.unwrap().is_none());
        assert!(store.read_asset(&owner, "missing").await.unwrap().is_none());
        assert!(store.read_asset(&owner, "cover").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_store_replaces_asset_with_same_name() {
        let store = InMemoryAssetStore::new();
        let run_id = RunId::generate();

        store
            .store_asset(&run_id, Asset::new("report", "text/plain", b"v1".to_vec()))
            .await
            .unwrap();
        store
            .store_asset(&run_id, Asset::new("report", "text/markdown", b"v2".to_vec()))
            .await
            .unwrap();

        let asset = store.read_asset(&run_id, "report").await.unwrap().unwrap();
        assert_eq!(asset.content_type, "text/markdown");
        assert_eq!(asset.data, b"v2".to_vec());
    }

    #[tokio::test]
    async fn test_rejects_invalid_names() {
        let store = InMemoryAssetStore::new();
        let run_id = RunId::generate();

        let result = store
            .store_asset(&run_id, Asset::new("a/b", "text/plain", Vec::new()))
            .await;
        assert!(matches!(result, Err(AssetStoreError::InvalidAssetName(_))));
    }
}

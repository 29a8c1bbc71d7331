//! Filesystem implementation of AssetStorage

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use runcast_core::{validate_asset_name, Asset, AssetStorage, AssetStoreResult, RunId};

use crate::run_dir;

const META_SUFFIX: &str = ".meta.json";

/// Sidecar metadata written next to each asset
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetMetadata {
    content_type: String,
}

/// Stores assets below `<root>/<runId>/assets`
#[derive(Debug, Clone)]
pub struct FileSystemAssetStore {
    root: PathBuf,
}

impl FileSystemAssetStore {
    /// Create a store rooted at `root`. Directories are created on demand.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn assets_dir(&self, run_id: &RunId) -> AssetStoreResult<PathBuf> {
        Ok(run_dir(&self.root, run_id)?.join("assets"))
    }

    fn meta_path(dir: &Path, asset_name: &str) -> PathBuf {
        dir.join(format!("{}{}", asset_name, META_SUFFIX))
    }
}

#[async_trait]
impl AssetStorage for FileSystemAssetStore {
    async fn store_asset(&self, run_id: &RunId, asset: Asset) -> AssetStoreResult<()> {
        validate_asset_name(&asset.name)?;

        let dir = self.assets_dir(run_id)?;
        fs::create_dir_all(&dir).await?;

        // Data first: a readable sidecar implies complete bytes
        fs::write(dir.join(&asset.name), &asset.data).await?;
        let metadata = serde_json::to_vec(&AssetMetadata {
            content_type: asset.content_type.clone(),
        })?;
        fs::write(Self::meta_path(&dir, &asset.name), metadata).await?;

        debug!(
            %run_id,
            asset = %asset.name,
            size = asset.len(),
            dir = %dir.display(),
            "Wrote asset"
        );
        Ok(())
    }

    async fn read_asset(
        &self,
        run_id: &RunId,
        asset_name: &str,
    ) -> AssetStoreResult<Option<Asset>> {
        validate_asset_name(asset_name)?;
        let dir = self.assets_dir(run_id)?;

        let metadata = match fs::read(Self::meta_path(&dir, asset_name)).await {
            Ok(bytes) => serde_json::from_slice::<AssetMetadata>(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let data = match fs::read(dir.join(asset_name)).await {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Ok(Some(Asset::new(asset_name, metadata.content_type, data)))
    }

    async fn health_check(&self) -> AssetStoreResult<bool> {
        fs::create_dir_all(&self.root).await?;
        Ok(fs::metadata(&self.root).await?.is_dir())
    }
}

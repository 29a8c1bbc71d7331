//! Runcast Asset Store
//!
//! Implementations of the [`AssetStorage`](runcast_core::AssetStorage) and
//! [`RunLogger`](runcast_core::RunLogger) contracts.
//!
//! Both filesystem implementations lay files out per run:
//!
//! ```text
//! <root>/<runId>/assets/<name>            asset bytes
//! <root>/<runId>/assets/<name>.meta.json  { "contentType": ... }
//! <root>/<runId>/logs/<ts>-<seq>-error.json
//! ```

use std::path::{Path, PathBuf};

use runcast_core::{AssetStoreError, AssetStoreResult, RunId};

pub mod filesystem;
pub mod logger;
pub mod memory;

pub use filesystem::FileSystemAssetStore;
pub use logger::FileSystemRunLogger;
pub use memory::InMemoryAssetStore;

/// Directory of a run below `root`, rejecting ids that are not a single path segment
pub(crate) fn run_dir(root: &Path, run_id: &RunId) -> AssetStoreResult<PathBuf> {
    let id = run_id.as_str();
    if id.is_empty() || id == "." || id.contains("..") || id.contains('/') || id.contains('\\') {
        return Err(AssetStoreError::Backend(format!(
            "Invalid run id for filesystem layout: {:?}",
            id
        )));
    }
    Ok(root.join(id))
}

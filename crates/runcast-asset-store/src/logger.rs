//! Filesystem implementation of RunLogger
//!
//! Every error becomes one JSON document in the run's `logs` directory.
//! Errors without a run go to `<root>/logs`. Write failures are reported
//! through `tracing` and otherwise swallowed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::{error, warn};

use runcast_core::{AssetStoreResult, RunId, RunLogger};

use crate::run_dir;

/// Document written for each logged error
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorRecord<'a> {
    timestamp: DateTime<Utc>,
    run_id: Option<&'a RunId>,
    message: &'a str,
    error: String,
    causes: Vec<String>,
}

/// Writes run errors as JSON files below `root`
#[derive(Debug)]
pub struct FileSystemRunLogger {
    root: PathBuf,
    sequence: AtomicU64,
}

impl FileSystemRunLogger {
    /// Create a logger rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Root directory of the logger
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn logs_dir(&self, run_id: Option<&RunId>) -> AssetStoreResult<PathBuf> {
        match run_id {
            Some(run_id) => Ok(run_dir(&self.root, run_id)?.join("logs")),
            None => Ok(self.root.join("logs")),
        }
    }

    async fn write_record(&self, record: &ErrorRecord<'_>) -> AssetStoreResult<PathBuf> {
        let dir = self.logs_dir(record.run_id)?;
        fs::create_dir_all(&dir).await?;

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let file = dir.join(format!(
            "{}-{}-error.json",
            record.timestamp.format("%Y%m%dT%H%M%S%.3fZ"),
            sequence
        ));
        fs::write(&file, serde_json::to_vec_pretty(record)?).await?;
        Ok(file)
    }
}

#[async_trait]
impl RunLogger for FileSystemRunLogger {
    async fn log_error(&self, run_id: Option<&RunId>, message: &str, err: &anyhow::Error) {
        match run_id {
            Some(run_id) => error!(%run_id, error = ?err, "{}", message),
            None => error!(error = ?err, "{}", message),
        }

        let record = ErrorRecord {
            timestamp: Utc::now(),
            run_id,
            message,
            error: err.to_string(),
            causes: err.chain().skip(1).map(|cause| cause.to_string()).collect(),
        };

        if let Err(write_err) = self.write_record(&record).await {
            warn!(error = %write_err, root = %self.root.display(), "Failed to write run error log");
        }
    }
}

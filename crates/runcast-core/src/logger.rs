//! Run-scoped error logging contract

use async_trait::async_trait;
use std::fmt::Debug;
use tracing::error;

use crate::run::RunId;

/// Receives errors that happen after a response has been committed, or that
/// must be recorded against a run.
#[async_trait]
pub trait RunLogger: Send + Sync + Debug {
    /// Record an error, optionally attributed to a run
    async fn log_error(&self, run_id: Option<&RunId>, message: &str, error: &anyhow::Error);
}

/// Logger that forwards errors to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRunLogger;

impl TracingRunLogger {
    /// Create a new tracing logger
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RunLogger for TracingRunLogger {
    async fn log_error(&self, run_id: Option<&RunId>, message: &str, error: &anyhow::Error) {
        match run_id {
            Some(run_id) => error!(%run_id, error = ?error, "{}", message),
            None => error!(error = ?error, "{}", message),
        }
    }
}

//! Registry of runs owned by a server instance
//!
//! Maps run identifiers to runs. The submit path inserts, the stream, asset
//! and status paths read. Finished runs with no attached consumer can be
//! evicted after a retention period.

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};
use crate::run::{FlowRun, RunId};

/// Concurrent map from run id to run
pub struct RunRegistry<E> {
    runs: DashMap<RunId, Arc<FlowRun<E>>>,
}

impl<E> RunRegistry<E> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            runs: DashMap::new(),
        }
    }

    /// Register a run under its id. Never overwrites an existing entry.
    pub fn register(&self, run: Arc<FlowRun<E>>) -> CoreResult<()> {
        match self.runs.entry(run.id().clone()) {
            Entry::Occupied(entry) => Err(CoreError::DuplicateRun(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!(run_id = %run.id(), "Registered run");
                entry.insert(run);
                Ok(())
            }
        }
    }

    /// Look up a run
    pub fn get(&self, run_id: &str) -> Option<Arc<FlowRun<E>>> {
        self.runs.get(run_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether a run is registered
    pub fn contains(&self, run_id: &str) -> bool {
        self.runs.contains_key(run_id)
    }

    /// Number of registered runs
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Whether no run is registered
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Remove runs that finished at least `retention` ago and have no active
    /// stream consumer. Returns the evicted ids.
    pub fn evict_finished(&self, retention: Duration) -> Vec<RunId> {
        let now = Utc::now();
        let mut evicted = Vec::new();

        self.runs.retain(|run_id, run| {
            let expired = run
                .finished_at()
                .and_then(|finished_at| (now - finished_at).to_std().ok())
                .map(|age| age >= retention)
                .unwrap_or(false);

            if expired && !run.event_queue().has_consumer() {
                evicted.push(run_id.clone());
                false
            } else {
                true
            }
        });

        if !evicted.is_empty() {
            info!(count = evicted.len(), remaining = self.runs.len(), "Evicted finished runs");
        }
        evicted
    }
}

impl<E> Default for RunRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for RunRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunRegistry")
            .field("runs", &self.runs.len())
            .finish()
    }
}

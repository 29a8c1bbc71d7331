//! Flow runs
//!
//! A [`FlowRun`] is one execution of a flow. It owns the run's event queue and
//! gives the flow access to asset storage and the run logger. Its lifecycle is
//! `created -> running -> finished`; finishing closes the event queue so that
//! stream consumers terminate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;

use crate::asset::{validate_asset_name, Asset, AssetStorage};
use crate::error::CoreResult;
use crate::event_queue::EventQueue;
use crate::logger::RunLogger;
use crate::paths::PathProvider;

/// Opaque unique identifier of a run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the string representation of the identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RunId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RunId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for RunId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RunId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Registered, processing not started yet
    Created,
    /// Flow is processing
    Running,
    /// Terminal, the event queue is closed
    Finished,
}

/// How a finished run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Processing resolved
    Succeeded,
    /// Processing returned an error or panicked
    Failed,
}

#[derive(Debug)]
struct RunStatus {
    state: RunState,
    outcome: Option<RunOutcome>,
    finished_at: Option<DateTime<Utc>>,
}

/// Serializable view of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub id: RunId,
    pub state: RunState,
    pub outcome: Option<RunOutcome>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub events_path: String,
}

/// One execution of a flow
pub struct FlowRun<E> {
    id: RunId,
    event_queue: EventQueue<E>,
    paths: PathProvider,
    asset_storage: Arc<dyn AssetStorage>,
    logger: Arc<dyn RunLogger>,
    created_at: DateTime<Utc>,
    status: Mutex<RunStatus>,
}

impl<E> FlowRun<E> {
    /// Create a new run with a freshly generated identifier
    pub fn new(
        paths: PathProvider,
        asset_storage: Arc<dyn AssetStorage>,
        logger: Arc<dyn RunLogger>,
    ) -> Self {
        Self::with_id(RunId::generate(), paths, asset_storage, logger)
    }

    /// Create a new run with a caller-chosen identifier
    pub fn with_id(
        id: RunId,
        paths: PathProvider,
        asset_storage: Arc<dyn AssetStorage>,
        logger: Arc<dyn RunLogger>,
    ) -> Self {
        debug!(run_id = %id, "Creating flow run");
        Self {
            id,
            event_queue: EventQueue::new(),
            paths,
            asset_storage,
            logger,
            created_at: Utc::now(),
            status: Mutex::new(RunStatus {
                state: RunState::Created,
                outcome: None,
                finished_at: None,
            }),
        }
    }

    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn event_queue(&self) -> &EventQueue<E> {
        &self.event_queue
    }

    pub fn paths(&self) -> &PathProvider {
        &self.paths
    }

    pub fn logger(&self) -> &Arc<dyn RunLogger> {
        &self.logger
    }

    pub fn asset_storage(&self) -> &Arc<dyn AssetStorage> {
        &self.asset_storage
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> RunState {
        self.lock_status().state
    }

    pub fn outcome(&self) -> Option<RunOutcome> {
        self.lock_status().outcome
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.lock_status().finished_at
    }

    pub fn is_finished(&self) -> bool {
        self.state() == RunState::Finished
    }

    /// Move a created run to `running`. Has no effect in any other state.
    pub fn mark_running(&self) {
        let mut status = self.lock_status();
        if status.state == RunState::Created {
            status.state = RunState::Running;
        }
    }

    /// Publish an event to the run's stream.
    ///
    /// Fails with [`CoreError::QueueClosed`](crate::CoreError::QueueClosed)
    /// once the run has finished.
    pub fn publish_event(&self, event: E) -> CoreResult<()> {
        self.event_queue.push(event)
    }

    /// Store an asset for this run and return the URL it is served under
    pub async fn store_asset(
        &self,
        name: &str,
        content_type: &str,
        data: impl Into<Vec<u8>>,
    ) -> CoreResult<String> {
        validate_asset_name(name)?;

        let asset = Asset::new(name, content_type, data);
        let size = asset.len();
        self.asset_storage.store_asset(&self.id, asset).await?;

        debug!(run_id = %self.id, asset = name, size, "Stored asset");
        Ok(self.paths.asset_url(self.id.as_str(), name))
    }

    /// Enter the terminal state and close the event queue.
    ///
    /// Returns `false` if the run had already finished; the first outcome wins.
    pub fn finish(&self, outcome: RunOutcome) -> bool {
        {
            let mut status = self.lock_status();
            if status.state == RunState::Finished {
                return false;
            }
            status.state = RunState::Finished;
            status.outcome = Some(outcome);
            status.finished_at = Some(Utc::now());
        }

        self.event_queue.close();
        info!(run_id = %self.id, ?outcome, "Flow run finished");
        true
    }

    /// Snapshot of the run for status responses
    pub fn summary(&self) -> RunSummary {
        let status = self.lock_status();
        RunSummary {
            id: self.id.clone(),
            state: status.state,
            outcome: status.outcome,
            created_at: self.created_at,
            finished_at: status.finished_at,
            events_path: self.paths.events_path(self.id.as_str()),
        }
    }

    fn lock_status(&self) -> std::sync::MutexGuard<'_, RunStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Manual Debug implementation that doesn't try to debug the trait objects
impl<E> fmt::Debug for FlowRun<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowRun")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("event_queue", &self.event_queue)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetStoreResult;
    use crate::error::CoreError;
    use crate::testing::RecordingRunLogger;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::collections::HashMap;

    #[derive(Debug, Default)]
    struct MapStorage {
        assets: Mutex<HashMap<(RunId, String), Asset>>,
    }

    #[async_trait]
    impl AssetStorage for MapStorage {
        async fn store_asset(&self, run_id: &RunId, asset: Asset) -> AssetStoreResult<()> {
            self.assets
                .lock()
                .unwrap()
                .insert((run_id.clone(), asset.name.clone()), asset);
            Ok(())
        }

        async fn read_asset(
            &self,
            run_id: &RunId,
            asset_name: &str,
        ) -> AssetStoreResult<Option<Asset>> {
            Ok(self
                .assets
                .lock()
                .unwrap()
                .get(&(run_id.clone(), asset_name.to_string()))
                .cloned())
        }
    }

    fn new_run(storage: Arc<MapStorage>) -> FlowRun<String> {
        FlowRun::new(
            PathProvider::new("/flow"),
            storage,
            Arc::new(RecordingRunLogger::new()),
        )
    }

    #[test]
    fn test_run_ids_are_unique() {
        let a = RunId::generate();
        let b = RunId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let run = new_run(Arc::new(MapStorage::default()));
        assert_eq!(run.state(), RunState::Created);

        run.mark_running();
        assert_eq!(run.state(), RunState::Running);
        assert!(run.finished_at().is_none());

        assert!(run.finish(RunOutcome::Failed));
        assert!(!run.finish(RunOutcome::Succeeded));
        assert_eq!(run.state(), RunState::Finished);
        assert_eq!(run.outcome(), Some(RunOutcome::Failed));
        assert!(run.finished_at().is_some());

        // No way back from finished
        run.mark_running();
        assert_eq!(run.state(), RunState::Finished);
    }

    #[tokio::test]
    async fn test_finish_closes_event_stream() {
        let run = new_run(Arc::new(MapStorage::default()));
        run.publish_event("first".to_string()).unwrap();
        run.finish(RunOutcome::Succeeded);

        assert!(matches!(
            run.publish_event("late".to_string()),
            Err(CoreError::QueueClosed)
        ));

        let events: Vec<String> = run.event_queue().subscribe().unwrap().collect().await;
        assert_eq!(events, vec!["first".to_string()]);
    }

    #[tokio::test]
    async fn test_store_asset_returns_asset_url() {
        let storage = Arc::new(MapStorage::default());
        let run = new_run(storage.clone());

        let url = run.store_asset("cover", "image/png", vec![1u8, 2, 3]).await.unwrap();
        assert_eq!(url, format!("/flow/{}/assets/cover", run.id()));

        let stored = storage.read_asset(run.id(), "cover").await.unwrap().unwrap();
        assert_eq!(stored.content_type, "image/png");
        assert_eq!(stored.data, vec![1u8, 2, 3]);
    }

    #[tokio::test]
    async fn test_store_asset_rejects_unsafe_names() {
        let run = new_run(Arc::new(MapStorage::default()));
        let result = run.store_asset("../escape", "text/plain", b"x".to_vec()).await;
        assert!(matches!(result, Err(CoreError::AssetStorage(_))));
    }

    #[test]
    fn test_summary_serializes_in_camel_case() {
        let run = new_run(Arc::new(MapStorage::default()));
        let value = serde_json::to_value(run.summary()).unwrap();

        assert_eq!(value["id"], run.id().as_str());
        assert_eq!(value["state"], "created");
        assert!(value["outcome"].is_null());
        assert_eq!(value["eventsPath"], format!("/flow/{}/events", run.id()));
    }
}

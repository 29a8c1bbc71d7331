//! Main Runcast Server implementation
//!
//! This module contains the RuncastServer implementation: the run registry
//! owned by one server instance and the operations behind each endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use runcast_core::{
    launch_flow, Asset, AssetStorage, AssetStoreError, CoreError, EventStream, Flow, FlowRun,
    PathProvider, RunId, RunLogger, RunRegistry, RunSummary,
};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Response to a flow submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Identifier of the new run
    pub id: RunId,

    /// Event stream URL of the run, absolute when a base URL is configured
    pub path: String,
}

/// Server hosting a single flow
pub struct RuncastServer<F: Flow> {
    /// Configuration
    pub config: ServerConfig,

    /// The hosted flow
    flow: Arc<F>,

    /// Route derivation shared by every run
    paths: PathProvider,

    /// Runs of this server instance
    registry: RunRegistry<F::Event>,

    /// Asset storage handed to every run
    asset_storage: Arc<dyn AssetStorage>,

    /// Error logger handed to every run
    logger: Arc<dyn RunLogger>,
}

/// Manual Debug implementation that doesn't try to debug the flow
impl<F: Flow> std::fmt::Debug for RuncastServer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuncastServer")
            .field("config", &self.config)
            .field("flow", &self.flow.name())
            .field("registry", &self.registry)
            .finish()
    }
}

impl<F: Flow> RuncastServer<F> {
    /// Create a new RuncastServer
    pub fn new(
        config: ServerConfig,
        flow: F,
        asset_storage: Arc<dyn AssetStorage>,
        logger: Arc<dyn RunLogger>,
    ) -> Self {
        let mut paths = PathProvider::new(&config.base_path);
        if let Some(base_url) = &config.base_url {
            paths = paths.with_base_url(base_url);
        }

        Self {
            config,
            flow: Arc::new(flow),
            paths,
            registry: RunRegistry::new(),
            asset_storage,
            logger,
        }
    }

    pub fn flow(&self) -> &Arc<F> {
        &self.flow
    }

    pub fn paths(&self) -> &PathProvider {
        &self.paths
    }

    pub fn registry(&self) -> &RunRegistry<F::Event> {
        &self.registry
    }

    /// Validate `body`, register a new run and start processing it.
    ///
    /// Returns as soon as the run is registered; processing continues on a
    /// detached task. Invalid input is rejected before anything is created.
    pub fn submit(&self, body: Value) -> ServerResult<SubmitResponse> {
        let input = self.flow.parse_input(body)?;

        let run = Arc::new(FlowRun::new(
            self.paths.clone(),
            Arc::clone(&self.asset_storage),
            Arc::clone(&self.logger),
        ));
        self.registry.register(Arc::clone(&run))?;

        info!(flow = self.flow.name(), run_id = %run.id(), "Starting flow run");
        // Detached: the join handle is not tied to the request
        let _ = launch_flow(Arc::clone(&self.flow), input, Arc::clone(&run));

        Ok(SubmitResponse {
            id: run.id().clone(),
            path: self.paths.events_url(run.id().as_str()),
        })
    }

    /// Look up a registered run
    pub fn get_run(&self, run_id: &str) -> ServerResult<Arc<FlowRun<F::Event>>> {
        self.registry
            .get(run_id)
            .ok_or_else(|| ServerError::RunNotFound(run_id.to_string()))
    }

    /// Status of a registered run
    pub fn run_summary(&self, run_id: &str) -> ServerResult<RunSummary> {
        Ok(self.get_run(run_id)?.summary())
    }

    /// Attach the single consumer of a run's event stream
    pub fn open_event_stream(&self, run_id: &str) -> ServerResult<EventStream<F::Event>> {
        let run = self.get_run(run_id)?;
        run.event_queue().subscribe().map_err(|err| match err {
            CoreError::ConsumerAlreadyAttached => ServerError::ConsumerConflict(run_id.to_string()),
            other => other.into(),
        })
    }

    /// Read a named asset of a registered run.
    ///
    /// Missing runs and missing assets are logged through the run logger.
    pub async fn read_asset(&self, run_id: &str, asset_name: &str) -> ServerResult<Asset> {
        let run = match self.registry.get(run_id) {
            Some(run) => run,
            None => {
                let err = ServerError::RunNotFound(run_id.to_string());
                self.logger
                    .log_error(
                        None,
                        &format!("Asset {} requested for unknown run", asset_name),
                        &anyhow::anyhow!("{}", err),
                    )
                    .await;
                return Err(err);
            }
        };

        let result = self.asset_storage.read_asset(run.id(), asset_name).await;
        let err = match result {
            Ok(Some(asset)) => {
                debug!(%run_id, asset = asset_name, size = asset.len(), "Serving asset");
                return Ok(asset);
            }
            Ok(None) | Err(AssetStoreError::InvalidAssetName(_)) => ServerError::AssetNotFound {
                run_id: run_id.to_string(),
                asset_name: asset_name.to_string(),
            },
            Err(err) => ServerError::from(err),
        };

        self.logger
            .log_error(Some(run.id()), &err.to_string(), &anyhow::anyhow!("{}", err))
            .await;
        Err(err)
    }

    /// Check asset storage health
    pub async fn check_asset_storage_health(&self) -> ServerResult<bool> {
        Ok(self.asset_storage.health_check().await?)
    }

    /// Remove finished runs past the configured retention
    pub fn evict_finished_runs(&self) -> Vec<RunId> {
        match self.config.run_retention() {
            Some(retention) => self.registry.evict_finished(retention),
            None => Vec::new(),
        }
    }

    /// Start the periodic eviction sweep.
    ///
    /// The task holds a weak reference and stops once the server is dropped.
    /// Returns `None` when retention is disabled.
    pub fn spawn_eviction_task(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        self.config.run_retention()?;

        let server: Weak<Self> = Arc::downgrade(self);
        let interval = self.config.sweep_interval();
        let span = info_span!("run_eviction", interval_secs = interval.as_secs());

        Some(tokio::spawn(
            async move {
                let mut ticker = tokio::time::interval(interval);
                // The first tick completes immediately
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let Some(strong) = server.upgrade() else {
                        debug!("Server dropped, stopping eviction");
                        break;
                    };
                    let evicted = strong.evict_finished_runs();
                    if !evicted.is_empty() {
                        debug!(?evicted, "Eviction sweep removed runs");
                    }
                }
            }
            .instrument(span),
        ))
    }

    /// Run the server until Ctrl-C
    pub async fn run(self) -> ServerResult<()> {
        info!(flow = self.flow.name(), "Starting Runcast Server");

        let server = Arc::new(self);
        let _eviction = server.spawn_eviction_task();

        // Build the API router
        let app = crate::api::build_router(Arc::clone(&server));

        // Create and bind the TCP listener
        let listener =
            TcpListener::bind((server.config.bind_address.as_str(), server.config.port)).await?;
        let addr: SocketAddr = listener.local_addr()?;
        info!("Listening on {}{}", addr, server.paths.submit_path());

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::StreamExt;
    use runcast_asset_store::InMemoryAssetStore;
    use runcast_core::testing::RecordingRunLogger;
    use runcast_core::RunState;
    use serde::Deserialize;
    use serde_json::json;
    use std::time::Duration;

    #[derive(Debug, Deserialize)]
    struct GreetInput {
        name: String,
    }

    struct GreetFlow;

    #[async_trait]
    impl Flow for GreetFlow {
        type Input = GreetInput;
        type Event = String;

        fn name(&self) -> &str {
            "greet"
        }

        async fn process(
            &self,
            input: GreetInput,
            run: Arc<FlowRun<String>>,
        ) -> anyhow::Result<()> {
            run.publish_event(format!("hello {}", input.name))?;
            run.store_asset("greeting", "text/plain", input.name.into_bytes()).await?;
            Ok(())
        }
    }

    fn new_server(config: ServerConfig) -> (RuncastServer<GreetFlow>, Arc<RecordingRunLogger>) {
        let logger = Arc::new(RecordingRunLogger::new());
        let server = RuncastServer::new(
            config,
            GreetFlow,
            Arc::new(InMemoryAssetStore::new()),
            logger.clone(),
        );
        (server, logger)
    }

    async fn wait_until_finished(run: &FlowRun<String>) {
        for _ in 0..100 {
            if run.state() == RunState::Finished {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("run did not finish");
    }

    #[tokio::test]
    async fn test_submit_registers_and_runs() {
        let (server, logger) = new_server(ServerConfig::default());

        let response = server.submit(json!({ "name": "ada" })).unwrap();
        assert_eq!(response.path, format!("/flow/{}/events", response.id));

        let events: Vec<String> = server
            .open_event_stream(response.id.as_str())
            .unwrap()
            .collect()
            .await;
        assert_eq!(events, vec!["hello ada".to_string()]);

        let asset = server.read_asset(response.id.as_str(), "greeting").await.unwrap();
        assert_eq!(asset.data, b"ada".to_vec());
        assert!(logger.entries().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_input_creates_no_run() {
        let (server, _) = new_server(ServerConfig::default());

        let result = server.submit(json!({ "nom": "ada" }));
        assert!(matches!(result, Err(ServerError::ValidationError(_))));
        assert!(server.registry().is_empty());
    }

    #[tokio::test]
    async fn test_second_consumer_conflicts() {
        let (server, _) = new_server(ServerConfig::default());
        let response = server.submit(json!({ "name": "ada" })).unwrap();

        let _first = server.open_event_stream(response.id.as_str()).unwrap();
        assert!(matches!(
            server.open_event_stream(response.id.as_str()),
            Err(ServerError::ConsumerConflict(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_assets_are_logged() {
        let (server, logger) = new_server(ServerConfig::default());

        let result = server.read_asset("never-issued", "cover").await;
        assert!(matches!(result, Err(ServerError::RunNotFound(_))));

        let response = server.submit(json!({ "name": "ada" })).unwrap();
        let result = server.read_asset(response.id.as_str(), "cover").await;
        assert!(matches!(result, Err(ServerError::AssetNotFound { .. })));

        let entries = logger.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].run_id.is_none());
        assert_eq!(entries[1].run_id.as_ref(), Some(&response.id));
        assert_eq!(entries[1].message, "Asset cover not found");
    }

    #[tokio::test]
    async fn test_eviction_follows_retention_setting() {
        let (server, _) = new_server(ServerConfig {
            run_retention_secs: Some(0),
            ..ServerConfig::default()
        });
        let response = server.submit(json!({ "name": "ada" })).unwrap();
        let run = server.get_run(response.id.as_str()).unwrap();
        wait_until_finished(&run).await;

        assert_eq!(server.evict_finished_runs(), vec![response.id.clone()]);
        assert!(matches!(
            server.run_summary(response.id.as_str()),
            Err(ServerError::RunNotFound(_))
        ));

        let (server, _) = new_server(ServerConfig {
            run_retention_secs: None,
            ..ServerConfig::default()
        });
        let response = server.submit(json!({ "name": "ada" })).unwrap();
        wait_until_finished(&server.get_run(response.id.as_str()).unwrap()).await;
        assert!(server.evict_finished_runs().is_empty());
    }

    #[tokio::test]
    async fn test_eviction_task_stops_when_disabled() {
        let (server, _) = new_server(ServerConfig {
            run_retention_secs: None,
            ..ServerConfig::default()
        });
        assert!(Arc::new(server).spawn_eviction_task().is_none());
    }
}

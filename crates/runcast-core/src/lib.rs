//! Runcast Core
//!
//! Run lifecycle for long-running flows exposed over HTTP: per-run event
//! queues, the run registry, route derivation and the contracts of the
//! collaborators a server plugs in (flow, asset storage, run logger).

/// Asset storage contract
pub mod asset;

/// Error module
pub mod error;

/// Event queue module
pub mod event_queue;

/// Flow contract
pub mod flow;

/// Detached flow execution
pub mod launcher;

/// Run logger contract
pub mod logger;

/// Route derivation
pub mod paths;

/// Run registry
pub mod registry;

/// Flow runs
pub mod run;

/// Test doubles for collaborator traits
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export key types
pub use asset::{validate_asset_name, Asset, AssetStorage, AssetStoreError, AssetStoreResult};
pub use error::{CoreError, CoreResult};
pub use event_queue::{EventQueue, EventStream};
pub use flow::Flow;
pub use launcher::launch_flow;
pub use logger::{RunLogger, TracingRunLogger};
pub use paths::PathProvider;
pub use registry::RunRegistry;
pub use run::{FlowRun, RunId, RunOutcome, RunState, RunSummary};

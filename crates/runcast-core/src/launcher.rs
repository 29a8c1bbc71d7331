//! Detached flow execution
//!
//! Processing runs on its own task so it is not tied to the HTTP request that
//! started it. Whatever happens, the run ends up finished: errors and panics
//! are reported to the run logger, then the event queue is closed.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, info_span, Instrument};

use crate::flow::Flow;
use crate::run::{FlowRun, RunOutcome};

/// Spawn processing of `input` on `run` and return the task handle.
///
/// The handle resolves to the run's outcome. Dropping it does not cancel the
/// task.
pub fn launch_flow<F: Flow>(
    flow: Arc<F>,
    input: F::Input,
    run: Arc<FlowRun<F::Event>>,
) -> JoinHandle<RunOutcome> {
    let span = info_span!("flow_run", flow = flow.name(), run_id = %run.id());
    run.mark_running();

    tokio::spawn(
        async move {
            info!("Flow processing started");
            let result = AssertUnwindSafe(flow.process(input, Arc::clone(&run)))
                .catch_unwind()
                .await;

            let outcome = match result {
                Ok(Ok(())) => {
                    info!("Flow processing completed");
                    RunOutcome::Succeeded
                }
                Ok(Err(err)) => {
                    run.logger()
                        .log_error(Some(run.id()), "Failed to process flow", &err)
                        .await;
                    RunOutcome::Failed
                }
                Err(panic) => {
                    let err = anyhow::anyhow!("Flow panicked: {}", panic_message(panic.as_ref()));
                    run.logger()
                        .log_error(Some(run.id()), "Failed to process flow", &err)
                        .await;
                    RunOutcome::Failed
                }
            };

            run.finish(outcome);
            outcome
        }
        .instrument(span),
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}

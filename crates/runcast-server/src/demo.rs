//! Demo flow served by the `runcast-server` binary
//!
//! Walks through a number of steps for a topic, reporting progress on the
//! event stream, and finishes by storing a plain-text report asset.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use runcast_core::{CoreError, CoreResult, Flow, FlowRun};

/// Largest number of steps a demo run accepts
pub const MAX_STEPS: u32 = 20;

/// Input of a demo run
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DemoInput {
    /// Topic the report is written about
    pub topic: String,

    /// Number of progress steps
    #[serde(default = "default_steps")]
    pub steps: u32,
}

fn default_steps() -> u32 {
    3
}

/// Events published by a demo run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DemoEvent {
    Started {
        topic: String,
        steps: u32,
    },
    Progress {
        step: u32,
        total: u32,
        message: String,
    },
    Done {
        #[serde(rename = "reportUrl")]
        report_url: String,
    },
}

/// The demo flow
#[derive(Debug, Clone)]
pub struct DemoFlow {
    step_delay: Duration,
}

impl DemoFlow {
    pub fn new() -> Self {
        Self {
            step_delay: Duration::from_millis(250),
        }
    }

    /// Pause between two progress events
    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }
}

impl Default for DemoFlow {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Flow for DemoFlow {
    type Input = DemoInput;
    type Event = DemoEvent;

    fn name(&self) -> &str {
        "demo"
    }

    fn validate_input(&self, input: &DemoInput) -> CoreResult<()> {
        if input.topic.trim().is_empty() {
            return Err(CoreError::InvalidInput("topic must not be empty".to_string()));
        }
        if input.steps == 0 || input.steps > MAX_STEPS {
            return Err(CoreError::InvalidInput(format!(
                "steps must be between 1 and {}",
                MAX_STEPS
            )));
        }
        Ok(())
    }

    async fn process(&self, input: DemoInput, run: Arc<FlowRun<DemoEvent>>) -> anyhow::Result<()> {
        run.publish_event(DemoEvent::Started {
            topic: input.topic.clone(),
            steps: input.steps,
        })?;

        let mut report = format!("Report on {}\n", input.topic);
        for step in 1..=input.steps {
            if !self.step_delay.is_zero() {
                tokio::time::sleep(self.step_delay).await;
            }

            let message = format!("Finished step {} of {} on {}", step, input.steps, input.topic);
            debug!(run_id = %run.id(), step, "Demo step");
            report.push_str(&message);
            report.push('\n');

            run.publish_event(DemoEvent::Progress {
                step,
                total: input.steps,
                message,
            })?;
        }

        let report_url = run.store_asset("report", "text/plain", report).await?;
        run.publish_event(DemoEvent::Done { report_url })?;
        Ok(())
    }
}

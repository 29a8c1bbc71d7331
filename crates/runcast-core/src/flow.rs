//! The flow contract
//!
//! A flow is the pluggable computation hosted by the server. The core only
//! knows how to validate its input, launch it and deliver its events.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::run::FlowRun;

/// A schema-typed asynchronous computation
#[async_trait]
pub trait Flow: Send + Sync + 'static {
    /// Validated input of a run
    type Input: DeserializeOwned + Send + 'static;

    /// Events published to the run's stream
    type Event: Serialize + Send + Sync + 'static;

    /// Name used in logs
    fn name(&self) -> &str;

    /// Parse and validate a raw request body.
    ///
    /// Deserializes into [`Flow::Input`] and then applies
    /// [`validate_input`](Flow::validate_input). Input that fails here never
    /// reaches [`process`](Flow::process).
    fn parse_input(&self, raw: Value) -> CoreResult<Self::Input> {
        let input: Self::Input =
            serde_json::from_value(raw).map_err(|err| CoreError::InvalidInput(err.to_string()))?;
        self.validate_input(&input)?;
        Ok(input)
    }

    /// Constraints that the type alone does not express
    fn validate_input(&self, _input: &Self::Input) -> CoreResult<()> {
        Ok(())
    }

    /// Run the computation, publishing events and storing assets through `run`
    async fn process(
        &self,
        input: Self::Input,
        run: Arc<FlowRun<Self::Event>>,
    ) -> anyhow::Result<()>;
}

//! Closure adapter: lifts a function over control messages into a [`Stage`].

use async_trait::async_trait;
use batchflow_core::error::StageError;
use batchflow_core::{ControlMessage, PipelineMessage, Stage};

/// Wraps a `Fn(ControlMessage) -> Result<ControlMessage, StageError>` as a pipeline stage,
/// for one-off processing steps that do not warrant a named stage type.
pub struct FnStage<F> {
    name: String,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(ControlMessage) -> Result<ControlMessage, StageError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(ControlMessage) -> Result<ControlMessage, StageError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, msg: PipelineMessage) -> Result<Vec<PipelineMessage>, StageError> {
        match msg {
            PipelineMessage::Control(control) => {
                Ok(vec![PipelineMessage::Control((self.func)(control)?)])
            }
            PipelineMessage::Meta(_) => Err(StageError::Mismatch(format!(
                "stage '{}' expects ControlMessage input",
                self.name
            ))),
        }
    }
}

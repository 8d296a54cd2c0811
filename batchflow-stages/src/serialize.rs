//! Serialize stage: unwraps control messages back into plain message envelopes,
//! with optional column filtering.

use async_trait::async_trait;
use batchflow_core::error::StageError;
use batchflow_core::table::filter_columns;
use batchflow_core::{MessageMeta, PipelineMessage, Stage};

/// Converts each [`batchflow_core::ControlMessage`] back to a [`MessageMeta`].
/// `include` selects columns (empty means all); `exclude` removes columns and wins on overlap.
#[derive(Default)]
pub struct SerializeStage {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl SerializeStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_include(mut self, include: Vec<String>) -> Self {
        self.include = include;
        self
    }

    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }
}

#[async_trait]
impl Stage for SerializeStage {
    fn name(&self) -> &str {
        "serialize"
    }

    async fn process(&self, msg: PipelineMessage) -> Result<Vec<PipelineMessage>, StageError> {
        let control = match msg {
            PipelineMessage::Control(control) => control,
            PipelineMessage::Meta(_) => {
                return Err(StageError::Mismatch(
                    "serialize expects ControlMessage input".to_string(),
                ))
            }
        };

        let meta = control.into_payload()?;
        let meta = if self.include.is_empty() && self.exclude.is_empty() {
            meta
        } else {
            MessageMeta::new(filter_columns(&meta.batch, &self.include, &self.exclude)?)
        };
        Ok(vec![PipelineMessage::Meta(meta)])
    }
}

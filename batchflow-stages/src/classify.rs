//! Classification stage: thresholds numeric columns and relabels them with class names.

use async_trait::async_trait;
use batchflow_core::error::StageError;
use batchflow_core::table::threshold_batch;
use batchflow_core::{MessageMeta, PipelineMessage, Stage};
use tracing::debug;

/// Replaces each control message's payload batch with `value > threshold` boolean columns,
/// renamed to the configured class labels. Offset and metadata are preserved.
pub struct AddClassificationsStage {
    threshold: f64,
    class_labels: Vec<String>,
}

impl AddClassificationsStage {
    pub fn new(threshold: f64, class_labels: Vec<String>) -> Self {
        Self {
            threshold,
            class_labels,
        }
    }
}

#[async_trait]
impl Stage for AddClassificationsStage {
    fn name(&self) -> &str {
        "add-classifications"
    }

    async fn process(&self, msg: PipelineMessage) -> Result<Vec<PipelineMessage>, StageError> {
        let mut control = match msg {
            PipelineMessage::Control(control) => control,
            PipelineMessage::Meta(_) => {
                return Err(StageError::Mismatch(
                    "add-classifications expects ControlMessage input".to_string(),
                ))
            }
        };

        let classified = threshold_batch(&control.payload()?.batch, self.threshold, &self.class_labels)?;
        debug!(
            rows = classified.num_rows(),
            labels = self.class_labels.len(),
            "Applied classifications"
        );
        control.set_payload(MessageMeta::new(classified));
        Ok(vec![PipelineMessage::Control(control)])
    }
}

//! Deserialize stage: splits incoming batches into control-message slices.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use batchflow_core::error::StageError;
use batchflow_core::{ControlMessage, MessageMeta, PipelineConfig, PipelineMessage, Stage};
use tracing::debug;

/// Turns each [`MessageMeta`] into one or more [`ControlMessage`]s of at most
/// `pipeline_batch_size` rows.
///
/// With `ensure_sliceable_index` each slice gets an absolute row offset from a running
/// total across the whole stream; without it offsets restart at 0 per message.
pub struct DeserializeStage {
    batch_size: usize,
    ensure_sliceable_index: bool,
    next_offset: AtomicUsize,
}

impl DeserializeStage {
    pub fn new(config: &PipelineConfig, ensure_sliceable_index: bool) -> Self {
        Self {
            batch_size: config.pipeline_batch_size,
            ensure_sliceable_index,
            next_offset: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Stage for DeserializeStage {
    fn name(&self) -> &str {
        "deserialize"
    }

    async fn process(&self, msg: PipelineMessage) -> Result<Vec<PipelineMessage>, StageError> {
        let meta = match msg {
            PipelineMessage::Meta(meta) => meta,
            PipelineMessage::Control(_) => {
                return Err(StageError::Mismatch(
                    "deserialize expects MessageMeta input".to_string(),
                ))
            }
        };

        let rows = meta.row_count();
        let mut out = Vec::new();
        let mut local_offset = 0usize;
        while local_offset < rows {
            let len = self.batch_size.min(rows - local_offset);
            let slice = meta.batch.slice(local_offset, len);
            let offset = if self.ensure_sliceable_index {
                self.next_offset.fetch_add(len, Ordering::SeqCst)
            } else {
                local_offset
            };
            out.push(PipelineMessage::Control(ControlMessage::new(
                MessageMeta::new(slice),
                offset,
            )));
            local_offset += len;
        }
        // Empty batches produce no control messages.
        debug!(rows, slices = out.len(), "Deserialized message");
        Ok(out)
    }
}

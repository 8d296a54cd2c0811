//! Message envelopes and stage traits: [`MessageMeta`], [`ControlMessage`], [`PipelineMessage`],
//! and the [`Stage`] / [`SourceStage`] seams every pipeline component implements.

use std::collections::HashMap;

use arrow_array::RecordBatch;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::StageError;

/// Envelope over a tabular batch: id, data, and creation time.
#[derive(Debug, Clone)]
pub struct MessageMeta {
    pub id: String,
    pub batch: RecordBatch,
    pub created_at: DateTime<Utc>,
}

impl MessageMeta {
    /// Wraps a batch in a fresh envelope with a v4 uuid id.
    pub fn new(batch: RecordBatch) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            batch,
            created_at: Utc::now(),
        }
    }

    /// Returns a copy of the wrapped batch. Columns are reference-counted, so the copy is cheap.
    pub fn copy_dataframe(&self) -> RecordBatch {
        self.batch.clone()
    }

    pub fn row_count(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn column_count(&self) -> usize {
        self.batch.num_columns()
    }
}

/// Unit of work between deserialize and serialize: an optional payload batch, the absolute
/// row offset of that slice, and free-form metadata set by processing stages.
#[derive(Debug, Clone, Default)]
pub struct ControlMessage {
    payload: Option<MessageMeta>,
    pub slice_offset: usize,
    metadata: HashMap<String, serde_json::Value>,
}

impl ControlMessage {
    pub fn new(payload: MessageMeta, slice_offset: usize) -> Self {
        Self {
            payload: Some(payload),
            slice_offset,
            metadata: HashMap::new(),
        }
    }

    /// Borrows the payload, or errors when the message carries none.
    pub fn payload(&self) -> Result<&MessageMeta, StageError> {
        self.payload.as_ref().ok_or(StageError::MissingPayload)
    }

    /// Consumes the message and takes its payload, or errors when the message carries none.
    pub fn into_payload(self) -> Result<MessageMeta, StageError> {
        self.payload.ok_or(StageError::MissingPayload)
    }

    /// Replaces the payload, keeping offset and metadata.
    pub fn set_payload(&mut self, payload: MessageMeta) {
        self.payload = Some(payload);
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
    }

    pub fn get_metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    pub fn row_count(&self) -> usize {
        self.payload.as_ref().map_or(0, MessageMeta::row_count)
    }
}

/// The single type flowing along pipeline edges.
#[derive(Debug, Clone)]
pub enum PipelineMessage {
    Meta(MessageMeta),
    Control(ControlMessage),
}

impl PipelineMessage {
    pub fn row_count(&self) -> usize {
        match self {
            Self::Meta(meta) => meta.row_count(),
            Self::Control(control) => control.row_count(),
        }
    }

    /// Short variant tag for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Meta(_) => "meta",
            Self::Control(_) => "control",
        }
    }
}

/// Head of a pipeline: pushes messages into the first edge until exhausted.
/// Returning drops the sender, which signals end-of-stream downstream.
#[async_trait]
pub trait SourceStage: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, tx: mpsc::Sender<PipelineMessage>) -> Result<(), StageError>;
}

/// A pipeline processing step: zero, one, or many outputs per input.
/// The driver runs all inputs through `process`, then calls `on_complete` once after
/// upstream end-of-stream, before the stage's own sender drops.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    async fn process(&self, msg: PipelineMessage) -> Result<Vec<PipelineMessage>, StageError>;

    async fn on_complete(&self) -> Result<(), StageError> {
        Ok(())
    }
}

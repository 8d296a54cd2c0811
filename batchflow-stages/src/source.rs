//! In-memory sources: a fixed message list and a generator-backed variant.

use async_trait::async_trait;
use batchflow_core::error::StageError;
use batchflow_core::{MessageMeta, PipelineMessage, SourceStage};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

/// Emits a fixed list of messages in order, then ends the stream.
pub struct InMemorySourceStage {
    messages: Vec<MessageMeta>,
}

impl InMemorySourceStage {
    pub fn new(messages: Vec<MessageMeta>) -> Self {
        Self { messages }
    }
}

#[async_trait]
impl SourceStage for InMemorySourceStage {
    fn name(&self) -> &str {
        "in-memory-source"
    }

    #[instrument(skip(self, tx))]
    async fn run(&self, tx: mpsc::Sender<PipelineMessage>) -> Result<(), StageError> {
        let mut emitted = 0usize;
        for meta in self.messages.iter().cloned() {
            if tx.send(PipelineMessage::Meta(meta)).await.is_err() {
                // Downstream hung up (shutdown or error); stop emitting.
                warn!(emitted, "Downstream closed before source exhausted");
                return Ok(());
            }
            emitted += 1;
        }
        info!(emitted, "Source exhausted");
        Ok(())
    }
}

type MetaGenerator =
    Box<dyn Fn() -> Box<dyn Iterator<Item = MessageMeta> + Send> + Send + Sync>;

/// Emits everything a generator closure yields. The closure is invoked once per run,
/// so the same source can drive repeated pipeline runs.
pub struct InMemoryDataGenStage {
    generator: MetaGenerator,
}

impl InMemoryDataGenStage {
    pub fn new<F, I>(generator: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: Iterator<Item = MessageMeta> + Send + 'static,
    {
        Self {
            generator: Box::new(move || Box::new(generator())),
        }
    }
}

#[async_trait]
impl SourceStage for InMemoryDataGenStage {
    fn name(&self) -> &str {
        "in-memory-data-gen"
    }

    #[instrument(skip(self, tx))]
    async fn run(&self, tx: mpsc::Sender<PipelineMessage>) -> Result<(), StageError> {
        let mut emitted = 0usize;
        for meta in (self.generator)() {
            if tx.send(PipelineMessage::Meta(meta)).await.is_err() {
                warn!(emitted, "Downstream closed before generator exhausted");
                return Ok(());
            }
            emitted += 1;
        }
        info!(emitted, "Generator exhausted");
        Ok(())
    }
}

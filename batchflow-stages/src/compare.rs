//! Compare stage: terminal sink that checks every received batch against an expected one.

use std::sync::Mutex;

use arrow_array::RecordBatch;
use async_trait::async_trait;
use batchflow_core::error::StageError;
use batchflow_core::table::first_difference;
use batchflow_core::{PipelineMessage, Stage};
use tracing::{info, warn};

/// Outcome of a compare run: how many messages arrived and how many matched.
#[derive(Debug, Clone, Default)]
pub struct CompareResults {
    pub total: usize,
    pub matched: usize,
    /// First mismatch seen, if any.
    pub first_diff: Option<String>,
}

impl CompareResults {
    /// True when at least one message arrived and every one matched.
    pub fn passed(&self) -> bool {
        self.total > 0 && self.matched == self.total
    }
}

/// Panics unless the compare stage saw at least one message and all of them matched.
/// Test helper; the panic message carries the first observed difference.
pub fn assert_results(results: &CompareResults) {
    assert!(results.total > 0, "compare stage received no messages");
    assert_eq!(
        results.matched,
        results.total,
        "{} of {} messages mismatched; first difference: {}",
        results.total - results.matched,
        results.total,
        results.first_diff.as_deref().unwrap_or("unknown")
    );
}

/// Terminal stage: accumulates per-message comparison outcomes against an expected batch.
/// Accepts both message variants (control messages are compared by payload) and emits nothing.
pub struct CompareDataFrameStage {
    expected: RecordBatch,
    results: Mutex<CompareResults>,
}

impl CompareDataFrameStage {
    pub fn new(expected: RecordBatch) -> Self {
        Self {
            expected,
            results: Mutex::new(CompareResults::default()),
        }
    }

    /// Snapshot of the accumulated results.
    pub fn get_results(&self) -> CompareResults {
        self.results.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Stage for CompareDataFrameStage {
    fn name(&self) -> &str {
        "compare-dataframe"
    }

    async fn process(&self, msg: PipelineMessage) -> Result<Vec<PipelineMessage>, StageError> {
        let diff = match &msg {
            PipelineMessage::Meta(meta) => first_difference(&meta.batch, &self.expected),
            PipelineMessage::Control(control) => {
                first_difference(&control.payload()?.batch, &self.expected)
            }
        };

        let mut results = self.results.lock().unwrap_or_else(|e| e.into_inner());
        results.total += 1;
        match diff {
            None => results.matched += 1,
            Some(diff) => {
                warn!(diff = %diff, "Received batch does not match expected");
                results.first_diff.get_or_insert(diff);
            }
        }
        Ok(Vec::new())
    }

    async fn on_complete(&self) -> Result<(), StageError> {
        let results = self.get_results();
        info!(
            total = results.total,
            matched = results.matched,
            passed = results.passed(),
            "Compare complete"
        );
        Ok(())
    }
}

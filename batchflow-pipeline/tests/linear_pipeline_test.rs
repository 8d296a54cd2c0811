//! Driver-level tests for [`batchflow_pipeline::LinearPipeline`].
//!
//! Covers: assembly validation, single-threaded ordering, stage-error propagation,
//! and an end-to-end classification run checked against the thresholding kernel.

use std::sync::{Arc, Mutex};

use arrow_array::{ArrayRef, Float64Array, RecordBatch};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use batchflow_core::table::{range_batch, threshold_batch};
use batchflow_core::{
    FlowError, MessageMeta, PipelineConfig, PipelineMessage, Stage, StageError,
};
use batchflow_pipeline::LinearPipeline;
use batchflow_stages::{
    assert_results, AddClassificationsStage, CompareDataFrameStage, DeserializeStage,
    InMemorySourceStage, SerializeStage,
};

/// Terminal test stage recording the row count of every message it sees.
struct RecordingStage {
    seen: Arc<Mutex<Vec<usize>>>,
}

#[async_trait]
impl Stage for RecordingStage {
    fn name(&self) -> &str {
        "recording"
    }

    async fn process(&self, msg: PipelineMessage) -> Result<Vec<PipelineMessage>, StageError> {
        self.seen.lock().unwrap().push(msg.row_count());
        Ok(Vec::new())
    }
}

/// Stage that fails on every message.
struct FailingStage;

#[async_trait]
impl Stage for FailingStage {
    fn name(&self) -> &str {
        "failing"
    }

    async fn process(&self, _msg: PipelineMessage) -> Result<Vec<PipelineMessage>, StageError> {
        Err(StageError::Metadata("boom".to_string()))
    }
}

fn metas_with_rows(rows: &[usize]) -> Vec<MessageMeta> {
    rows.iter()
        .map(|&r| MessageMeta::new(range_batch(r, 1).unwrap()))
        .collect()
}

/// **Test: A pipeline without a source or without stages refuses to run.**
#[tokio::test]
async fn test_run_requires_source_and_stages() {
    let pipe = LinearPipeline::new(PipelineConfig::default());
    let err = pipe.run().await.unwrap_err();
    assert!(matches!(err, FlowError::Build(_)), "got: {err}");

    let mut pipe = LinearPipeline::new(PipelineConfig::default());
    pipe.set_source(Arc::new(InMemorySourceStage::new(metas_with_rows(&[1]))));
    let err = pipe.run().await.unwrap_err();
    assert!(matches!(err, FlowError::Build(_)), "got: {err}");
}

/// **Test: An invalid config is rejected before anything is spawned.**
#[tokio::test]
async fn test_run_rejects_invalid_config() {
    let mut config = PipelineConfig::default();
    config.edge_buffer_size = 0;

    let mut pipe = LinearPipeline::new(config);
    pipe.set_source(Arc::new(InMemorySourceStage::new(metas_with_rows(&[1]))));
    pipe.add_stage(Arc::new(RecordingStage {
        seen: Arc::new(Mutex::new(Vec::new())),
    }));

    let err = pipe.run().await.unwrap_err();
    assert!(matches!(err, FlowError::Config(_)), "got: {err}");
}

/// **Test: With num_threads = 1 messages reach the terminal stage in source order.**
///
/// **Setup:** Five messages with distinct row counts (1..=5); a recording terminal stage.
/// **Action:** Run the pipeline.
/// **Expected:** Row counts recorded as 1, 2, 3, 4, 5.
#[tokio::test]
async fn test_single_threaded_ordering() {
    let seen = Arc::new(Mutex::new(Vec::new()));

    let mut pipe = LinearPipeline::new(PipelineConfig::default());
    pipe.set_source(Arc::new(InMemorySourceStage::new(metas_with_rows(&[
        1, 2, 3, 4, 5,
    ]))));
    pipe.add_stage(Arc::new(RecordingStage { seen: seen.clone() }));

    pipe.run().await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4, 5]);
}

/// **Test: A failing stage surfaces as a Stage error carrying the stage name.**
///
/// **Setup:** Source with messages; a failing middle stage; a recording terminal stage.
/// **Action:** Run the pipeline.
/// **Expected:** `run` returns `FlowError::Stage` for "failing"; the terminal stage saw nothing.
#[tokio::test]
async fn test_stage_error_propagates() {
    let seen = Arc::new(Mutex::new(Vec::new()));

    let mut pipe = LinearPipeline::new(PipelineConfig::default());
    pipe.set_source(Arc::new(InMemorySourceStage::new(metas_with_rows(&[
        2, 2, 2,
    ]))));
    pipe.add_stage(Arc::new(FailingStage));
    pipe.add_stage(Arc::new(RecordingStage { seen: seen.clone() }));

    let err = pipe.run().await.unwrap_err();
    match err {
        FlowError::Stage { stage, .. } => assert_eq!(stage, "failing"),
        other => panic!("expected stage error, got: {other}"),
    }
    assert!(seen.lock().unwrap().is_empty());
}

/// **Test: Classification pipeline produces the thresholded, relabeled batches.**
///
/// **Setup:** One float-column batch of probabilities; deserialize → classify(0.5,
/// ["is_large"]) → serialize → compare against the thresholding kernel's output.
/// **Action:** Run the pipeline.
/// **Expected:** Compare passes with exactly one received message.
#[tokio::test]
async fn test_classification_pipe() {
    let batch = RecordBatch::try_new(
        Arc::new(Schema::new(vec![Field::new("p", DataType::Float64, false)])),
        vec![Arc::new(Float64Array::from(vec![0.1, 0.4, 0.7, 0.95])) as ArrayRef],
    )
    .unwrap();
    let expected = threshold_batch(&batch, 0.5, &["is_large".to_string()]).unwrap();

    let config = PipelineConfig::default();
    let mut pipe = LinearPipeline::new(config.clone());
    pipe.set_source(Arc::new(InMemorySourceStage::new(vec![MessageMeta::new(
        batch,
    )])));
    pipe.add_stage(Arc::new(DeserializeStage::new(&config, true)));
    pipe.add_stage(Arc::new(AddClassificationsStage::new(
        0.5,
        vec!["is_large".to_string()],
    )));
    pipe.add_stage(Arc::new(SerializeStage::new()));
    let comp_stage = Arc::new(CompareDataFrameStage::new(expected));
    pipe.add_stage(comp_stage.clone());

    pipe.run().await.unwrap();

    let results = comp_stage.get_results();
    assert_eq!(results.total, 1);
    assert_results(&results);
}

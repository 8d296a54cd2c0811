//! # batchflow-pipeline
//!
//! Linear pipeline driver: a source followed by an ordered list of stages, wired with
//! bounded channels. Each stage runs `num_threads` workers; end-of-stream propagates by
//! sender drop, and the first stage error wins after all tasks join.

use std::sync::Arc;

use batchflow_core::{FlowError, PipelineConfig, PipelineMessage, Result, SourceStage, Stage};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument};

/// A source plus ordered stages, executed with one bounded channel per hop.
pub struct LinearPipeline {
    config: PipelineConfig,
    source: Option<Arc<dyn SourceStage>>,
    stages: Vec<Arc<dyn Stage>>,
}

impl LinearPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            source: None,
            stages: Vec::new(),
        }
    }

    /// Sets (or replaces) the pipeline head.
    pub fn set_source(&mut self, source: Arc<dyn SourceStage>) -> &mut Self {
        self.source = Some(source);
        self
    }

    /// Appends a stage. Keep your own clone of the Arc to inspect the stage after the run
    /// (e.g. a compare stage's results).
    pub fn add_stage(&mut self, stage: Arc<dyn Stage>) -> &mut Self {
        self.stages.push(stage);
        self
    }

    /// Runs the pipeline to completion.
    ///
    /// The source and every stage worker are spawned on a [`JoinSet`]; the terminal stage's
    /// outputs are discarded. With `num_threads = 1` messages reach each stage in source
    /// order. Returns the first stage error; secondary channel-teardown errors never mask it.
    #[instrument(skip(self), name = "linear_pipeline")]
    pub async fn run(&self) -> Result<()> {
        self.config.validate()?;
        let source = self
            .source
            .clone()
            .ok_or_else(|| FlowError::Build("pipeline has no source".to_string()))?;
        if self.stages.is_empty() {
            return Err(FlowError::Build("pipeline has no stages".to_string()));
        }

        info!(
            source = source.name(),
            stages = self.stages.len(),
            num_threads = self.config.num_threads,
            "Pipeline starting"
        );

        let mut tasks: JoinSet<Result<()>> = JoinSet::new();

        let (source_tx, mut upstream_rx) =
            mpsc::channel::<PipelineMessage>(self.config.edge_buffer_size);
        {
            let source = source.clone();
            tasks.spawn(async move {
                let name = source.name().to_string();
                source.run(source_tx).await.map_err(|e| FlowError::Stage {
                    stage: name,
                    source: e,
                })
            });
        }

        let last_index = self.stages.len() - 1;
        for stage in &self.stages[..last_index] {
            let (tx, next_rx) = mpsc::channel::<PipelineMessage>(self.config.edge_buffer_size);
            spawn_stage(
                &mut tasks,
                stage.clone(),
                upstream_rx,
                Some(tx),
                self.config.num_threads,
            );
            upstream_rx = next_rx;
        }
        // The terminal stage has no downstream edge; its outputs are discarded.
        spawn_stage(
            &mut tasks,
            self.stages[last_index].clone(),
            upstream_rx,
            None,
            self.config.num_threads,
        );

        let mut first_error: Option<FlowError> = None;
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(error = %e, "Pipeline stage failed");
                    first_error = prefer_error(first_error, e);
                }
                Err(join_err) => {
                    error!(error = %join_err, "Pipeline task panicked");
                    first_error =
                        prefer_error(first_error, FlowError::Task(join_err.to_string()));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(stages = self.stages.len(), "Pipeline finished");
                Ok(())
            }
        }
    }
}

/// Spawns one coordinator task for a stage: `num_threads` workers share the upstream
/// receiver; after all workers finish, `on_complete` runs once and only then does the
/// stage's sender drop, so downstream sees end-of-stream after the completion hook.
fn spawn_stage(
    tasks: &mut JoinSet<Result<()>>,
    stage: Arc<dyn Stage>,
    rx: mpsc::Receiver<PipelineMessage>,
    tx: Option<mpsc::Sender<PipelineMessage>>,
    num_threads: usize,
) {
    tasks.spawn(async move {
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let mut workers: JoinSet<Result<()>> = JoinSet::new();
        for _ in 0..num_threads {
            let rx = rx.clone();
            let tx = tx.clone();
            let stage = stage.clone();
            workers.spawn(async move {
                loop {
                    let msg = { rx.lock().await.recv().await };
                    let Some(msg) = msg else { break };
                    debug!(stage = stage.name(), kind = msg.kind(), "Processing message");
                    let outputs = stage.process(msg).await.map_err(|e| FlowError::Stage {
                        stage: stage.name().to_string(),
                        source: e,
                    })?;
                    if let Some(tx) = &tx {
                        for output in outputs {
                            if tx.send(output).await.is_err() {
                                return Err(FlowError::Channel(format!(
                                    "stage '{}' downstream closed",
                                    stage.name()
                                )));
                            }
                        }
                    }
                }
                Ok(())
            });
        }

        let mut first_error: Option<FlowError> = None;
        while let Some(result) = workers.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => first_error = prefer_error(first_error, e),
                Err(join_err) => {
                    first_error =
                        prefer_error(first_error, FlowError::Task(join_err.to_string()));
                }
            }
        }

        if first_error.is_none() {
            first_error = stage
                .on_complete()
                .await
                .map_err(|e| FlowError::Stage {
                    stage: stage.name().to_string(),
                    source: e,
                })
                .err();
        }

        // tx (if any) drops here, cascading end-of-stream after on_complete has run.
        drop(tx);

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    });
}

/// Keeps the most informative error: a real stage failure is never replaced by the
/// channel-teardown noise it causes upstream.
fn prefer_error(current: Option<FlowError>, new: FlowError) -> Option<FlowError> {
    match current {
        None => Some(new),
        Some(FlowError::Channel(_)) if !matches!(new, FlowError::Channel(_)) => Some(new),
        some => some,
    }
}

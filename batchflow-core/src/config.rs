//! Pipeline configuration: defaults and env-based loading.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};

/// Runtime configuration shared by the pipeline driver and stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Workers spawned per stage. 1 preserves source ordering end to end.
    pub num_threads: usize,
    /// Bounded channel capacity for each pipeline edge.
    pub edge_buffer_size: usize,
    /// Maximum rows per control message produced by the deserialize stage.
    pub pipeline_batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_threads: 1,
            edge_buffer_size: 128,
            pipeline_batch_size: 256,
        }
    }
}

impl PipelineConfig {
    /// Load from environment variables (BATCHFLOW_NUM_THREADS, BATCHFLOW_EDGE_BUFFER_SIZE,
    /// BATCHFLOW_PIPELINE_BATCH_SIZE), falling back to defaults for unset or unparsable values.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            num_threads: env_usize("BATCHFLOW_NUM_THREADS", defaults.num_threads),
            edge_buffer_size: env_usize("BATCHFLOW_EDGE_BUFFER_SIZE", defaults.edge_buffer_size),
            pipeline_batch_size: env_usize(
                "BATCHFLOW_PIPELINE_BATCH_SIZE",
                defaults.pipeline_batch_size,
            ),
        };
        config.validate()?;
        tracing::debug!(?config, "Loaded pipeline config from environment");
        Ok(config)
    }

    /// Rejects configurations no pipeline can run with.
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == 0 {
            return Err(FlowError::Config("num_threads must be non-zero".to_string()));
        }
        if self.edge_buffer_size == 0 {
            return Err(FlowError::Config(
                "edge_buffer_size must be non-zero".to_string(),
            ));
        }
        if self.pipeline_batch_size == 0 {
            return Err(FlowError::Config(
                "pipeline_batch_size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

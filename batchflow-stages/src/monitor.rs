//! Monitor stage: pass-through throughput observer.
//!
//! Counts messages and rows without touching the data, logs a progress line every
//! `log_interval` messages, and a final summary with rates at end-of-stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use batchflow_core::error::StageError;
use batchflow_core::{PipelineMessage, Stage};
use tracing::info;

const DEFAULT_LOG_INTERVAL: u64 = 100;

pub struct MonitorStage {
    name: String,
    description: String,
    unit: String,
    log_interval: u64,
    messages: AtomicU64,
    rows: AtomicU64,
    first_message_at: Mutex<Option<Instant>>,
}

impl MonitorStage {
    pub fn new(description: impl Into<String>, unit: impl Into<String>) -> Self {
        let description = description.into();
        Self {
            name: format!("monitor-{description}"),
            description,
            unit: unit.into(),
            log_interval: DEFAULT_LOG_INTERVAL,
            messages: AtomicU64::new(0),
            rows: AtomicU64::new(0),
            first_message_at: Mutex::new(None),
        }
    }

    /// Messages between progress lines (default 100).
    pub fn with_log_interval(mut self, log_interval: u64) -> Self {
        self.log_interval = log_interval.max(1);
        self
    }

    pub fn message_count(&self) -> u64 {
        self.messages.load(Ordering::SeqCst)
    }

    pub fn row_count(&self) -> u64 {
        self.rows.load(Ordering::SeqCst)
    }

    fn rate_per_sec(&self, count: u64) -> f64 {
        let started = self
            .first_message_at
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .unwrap_or_else(Instant::now);
        let elapsed = started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            count as f64 / elapsed
        } else {
            0.0
        }
    }
}

#[async_trait]
impl Stage for MonitorStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, msg: PipelineMessage) -> Result<Vec<PipelineMessage>, StageError> {
        {
            let mut first = self
                .first_message_at
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            first.get_or_insert_with(Instant::now);
        }

        let count = self.messages.fetch_add(1, Ordering::SeqCst) + 1;
        self.rows.fetch_add(msg.row_count() as u64, Ordering::SeqCst);

        if count % self.log_interval == 0 {
            info!(
                description = %self.description,
                unit = %self.unit,
                messages = count,
                rows = self.rows.load(Ordering::SeqCst),
                rate_per_sec = self.rate_per_sec(count),
                "Monitor progress"
            );
        }

        Ok(vec![msg])
    }

    async fn on_complete(&self) -> Result<(), StageError> {
        let count = self.message_count();
        info!(
            description = %self.description,
            unit = %self.unit,
            messages = count,
            rows = self.row_count(),
            rate_per_sec = self.rate_per_sec(count),
            "Monitor complete"
        );
        Ok(())
    }
}

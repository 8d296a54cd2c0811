//! # batchflow-core
//!
//! Core types and traits for batchflow pipelines: message envelopes over Arrow record batches,
//! the [`Stage`] and [`SourceStage`] traits, batch helpers, configuration, errors, and tracing
//! initialization. Engine-agnostic; used by batchflow-stages and batchflow-pipeline.

pub mod config;
pub mod error;
pub mod logger;
pub mod messages;
pub mod table;

pub use config::PipelineConfig;
pub use error::{FlowError, Result, StageError};
pub use logger::init_tracing;
pub use messages::{ControlMessage, MessageMeta, PipelineMessage, SourceStage, Stage};

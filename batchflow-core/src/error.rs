use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Pipeline build error: {0}")]
    Build(String),

    #[error("Stage '{stage}' failed: {source}")]
    Stage { stage: String, source: StageError },

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Task error: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum StageError {
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error("Expected {expected} class labels, got {actual}")]
    LabelCount { expected: usize, actual: usize },

    #[error("Column '{column}' has unsupported type {datatype}")]
    UnsupportedColumn { column: String, datatype: String },

    #[error("Control message has no payload")]
    MissingPayload,

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Message mismatch: {0}")]
    Mismatch(String),
}

pub type Result<T> = std::result::Result<T, FlowError>;

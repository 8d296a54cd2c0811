//! # batchflow-stages
//!
//! Stage library for batchflow pipelines: in-memory sources, deserialize/serialize,
//! monitoring, classification, closure adapters, and dataframe comparison sinks.

pub mod classify;
pub mod compare;
pub mod deserialize;
pub mod fn_stage;
pub mod monitor;
pub mod serialize;
pub mod source;

pub use classify::AddClassificationsStage;
pub use compare::{assert_results, CompareDataFrameStage, CompareResults};
pub use deserialize::DeserializeStage;
pub use fn_stage::FnStage;
pub use monitor::MonitorStage;
pub use serialize::SerializeStage;
pub use source::{InMemoryDataGenStage, InMemorySourceStage};

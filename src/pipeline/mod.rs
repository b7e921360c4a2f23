//! Threaded line pipeline for live decoding.
//!
//! Each station runs in its own thread, connected by bounded crossbeam
//! channels for backpressure. The filter itself is single-threaded: exactly
//! one station owns it and sees lines in arrival order.

pub mod error;
pub mod filter_station;
pub mod orchestrator;
pub mod sink;
pub mod station;
pub mod types;

pub use error::{ErrorReporter, LogReporter, StationError};
pub use filter_station::FilterStation;
pub use orchestrator::{Pipeline, PipelineConfig, PipelineHandle};
pub use sink::{
    CollectorSink, FileSink, JsonLinesSink, OutputSink, StdoutSink, deliver,
};
pub use station::{Station, StationRunner, StationStats};
pub use types::{DecodedLine, SinkEvent};

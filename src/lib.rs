//! qsoprint - print the Morse conversations that involve your call sign
//!
//! Reads text lines from an external CW decoder, keeps a short rolling
//! buffer of recent traffic and forwards only the exchanges around the
//! monitored call sign, marking where each conversation ends.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod app;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod filter;
pub mod output;
pub mod pipeline;
pub mod source;

// Core types (source → filter → sink)
pub use filter::{ConversationFilter, FilterSettings, FilterState};
pub use pipeline::sink::{CollectorSink, FileSink, JsonLinesSink, OutputSink, StdoutSink};
pub use pipeline::types::{DecodedLine, SinkEvent};
pub use source::{DecoderProcess, LineSource, ReaderSource};

// Pipeline
pub use pipeline::orchestrator::{Pipeline, PipelineConfig, PipelineHandle};

// Error handling
pub use error::{QsoPrintError, Result};

// Config
pub use config::{Config, OutputKind};

// Station framework (for advanced users)
pub use pipeline::error::{ErrorReporter, StationError};
pub use pipeline::station::Station;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

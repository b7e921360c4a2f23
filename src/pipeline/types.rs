//! Data types flowing between pipeline stations.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// A decoded text line with its arrival time.
///
/// Produced by a line source, consumed once by the conversation filter.
/// The filter may keep a copy in its rolling buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLine {
    /// Decoded text, with the decoder prefix already stripped.
    pub text: String,
    /// When the line arrived from the decoder.
    pub arrival: Instant,
}

impl DecodedLine {
    pub fn new(text: impl Into<String>, arrival: Instant) -> Self {
        Self {
            text: text.into(),
            arrival,
        }
    }

    /// Creates a line stamped with the current time.
    pub fn now(text: impl Into<String>) -> Self {
        Self::new(text, Instant::now())
    }
}

/// Output decided by the filter, delivered to an [`OutputSink`](crate::pipeline::sink::OutputSink).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "text", rename_all = "snake_case")]
pub enum SinkEvent {
    /// Render one line.
    Line(String),
    /// End of a tracked conversation (e.g. cut the paper).
    Boundary,
}

impl SinkEvent {
    pub fn line(text: impl Into<String>) -> Self {
        Self::Line(text.into())
    }

    pub fn is_boundary(&self) -> bool {
        matches!(self, SinkEvent::Boundary)
    }

    /// Text of a `Line` event, `None` for boundaries.
    pub fn text(&self) -> Option<&str> {
        match self {
            SinkEvent::Line(text) => Some(text),
            SinkEvent::Boundary => None,
        }
    }
}

//! Station failures and where they are reported.
//!
//! A recoverable error loses one line or one delivery and the station keeps
//! going. A fatal error stops the station. Library errors are classified by
//! origin: losing the decoder ends the run, a sink or parse failure does not.

use crate::error::QsoPrintError;
use crate::output;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationError {
    Recoverable(String),
    Fatal(String),
}

impl StationError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StationError::Fatal(_))
    }

    pub fn message(&self) -> &str {
        match self {
            StationError::Recoverable(msg) | StationError::Fatal(msg) => msg,
        }
    }
}

impl fmt::Display for StationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = if self.is_fatal() { "fatal" } else { "recoverable" };
        write!(f, "{}: {}", severity, self.message())
    }
}

impl std::error::Error for StationError {}

impl From<QsoPrintError> for StationError {
    fn from(error: QsoPrintError) -> Self {
        let message = error.to_string();
        match error {
            QsoPrintError::DecoderSpawn { .. } | QsoPrintError::DecoderRead { .. } => {
                StationError::Fatal(message)
            }
            _ => StationError::Recoverable(message),
        }
    }
}

/// Receives errors from stations and the reader thread.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, station: &str, error: &StationError);
}

/// Writes station errors to stderr.
///
/// In quiet mode recoverable errors are dropped; fatal errors always show.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter {
    quiet: bool,
}

impl LogReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quiet(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn shows(&self, error: &StationError) -> bool {
        error.is_fatal() || !self.quiet
    }
}

impl ErrorReporter for LogReporter {
    fn report(&self, station: &str, error: &StationError) {
        if self.shows(error) {
            output::render_station_error(station, error);
        }
    }
}

//! Stations: one thread per pipeline stage, joined by channels.
//!
//! A station handles one input at a time in channel order. The runner owns
//! the thread and counts what passed through, so `-vv` can show where lines
//! went once the run is over.

use crate::pipeline::error::{ErrorReporter, StationError};
use crossbeam_channel::{Receiver, Sender};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub trait Station: Send + 'static {
    type Input: Send + 'static;
    type Output: Send + 'static;

    /// Handles one input.
    ///
    /// `Ok(None)` means the input was consumed without output, as the filter
    /// does while it holds lines for a possible lead-in.
    fn process(&mut self, input: Self::Input) -> Result<Option<Self::Output>, StationError>;

    fn name(&self) -> &'static str;

    /// Runs once on the station thread after the last input.
    fn shutdown(&mut self) {}
}

/// What a station did during its run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StationStats {
    pub received: usize,
    pub emitted: usize,
    pub recoverable_errors: usize,
    pub stopped_on_fatal: bool,
}

impl fmt::Display for StationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in, {} out, {} recoverable error(s)",
            self.received, self.emitted, self.recoverable_errors
        )?;
        if self.stopped_on_fatal {
            f.write_str(", stopped on fatal error")?;
        }
        Ok(())
    }
}

pub struct StationRunner<S: Station> {
    handle: Option<JoinHandle<StationStats>>,
    station_name: &'static str,
    _phantom: PhantomData<S>,
}

impl<S: Station> StationRunner<S> {
    /// Spawns `station` on its own thread.
    ///
    /// The thread ends when the input channel closes, when nothing is left
    /// to receive its output, or on a fatal error.
    pub fn spawn(
        mut station: S,
        input_rx: Receiver<S::Input>,
        output_tx: Sender<S::Output>,
        error_reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        let station_name = station.name();
        let handle = thread::spawn(move || {
            let stats = drive(&mut station, &input_rx, &output_tx, error_reporter.as_ref());
            station.shutdown();
            stats
        });

        Self {
            handle: Some(handle),
            station_name,
            _phantom: PhantomData,
        }
    }

    /// Waits for the station thread and returns its counters.
    pub fn join(mut self) -> Result<StationStats, String> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| format!("station '{}' panicked", self.station_name)),
            None => Ok(StationStats::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.station_name
    }
}

fn drive<S: Station>(
    station: &mut S,
    input_rx: &Receiver<S::Input>,
    output_tx: &Sender<S::Output>,
    reporter: &dyn ErrorReporter,
) -> StationStats {
    let name = station.name();
    let mut stats = StationStats::default();

    for input in input_rx.iter() {
        stats.received += 1;
        match station.process(input) {
            Ok(Some(output)) => {
                if output_tx.send(output).is_err() {
                    break;
                }
                stats.emitted += 1;
            }
            Ok(None) => {}
            Err(error) => {
                reporter.report(name, &error);
                if error.is_fatal() {
                    stats.stopped_on_fatal = true;
                    break;
                }
                stats.recoverable_errors += 1;
            }
        }
    }
    stats
}

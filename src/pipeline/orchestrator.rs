//! Line pipeline that runs from startup until the source is exhausted or stopped.
//!
//! source thread → [lines] → FilterStation → [events] → SinkStation
//!
//! Each arrow is a bounded crossbeam channel with a single consumer, so the
//! filter sees lines strictly in arrival order and a slow sink only applies
//! backpressure instead of racing the state machine.

use crate::defaults;
use crate::filter::conversation::{ConversationFilter, FilterSettings};
use crate::pipeline::error::{ErrorReporter, LogReporter, StationError};
use crate::pipeline::filter_station::FilterStation;
use crate::pipeline::sink::{OutputSink, SinkStation};
use crate::pipeline::station::{Station, StationRunner};
use crate::pipeline::types::DecodedLine;
use crate::source::LineSource;
use crossbeam_channel::{Receiver, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Filter settings, fixed for the whole run
    pub filter: FilterSettings,
    /// Verbosity level (0=output only, 1=lines+transitions, 2=full diagnostics)
    pub verbosity: u8,
    /// Suppress diagnostic messages
    pub quiet: bool,
    /// Channel buffer sizes
    pub line_buffer: usize,
    pub event_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filter: FilterSettings::disabled(),
            verbosity: 0,
            quiet: false,
            line_buffer: defaults::LINE_BUFFER,
            event_buffer: defaults::EVENT_BUFFER,
        }
    }
}

fn join_reporting_panic(handle: JoinHandle<()>) {
    if let Err(panic_info) = handle.join() {
        let msg = panic_info
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("unknown panic");
        eprintln!("qsoprint: pipeline thread panicked: {msg}");
    }
}

fn join_station<S: Station>(runner: StationRunner<S>, show_stats: bool) {
    let name = runner.name();
    match runner.join() {
        Ok(stats) if show_stats => eprintln!("qsoprint: [{name}] {stats}"),
        Ok(_) => {}
        Err(msg) => eprintln!("qsoprint: {msg}"),
    }
}

/// Handle to a running pipeline.
pub struct PipelineHandle {
    /// Cleared to stop reading; also cleared by the reader when the source ends
    running: Arc<AtomicBool>,
    /// Join handles for spawned threads
    threads: Vec<JoinHandle<()>>,
    /// Receiver for the sink's finish() result
    result_rx: Receiver<Option<String>>,
}

impl PipelineHandle {
    /// Returns true while the source is still being read.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Shared flag that stops the reader when cleared.
    ///
    /// Lets another task request shutdown while this handle is blocked in
    /// [`wait`](Self::wait).
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Blocks until the source is exhausted and every queued line has been
    /// filtered and delivered. Returns the sink's accumulated result.
    pub fn wait(self) -> Option<String> {
        for handle in self.threads {
            join_reporting_panic(handle);
        }
        self.result_rx.try_recv().ok().flatten()
    }

    /// Stops reading and returns the sink's accumulated result.
    ///
    /// Lines still buffered by the filter are discarded. Waits up to 2s for
    /// queued output to drain, then 1s for threads to finish; remaining
    /// threads (e.g. a reader blocked on stdin) are detached and die with
    /// the process.
    pub fn stop(mut self) -> Option<String> {
        self.running.store(false, Ordering::SeqCst);

        let result = self
            .result_rx
            .recv_timeout(Duration::from_secs(2))
            .ok()
            .flatten();

        let deadline = Instant::now() + Duration::from_secs(1);
        let poll_interval = Duration::from_millis(50);

        loop {
            let mut remaining = Vec::new();
            for handle in self.threads.drain(..) {
                if handle.is_finished() {
                    join_reporting_panic(handle);
                } else {
                    remaining.push(handle);
                }
            }
            self.threads = remaining;

            if self.threads.is_empty() {
                break;
            }
            if Instant::now() >= deadline {
                eprintln!(
                    "qsoprint: shutdown timeout, {} thread(s) still running, detaching",
                    self.threads.len()
                );
                break;
            }
            thread::sleep(poll_interval);
        }

        result
    }
}

/// Line filtering pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    error_reporter: Arc<dyn ErrorReporter>,
}

impl Pipeline {
    /// Creates a new pipeline reporting to stderr; `quiet` hides recoverable errors.
    pub fn new(config: PipelineConfig) -> Self {
        let error_reporter: Arc<dyn ErrorReporter> = Arc::new(LogReporter::quiet(config.quiet));
        Self {
            config,
            error_reporter,
        }
    }

    /// Sets a custom error reporter.
    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.error_reporter = reporter;
        self
    }

    /// Starts the pipeline.
    ///
    /// Lines are stamped with their arrival time as they are read from
    /// `source`; the filter's decisions are rendered by `sink`.
    pub fn start<S: LineSource>(self, mut source: S, sink: Box<dyn OutputSink>) -> PipelineHandle {
        let running = Arc::new(AtomicBool::new(true));

        let (line_tx, line_rx) = bounded::<DecodedLine>(self.config.line_buffer.max(1));
        let (event_tx, event_rx) = bounded(self.config.event_buffer.max(1));
        let (sink_out_tx, sink_out_rx) = bounded::<()>(self.config.event_buffer.max(1));
        let (result_tx, result_rx) = bounded(1);

        let filter_station = FilterStation::new(ConversationFilter::new(self.config.filter))
            .with_quiet(self.config.quiet)
            .with_verbosity(self.config.verbosity);
        let sink_station =
            SinkStation::new(sink, self.config.quiet, self.config.verbosity, result_tx);

        let filter_runner = StationRunner::spawn(
            filter_station,
            line_rx,
            event_tx,
            self.error_reporter.clone(),
        );
        let sink_runner = StationRunner::spawn(
            sink_station,
            event_rx,
            sink_out_tx,
            self.error_reporter.clone(),
        );

        // Terminal station output carries no data; drain until the sink exits.
        let drain_handle = thread::spawn(move || while sink_out_rx.recv().is_ok() {});

        let reader_running = running.clone();
        let reporter = self.error_reporter.clone();
        let reader_handle = thread::spawn(move || {
            let name = source.name();
            while reader_running.load(Ordering::SeqCst) {
                match source.next_line() {
                    Ok(Some(text)) => {
                        if line_tx.send(DecodedLine::now(text)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        reporter.report(name, &StationError::from(e));
                        break;
                    }
                }
            }
            source.close();
            reader_running.store(false, Ordering::SeqCst);
            // Dropping line_tx here lets the stations drain and shut down.
        });

        let show_stats = !self.config.quiet && self.config.verbosity >= 2;
        let mut threads = vec![reader_handle, drain_handle];
        threads.push(thread::spawn(move || join_station(filter_runner, show_stats)));
        threads.push(thread::spawn(move || join_station(sink_runner, show_stats)));

        PipelineHandle {
            running,
            threads,
            result_rx,
        }
    }
}

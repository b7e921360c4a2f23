use crate::error::{QsoPrintError, Result};
use crate::output::{clear_line, render_delivery_failure};
use crate::pipeline::error::StationError;
use crate::pipeline::station::Station;
use crate::pipeline::types::SinkEvent;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Pluggable output handler for the conversation filter.
/// Pairs with LineSource for input - this handles what gets printed.
pub trait OutputSink: Send + 'static {
    /// Render one line.
    fn emit(&mut self, text: &str) -> Result<()>;

    /// Mark the end of a tracked conversation (e.g. cut the paper).
    fn signal_boundary(&mut self) -> Result<()>;

    /// Called on pipeline shutdown. Return accumulated text if applicable.
    fn finish(&mut self) -> Option<String> {
        None
    }

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "sink"
    }
}

/// Delivers `events` to `sink` in order.
///
/// Every event is attempted even if an earlier one failed, so a flaky sink
/// loses single lines rather than the rest of a conversation. The first
/// failure is returned.
pub fn deliver(sink: &mut dyn OutputSink, events: &[SinkEvent]) -> Result<()> {
    let mut first_error = None;
    for event in events {
        let result = match event {
            SinkEvent::Line(text) => sink.emit(text),
            SinkEvent::Boundary => sink.signal_boundary(),
        };
        if let Err(e) = result
            && first_error.is_none()
        {
            first_error = Some(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn sink_error(sink: &str, error: io::Error) -> QsoPrintError {
    QsoPrintError::SinkWrite {
        sink: sink.to_string(),
        message: error.to_string(),
    }
}

/// Station wrapper for any OutputSink implementation.
/// Runs rendering on its own thread so a slow printer never stalls the filter.
pub(crate) struct SinkStation {
    sink: Box<dyn OutputSink>,
    quiet: bool,
    verbosity: u8,
    result_tx: Option<crossbeam_channel::Sender<Option<String>>>,
    delivered: usize,
}

impl SinkStation {
    pub(crate) fn new(
        sink: Box<dyn OutputSink>,
        quiet: bool,
        verbosity: u8,
        result_tx: crossbeam_channel::Sender<Option<String>>,
    ) -> Self {
        Self {
            sink,
            quiet,
            verbosity,
            result_tx: Some(result_tx),
            delivered: 0,
        }
    }
}

impl Station for SinkStation {
    type Input = Vec<SinkEvent>;
    type Output = ();

    fn name(&self) -> &'static str {
        self.sink.name()
    }

    fn process(&mut self, events: Vec<SinkEvent>) -> std::result::Result<Option<()>, StationError> {
        if events.is_empty() {
            return Ok(None);
        }

        match deliver(self.sink.as_mut(), &events) {
            Ok(()) => {
                self.delivered += events.len();
                Ok(Some(()))
            }
            Err(e) => {
                if !self.quiet && self.verbosity >= 1 {
                    clear_line();
                    render_delivery_failure(&events);
                }
                Err(StationError::Recoverable(format!("Delivery failed: {}", e)))
            }
        }
    }

    fn shutdown(&mut self) {
        if !self.quiet && self.verbosity >= 2 {
            eprintln!(
                "qsoprint: {} sink delivered {} event(s)",
                self.sink.name(),
                self.delivered
            );
        }

        let result = self.sink.finish();
        if let Some(tx) = self.result_tx.take()
            && tx.send(result).is_err()
        {
            eprintln!("qsoprint: sink shutdown, result receiver already dropped");
        }
    }
}

/// Prints lines to stdout; boundaries become a separator line.
pub struct StdoutSink {
    separator: String,
}

impl StdoutSink {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new(crate::defaults::SEPARATOR)
    }
}

impl OutputSink for StdoutSink {
    fn emit(&mut self, text: &str) -> Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", text).map_err(|e| sink_error("stdout", e))?;
        out.flush().map_err(|e| sink_error("stdout", e))
    }

    fn signal_boundary(&mut self) -> Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}\n", self.separator).map_err(|e| sink_error("stdout", e))?;
        out.flush().map_err(|e| sink_error("stdout", e))
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}

/// Appends lines to a file or device node (e.g. `/dev/usb/lp0`).
///
/// Boundaries write the separator followed by blank lines to feed the
/// paper past the tear bar. Each write is flushed immediately.
pub struct FileSink {
    path: PathBuf,
    file: File,
    separator: String,
}

impl FileSink {
    /// Number of blank lines fed after a separator.
    const FEED_LINES: usize = 3;

    pub fn open(path: &Path, separator: impl Into<String>) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| QsoPrintError::SinkWrite {
                sink: "file".to_string(),
                message: format!("cannot open {}: {}", path.display(), e),
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            separator: separator.into(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.file
            .write_all(bytes)
            .and_then(|()| self.file.flush())
            .map_err(|e| sink_error("file", e))
    }
}

impl OutputSink for FileSink {
    fn emit(&mut self, text: &str) -> Result<()> {
        self.write_all(format!("{}\n", text).as_bytes())
    }

    fn signal_boundary(&mut self) -> Result<()> {
        let feed = "\n".repeat(Self::FEED_LINES);
        self.write_all(format!("{}\n{}", self.separator, feed).as_bytes())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Writes one JSON object per event, for piping into other tools.
pub struct JsonLinesSink<W: Write + Send + 'static> {
    writer: W,
}

impl<W: Write + Send + 'static> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn write_event(&mut self, event: &SinkEvent) -> Result<()> {
        serde_json::to_writer(&mut self.writer, event).map_err(|e| QsoPrintError::SinkWrite {
            sink: "json".to_string(),
            message: e.to_string(),
        })?;
        self.writer
            .write_all(b"\n")
            .and_then(|()| self.writer.flush())
            .map_err(|e| sink_error("json", e))
    }
}

impl JsonLinesSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send + 'static> OutputSink for JsonLinesSink<W> {
    fn emit(&mut self, text: &str) -> Result<()> {
        self.write_event(&SinkEvent::line(text))
    }

    fn signal_boundary(&mut self) -> Result<()> {
        self.write_event(&SinkEvent::Boundary)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

/// Collects events in memory for tests and library use.
/// Returns the emitted lines, newline-joined, on finish().
#[derive(Clone, Default)]
pub struct CollectorSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SinkEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of everything received so far.
    ///
    /// Clones of a collector share storage, so a clone kept by the caller
    /// sees what the pipeline's copy received.
    pub fn events(&self) -> Vec<SinkEvent> {
        self.lock().clone()
    }

    /// Emitted line texts, boundaries omitted.
    pub fn lines(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|e| e.text().map(str::to_string))
            .collect()
    }

    pub fn boundaries(&self) -> usize {
        self.lock().iter().filter(|e| e.is_boundary()).count()
    }
}

impl OutputSink for CollectorSink {
    fn emit(&mut self, text: &str) -> Result<()> {
        self.lock().push(SinkEvent::line(text));
        Ok(())
    }

    fn signal_boundary(&mut self) -> Result<()> {
        self.lock().push(SinkEvent::Boundary);
        Ok(())
    }

    fn finish(&mut self) -> Option<String> {
        let lines = self.lines();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::NamedTempFile;

    /// Sink that fails on lines containing a marker.
    struct FlakySink {
        inner: CollectorSink,
        fail_on: &'static str,
        fail_boundary: bool,
    }

    impl OutputSink for FlakySink {
        fn emit(&mut self, text: &str) -> Result<()> {
            if text.contains(self.fail_on) {
                return Err(QsoPrintError::SinkWrite {
                    sink: "flaky".to_string(),
                    message: format!("refused {}", text),
                });
            }
            self.inner.emit(text)
        }

        fn signal_boundary(&mut self) -> Result<()> {
            if self.fail_boundary {
                return Err(QsoPrintError::SinkWrite {
                    sink: "flaky".to_string(),
                    message: "no cutter".to_string(),
                });
            }
            self.inner.signal_boundary()
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    #[test]
    fn output_sink_is_object_safe() {
        let _sink: Box<dyn OutputSink> = Box::new(CollectorSink::new());
    }

    #[test]
    fn collector_sink_records_events_in_order() {
        let mut sink = CollectorSink::new();
        let observer = sink.clone();

        sink.emit("CQ CQ").unwrap();
        sink.emit("K1ABC 73").unwrap();
        sink.signal_boundary().unwrap();

        assert_eq!(
            observer.events(),
            vec![
                SinkEvent::line("CQ CQ"),
                SinkEvent::line("K1ABC 73"),
                SinkEvent::Boundary
            ]
        );
        assert_eq!(observer.boundaries(), 1);
        assert_eq!(sink.finish(), Some("CQ CQ\nK1ABC 73".to_string()));
    }

    #[test]
    fn collector_sink_empty_returns_none() {
        let mut sink = CollectorSink::new();
        assert_eq!(sink.finish(), None);
    }

    #[test]
    fn deliver_attempts_every_event_after_failure() {
        let inner = CollectorSink::new();
        let mut sink = FlakySink {
            inner: inner.clone(),
            fail_on: "BAD",
            fail_boundary: false,
        };

        let events = vec![
            SinkEvent::line("first"),
            SinkEvent::line("BAD line"),
            SinkEvent::line("third"),
            SinkEvent::Boundary,
        ];
        let result = deliver(&mut sink, &events);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("refused BAD line"));
        assert_eq!(inner.lines(), vec!["first", "third"]);
        assert_eq!(inner.boundaries(), 1);
    }

    #[test]
    fn deliver_reports_first_failure_only() {
        let mut sink = FlakySink {
            inner: CollectorSink::new(),
            fail_on: "X",
            fail_boundary: true,
        };
        let events = vec![SinkEvent::line("X1"), SinkEvent::Boundary];

        let err = deliver(&mut sink, &events).unwrap_err();
        assert!(err.to_string().contains("refused X1"));
    }

    #[test]
    fn file_sink_appends_lines_and_separator() {
        let temp = NamedTempFile::new().unwrap();
        let mut sink = FileSink::open(temp.path(), "=====").unwrap();
        assert_eq!(sink.path(), temp.path());

        sink.emit("K2XYZ DE K1ABC 599").unwrap();
        sink.emit("K1ABC 73").unwrap();
        sink.signal_boundary().unwrap();

        let mut contents = String::new();
        File::open(temp.path())
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "K2XYZ DE K1ABC 599\nK1ABC 73\n=====\n\n\n\n");
    }

    #[test]
    fn file_sink_open_failure_is_sink_error() {
        let result = FileSink::open(Path::new("/nonexistent-dir-qsoprint/lp0"), "--");
        match result {
            Err(QsoPrintError::SinkWrite { sink, message }) => {
                assert_eq!(sink, "file");
                assert!(message.contains("/nonexistent-dir-qsoprint/lp0"));
            }
            _ => panic!("Expected SinkWrite error"),
        }
    }

    #[test]
    fn json_sink_writes_one_object_per_line() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.emit("CQ").unwrap();
        sink.signal_boundary().unwrap();

        let written = String::from_utf8(sink.writer.clone()).unwrap();
        assert_eq!(
            written,
            "{\"type\":\"line\",\"text\":\"CQ\"}\n{\"type\":\"boundary\"}\n"
        );
    }

    #[test]
    fn sink_station_reports_failures_as_recoverable() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let sink = FlakySink {
            inner: CollectorSink::new(),
            fail_on: "BAD",
            fail_boundary: false,
        };
        let mut station = SinkStation::new(Box::new(sink), true, 0, tx);

        assert_eq!(station.name(), "flaky");
        assert!(station.process(vec![]).unwrap().is_none());
        assert!(station.process(vec![SinkEvent::line("ok")]).unwrap().is_some());

        match station.process(vec![SinkEvent::line("BAD")]) {
            Err(StationError::Recoverable(msg)) => assert!(msg.contains("Delivery failed")),
            other => panic!("Expected recoverable error, got {:?}", other),
        }

        station.shutdown();
        assert_eq!(rx.recv().unwrap(), None);
    }

    #[test]
    fn sink_station_sends_finish_result_on_shutdown() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut station = SinkStation::new(Box::new(CollectorSink::new()), true, 0, tx);

        station
            .process(vec![SinkEvent::line("one"), SinkEvent::Boundary])
            .unwrap();
        station.shutdown();

        assert_eq!(rx.recv().unwrap(), Some("one".to_string()));
    }
}

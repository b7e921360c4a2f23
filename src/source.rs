//! Line sources feeding the conversation filter.
//!
//! The filter never talks to the radio. It consumes text lines produced by
//! an external decoder (multimon-ng by default), read from a child
//! process or from any buffered reader such as stdin.

use crate::error::{QsoPrintError, Result};
use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::time::Duration;

/// Pluggable source of decoded text lines.
/// Pairs with OutputSink for output - this handles what comes in.
pub trait LineSource: Send + 'static {
    /// Returns the next accepted line, or `None` once the source is exhausted.
    ///
    /// Blocks until a line is available.
    fn next_line(&mut self) -> Result<Option<String>>;

    /// Releases the source (e.g. terminates a child process).
    fn close(&mut self) {}

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "source"
    }
}

/// Turns one raw decoder output line into filter input.
///
/// Trims the line, requires and strips `prefix` when it is non-empty, and
/// drops lines that are blank before or after stripping.
pub fn normalize_decoder_line(raw: &str, prefix: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let message = if prefix.is_empty() {
        trimmed
    } else {
        trimmed.strip_prefix(prefix)?.trim()
    };
    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}

/// Reads decoder output from any buffered reader.
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected, so a
/// garbled decode never ends the session.
pub struct ReaderSource<R: BufRead + Send + 'static> {
    reader: R,
    prefix: String,
    buf: Vec<u8>,
}

impl<R: BufRead + Send + 'static> ReaderSource<R> {
    pub fn new(reader: R, prefix: impl Into<String>) -> Self {
        Self {
            reader,
            prefix: prefix.into(),
            buf: Vec::new(),
        }
    }
}

impl ReaderSource<BufReader<std::io::Stdin>> {
    /// Pipe mode: decoder output arrives on stdin.
    pub fn stdin(prefix: impl Into<String>) -> Self {
        Self::new(BufReader::new(std::io::stdin()), prefix)
    }
}

impl<R: BufRead + Send + 'static> LineSource for ReaderSource<R> {
    fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            self.buf.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .map_err(|e| QsoPrintError::DecoderRead {
                    message: e.to_string(),
                })?;
            if read == 0 {
                return Ok(None);
            }
            let raw = String::from_utf8_lossy(&self.buf);
            if let Some(line) = normalize_decoder_line(&raw, &self.prefix) {
                return Ok(Some(line));
            }
        }
    }

    fn name(&self) -> &'static str {
        "reader"
    }
}

/// Runs the external decoder pipeline via `sh -c` and reads its stdout.
pub struct DecoderProcess {
    command: String,
    child: Child,
    lines: ReaderSource<BufReader<ChildStdout>>,
}

impl DecoderProcess {
    /// Spawns `command` through the shell. Its stderr is discarded.
    pub fn spawn(command: &str, prefix: impl Into<String>) -> Result<Self> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| QsoPrintError::DecoderSpawn {
                command: command.to_string(),
                message: e.to_string(),
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| QsoPrintError::DecoderSpawn {
                command: command.to_string(),
                message: "stdout was not captured".to_string(),
            })?;

        Ok(Self {
            command: command.to_string(),
            child,
            lines: ReaderSource::new(BufReader::new(stdout), prefix),
        })
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl LineSource for DecoderProcess {
    fn next_line(&mut self) -> Result<Option<String>> {
        self.lines.next_line()
    }

    fn close(&mut self) {
        match self.child.try_wait() {
            Ok(Some(_)) => {}
            Ok(None) => {
                if let Err(e) = self.child.kill() {
                    eprintln!("qsoprint: failed to stop decoder: {e}");
                }
                if let Err(e) = self.child.wait() {
                    eprintln!("qsoprint: failed to reap decoder: {e}");
                }
            }
            Err(e) => eprintln!("qsoprint: failed to query decoder status: {e}"),
        }
    }

    fn name(&self) -> &'static str {
        "decoder"
    }
}

impl Drop for DecoderProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait()
            && self.child.kill().is_ok()
            && let Err(e) = self.child.wait()
        {
            eprintln!("qsoprint: failed to reap decoder: {e}");
        }
    }
}

/// A line from a replay transcript with its offset from the start.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedLine {
    pub line_no: usize,
    pub offset: Duration,
    pub text: String,
}

/// Parses one replay transcript line: `<seconds> <text>`.
///
/// Seconds may be fractional and are capped at
/// [`MAX_REPLAY_OFFSET_SECS`](crate::defaults::MAX_REPLAY_OFFSET_SECS).
/// Blank lines and lines starting with `#` yield `Ok(None)`. The text may
/// be empty.
pub fn parse_timed_line(raw: &str, line_no: usize) -> Result<Option<TimedLine>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let (offset, text) = match trimmed.split_once(char::is_whitespace) {
        Some((offset, text)) => (offset, text.trim()),
        None => (trimmed, ""),
    };

    let secs: f64 = offset.parse().map_err(|_| QsoPrintError::ReplayParse {
        line_no,
        message: format!("'{}' is not a time offset in seconds", offset),
    })?;
    if secs > crate::defaults::MAX_REPLAY_OFFSET_SECS {
        return Err(QsoPrintError::ReplayParse {
            line_no,
            message: format!(
                "offset {} exceeds the {}s replay limit",
                offset,
                crate::defaults::MAX_REPLAY_OFFSET_SECS
            ),
        });
    }
    let offset = Duration::try_from_secs_f64(secs).map_err(|e| QsoPrintError::ReplayParse {
        line_no,
        message: format!("invalid offset {}: {}", secs, e),
    })?;

    Ok(Some(TimedLine {
        line_no,
        offset,
        text: text.to_string(),
    }))
}

/// Parses a whole replay transcript, rejecting offsets that go backwards.
pub fn parse_transcript(contents: &str) -> Result<Vec<TimedLine>> {
    let mut lines: Vec<TimedLine> = Vec::new();
    for (idx, raw) in contents.lines().enumerate() {
        let line_no = idx + 1;
        if let Some(line) = parse_timed_line(raw, line_no)? {
            if let Some(prev) = lines.last()
                && line.offset < prev.offset
            {
                return Err(QsoPrintError::ReplayParse {
                    line_no,
                    message: "time offsets must not decrease".to_string(),
                });
            }
            lines.push(line);
        }
    }
    Ok(lines)
}

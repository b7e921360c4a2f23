//! Conversation filter: decides which decoded lines reach the output sink.
//!
//! Lines are buffered while idle. Hearing the monitored call sign arms the
//! filter; the first line that is not merely the call sign again is the
//! response, which flushes the buffered lead-in (minus call-sign lines) and
//! starts real-time forwarding until a termination token ends the QSO.

use crate::config::FilterConfig;
use crate::error::Result;
use crate::filter::buffer::RollingBuffer;
use crate::filter::matching::{CallSign, TerminationSet, names_other_station};
use crate::pipeline::sink::{OutputSink, deliver};
use crate::pipeline::types::{DecodedLine, SinkEvent};
use std::fmt;
use std::time::{Duration, Instant};

/// Where the filter is within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterState {
    /// Buffering context, nothing is forwarded.
    #[default]
    Idle,
    /// Call sign heard, waiting for another station to answer.
    AwaitingResponse,
    /// Forwarding every line until a termination token.
    Active,
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterState::Idle => "idle",
            FilterState::AwaitingResponse => "awaiting-response",
            FilterState::Active => "active",
        };
        f.write_str(name)
    }
}

/// Read-only settings for a filter run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSettings {
    pub enabled: bool,
    pub call_sign: CallSign,
    pub window: Duration,
    pub termination: TerminationSet,
}

impl FilterSettings {
    /// Settings with the default window and termination tokens.
    pub fn new(enabled: bool, call_sign: &str) -> Self {
        Self {
            enabled,
            call_sign: CallSign::new(call_sign),
            window: Duration::from_secs(crate::defaults::ROLLING_WINDOW_SECS),
            termination: TerminationSet::new(crate::defaults::TERMINATION_TOKENS),
        }
    }

    /// Pass-through settings: every line is forwarded.
    pub fn disabled() -> Self {
        Self::new(false, "")
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            enabled: config.enabled,
            call_sign: CallSign::new(&config.call_sign),
            window: Duration::from_secs(config.window_secs),
            termination: TerminationSet::new(&config.termination_tokens),
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_termination(mut self, termination: TerminationSet) -> Self {
        self.termination = termination;
        self
    }

    /// Filtering needs both the flag and a non-empty call sign.
    pub fn is_filtering(&self) -> bool {
        self.enabled && !self.call_sign.is_empty()
    }
}

/// The line-filtering state machine and its rolling buffer.
///
/// Lines must be fed in arrival order; the filter owns its state and is
/// not shared between threads.
#[derive(Debug, Clone)]
pub struct ConversationFilter {
    settings: FilterSettings,
    state: FilterState,
    buffer: RollingBuffer,
}

impl ConversationFilter {
    pub fn new(settings: FilterSettings) -> Self {
        let buffer = RollingBuffer::new(settings.window);
        Self {
            settings,
            state: FilterState::Idle,
            buffer,
        }
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Lines currently held for a possible lead-in.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drops buffered lines and returns to `Idle`.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = FilterState::Idle;
    }

    /// Applies one line and returns what to forward, in order.
    ///
    /// Performs no I/O. Each input line appears at most once in the result.
    pub fn step(&mut self, line: DecodedLine) -> Vec<SinkEvent> {
        if !self.settings.is_filtering() {
            return vec![SinkEvent::Line(line.text)];
        }

        if self.state == FilterState::AwaitingResponse && !self.call_in_window(line.arrival) {
            // Nobody answered in time; the line is treated as if heard while idle.
            self.state = FilterState::Idle;
        }

        match self.state {
            FilterState::Idle => {
                let heard = self.settings.call_sign.is_in(&line.text);
                self.buffer.append(line);
                if heard {
                    self.state = FilterState::AwaitingResponse;
                }
                Vec::new()
            }
            FilterState::AwaitingResponse => {
                if self.is_repeat(&line.text) {
                    self.buffer.append(line);
                    return Vec::new();
                }

                // The response itself is not buffered, so it is never part of its own lead-in.
                let call_sign = &self.settings.call_sign;
                let lead_in = self
                    .buffer
                    .drain_matching(|l| call_sign.is_in(&l.text), line.arrival);

                let mut events: Vec<SinkEvent> = lead_in
                    .into_iter()
                    .map(|l| SinkEvent::Line(l.text))
                    .collect();
                let ends = self.settings.termination.matches(&line.text);
                events.push(SinkEvent::Line(line.text));

                if ends {
                    self.end_conversation(&mut events);
                } else {
                    self.state = FilterState::Active;
                }
                events
            }
            FilterState::Active => {
                let ends = self.settings.termination.matches(&line.text);
                let mut events = vec![SinkEvent::Line(line.text)];
                if ends {
                    self.end_conversation(&mut events);
                }
                events
            }
        }
    }

    /// Applies one line and delivers the resulting events to `sink`.
    ///
    /// The transition is committed before delivery; a sink failure is
    /// returned but leaves the filter state as `step` left it.
    pub fn process(
        &mut self,
        line: DecodedLine,
        sink: &mut dyn OutputSink,
    ) -> Result<Vec<SinkEvent>> {
        let events = self.step(line);
        deliver(sink, &events)?;
        Ok(events)
    }

    /// A line that only repeats the monitored call sign keeps the wait going.
    ///
    /// A line naming another station, or not mentioning the call sign at
    /// all, is a response.
    fn is_repeat(&self, text: &str) -> bool {
        let call_sign = &self.settings.call_sign;
        call_sign.is_in(text) && !names_other_station(text, call_sign)
    }

    /// Evicts relative to `now` and reports whether a call-sign line is still held.
    fn call_in_window(&mut self, now: Instant) -> bool {
        self.buffer.evict(now);
        let call_sign = &self.settings.call_sign;
        self.buffer.any(|l| call_sign.is_in(&l.text))
    }

    fn end_conversation(&mut self, events: &mut Vec<SinkEvent>) {
        events.push(SinkEvent::Boundary);
        self.buffer.clear();
        self.state = FilterState::Idle;
    }
}

//! Filter station: runs the conversation filter on its own thread.

use crate::filter::conversation::{ConversationFilter, FilterState};
use crate::output::{render_lead_in, render_received, render_transition};
use crate::pipeline::error::StationError;
use crate::pipeline::station::Station;
use crate::pipeline::types::{DecodedLine, SinkEvent};

/// Station that applies each decoded line to the conversation filter.
///
/// Outputs the events to forward for a line, or nothing while buffering.
pub struct FilterStation {
    filter: ConversationFilter,
    quiet: bool,
    verbosity: u8,
}

impl FilterStation {
    pub fn new(filter: ConversationFilter) -> Self {
        Self {
            filter,
            quiet: false,
            verbosity: 0,
        }
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Verbosity level (1 = echo lines and transitions, 2 = lead-in details).
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn state(&self) -> FilterState {
        self.filter.state()
    }

    fn show(&self, level: u8) -> bool {
        !self.quiet && self.verbosity >= level
    }
}

impl Station for FilterStation {
    type Input = DecodedLine;
    type Output = Vec<SinkEvent>;

    fn name(&self) -> &'static str {
        "filter"
    }

    fn process(&mut self, line: DecodedLine) -> Result<Option<Vec<SinkEvent>>, StationError> {
        if self.show(1) {
            render_received(&line.text);
        }

        let before = self.filter.state();
        let events = self.filter.step(line);
        let after = self.filter.state();

        if before != after && self.show(1) {
            render_transition(before, after);
        }
        if before == FilterState::AwaitingResponse && after != before && self.show(2) {
            // Everything but the response line and a possible boundary is lead-in.
            let forwarded = events.iter().filter(|e| !e.is_boundary()).count();
            render_lead_in(forwarded.saturating_sub(1));
        }

        if events.is_empty() {
            Ok(None)
        } else {
            Ok(Some(events))
        }
    }

    fn shutdown(&mut self) {
        let buffered = self.filter.buffered();
        if buffered > 0 && self.show(1) {
            eprintln!(
                "qsoprint: discarding {} buffered line(s) ({})",
                buffered,
                self.filter.state()
            );
        }
    }
}

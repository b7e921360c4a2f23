//! Diagnostic rendering for terminal output.
//!
//! Everything here goes to stderr so stdout stays reserved for the printed
//! conversation.

use crate::filter::FilterState;
use crate::pipeline::error::StationError;
use crate::pipeline::types::SinkEvent;
use std::io::{self, Write};

const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Clear the current terminal line (replaces a pending status line).
pub fn clear_line() {
    eprint!("\r\x1b[2K");
    io::stderr().flush().ok();
}

fn state_color(state: FilterState) -> &'static str {
    match state {
        FilterState::Idle => DIM,
        FilterState::AwaitingResponse => YELLOW,
        FilterState::Active => GREEN,
    }
}

/// Echo a decoded line as it arrives.
pub fn render_received(text: &str) {
    clear_line();
    eprintln!("{DIM}rx{RESET} {text}");
}

/// Show a filter state change, e.g. `idle -> awaiting-response`.
pub fn render_transition(before: FilterState, after: FilterState) {
    eprintln!("{}", format_transition(before, after));
}

fn format_transition(before: FilterState, after: FilterState) -> String {
    format!(
        "   {}{before}{RESET} {DIM}->{RESET} {}{after}{RESET}",
        state_color(before),
        state_color(after)
    )
}

/// Report how many buffered lines were printed ahead of a response.
pub fn render_lead_in(count: usize) {
    match count {
        0 => eprintln!("   {DIM}no lead-in{RESET}"),
        1 => eprintln!("   {CYAN}1 lead-in line{RESET}"),
        n => eprintln!("   {CYAN}{n} lead-in lines{RESET}"),
    }
}

/// Show the events a failing sink could not render.
pub fn render_delivery_failure(events: &[SinkEvent]) {
    for event in events {
        match event {
            SinkEvent::Line(text) => eprintln!("{RED}lost{RESET} {DIM}{text}{RESET}"),
            SinkEvent::Boundary => eprintln!("{RED}lost{RESET} {DIM}<boundary>{RESET}"),
        }
    }
}

/// Report a station error, replacing any pending status line.
pub fn render_station_error(station: &str, error: &StationError) {
    clear_line();
    eprintln!("{}", format_station_error(station, error));
}

fn format_station_error(station: &str, error: &StationError) -> String {
    let color = if error.is_fatal() { RED } else { YELLOW };
    format!("qsoprint: [{station}] {color}{error}{RESET}")
}

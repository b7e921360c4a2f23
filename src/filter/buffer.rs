//! Time-bounded rolling buffer of recent decoded lines.
//!
//! Holds every line seen within the trailing window, in arrival order.
//! Eviction is lazy: each access takes the caller's `now` and drops
//! entries older than the window before reading.

use crate::pipeline::types::DecodedLine;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Drops entries from the front of `lines` whose age at `now` exceeds `window`.
///
/// Entries are assumed to be in non-decreasing arrival order, so eviction
/// stops at the first entry still inside the window. An entry exactly
/// `window` old is kept.
pub fn evict_expired(lines: &mut VecDeque<DecodedLine>, now: Instant, window: Duration) {
    while let Some(front) = lines.front() {
        if now.saturating_duration_since(front.arrival) > window {
            lines.pop_front();
        } else {
            break;
        }
    }
}

/// Lines seen within the last `window`, oldest first.
#[derive(Debug, Clone)]
pub struct RollingBuffer {
    lines: VecDeque<DecodedLine>,
    window: Duration,
}

impl RollingBuffer {
    pub fn new(window: Duration) -> Self {
        Self {
            lines: VecDeque::new(),
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Adds a line at the back. Evicts relative to the line's own arrival.
    pub fn append(&mut self, line: DecodedLine) {
        let now = line.arrival;
        self.lines.push_back(line);
        self.evict(now);
    }

    /// Evicts strictly-expired entries relative to `now`.
    pub fn evict(&mut self, now: Instant) {
        evict_expired(&mut self.lines, now, self.window);
    }

    /// Returns the in-window lines in arrival order.
    pub fn snapshot(&mut self, now: Instant) -> Vec<DecodedLine> {
        self.evict(now);
        self.lines.iter().cloned().collect()
    }

    /// Returns the in-window lines for which `predicate` is false, then clears the buffer.
    pub fn drain_matching<P>(&mut self, predicate: P, now: Instant) -> Vec<DecodedLine>
    where
        P: Fn(&DecodedLine) -> bool,
    {
        self.evict(now);
        self.lines
            .drain(..)
            .filter(|line| !predicate(line))
            .collect()
    }

    /// Whether any retained line satisfies `predicate`. Does not evict.
    pub fn any<P>(&self, predicate: P) -> bool
    where
        P: Fn(&DecodedLine) -> bool,
    {
        self.lines.iter().any(predicate)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Number of retained lines, including any not yet evicted.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(15);

    fn at(base: Instant, secs: u64) -> Instant {
        base + Duration::from_secs(secs)
    }

    fn texts(lines: &[DecodedLine]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn test_append_preserves_arrival_order() {
        let base = Instant::now();
        let mut buffer = RollingBuffer::new(WINDOW);

        buffer.append(DecodedLine::new("one", at(base, 0)));
        buffer.append(DecodedLine::new("two", at(base, 1)));
        buffer.append(DecodedLine::new("three", at(base, 2)));

        let snapshot = buffer.snapshot(at(base, 2));
        assert_eq!(texts(&snapshot), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_snapshot_evicts_expired_lines() {
        let base = Instant::now();
        let mut buffer = RollingBuffer::new(WINDOW);

        buffer.append(DecodedLine::new("old", at(base, 0)));
        buffer.append(DecodedLine::new("fresh", at(base, 10)));

        let snapshot = buffer.snapshot(at(base, 16));
        assert_eq!(texts(&snapshot), vec!["fresh"]);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_line_exactly_window_old_is_kept() {
        let base = Instant::now();
        let mut buffer = RollingBuffer::new(WINDOW);
        buffer.append(DecodedLine::new("edge", at(base, 0)));

        let snapshot = buffer.snapshot(at(base, 15));
        assert_eq!(texts(&snapshot), vec!["edge"]);
    }

    #[test]
    fn test_append_evicts_relative_to_new_line() {
        let base = Instant::now();
        let mut buffer = RollingBuffer::new(WINDOW);

        buffer.append(DecodedLine::new("K1ABC QRZ", at(base, 0)));
        buffer.append(DecodedLine::new("K1ABC QRZ AGAIN", at(base, 20)));

        assert_eq!(buffer.len(), 1);
        assert_eq!(texts(&buffer.snapshot(at(base, 20))), vec!["K1ABC QRZ AGAIN"]);
    }

    #[test]
    fn test_drain_matching_excludes_predicate_hits_and_clears() {
        let base = Instant::now();
        let mut buffer = RollingBuffer::new(WINDOW);

        buffer.append(DecodedLine::new("CQ CQ DE W2ZZZ", at(base, 0)));
        buffer.append(DecodedLine::new("K1ABC DE W2ZZZ", at(base, 2)));
        buffer.append(DecodedLine::new("QRL?", at(base, 3)));

        let lead_in = buffer.drain_matching(|l| l.text.contains("K1ABC"), at(base, 5));

        assert_eq!(texts(&lead_in), vec!["CQ CQ DE W2ZZZ", "QRL?"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_matching_skips_expired_lines() {
        let base = Instant::now();
        let mut buffer = RollingBuffer::new(WINDOW);

        buffer.append(DecodedLine::new("stale", at(base, 0)));
        buffer.append(DecodedLine::new("recent", at(base, 12)));

        let lead_in = buffer.drain_matching(|_| false, at(base, 20));
        assert_eq!(texts(&lead_in), vec!["recent"]);
    }

    #[test]
    fn test_clear_empties_buffer() {
        let base = Instant::now();
        let mut buffer = RollingBuffer::new(WINDOW);
        buffer.append(DecodedLine::new("a", base));
        buffer.append(DecodedLine::new("b", base));

        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.snapshot(base).is_empty());
    }

    #[test]
    fn test_evict_expired_on_plain_deque() {
        let base = Instant::now();
        let mut lines: VecDeque<DecodedLine> = [
            DecodedLine::new("a", at(base, 0)),
            DecodedLine::new("b", at(base, 5)),
            DecodedLine::new("c", at(base, 9)),
        ]
        .into_iter()
        .collect();

        evict_expired(&mut lines, at(base, 21), Duration::from_secs(15));

        let remaining: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(remaining, vec!["c"]);
    }

    #[test]
    fn test_now_before_arrival_does_not_evict() {
        let base = Instant::now();
        let mut buffer = RollingBuffer::new(WINDOW);
        buffer.append(DecodedLine::new("future", at(base, 30)));

        assert_eq!(buffer.snapshot(at(base, 0)).len(), 1);
    }

    #[test]
    fn test_any_checks_retained_lines_without_evicting() {
        let base = Instant::now();
        let mut buffer = RollingBuffer::new(WINDOW);
        buffer.append(DecodedLine::new("K1ABC QRZ", at(base, 0)));
        buffer.append(DecodedLine::new("QRL?", at(base, 1)));

        assert!(buffer.any(|l| l.text.contains("K1ABC")));
        assert!(!buffer.any(|l| l.text.contains("W2ZZZ")));

        buffer.evict(at(base, 16));
        assert!(!buffer.any(|l| l.text.contains("K1ABC")));
        assert_eq!(buffer.len(), 1);
    }
}

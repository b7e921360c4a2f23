//! Default configuration constants for qsoprint.
//!
//! Shared by the config layer, the CLI and the filter so the values stay
//! consistent.

/// Rolling buffer window in seconds.
///
/// Lines older than this relative to the current line are never part of a
/// lead-in.
pub const ROLLING_WINDOW_SECS: u64 = 15;

/// Tokens that end a tracked conversation.
///
/// `DE` is deliberately absent: it appears in nearly every exchange.
pub const TERMINATION_TOKENS: &[&str] = &[
    "73",
    "SK",
    "RR",
    "DIT DIT",
    "END OF CALL",
    "END OF CONTACT",
    "73+",
    "73!",
];

/// Prefix multimon-ng puts in front of each decoded CW line.
pub const LINE_PREFIX: &str = "CW:";

/// Receive frequency in Hz (14.070 MHz).
pub const FREQUENCY_HZ: u64 = 14_070_000;

/// RTL-SDR tuner gain (0-49).
pub const GAIN: u32 = 40;

/// Shell pipeline that turns the radio into `CW: ...` lines on stdout.
///
/// `{frequency}` and `{gain}` are substituted from the decoder config.
pub const DECODER_COMMAND: &str = "rtl_fm -f {frequency} -s 22050 -g {gain} - \
    | sox -t raw -r 22050 -e signed -b 16 -c 1 - -t wav - \
    | multimon-ng -a CW -t wav -";

/// Text written between conversations by sinks that cannot cut paper.
pub const SEPARATOR: &str = "--------------------------------";

/// Largest replay time offset accepted (30 days).
pub const MAX_REPLAY_OFFSET_SECS: f64 = 30.0 * 24.0 * 3600.0;

/// Bounded channel sizes between pipeline stations.
pub const LINE_BUFFER: usize = 256;
pub const EVENT_BUFFER: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn termination_tokens_exclude_de() {
        assert!(!TERMINATION_TOKENS.contains(&"DE"));
        assert!(TERMINATION_TOKENS.contains(&"73"));
    }

    #[test]
    fn decoder_command_has_placeholders() {
        assert!(DECODER_COMMAND.contains("{frequency}"));
        assert!(DECODER_COMMAND.contains("{gain}"));
        assert!(DECODER_COMMAND.contains("multimon-ng -a CW"));
    }
}

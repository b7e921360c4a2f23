//! Command-line interface for qsoprint
//!
//! Provides argument parsing using clap derive macros.

use crate::app::RunOptions;
use crate::config::OutputKind;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Print the Morse conversations that involve your call sign
#[derive(Parser, Debug)]
#[command(
    name = "qsoprint",
    version,
    about = "Print the Morse conversations that involve your call sign"
)]
pub struct Cli {
    /// Subcommand to execute (default: listen to the decoder)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: lines + state changes, -vv: full diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Call sign to follow; enables filtering
    #[arg(long, short = 'C', global = true, value_name = "CALL")]
    pub call_sign: Option<String>,

    /// Print every decoded line, ignoring the conversation filter
    #[arg(long, global = true)]
    pub no_filter: bool,

    /// Lead-in window (default: 15s). Examples: 15, 30s, 1m
    #[arg(long, short = 'w', global = true, value_name = "DURATION", value_parser = parse_window)]
    pub window: Option<Duration>,

    /// Output sink: stdout, file or json
    #[arg(long, short = 'o', global = true, value_name = "KIND")]
    pub output: Option<OutputKind>,

    /// Output file or printer device (implies --output file)
    #[arg(long, global = true, value_name = "PATH")]
    pub output_path: Option<PathBuf>,
}

/// Parse a window duration.
///
/// Supports any duration format accepted by `humantime`: bare numbers (seconds),
/// single-unit (`30s`, `1m`), and compound (`1m30s`). Zero is rejected.
fn parse_window(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let window = match s.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(s).map_err(|e| e.to_string())?,
    };
    if window.is_zero() {
        return Err("window must be longer than zero".to_string());
    }
    Ok(window)
}

impl Cli {
    /// Overrides for the run modes, taken from the global flags.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            call_sign: self.call_sign.clone(),
            no_filter: self.no_filter,
            window: self.window,
            output: self.output,
            output_path: self.output_path.clone(),
            quiet: self.quiet,
            verbosity: self.verbose,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read decoder output live (stdin when piped, else the decoder command)
    Listen,

    /// Replay a transcript of `<seconds> <text>` lines through the filter
    Replay {
        /// Transcript file
        file: PathBuf,
    },

    /// View and create configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (file + environment)
    Show,
    /// Print the configuration file path
    Path,
    /// Write a default configuration file
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_command() {
        let cli = Cli::try_parse_from(["qsoprint"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.call_sign.is_none());
        assert!(!cli.no_filter);
        assert!(cli.window.is_none());
        assert!(cli.output.is_none());
        assert!(cli.output_path.is_none());
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_verbose_double() {
        let cli = Cli::try_parse_from(["qsoprint", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_parse_filter_options() {
        let cli = Cli::try_parse_from([
            "qsoprint",
            "--call-sign",
            "K1ABC",
            "--window",
            "30s",
            "--output",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.call_sign.as_deref(), Some("K1ABC"));
        assert_eq!(cli.window, Some(Duration::from_secs(30)));
        assert_eq!(cli.output, Some(OutputKind::Json));
    }

    #[test]
    fn test_parse_short_flags() {
        let cli = Cli::try_parse_from(["qsoprint", "-C", "W2ZZZ", "-w", "20", "-q"]).unwrap();
        assert_eq!(cli.call_sign.as_deref(), Some("W2ZZZ"));
        assert_eq!(cli.window, Some(Duration::from_secs(20)));
        assert!(cli.quiet);
    }

    #[test]
    fn test_parse_window_formats() {
        assert_eq!(parse_window("15"), Ok(Duration::from_secs(15)));
        assert_eq!(parse_window("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_window("500ms"), Ok(Duration::from_millis(500)));
        assert!(parse_window("0").is_err());
        assert!(parse_window("soon").is_err());
    }

    #[test]
    fn test_parse_invalid_output_kind() {
        assert!(Cli::try_parse_from(["qsoprint", "--output", "fax"]).is_err());
    }

    #[test]
    fn test_parse_listen() {
        let cli = Cli::try_parse_from(["qsoprint", "listen", "--no-filter"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Listen)));
        assert!(cli.no_filter);
    }

    #[test]
    fn test_parse_replay_with_global_flags() {
        let cli = Cli::try_parse_from([
            "qsoprint",
            "replay",
            "session.txt",
            "--call-sign",
            "K1ABC",
            "--output-path",
            "/dev/usb/lp0",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Replay { ref file }) => {
                assert_eq!(file, &PathBuf::from("session.txt"));
            }
            _ => panic!("Expected Replay command"),
        }
        let options = cli.run_options();
        assert_eq!(options.call_sign.as_deref(), Some("K1ABC"));
        assert_eq!(options.output_path, Some(PathBuf::from("/dev/usb/lp0")));
    }

    #[test]
    fn test_parse_replay_requires_file() {
        assert!(Cli::try_parse_from(["qsoprint", "replay"]).is_err());
    }

    #[test]
    fn test_parse_config_actions() {
        for (arg, expected) in [("show", "Show"), ("path", "Path"), ("init", "Init")] {
            let cli = Cli::try_parse_from(["qsoprint", "config", arg]).unwrap();
            match cli.command {
                Some(Commands::Config { action }) => {
                    assert_eq!(format!("{:?}", action), expected);
                }
                _ => panic!("Expected Config command"),
            }
        }
    }

    #[test]
    fn test_parse_completions() {
        let cli = Cli::try_parse_from(["qsoprint", "completions", "bash"]).unwrap();
        match cli.command {
            Some(Commands::Completions { shell }) => assert_eq!(shell, Shell::Bash),
            _ => panic!("Expected Completions command"),
        }
    }

    #[test]
    fn test_run_options_carry_verbosity() {
        let cli = Cli::try_parse_from(["qsoprint", "-v", "--no-filter"]).unwrap();
        let options = cli.run_options();
        assert_eq!(options.verbosity, 1);
        assert!(options.no_filter);
        assert!(!options.quiet);
    }
}

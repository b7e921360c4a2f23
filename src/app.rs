//! Application entry points.
//!
//! Wires configuration, a line source, the conversation filter and an
//! output sink together for the `listen` and `replay` modes.

use crate::config::{Config, OutputConfig, OutputKind};
use crate::error::{QsoPrintError, Result};
use crate::filter::conversation::{ConversationFilter, FilterSettings};
use crate::pipeline::error::{ErrorReporter, LogReporter, StationError};
use crate::pipeline::orchestrator::{Pipeline, PipelineConfig};
use crate::pipeline::sink::{FileSink, JsonLinesSink, OutputSink, StdoutSink};
use crate::pipeline::types::DecodedLine;
use crate::source::{DecoderProcess, LineSource, ReaderSource, parse_transcript};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

/// Command-line overrides applied on top of the loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Monitored call sign; also enables the filter.
    pub call_sign: Option<String>,
    /// Forward every line regardless of configuration.
    pub no_filter: bool,
    pub window: Option<Duration>,
    pub output: Option<OutputKind>,
    pub output_path: Option<PathBuf>,
    pub quiet: bool,
    /// 0 = printed output only, 1 = lines + transitions, 2 = full diagnostics
    pub verbosity: u8,
}

impl RunOptions {
    /// Applies the overrides to `config`.
    ///
    /// Giving a call sign turns filtering on; `no_filter` wins over both.
    pub fn apply(&self, config: &mut Config) {
        if let Some(call_sign) = &self.call_sign {
            config.filter.call_sign = call_sign.clone();
            config.filter.enabled = true;
        }
        if self.no_filter {
            config.filter.enabled = false;
        }
        if let Some(kind) = self.output {
            config.output.kind = kind;
        }
        if let Some(path) = &self.output_path {
            config.output.path = Some(path.clone());
            if self.output.is_none() {
                config.output.kind = OutputKind::File;
            }
        }
    }

    /// Filter settings for `config` after applying the window override.
    pub fn filter_settings(&self, config: &Config) -> FilterSettings {
        let settings = FilterSettings::from_config(&config.filter);
        match self.window {
            Some(window) => settings.with_window(window),
            None => settings,
        }
    }
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config), which must exist
/// 2. Default config path (~/.config/qsoprint/config.toml)
/// 3. Built-in defaults
///
/// Environment variable overrides are applied last.
pub fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match custom_path {
        Some(path) if !path.exists() => {
            return Err(QsoPrintError::ConfigFileNotFound {
                path: path.display().to_string(),
            });
        }
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path())?,
    };
    Ok(config.with_env_overrides())
}

/// Builds the sink selected by the output configuration.
pub fn build_sink(output: &OutputConfig) -> Result<Box<dyn OutputSink>> {
    match output.kind {
        OutputKind::Stdout => Ok(Box::new(StdoutSink::new(output.separator.clone()))),
        OutputKind::Json => Ok(Box::new(JsonLinesSink::stdout())),
        OutputKind::File => {
            let path = output
                .path
                .as_deref()
                .ok_or_else(|| QsoPrintError::ConfigInvalidValue {
                    key: "output.path".to_string(),
                    message: "required when output.kind = \"file\"".to_string(),
                })?;
            Ok(Box::new(FileSink::open(path, output.separator.clone())?))
        }
    }
}

/// One-line summary of what a run will do, for the startup banner.
pub fn describe(settings: &FilterSettings, config: &Config) -> String {
    let filter = if settings.is_filtering() {
        format!(
            "filtering for {} ({}s window)",
            settings.call_sign,
            settings.window.as_secs_f64()
        )
    } else if settings.enabled {
        "filter enabled without a call sign, printing everything".to_string()
    } else {
        "printing everything".to_string()
    };
    let output = match (config.output.kind, &config.output.path) {
        (OutputKind::File, Some(path)) => format!("file {}", path.display()),
        (OutputKind::File, None) => "file".to_string(),
        (OutputKind::Stdout, _) => "stdout".to_string(),
        (OutputKind::Json, _) => "json".to_string(),
    };
    format!("{filter} → {output}")
}

/// Run live: read decoder output, filter it and print until the source ends
/// or Ctrl+C.
///
/// Reads from stdin when it is piped, otherwise spawns the configured
/// decoder command.
pub async fn run_listen(mut config: Config, options: RunOptions) -> Result<()> {
    options.apply(&mut config);
    config.validate()?;

    let settings = options.filter_settings(&config);
    if !options.quiet {
        if options.verbosity >= 2 {
            eprintln!("qsoprint {}", crate::version_string());
        }
        eprintln!("{}", describe(&settings, &config));
    }

    let pipeline_config = PipelineConfig {
        filter: settings,
        verbosity: options.verbosity,
        quiet: options.quiet,
        ..Default::default()
    };
    let sink = build_sink(&config.output)?;
    let prefix = config.decoder.line_prefix.clone();

    if std::io::stdin().is_terminal() {
        let command = config.decoder.render_command();
        if !options.quiet && options.verbosity >= 1 {
            eprintln!("Starting decoder: {command}");
        }
        let source = DecoderProcess::spawn(&command, prefix)?;
        run_until_done(pipeline_config, source, sink, options.quiet).await
    } else {
        let source = ReaderSource::stdin(prefix);
        run_until_done(pipeline_config, source, sink, options.quiet).await
    }
}

/// Runs the pipeline until the source is exhausted or Ctrl+C arrives.
async fn run_until_done<S: LineSource>(
    pipeline_config: PipelineConfig,
    source: S,
    sink: Box<dyn OutputSink>,
    quiet: bool,
) -> Result<()> {
    let handle = Pipeline::new(pipeline_config).start(source, sink);
    let stop_flag = handle.stop_flag();

    // A plain thread rather than spawn_blocking: the runtime would wait on
    // a blocking task at shutdown, and a reader stuck on stdin never returns.
    let (done_tx, mut done_rx) = tokio::sync::oneshot::channel();
    std::thread::spawn(move || {
        // Receiver is gone only if main already gave up waiting.
        done_tx.send(handle.wait()).ok();
    });

    tokio::select! {
        finished = &mut done_rx => {
            finished.map_err(|e| QsoPrintError::Other(format!("Pipeline thread failed: {}", e)))?;
            if !quiet {
                eprintln!("Input ended");
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|e| QsoPrintError::Other(format!("Failed to wait for Ctrl+C: {}", e)))?;
            if !quiet {
                eprintln!("\nShutting down...");
            }
            stop_flag.store(false, Ordering::SeqCst);
            // The decoder shares our process group and exits on the same
            // signal; a reader still blocked after that is abandoned.
            if tokio::time::timeout(Duration::from_secs(3), done_rx).await.is_err() && !quiet {
                eprintln!("qsoprint: input still blocked, exiting anyway");
            }
        }
    }
    Ok(())
}

/// Replay a timestamped transcript through the filter.
///
/// Each transcript line is `<seconds> <text>`; arrival times are derived
/// from the offsets so window eviction behaves as it would live. Sink
/// failures are reported and the replay continues.
pub fn run_replay(mut config: Config, options: RunOptions, file: &Path) -> Result<()> {
    options.apply(&mut config);
    config.validate()?;

    let contents = std::fs::read_to_string(file)?;
    let lines = parse_transcript(&contents)?;

    let settings = options.filter_settings(&config);
    if !options.quiet {
        eprintln!("{}", describe(&settings, &config));
    }

    let mut sink = build_sink(&config.output)?;
    let mut filter = ConversationFilter::new(settings);
    let reporter = LogReporter::quiet(options.quiet);
    let base = Instant::now();

    for line in lines {
        let arrival = base
            .checked_add(line.offset)
            .ok_or_else(|| QsoPrintError::ReplayParse {
                line_no: line.line_no,
                message: format!("offset {:?} is out of range", line.offset),
            })?;
        if let Err(e) = filter.process(DecodedLine::new(line.text, arrival), sink.as_mut()) {
            reporter.report(sink.name(), &StationError::from(e));
        }
    }

    if !options.quiet && options.verbosity >= 1 && filter.buffered() > 0 {
        eprintln!(
            "qsoprint: replay ended {} with {} unprinted line(s)",
            filter.state(),
            filter.buffered()
        );
    }
    Ok(())
}

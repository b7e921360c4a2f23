use crate::defaults;
use crate::error::{QsoPrintError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub filter: FilterConfig,
    pub decoder: DecoderConfig,
    pub output: OutputConfig,
}

/// Conversation filter configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    pub enabled: bool,
    pub call_sign: String,
    pub window_secs: u64,
    pub termination_tokens: Vec<String>,
}

/// External decoder pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecoderConfig {
    /// Shell command whose stdout yields decoded lines.
    /// `{frequency}` and `{gain}` are substituted before spawning.
    pub command: String,
    pub frequency_hz: u64,
    pub gain: u32,
    /// Prefix each decoder line must carry; empty accepts every line.
    pub line_prefix: String,
}

/// Output sink configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub kind: OutputKind,
    /// Target for `kind = "file"`, e.g. a printer device node.
    pub path: Option<PathBuf>,
    /// Written between conversations.
    pub separator: String,
}

/// Output sink selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    #[default]
    Stdout,
    File,
    Json,
}

impl std::str::FromStr for OutputKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stdout" => Ok(OutputKind::Stdout),
            "file" => Ok(OutputKind::File),
            "json" => Ok(OutputKind::Json),
            other => Err(format!(
                "unknown output kind '{}' (expected stdout, file or json)",
                other
            )),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            call_sign: String::new(),
            window_secs: defaults::ROLLING_WINDOW_SECS,
            termination_tokens: defaults::TERMINATION_TOKENS
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            command: defaults::DECODER_COMMAND.to_string(),
            frequency_hz: defaults::FREQUENCY_HZ,
            gain: defaults::GAIN,
            line_prefix: defaults::LINE_PREFIX.to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            kind: OutputKind::Stdout,
            path: None,
            separator: defaults::SEPARATOR.to_string(),
        }
    }
}

impl DecoderConfig {
    /// The decoder command with `{frequency}` and `{gain}` filled in.
    pub fn render_command(&self) -> String {
        self.command
            .replace("{frequency}", &self.frequency_hz.to_string())
            .replace("{gain}", &self.gain.to_string())
    }
}

/// Parses the boolean spellings accepted in environment overrides.
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values. The result is validated.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't exist
    ///
    /// Only a missing file yields defaults; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(QsoPrintError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Checks values the filter and sinks depend on.
    pub fn validate(&self) -> Result<()> {
        if self.filter.window_secs == 0 {
            return Err(QsoPrintError::ConfigInvalidValue {
                key: "filter.window_secs".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self
            .filter
            .termination_tokens
            .iter()
            .all(|t| t.trim().is_empty())
        {
            return Err(QsoPrintError::ConfigInvalidValue {
                key: "filter.termination_tokens".to_string(),
                message: "at least one token is required".to_string(),
            });
        }
        if self.output.kind == OutputKind::File && self.output.path.is_none() {
            return Err(QsoPrintError::ConfigInvalidValue {
                key: "output.path".to_string(),
                message: "required when output.kind = \"file\"".to_string(),
            });
        }
        if self.decoder.command.trim().is_empty() {
            return Err(QsoPrintError::ConfigInvalidValue {
                key: "decoder.command".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - QSOPRINT_CALL_SIGN → filter.call_sign
    /// - QSOPRINT_FILTER_ENABLED → filter.enabled (1/0, true/false, yes/no, on/off)
    /// - QSOPRINT_OUTPUT_PATH → output.path
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(call_sign) = std::env::var("QSOPRINT_CALL_SIGN")
            && !call_sign.is_empty()
        {
            self.filter.call_sign = call_sign;
        }

        if let Ok(enabled) = std::env::var("QSOPRINT_FILTER_ENABLED")
            && let Some(enabled) = parse_bool(&enabled)
        {
            self.filter.enabled = enabled;
        }

        if let Ok(path) = std::env::var("QSOPRINT_OUTPUT_PATH")
            && !path.is_empty()
        {
            self.output.path = Some(PathBuf::from(path));
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/qsoprint/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("qsoprint")
            .join("config.toml")
    }

    /// Serialize to TOML for display.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| QsoPrintError::ConfigParse {
            message: e.to_string(),
        })
    }

    /// Write the default configuration to `path`, creating parent directories.
    ///
    /// Refuses to overwrite an existing file.
    pub fn write_default(path: &Path) -> Result<()> {
        if path.exists() {
            return Err(QsoPrintError::Other(format!(
                "{} already exists",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, Self::default().to_toml()?)?;
        Ok(())
    }
}

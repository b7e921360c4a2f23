//! Error types for qsoprint.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QsoPrintError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Decoder (line source) errors
    #[error("Failed to start decoder `{command}`: {message}")]
    DecoderSpawn { command: String, message: String },

    #[error("Decoder read failed: {message}")]
    DecoderRead { message: String },

    // Output sink errors
    #[error("Output sink '{sink}' failed: {message}")]
    SinkWrite { sink: String, message: String },

    // Replay transcript errors
    #[error("Invalid replay line {line_no}: {message}")]
    ReplayParse { line_no: usize, message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, QsoPrintError>;

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the podcast analytics pipeline.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line that looked complete still failed JSON decoding.
    #[error("Failed to unmarshal JSON at {path}:{line}: {source}")]
    CorruptLine {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A JSON document could not be parsed or serialized.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A boundary date did not match `YYYY-MM-DD`.
    #[error("Invalid date: {value}")]
    InvalidDate { value: String },

    /// A time zone name is not a recognised IANA identifier.
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Writing the result to standard output failed.
    #[error("Failed to write to stdout: {0}")]
    Stdout(#[source] std::io::Error),

    /// Writing the result to the output file failed.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An env file exists but could not be read or parsed.
    #[error("Failed to load env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// Convenience alias used throughout the analytics crates.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

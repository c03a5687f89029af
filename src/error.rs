//! Error types for the application.
//!
//! Covers the three failure families the front-end deals with: invalid
//! input (URLs, batch files), engine failures (yt-dlp exits, unparsable
//! metadata) and configuration I/O.

use std::io;
use thiserror::Error;

/// Represents all possible errors that can occur in the application.
///
/// # Error Categories
///
/// - IO: File system operations
/// - Json: Configuration and engine metadata (de)serialization
/// - Parsing: URL parsing
/// - Youtube: Engine binary provisioning
/// - Engine: yt-dlp invocation failures
/// - Batch / Config / Interrupted: front-end input errors
/// - Custom: Application-specific errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Youtube error: {0}")]
    Youtube(#[from] yt_dlp::error::Error),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Invalid URL: {0:?}")]
    InvalidUrl(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Batch file error: {0}")]
    Batch(String),

    #[error("Interrupted by user")]
    Interrupted,

    #[error("{0}")]
    Custom(String),
}

impl From<&str> for AppError {
    fn from(error: &str) -> Self {
        AppError::Custom(error.to_string())
    }
}

impl From<String> for AppError {
    fn from(error: String) -> Self {
        AppError::Custom(error)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

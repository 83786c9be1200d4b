use thiserror::Error;

use crate::browser::BrowserError;

/// Errors surfaced by the harvester library
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Page error: {0}")]
    Page(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("JSON parse error: {0}")]
    JsonParseError(String),
}

/// Result type for harvester operations
pub type HarvestResult<T> = Result<T, HarvestError>;

/// Implement From<BrowserError> for HarvestError
impl From<BrowserError> for HarvestError {
    fn from(err: BrowserError) -> Self {
        HarvestError::Browser(err.to_string())
    }
}

/// Implement From<serde_json::Error> for HarvestError
impl From<serde_json::Error> for HarvestError {
    fn from(err: serde_json::Error) -> Self {
        HarvestError::JsonParseError(err.to_string())
    }
}

/// Implement From<std::io::Error> for HarvestError
impl From<std::io::Error> for HarvestError {
    fn from(err: std::io::Error) -> Self {
        HarvestError::IoError(err.to_string())
    }
}

impl From<csv::Error> for HarvestError {
    fn from(err: csv::Error) -> Self {
        HarvestError::Input(err.to_string())
    }
}

impl From<reqwest::Error> for HarvestError {
    fn from(err: reqwest::Error) -> Self {
        HarvestError::Submission(err.to_string())
    }
}

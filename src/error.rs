//! Crate-wide error type

/// Errors surfaced by the overlay controller and its tooling
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configured selector could not be parsed
    #[error("Invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },

    /// Configuration file could not be parsed
    #[error("Invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Could not write config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// Export found no report content anywhere in the document
    #[error("No analysis results available")]
    NoReportContent,

    /// The live document refused an operation (element creation, blob URLs)
    #[error("DOM error: {0}")]
    Dom(String),

    /// A replayed session referenced something the document does not have
    #[error("Replay error: {0}")]
    Replay(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;
use std::io;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Audio error: {0}")]
    Audio(#[from] hound::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    // Fatal: the alignment core cannot run on partial input
    #[error("Failed to load {artifact}: {reason}")]
    Load { artifact: String, reason: String },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Alignment invariant violated: {0}")]
    Alignment(String),
}

// Type alias for Result
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions for common error conversions
impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn load<A: Into<String>, R: Into<String>>(artifact: A, reason: R) -> Self {
        Error::Load {
            artifact: artifact.into(),
            reason: reason.into(),
        }
    }

    pub fn embedding<S: Into<String>>(msg: S) -> Self {
        Error::Embedding(msg.into())
    }

    pub fn alignment<S: Into<String>>(msg: S) -> Self {
        Error::Alignment(msg.into())
    }
}

//! # Console Error Type
//!
//! Everything that can stop the console before or while it runs.

use thiserror::Error;

use titan_scan::PipelineError;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Failed to read catalog {path}: {source}")]
    CatalogRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog file {path}: {source}")]
    CatalogParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown argument: {0}")]
    UnknownArgument(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Console I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type ConsoleResult<T> = Result<T, ConsoleError>;

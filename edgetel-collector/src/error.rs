//! Collector error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while collecting or writing a snapshot.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("failed to run '{program}': {source}")]
    Command {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse output for '{field}': {source}")]
    Parse {
        field: String,
        #[source]
        source: crate::parser::ParseError,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CollectorError>;

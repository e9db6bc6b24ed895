//! Publisher error types.

use std::path::PathBuf;

use thiserror::Error;

use edgetel_bridge_framework::BridgeError;

use crate::transform::TransformError;

/// Errors raised while assembling or publishing a snapshot.
#[derive(Debug, Error)]
pub enum PublisherError {
    /// A source file could not be read.
    #[error("failed to read '{field}' from {}: {source}", path.display())]
    SourceRead {
        field: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A raw value did not fit its transformation rule.
    #[error("failed to transform '{field}': {source}")]
    Transform {
        field: String,
        #[source]
        source: TransformError,
    },

    /// The aggregate file could not be read or parsed.
    #[error("invalid aggregate file {}: {message}", path.display())]
    Aggregate { path: PathBuf, message: String },

    /// The mirror log could not be written.
    #[error("failed to write mirror log {}: {source}", path.display())]
    Mirror {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Envelope or payload encoding failed.
    #[error("encoding error: {0}")]
    Encoding(#[from] edgetel_common::Error),

    /// Transport or configuration failure.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Result type for publisher operations.
pub type Result<T> = std::result::Result<T, PublisherError>;

//! Where snapshot values come from.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use edgetel_common::{TIMESTAMP_FIELD, TelemetrySnapshot};

use crate::error::{PublisherError, Result};
use crate::transform::Transform;

/// One snapshot field read from a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSource {
    /// Field name in the snapshot.
    pub field: String,

    /// File holding the raw value.
    pub path: PathBuf,

    /// Explicit rule; falls back to [`Transform::for_field`].
    #[serde(default)]
    pub transform: Option<Transform>,
}

impl FieldSource {
    pub fn new(field: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            field: field.into(),
            path: path.into(),
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// The rule applied to this field.
    pub fn rule(&self) -> Transform {
        self.transform
            .clone()
            .unwrap_or_else(|| Transform::for_field(&self.field))
    }

    /// Read the file and transform its contents.
    pub async fn read(&self) -> Result<String> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| PublisherError::SourceRead {
                field: self.field.clone(),
                path: self.path.clone(),
                source,
            })?;

        self.rule()
            .apply(&raw)
            .map_err(|source| PublisherError::Transform {
                field: self.field.clone(),
                source,
            })
    }
}

/// How a snapshot is assembled on each telemetry tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    /// One file per field.
    Fields(Vec<FieldSource>),
    /// A single flat JSON object written by another process.
    Aggregate(PathBuf),
}

impl SnapshotSource {
    /// Build a fresh snapshot stamped with `timestamp`.
    ///
    /// Any failing field abandons the whole snapshot.
    pub async fn read_snapshot(&self, timestamp: i64) -> Result<TelemetrySnapshot> {
        match self {
            SnapshotSource::Fields(sources) => {
                let mut snapshot = TelemetrySnapshot::new(timestamp);
                for source in sources {
                    let value = source.read().await?;
                    snapshot.insert(source.field.clone(), value);
                }
                Ok(snapshot)
            }
            SnapshotSource::Aggregate(path) => read_aggregate(path, timestamp).await,
        }
    }

    /// Number of configured fields, `None` for an aggregate file.
    pub fn field_count(&self) -> Option<usize> {
        match self {
            SnapshotSource::Fields(sources) => Some(sources.len()),
            SnapshotSource::Aggregate(_) => None,
        }
    }
}

async fn read_aggregate(path: &Path, timestamp: i64) -> Result<TelemetrySnapshot> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PublisherError::Aggregate {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut snapshot =
        TelemetrySnapshot::from_json(&content).map_err(|e| PublisherError::Aggregate {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    if !snapshot.contains(TIMESTAMP_FIELD) {
        snapshot.insert(TIMESTAMP_FIELD, timestamp.to_string());
    }

    Ok(snapshot)
}

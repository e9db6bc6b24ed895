//! Snapshot collection and the aggregate file.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tempfile::NamedTempFile;

use edgetel_common::TelemetrySnapshot;

use crate::error::{CollectorError, Result};
use crate::parser::OutputParser;
use crate::runner::CommandRunner;

/// A snapshot field produced by running a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorSource {
    pub field: String,
    pub program: String,
    pub args: Vec<String>,
    pub parser: OutputParser,
}

impl CollectorSource {
    pub fn new(field: &str, program: &str, args: &[&str], parser: OutputParser) -> Self {
        Self {
            field: field.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            parser,
        }
    }
}

/// Battery percentage and total uptime.
pub fn default_sources() -> Vec<CollectorSource> {
    vec![
        CollectorSource::new(
            "battery_percentage",
            "upower",
            &["-d"],
            OutputParser::UpowerPercentage,
        ),
        CollectorSource::new(
            "uptime_total_seconds",
            "uptime",
            &[],
            OutputParser::UptimeSeconds,
        ),
    ]
}

/// Run every source and assemble a snapshot stamped with `timestamp`.
///
/// Stops at the first failing source.
pub async fn collect_snapshot<R: CommandRunner>(
    sources: &[CollectorSource],
    runner: &R,
    timestamp: i64,
) -> Result<TelemetrySnapshot> {
    let mut snapshot = TelemetrySnapshot::new(timestamp);

    for source in sources {
        let args: Vec<&str> = source.args.iter().map(String::as_str).collect();
        let output = runner
            .run(&source.program, &args)
            .await
            .map_err(|e| CollectorError::Command {
                program: source.program.clone(),
                source: e,
            })?;

        let value = source
            .parser
            .parse(&output)
            .map_err(|e| CollectorError::Parse {
                field: source.field.clone(),
                source: e,
            })?;

        tracing::debug!(field = %source.field, value = %value, "Collected");
        snapshot.insert(source.field.clone(), value);
    }

    Ok(snapshot)
}

/// Write `snapshot` as 4-space indented JSON, replacing `path` atomically.
///
/// Missing parent directories are created.
pub fn write_snapshot(path: &Path, snapshot: &TelemetrySnapshot) -> Result<()> {
    let write_err = |source| CollectorError::Write {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    snapshot.serialize(&mut serializer)?;

    let mut file = NamedTempFile::new_in(parent).map_err(write_err)?;
    file.write_all(&buf).map_err(write_err)?;
    file.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}

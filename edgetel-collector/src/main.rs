//! Host-side telemetry collector.
//!
//! Runs once: collects readings that need host commands and writes them to
//! the aggregate snapshot file. Meant to be run from cron.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use edgetel_common::{LogFormat, LoggingConfig, current_timestamp_secs, init_tracing};

use edgetel_collector::{DEFAULT_OUTPUT, SystemRunner, collect_snapshot, default_sources, write_snapshot};

#[derive(Parser, Debug)]
#[command(name = "edgetel-collector", version, about = "Collect host telemetry into a snapshot file")]
struct Args {
    /// Snapshot file to write
    #[arg(short, long, env = "TELEMETRY_FILE", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&LoggingConfig {
        level: args.log_level.clone(),
        format: if args.json_logs {
            LogFormat::Json
        } else {
            LogFormat::Text
        },
    })
    .map_err(|e| anyhow::anyhow!("{}", e))?;

    let snapshot = collect_snapshot(&default_sources(), &SystemRunner, current_timestamp_secs())
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    write_snapshot(&args.output, &snapshot).map_err(|e| anyhow::anyhow!("{}", e))?;

    tracing::info!(
        path = %args.output.display(),
        fields = snapshot.len(),
        "Snapshot written"
    );

    Ok(())
}

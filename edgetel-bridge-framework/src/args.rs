//! CLI argument parsing shared by EdgeTel binaries.

use std::path::PathBuf;

use clap::Args;

/// Common CLI arguments for all services.
///
/// Meant to be flattened into a binary's own `Parser` struct.
#[derive(Args, Debug, Clone, Default)]
pub struct BridgeArgs {
    /// Path to a JSON5 configuration file.
    #[arg(short, long, env = "EDGETEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,
}

//! One-shot host telemetry collector.
//!
//! Some readings (battery state from `upower`, uptime from `uptime`) need
//! host commands that a containerized publisher cannot run. This crate runs
//! them on the host, typically from cron, and writes the result as a flat
//! JSON snapshot file that the publisher reads as its aggregate source.
//!
//! ```text
//! {
//!     "timestamp": "1700000000",
//!     "battery_percentage": "87",
//!     "uptime_total_seconds": "273900"
//! }
//! ```

pub mod collect;
pub mod error;
pub mod parser;
pub mod runner;

pub use collect::{CollectorSource, collect_snapshot, default_sources, write_snapshot};
pub use error::{CollectorError, Result};
pub use parser::{OutputParser, ParseError, parse_upower_percentage, parse_uptime_seconds};
pub use runner::{CommandRunner, SystemRunner};

/// Where the publisher expects the aggregate file by default.
pub const DEFAULT_OUTPUT: &str = "/home/mobian/telemetry_data/telemetry_data.json";

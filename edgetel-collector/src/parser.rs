//! Parsers for command output.

use thiserror::Error;

/// Command output did not have the expected shape.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ParseError(pub String);

/// How to turn a command's output into a snapshot value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputParser {
    /// Value of the last `percentage:` line of `upower -d`, `%` removed.
    UpowerPercentage,
    /// Total seconds from the `up ...` part of `uptime`.
    UptimeSeconds,
    /// The whole output, whitespace trimmed.
    Trimmed,
}

impl OutputParser {
    pub fn parse(&self, output: &str) -> Result<String, ParseError> {
        match self {
            OutputParser::UpowerPercentage => parse_upower_percentage(output),
            OutputParser::UptimeSeconds => parse_uptime_seconds(output).map(|s| s.to_string()),
            OutputParser::Trimmed => Ok(output.trim().to_string()),
        }
    }
}

/// Extract the battery percentage from `upower -d` output.
///
/// ```text
///   percentage:          87%
/// ```
///
/// With several devices listed the last one wins, which is normally the
/// aggregated `DisplayDevice`.
pub fn parse_upower_percentage(output: &str) -> Result<String, ParseError> {
    output
        .lines()
        .rev()
        .filter_map(|line| line.trim().strip_prefix("percentage:"))
        .map(|value| value.trim().trim_end_matches('%').trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ParseError("no percentage line in upower output".to_string()))
}

/// Total uptime in seconds from `uptime` output.
///
/// Handles the procps and busybox layouts:
///
/// ```text
///  14:03:12 up 3 days,  4:05,  2 users,  load average: 0.00, 0.01, 0.05
///  14:03:12 up 45 min,  1 user,  load average: 0.10, 0.02, 0.00
///  14:03:12 up 1 day, 23 min,  load average: 0.00, 0.00, 0.00
/// ```
pub fn parse_uptime_seconds(output: &str) -> Result<u64, ParseError> {
    let err = || ParseError(format!("unrecognized uptime output: {:?}", output.trim()));

    let (_, rest) = output.split_once(" up ").ok_or_else(err)?;

    let mut total = 0u64;
    let mut matched = false;

    for part in rest.split(',').map(str::trim) {
        if part.contains("user") || part.starts_with("load average") {
            break;
        }

        if let Some((hours, minutes)) = part.split_once(':') {
            let hours: u64 = hours.trim().parse().map_err(|_| err())?;
            let minutes: u64 = minutes.trim().parse().map_err(|_| err())?;
            total += hours * 3600 + minutes * 60;
            matched = true;
            continue;
        }

        let mut tokens = part.split_whitespace();
        let (Some(count), Some(unit)) = (tokens.next(), tokens.next()) else {
            return Err(err());
        };
        let count: u64 = count.parse().map_err(|_| err())?;
        let scale = match unit {
            "day" | "days" => 86_400,
            "hr" | "hrs" | "hour" | "hours" => 3_600,
            "min" | "mins" => 60,
            "sec" | "secs" => 1,
            _ => return Err(err()),
        };
        total += count * scale;
        matched = true;
    }

    if matched { Ok(total) } else { Err(err()) }
}

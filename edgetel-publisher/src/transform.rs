//! Per-field value transformations.
//!
//! Every rule is a pure function from the raw file contents to the string
//! stored in the snapshot. The temperature rule truncates by character
//! position (`"45.3 C"` becomes `"45"`); downstream consumers rely on that
//! convention, so it must not be turned into numeric parsing.

use std::num::ParseIntError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A value did not have the shape its rule expects.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("expected at least {} whitespace-separated tokens in {input:?}", index + 1)]
    MissingToken { index: usize, input: String },

    #[error("expected an integer, got {input:?}: {source}")]
    NotInteger {
        input: String,
        #[source]
        source: ParseIntError,
    },
}

/// Transformation applied to a raw field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Transform {
    /// Strip leading and trailing whitespace.
    Strip,
    /// Keep the first whitespace-separated token.
    FirstToken,
    /// Keep the first `count` characters of the stripped value.
    LeadingChars { count: usize },
    /// Keep the whitespace-separated token at `index` and append `suffix`.
    NthTokenWithSuffix { index: usize, suffix: String },
    /// Parse an integer in micro-units and format it in whole units.
    MicroToUnit {
        #[serde(default = "default_decimals")]
        decimals: usize,
    },
}

fn default_decimals() -> usize {
    2
}

impl Transform {
    /// Rule used for a field when none is configured explicitly.
    pub fn for_field(field: &str) -> Self {
        match field {
            // /proc/uptime: "<total> <idle>"
            "uptime_total_seconds" => Transform::FirstToken,
            // Millidegrees, truncated by position.
            "cpu_temp" | "battery_temp" => Transform::LeadingChars { count: 2 },
            "mem_free" => Transform::NthTokenWithSuffix {
                index: 4,
                suffix: "kb".to_string(),
            },
            // Microwatts to watts.
            "power_draw" => Transform::MicroToUnit {
                decimals: default_decimals(),
            },
            _ => Transform::Strip,
        }
    }

    /// Apply the rule to a raw value.
    pub fn apply(&self, raw: &str) -> Result<String, TransformError> {
        match self {
            Transform::Strip => Ok(raw.trim().to_string()),
            Transform::FirstToken => nth_token(raw, 0).map(str::to_string),
            Transform::LeadingChars { count } => Ok(raw.trim().chars().take(*count).collect()),
            Transform::NthTokenWithSuffix { index, suffix } => {
                nth_token(raw, *index).map(|token| format!("{}{}", token, suffix))
            }
            Transform::MicroToUnit { decimals } => {
                let trimmed = raw.trim();
                let micro: i64 = trimmed
                    .parse()
                    .map_err(|source| TransformError::NotInteger {
                        input: trimmed.to_string(),
                        source,
                    })?;
                Ok(format!("{:.*}", decimals, micro as f64 / 1_000_000.0))
            }
        }
    }
}

fn nth_token(raw: &str, index: usize) -> Result<&str, TransformError> {
    raw.split_whitespace()
        .nth(index)
        .ok_or_else(|| TransformError::MissingToken {
            index,
            input: raw.to_string(),
        })
}

/// Apply the default rule for `field` to `raw`.
pub fn apply_transformation(field: &str, raw: &str) -> Result<String, TransformError> {
    Transform::for_field(field).apply(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptime_keeps_total_seconds() {
        assert_eq!(
            apply_transformation("uptime_total_seconds", "12345.67 8901.23").unwrap(),
            "12345.67"
        );
        assert_eq!(
            apply_transformation("uptime_total_seconds", "12345.67 8901.23\n").unwrap(),
            "12345.67"
        );
    }

    #[test]
    fn test_uptime_empty_is_error() {
        assert!(matches!(
            apply_transformation("uptime_total_seconds", "  \n"),
            Err(TransformError::MissingToken { index: 0, .. })
        ));
    }

    #[test]
    fn test_temperature_truncates_by_position() {
        assert_eq!(apply_transformation("cpu_temp", "45.3 C").unwrap(), "45");
        assert_eq!(apply_transformation("battery_temp", "31250\n").unwrap(), "31");
        // Three-digit readings are still cut to two characters.
        assert_eq!(apply_transformation("cpu_temp", "105000").unwrap(), "10");
        assert_eq!(apply_transformation("cpu_temp", " 7\n").unwrap(), "7");
    }

    #[test]
    fn test_mem_free_fifth_token() {
        // `free` style line: "Mem: total used free shared buff/cache available"
        assert_eq!(
            apply_transformation("mem_free", "Mem: 3900000 1200000 900000 204800 1800000").unwrap(),
            "204800kb"
        );
        assert_eq!(
            apply_transformation("mem_free", "MemFree:        204800 kB more text").unwrap(),
            "textkb"
        );
    }

    #[test]
    fn test_mem_free_too_short() {
        assert_eq!(
            apply_transformation("mem_free", "MemFree: 204800 kB"),
            Err(TransformError::MissingToken {
                index: 4,
                input: "MemFree: 204800 kB".to_string(),
            })
        );
    }

    #[test]
    fn test_power_draw_microwatts_to_watts() {
        assert_eq!(apply_transformation("power_draw", "2500000").unwrap(), "2.50");
        assert_eq!(apply_transformation("power_draw", "1234567\n").unwrap(), "1.23");
        assert_eq!(apply_transformation("power_draw", "0").unwrap(), "0.00");
        assert_eq!(apply_transformation("power_draw", "-750000").unwrap(), "-0.75");
    }

    #[test]
    fn test_power_draw_not_integer() {
        assert!(matches!(
            apply_transformation("power_draw", "2.5W"),
            Err(TransformError::NotInteger { .. })
        ));
    }

    #[test]
    fn test_unknown_field_strips() {
        assert_eq!(
            apply_transformation("battery_percentage", " 87\n").unwrap(),
            "87"
        );
        assert_eq!(apply_transformation("anything", "\tvalue  ").unwrap(), "value");
    }

    #[test]
    fn test_parse_explicit_rules() {
        let rule: Transform = json5::from_str(r#"{ rule: "leading_chars", count: 3 }"#).unwrap();
        assert_eq!(rule, Transform::LeadingChars { count: 3 });

        let rule: Transform = json5::from_str(r#"{ rule: "micro_to_unit" }"#).unwrap();
        assert_eq!(rule, Transform::MicroToUnit { decimals: 2 });

        let rule: Transform =
            json5::from_str(r#"{ rule: "nth_token_with_suffix", index: 1, suffix: "kb" }"#)
                .unwrap();
        assert_eq!(rule.apply("MemFree: 204800 kB").unwrap(), "204800kb");
    }
}

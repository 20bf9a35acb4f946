//! Parser configuration.
//!
//! All limits have defaults suitable for interactive router management. A
//! configuration document may be loaded from JSON; missing fields fall back
//! to the defaults below.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, ParseError};

/// Maximum accepted output size in bytes (10 MiB).
pub const DEFAULT_MAX_OUTPUT_SIZE: usize = 10 * 1024 * 1024;

/// Maximum line length. Reserved, not enforced.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 10_000;

/// Per-strategy parse deadline in milliseconds.
pub const DEFAULT_PARSE_TIMEOUT_MS: u64 = 5_000;

/// Maximum number of characters of raw output written to the log on failure.
pub const DEFAULT_MAX_LOG_OUTPUT_SIZE: usize = 1_000;

/// Number of command signatures remembered by the strategy cache.
pub const STRATEGY_CACHE_CAPACITY: u64 = 1_024;

/// Configuration options for [`crate::service::ParserService`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ParserConfig {
    /// Maximum output size to parse, in bytes.
    pub max_output_size: usize,

    /// Maximum line length to process. Reserved.
    pub max_line_length: usize,

    /// Deadline for a single strategy attempt, in milliseconds.
    pub parse_timeout_ms: u64,

    /// Return partial results on parse failure. Reserved.
    pub enable_partial_results: bool,

    /// Fail on any parse warning. Reserved.
    pub strict_mode: bool,

    /// Log a truncated copy of the raw output when a call fails.
    pub log_raw_on_error: bool,

    /// Maximum number of raw output characters logged on failure.
    pub max_log_output_size: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_output_size: DEFAULT_MAX_OUTPUT_SIZE,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            parse_timeout_ms: DEFAULT_PARSE_TIMEOUT_MS,
            enable_partial_results: true,
            strict_mode: false,
            log_raw_on_error: true,
            max_log_output_size: DEFAULT_MAX_LOG_OUTPUT_SIZE,
        }
    }
}

impl ParserConfig {
    /// Loads a configuration document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ParseError> {
        serde_json::from_str(json).map_err(|e| {
            ParseError::new(
                ErrorCode::InvalidFormat,
                format!("invalid parser config: {e}"),
            )
        })
    }

    pub fn parse_timeout(&self) -> Duration {
        Duration::from_millis(self.parse_timeout_ms)
    }

    pub fn with_parse_timeout(mut self, timeout: Duration) -> Self {
        self.parse_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_output_size(mut self, max: usize) -> Self {
        self.max_output_size = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let config = ParserConfig::default();
        assert_eq!(config.max_output_size, 10 * 1024 * 1024);
        assert_eq!(config.max_line_length, 10_000);
        assert_eq!(config.parse_timeout(), Duration::from_secs(5));
        assert!(config.enable_partial_results);
        assert!(!config.strict_mode);
        assert!(config.log_raw_on_error);
        assert_eq!(config.max_log_output_size, 1_000);
    }

    #[test]
    fn from_json_fills_missing_fields_with_defaults() {
        let config =
            ParserConfig::from_json(r#"{"parse_timeout_ms": 250, "strict_mode": true}"#)
                .expect("load config");
        assert_eq!(config.parse_timeout(), Duration::from_millis(250));
        assert!(config.strict_mode);
        assert_eq!(config.max_output_size, DEFAULT_MAX_OUTPUT_SIZE);
    }

    #[test]
    fn from_json_rejects_wrong_types() {
        let err = ParserConfig::from_json(r#"{"max_output_size": "big"}"#)
            .expect_err("string size should fail");
        assert_eq!(err.code, ErrorCode::InvalidFormat);
    }

    #[test]
    fn with_parse_timeout_round_trips_millis() {
        let config = ParserConfig::default().with_parse_timeout(Duration::from_millis(40));
        assert_eq!(config.parse_timeout_ms, 40);
    }
}

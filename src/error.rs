//! Error types for RouterOS output parsing.
//!
//! Hard failures abort a `parse_response` call and carry enough context
//! (line number, raw snippet, troubleshooting suggestions) to diagnose the
//! output that caused them. Non-fatal issues are reported as
//! [`crate::types::ParseWarning`] entries instead.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable error code for parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A strategy did not finish before the configured deadline.
    ParseTimeout,
    /// The output did not have the shape the strategy expected.
    InvalidFormat,
    /// The command type is not supported.
    UnknownCommand,
    /// Only part of the output could be interpreted.
    PartialParse,
    /// The output exceeds the configured size limit.
    OutputTooLarge,
    MalformedTable,
    MalformedDetail,
    MalformedExport,
    /// No registered strategy could handle the output.
    NoMatchingParser,
    EmptyOutput,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ParseTimeout => "PARSE_TIMEOUT",
            ErrorCode::InvalidFormat => "INVALID_FORMAT",
            ErrorCode::UnknownCommand => "UNKNOWN_COMMAND",
            ErrorCode::PartialParse => "PARTIAL_PARSE",
            ErrorCode::OutputTooLarge => "OUTPUT_TOO_LARGE",
            ErrorCode::MalformedTable => "MALFORMED_TABLE",
            ErrorCode::MalformedDetail => "MALFORMED_DETAIL",
            ErrorCode::MalformedExport => "MALFORMED_EXPORT",
            ErrorCode::NoMatchingParser => "NO_MATCHING_PARSER",
            ErrorCode::EmptyOutput => "EMPTY_OUTPUT",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsing error with diagnostic context.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[error("{}: {}{}", .code, .message, line_suffix(.line_number))]
pub struct ParseError {
    pub code: ErrorCode,
    pub message: String,
    /// Command that produced the output, when known.
    pub command: Option<String>,
    /// Line where the error occurred (1-indexed).
    pub line_number: Option<usize>,
    /// Snippet of the raw output around the error.
    pub raw_snippet: Option<String>,
    /// Troubleshooting suggestions for operators.
    pub suggestions: Vec<String>,
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(n) if *n > 0 => format!(" (line {n})"),
        _ => String::new(),
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Truncates `raw` to at most `max_chars` characters, appending `...` when cut.
pub(crate) fn truncate_chars(raw: &str, max_chars: usize) -> String {
    match raw.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &raw[..idx]),
        None => raw.to_string(),
    }
}

impl ParseError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            command: None,
            line_number: None,
            raw_snippet: None,
            suggestions: Vec::new(),
        }
    }

    /// Adds troubleshooting suggestions.
    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions
            .extend(suggestions.into_iter().map(Into::into));
        self
    }

    /// Attaches a raw output snippet, truncated to `max_chars` characters.
    pub fn with_raw_snippet(mut self, raw: &str, max_chars: usize) -> Self {
        self.raw_snippet = Some(truncate_chars(raw, max_chars));
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line_number = Some(line);
        self
    }

    /// Returns true if the same call might succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self.code, ErrorCode::ParseTimeout)
    }

    /// Parsing did not finish within `timeout`.
    pub fn timeout(command: &str, timeout: &str) -> Self {
        let mut err = Self::new(
            ErrorCode::ParseTimeout,
            format!("parsing timed out after {timeout}"),
        )
        .with_suggestions(owned(&[
            "Check if the router is responding slowly",
            "Try reducing the number of items being queried",
            "Consider using /print terse for faster output",
            "Increase the parse timeout if large output is expected",
        ]));
        if !command.is_empty() {
            err.command = Some(command.to_string());
        }
        err
    }

    pub fn invalid_format(raw: &str, detected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFormat,
            format!("could not detect valid output format (detected: {detected})"),
        )
        .with_suggestions(owned(&[
            "Verify the command executed successfully",
            "Check if the router returned an error message",
            "Try running the command directly on the device to see the actual output",
        ]))
        .with_raw_snippet(raw, 500)
    }

    pub fn unknown_command(command_type: &str) -> Self {
        Self::new(
            ErrorCode::UnknownCommand,
            format!("unknown command type: {command_type}"),
        )
        .with_suggestions(owned(&[
            "This command type is not yet supported by the parser",
            "Try using a supported command type (print, print detail, export)",
        ]))
    }

    pub fn partial_parse(parsed: usize, failed: usize, last_line: usize) -> Self {
        Self::new(
            ErrorCode::PartialParse,
            format!("only partially parsed output: {parsed} succeeded, {failed} failed"),
        )
        .with_line(last_line)
        .with_suggestions(owned(&[
            "Some rows in the output had unexpected format",
            "Check the router's RouterOS version for compatibility",
            "Review the partial results which may still be usable",
        ]))
    }

    pub fn output_too_large(actual: usize, max: usize) -> Self {
        Self::new(
            ErrorCode::OutputTooLarge,
            format!("output size ({actual} bytes) exceeds maximum ({max} bytes)"),
        )
        .with_suggestions(owned(&[
            "Use filtering to reduce the output size",
            "Add .proplist to limit returned fields",
            "Consider paginating the query",
        ]))
    }

    pub fn empty_output(command: &str) -> Self {
        let mut err = Self::new(ErrorCode::EmptyOutput, "router returned empty output")
            .with_suggestions(owned(&[
                "The queried path may have no items",
                "Check if the path exists on this router",
                "Verify the user has permission to read this path",
            ]));
        if !command.is_empty() {
            err.command = Some(command.to_string());
        }
        err
    }

    pub fn no_matching_parser(raw: &str, tried: &[String]) -> Self {
        Self::new(
            ErrorCode::NoMatchingParser,
            format!(
                "no parser strategy could handle this output (tried: {})",
                tried.join(", ")
            ),
        )
        .with_suggestions(owned(&[
            "The output format may be unsupported",
            "Check if this is a valid RouterOS command output",
            "Try using /export format as a fallback",
        ]))
        .with_raw_snippet(raw, 500)
    }

    pub fn malformed_table(line: usize, issue: &str) -> Self {
        Self::new(
            ErrorCode::MalformedTable,
            format!("malformed table format: {issue}"),
        )
        .with_line(line)
        .with_suggestions(owned(&[
            "The table format may have changed in this RouterOS version",
            "Check for special characters that may affect column alignment",
            "Try using /print terse for more reliable parsing",
        ]))
    }

    pub fn malformed_detail(line: usize, issue: &str) -> Self {
        Self::new(
            ErrorCode::MalformedDetail,
            format!("malformed detail format: {issue}"),
        )
        .with_line(line)
        .with_suggestions(owned(&[
            "Check for unbalanced quotes or special characters",
            "Try using /print terse for simpler output",
        ]))
    }

    pub fn malformed_export(line: usize, issue: &str) -> Self {
        Self::new(
            ErrorCode::MalformedExport,
            format!("malformed export format: {issue}"),
        )
        .with_line(line)
        .with_suggestions(owned(&[
            "Check if the export was interrupted or truncated",
            "Try running /export compact for simpler output",
        ]))
    }

    /// Multi-line diagnostic report for logging.
    pub fn diagnostic_string(&self) -> String {
        let mut out = String::from("Parse Error Diagnostic\n======================\n");
        out.push_str(&format!("Code:    {}\n", self.code));
        out.push_str(&format!("Message: {}\n", self.message));
        if let Some(command) = &self.command {
            out.push_str(&format!("Command: {command}\n"));
        }
        if let Some(line) = self.line_number.filter(|n| *n > 0) {
            out.push_str(&format!("Line:    {line}\n"));
        }
        if let Some(snippet) = &self.raw_snippet {
            out.push_str("Raw Output Snippet:\n---\n");
            out.push_str(snippet);
            out.push_str("\n---\n");
        }
        if !self.suggestions.is_empty() {
            out.push_str("Troubleshooting Suggestions:\n");
            for (i, s) in self.suggestions.iter().enumerate() {
                out.push_str(&format!("  {}. {}\n", i + 1, s));
            }
        }
        out
    }
}

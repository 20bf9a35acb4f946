//! Fixed-width table output from plain `print`.
//!
//! ```text
//! Flags: X - disabled, R - running
//!  #   NAME      LISTEN-PORT   MTU    RUNNING
//!  0 R vpn-usa   51820         1420   true
//! ```
//!
//! Column spans come from the header line and are reused for every row.

use std::sync::Arc;

use crate::error::ParseError;
use crate::normalizer::Normalizer;
use crate::strategy::{
    CancelToken, ParserStrategy, ResultBuilder, flag_entries, is_column_header, is_export_header,
    leading_lines,
};
use crate::tokenizer::{is_flag_legend, split_row_prefix};
use crate::types::{ColumnInfo, OutputFormat, ParseHints, ParseResult, Value};

const DETECT_LINES: usize = 5;

// Rows with no more entries than this are re-read by whitespace splitting.
const POSITIONAL_FALLBACK_MAX: usize = 2;

pub struct TableStrategy {
    normalizer: Arc<Normalizer>,
}

/// `Columns: NAME, TYPE, MTU` legend printed by RouterOS 7.
fn is_column_legend(line: &str) -> bool {
    line.trim_start().starts_with("Columns:")
}

/// `#  NAME  MTU` style header, as opposed to an export comment.
fn is_hash_header(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with('#')
        && !is_export_header(trimmed)
        && trimmed
            .trim_start_matches('#')
            .split_whitespace()
            .next()
            .and_then(|w| w.chars().next())
            .is_some_and(char::is_uppercase)
}

fn is_legend(line: &str) -> bool {
    is_flag_legend(line) || is_column_legend(line)
}

impl TableStrategy {
    pub fn new(normalizer: Arc<Normalizer>) -> Self {
        Self { normalizer }
    }

    /// Column spans by character position. The `#` marker column is dropped.
    pub fn extract_columns(&self, header: &str) -> Vec<ColumnInfo> {
        let mut runs: Vec<(usize, String)> = Vec::new();
        let mut current: Option<(usize, String)> = None;
        for (i, ch) in header.chars().enumerate() {
            if ch.is_whitespace() {
                if let Some(run) = current.take() {
                    runs.push(run);
                }
            } else {
                match current.as_mut() {
                    Some((_, name)) => name.push(ch),
                    None => current = Some((i, ch.to_string())),
                }
            }
        }
        runs.extend(current);

        runs.iter()
            .enumerate()
            .filter(|(_, (_, name))| name != "#")
            .map(|(i, (start, name))| ColumnInfo {
                name: name.clone(),
                start: *start,
                // the last column runs to the end of every row
                end: runs.get(i + 1).map_or(usize::MAX, |(next, _)| *next),
                normalized_name: self.normalizer.normalize_field_name(name),
            })
            .collect()
    }

    fn parse_row(&self, line: &str, columns: &[ColumnInfo]) -> Vec<(String, Value)> {
        let prefix = split_row_prefix(line);
        let mut entries = Vec::new();
        if let Some(n) = prefix.number {
            entries.push((".id".to_string(), Value::String(format!("*{n}"))));
        }

        let chars: Vec<char> = line.chars().collect();
        for col in columns {
            if col.start >= chars.len() {
                continue;
            }
            let end = col.end.min(chars.len());
            let value: String = chars[col.start..end].iter().collect();
            let value = value.trim();
            if !value.is_empty() {
                entries.push((col.name.clone(), Value::from(value)));
            }
        }

        let flags: Vec<_> = flag_entries(&prefix.flags).collect();
        if entries.len() + flags.len() <= POSITIONAL_FALLBACK_MAX {
            for (col, part) in columns.iter().zip(prefix.rest.split_whitespace()) {
                entries.push((col.name.clone(), Value::from(part)));
            }
        }
        // Flags last so `R` wins over a RUNNING column.
        entries.extend(flags);
        entries
    }
}

impl ParserStrategy for TableStrategy {
    fn name(&self) -> &str {
        "table"
    }

    fn priority(&self) -> u32 {
        2
    }

    fn can_parse(&self, raw: &str, _hints: &ParseHints) -> bool {
        leading_lines(raw, DETECT_LINES)
            .any(|l| is_flag_legend(l) || is_hash_header(l) || is_column_header(l))
    }

    fn parse(
        &self,
        raw: &str,
        _hints: &ParseHints,
        cancel: &CancelToken,
    ) -> Result<ParseResult, ParseError> {
        let mut lines = raw.lines().enumerate();

        let mut columns = None;
        for (_, line) in lines.by_ref() {
            cancel.check()?;
            if line.trim().is_empty() || is_legend(line) {
                continue;
            }
            if is_column_header(line) || is_hash_header(line) {
                columns = Some(self.extract_columns(line));
                break;
            }
        }
        let Some(columns) = columns else {
            return Err(ParseError::malformed_table(0, "could not find header line"));
        };

        let mut out = ResultBuilder::new(&self.normalizer, OutputFormat::Table, self.name());
        for (idx, line) in lines {
            cancel.check()?;
            let line_no = idx + 1;
            if line.trim().is_empty() || is_legend(line) {
                continue;
            }
            let entries = self.parse_row(line, &columns);
            if entries.is_empty() {
                out.skip(line_no, line, "could not extract any values from row");
                continue;
            }
            out.push(line_no, entries);
        }

        Ok(out.finish(String::new()))
    }
}

//! `print detail` output.
//!
//! Each item starts on a numbered row and may continue on indented lines:
//!
//! ```text
//! Flags: X - disabled; R - running
//!  0  R name="wg0" mtu=1420 listen-port=51820
//!       public-key="abc="
//!  1  X ;;; backup tunnel
//!       name="wg1" mtu=1420
//! ```

use std::sync::Arc;

use crate::error::ParseError;
use crate::normalizer::Normalizer;
use crate::strategy::{CancelToken, ParserStrategy, ResultBuilder, flag_entries, hinted};
use crate::tokenizer::{self, RowPrefix, indentation, is_flag_legend, split_row_prefix};
use crate::types::{OutputFormat, ParseHints, ParseResult, Value};

const DETECT_LINES: usize = 15;
const CONTINUATION_INDENT: usize = 4;
const COMMENT_MARKER: &str = ";;;";

pub struct DetailStrategy {
    normalizer: Arc<Normalizer>,
}

/// A numbered row that opens a new item, if `line` is one.
fn row_start(line: &str) -> Option<RowPrefix<'_>> {
    if indentation(line) >= CONTINUATION_INDENT {
        return None;
    }
    let prefix = split_row_prefix(line);
    prefix.number?;
    if prefix.rest.starts_with(COMMENT_MARKER) || prefix.rest.contains('=') {
        Some(prefix)
    } else {
        None
    }
}

fn is_continuation(line: &str) -> bool {
    indentation(line) >= CONTINUATION_INDENT && line.contains('=')
}

fn pairs(text: &str) -> Vec<(String, Value)> {
    tokenizer::DETAIL
        .pairs(text)
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect()
}

impl DetailStrategy {
    pub fn new(normalizer: Arc<Normalizer>) -> Self {
        Self { normalizer }
    }
}

impl ParserStrategy for DetailStrategy {
    fn name(&self) -> &str {
        "detail"
    }

    fn priority(&self) -> u32 {
        3
    }

    fn can_parse(&self, raw: &str, hints: &ParseHints) -> bool {
        if hinted(hints, OutputFormat::Detail) {
            return true;
        }
        let (mut starts, mut continuations) = (false, false);
        for line in raw
            .lines()
            .filter(|l| !l.trim().is_empty() && !is_flag_legend(l))
            .take(DETECT_LINES)
        {
            starts |= row_start(line).is_some();
            continuations |= is_continuation(line);
            if starts && continuations {
                return true;
            }
        }
        false
    }

    fn parse(
        &self,
        raw: &str,
        _hints: &ParseHints,
        cancel: &CancelToken,
    ) -> Result<ParseResult, ParseError> {
        let mut out = ResultBuilder::new(&self.normalizer, OutputFormat::Detail, self.name());
        // (line the item started on, device-named entries)
        let mut current: Option<(usize, Vec<(String, Value)>)> = None;
        let mut first_bad_line = 0;

        for (idx, line) in raw.lines().enumerate() {
            cancel.check()?;
            let line_no = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || is_flag_legend(line) {
                continue;
            }

            if let Some(prefix) = row_start(line) {
                if let Some((start, entries)) = current.take() {
                    out.push(start, entries);
                }
                let mut entries = Vec::new();
                if let Some(n) = prefix.number {
                    entries.push((".id".to_string(), Value::String(format!("*{n}"))));
                }
                entries.extend(flag_entries(&prefix.flags));
                match prefix.rest.strip_prefix(COMMENT_MARKER) {
                    Some(text) => {
                        entries.push(("comment".to_string(), Value::from(text.trim())));
                    }
                    None => entries.extend(pairs(prefix.rest)),
                }
                current = Some((line_no, entries));
                continue;
            }

            if trimmed.contains('=') {
                match current.as_mut() {
                    Some((_, entries)) => entries.extend(pairs(trimmed)),
                    // single-item output without a row number
                    None => current = Some((line_no, pairs(trimmed))),
                }
                continue;
            }

            if current.is_none() {
                if first_bad_line == 0 {
                    first_bad_line = line_no;
                }
                out.skip(line_no, line, "could not parse line");
            }
        }
        if let Some((start, entries)) = current.take() {
            out.push(start, entries);
        }

        if out.is_empty() {
            return Err(ParseError::malformed_detail(
                first_bad_line,
                "no key=value records found",
            ));
        }
        Ok(out.finish(String::new()))
    }
}

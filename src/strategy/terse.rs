//! `print terse` output: one `key=value;key=value` line per item.

use std::sync::Arc;

use crate::error::ParseError;
use crate::normalizer::Normalizer;
use crate::strategy::{CancelToken, ParserStrategy, ResultBuilder, hinted, leading_lines};
use crate::tokenizer;
use crate::types::{OutputFormat, ParseHints, ParseResult, Value};

const DETECT_LINES: usize = 10;

pub struct TerseStrategy {
    normalizer: Arc<Normalizer>,
}

impl TerseStrategy {
    pub fn new(normalizer: Arc<Normalizer>) -> Self {
        Self { normalizer }
    }
}

/// `a=1;b=2` or a lone `key=value` token.
fn is_terse_line(line: &str) -> bool {
    let segments = line.split(';').filter(|s| !s.trim().is_empty());
    let (mut total, mut with_eq) = (0, 0);
    for s in segments {
        total += 1;
        if s.contains('=') {
            with_eq += 1;
        }
    }
    if total >= 2 && with_eq == total {
        return true;
    }

    // Leading indentation rules out detail continuation lines.
    let line = line.trim_end();
    !line.contains(char::is_whitespace)
        && !line.contains(';')
        && line.find('=').is_some_and(|idx| idx > 0)
}

impl ParserStrategy for TerseStrategy {
    fn name(&self) -> &str {
        "terse"
    }

    fn priority(&self) -> u32 {
        1
    }

    fn can_parse(&self, raw: &str, hints: &ParseHints) -> bool {
        hinted(hints, OutputFormat::Terse) || leading_lines(raw, DETECT_LINES).any(is_terse_line)
    }

    fn parse(
        &self,
        raw: &str,
        _hints: &ParseHints,
        cancel: &CancelToken,
    ) -> Result<ParseResult, ParseError> {
        let mut out = ResultBuilder::new(&self.normalizer, OutputFormat::Terse, self.name());

        for (idx, line) in raw.lines().enumerate() {
            cancel.check()?;
            let line_no = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let pairs = if trimmed.contains('=') {
                tokenizer::TERSE.pairs(trimmed)
            } else {
                Vec::new()
            };
            if pairs.is_empty() {
                out.skip(line_no, line, "no key=value pairs found");
                continue;
            }

            let entries = pairs
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            out.push(line_no, entries);
        }

        if out.is_empty() {
            return Err(ParseError::invalid_format(raw, "terse"));
        }
        Ok(out.finish(String::new()))
    }
}

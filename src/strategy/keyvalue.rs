//! `key: value` output describing a single item, as printed by
//! `/system resource print`.

use std::sync::Arc;

use crate::error::ParseError;
use crate::normalizer::Normalizer;
use crate::strategy::{CancelToken, ParserStrategy, ResultBuilder, hinted};
use crate::tokenizer::is_flag_legend;
use crate::types::{OutputFormat, ParseHints, ParseResult, RouterOsVersion, Value};

const DETECT_LINES: usize = 15;
const MIN_DETECTED_PAIRS: usize = 3;
const MAX_KEY_LEN: usize = 50;

pub struct KeyValueStrategy {
    normalizer: Arc<Normalizer>,
}

/// Splits `  free-memory: 1.2GiB` into its key and value.
fn split_pair(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    let idx = trimmed.find(':').filter(|idx| *idx > 0)?;
    let key = trimmed[..idx].trim();
    if key.is_empty()
        || key.chars().count() > MAX_KEY_LEN
        || key.starts_with('#')
        || key.starts_with('/')
    {
        return None;
    }
    Some((key, trimmed[idx + 1..].trim()))
}

impl KeyValueStrategy {
    pub fn new(normalizer: Arc<Normalizer>) -> Self {
        Self { normalizer }
    }
}

impl ParserStrategy for KeyValueStrategy {
    fn name(&self) -> &str {
        "keyvalue"
    }

    fn priority(&self) -> u32 {
        5
    }

    fn can_parse(&self, raw: &str, hints: &ParseHints) -> bool {
        if hinted(hints, OutputFormat::KeyValue) {
            return true;
        }
        raw.lines()
            .filter(|l| !l.trim().is_empty() && !is_flag_legend(l))
            .take(DETECT_LINES)
            .filter(|l| split_pair(l).is_some())
            .count()
            >= MIN_DETECTED_PAIRS
    }

    fn parse(
        &self,
        raw: &str,
        _hints: &ParseHints,
        cancel: &CancelToken,
    ) -> Result<ParseResult, ParseError> {
        let mut out = ResultBuilder::new(&self.normalizer, OutputFormat::KeyValue, self.name());
        let mut entries = Vec::new();
        let mut last_line = 0;

        for (idx, line) in raw.lines().enumerate() {
            cancel.check()?;
            let line_no = idx + 1;
            if line.trim().is_empty() || is_flag_legend(line) {
                continue;
            }
            match split_pair(line) {
                Some((key, value)) => {
                    entries.push((key.to_string(), Value::from(value)));
                    last_line = line_no;
                }
                None => out.skip(line_no, line, "expected key: value"),
            }
        }

        if entries.is_empty() {
            return Err(ParseError::invalid_format(raw, "keyvalue"));
        }

        let version = entries
            .iter()
            .find(|(k, _)| k == "version")
            .and_then(|(_, v)| v.as_str())
            .and_then(RouterOsVersion::parse)
            .map(|v| format!("{}.{}.{}", v.major, v.minor, v.patch))
            .unwrap_or_default();

        out.push(last_line, entries);
        Ok(out.finish(version))
    }
}

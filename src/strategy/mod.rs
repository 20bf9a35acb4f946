//! Format strategies.
//!
//! Each strategy recognizes and parses one output layout. The service tries
//! them in ascending [`ParserStrategy::priority`] order until one succeeds.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ErrorCode, ParseError};
use crate::normalizer::Normalizer;
use crate::types::{
    OutputFormat, ParseHints, ParseMetadata, ParseResult, ParseWarning, PartialParseData,
    Resource, TableFlags, Value, WarningCode,
};

pub mod detail;
pub mod export;
pub mod keyvalue;
pub mod table;
pub mod terse;

pub use detail::DetailStrategy;
pub use export::ExportStrategy;
pub use keyvalue::KeyValueStrategy;
pub use table::TableStrategy;
pub use terse::TerseStrategy;

/// A parser for one RouterOS output layout.
///
/// Strategies hold no per-call state and may be invoked concurrently.
pub trait ParserStrategy: Send + Sync {
    /// Unique name, recorded in [`ParseMetadata::strategy_used`].
    fn name(&self) -> &str;

    /// Lower values are tried first.
    fn priority(&self) -> u32;

    /// Cheap check whether `raw` looks like this strategy's format.
    fn can_parse(&self, raw: &str, hints: &ParseHints) -> bool;

    /// Parses `raw`. Implementations call [`CancelToken::check`] once per
    /// line and return its error when the attempt was abandoned.
    fn parse(
        &self,
        raw: &str,
        hints: &ParseHints,
        cancel: &CancelToken,
    ) -> Result<ParseResult, ParseError>;
}

/// The five built-in strategies in priority order.
pub fn default_strategies(normalizer: &Arc<Normalizer>) -> Vec<Arc<dyn ParserStrategy>> {
    vec![
        Arc::new(TerseStrategy::new(normalizer.clone())),
        Arc::new(TableStrategy::new(normalizer.clone())),
        Arc::new(DetailStrategy::new(normalizer.clone())),
        Arc::new(ExportStrategy::new(normalizer.clone())),
        Arc::new(KeyValueStrategy::new(normalizer.clone())),
    ]
}

/// Cooperative cancellation flag shared between the service and a running
/// strategy attempt.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Fails with `ParseTimeout` once the token has been cancelled.
    pub fn check(&self) -> Result<(), ParseError> {
        if self.is_cancelled() {
            return Err(ParseError::new(
                ErrorCode::ParseTimeout,
                "parse attempt cancelled",
            ));
        }
        Ok(())
    }
}

/// True when the caller's hints name `format` explicitly or through the
/// command type.
pub(crate) fn hinted(hints: &ParseHints, format: OutputFormat) -> bool {
    hints.implied_format() == Some(format)
}

/// First `limit` non-blank lines.
pub(crate) fn leading_lines(raw: &str, limit: usize) -> impl Iterator<Item = &str> {
    raw.lines().filter(|l| !l.trim().is_empty()).take(limit)
}

static EXPORT_HEADER: Lazy<Regex> = Lazy::new(|| {
    match Regex::new(
        r"(?i)^#\s*(?:(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)/\d{1,2}/\d{4}|\d{4}-\d{2}-\d{2}|software id|model|routeros)",
    ) {
        Ok(re) => re,
        Err(err) => panic!("invalid EXPORT_HEADER regex: {err}"),
    }
});

/// `# jan/15/2024 10:30:00 by RouterOS 7.13.2` and similar export headers.
pub(crate) fn is_export_header(line: &str) -> bool {
    EXPORT_HEADER.is_match(line.trim_start())
}

/// A table header: at least two words of two or more characters whose
/// letters are mostly uppercase. The `#` column marker is not counted.
pub(crate) fn is_column_header(line: &str) -> bool {
    let upper_words = line
        .split_whitespace()
        .filter(|w| *w != "#")
        .filter(|w| {
            let letters = w.chars().filter(|c| c.is_alphabetic()).count();
            let upper = w.chars().filter(|c| c.is_uppercase()).count();
            w.chars().count() >= 2 && letters > 0 && upper * 10 >= letters * 7
        })
        .count();
    upper_words >= 2
}

/// Accumulates resources and skipped lines for one parse call.
pub(crate) struct ResultBuilder<'a> {
    normalizer: &'a Normalizer,
    format: OutputFormat,
    strategy: &'a str,
    resources: Vec<Resource>,
    warnings: Vec<ParseWarning>,
    unparseable: Vec<String>,
    last_successful_line: usize,
}

impl<'a> ResultBuilder<'a> {
    pub(crate) fn new(normalizer: &'a Normalizer, format: OutputFormat, strategy: &'a str) -> Self {
        Self {
            normalizer,
            format,
            strategy,
            resources: Vec::new(),
            warnings: Vec::new(),
            unparseable: Vec::new(),
            last_successful_line: 0,
        }
    }

    /// Normalizes device-named entries and appends them as one resource.
    /// Empty records are dropped.
    pub(crate) fn push(&mut self, line: usize, entries: Vec<(String, Value)>) {
        if entries.is_empty() {
            return;
        }
        self.resources.push(self.normalizer.normalize_resource(entries));
        self.last_successful_line = line;
    }

    /// Appends an already normalized resource.
    pub(crate) fn push_normalized(&mut self, line: usize, resource: Resource) {
        self.resources.push(resource);
        self.last_successful_line = line;
    }

    /// Records a line that could not be parsed.
    pub(crate) fn skip(&mut self, line: usize, text: &str, message: impl Into<String>) {
        self.warnings.push(ParseWarning {
            line,
            message: message.into(),
            code: WarningCode::MalformedLine,
        });
        self.unparseable.push(text.to_string());
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub(crate) fn finish(self, router_os_version: String) -> ParseResult {
        let partial_data = (!self.unparseable.is_empty()).then(|| PartialParseData {
            parsed_count: self.resources.len(),
            failed_count: self.unparseable.len(),
            unparseable_lines: self.unparseable,
            last_successful_line: self.last_successful_line,
        });
        ParseResult {
            metadata: ParseMetadata {
                format: self.format,
                row_count: self.resources.len(),
                strategy_used: self.strategy.to_string(),
                router_os_version,
                ..ParseMetadata::default()
            },
            resources: self.resources,
            warnings: self.warnings,
            partial_data,
        }
    }
}

/// Row flags as boolean entries. Only set flags are emitted.
pub(crate) fn flag_entries(flags: &TableFlags) -> impl Iterator<Item = (String, Value)> + '_ {
    flags
        .set_fields()
        .into_iter()
        .map(|name| (name.to_string(), Value::Bool(true)))
}

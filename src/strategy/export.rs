//! `/export` script output.
//!
//! ```text
//! # jan/15/2024 10:30:00 by RouterOS 7.13.2
//! # software id = XXXX-XXXX
//! /interface wireguard
//! add listen-port=51820 mtu=1420 name=vpn-usa
//! add listen-port=51821 mtu=1420 name=vpn-eu
//! ```
//!
//! Every command becomes one resource carrying `_path`, `_action` and, when
//! present, `_comment` and `_find` next to its properties.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ParseError;
use crate::normalizer::Normalizer;
use crate::strategy::{CancelToken, ParserStrategy, ResultBuilder, hinted, is_export_header};
use crate::tokenizer;
use crate::types::{ExportCommand, ExportSection, OutputFormat, ParseHints, ParseResult, Value};

const DETECT_LINES: usize = 20;
const VERSION_LINES: usize = 10;
const VERBS: &[&str] = &["add", "set", "remove", "enable", "disable", "move", "comment"];

static EXPORT_VERSION: Lazy<Regex> = Lazy::new(|| {
    match Regex::new(r"RouterOS\s+(\d+\.\d+(?:\.\d+)?)") {
        Ok(re) => re,
        Err(err) => panic!("invalid EXPORT_VERSION regex: {err}"),
    }
});

pub struct ExportStrategy {
    normalizer: Arc<Normalizer>,
}

fn is_path_line(trimmed: &str) -> bool {
    trimmed.starts_with('/') && !trimmed.contains('=')
}

fn is_command(trimmed: &str) -> bool {
    trimmed
        .split_whitespace()
        .next()
        .is_some_and(|verb| VERBS.contains(&verb))
}

/// RouterOS version from the header comments, if any.
pub fn export_version(raw: &str) -> Option<String> {
    raw.lines()
        .take(VERSION_LINES)
        .map(str::trim)
        .filter(|l| l.starts_with('#'))
        .find_map(|l| EXPORT_VERSION.captures(l).map(|c| c[1].to_string()))
}

/// Byte index of the last ` #` outside double quotes.
fn inline_comment_start(line: &str) -> Option<usize> {
    let mut in_quote = false;
    let mut prev_space = false;
    let mut found = None;
    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => in_quote = !in_quote,
            '#' if prev_space && !in_quote => found = Some(idx - 1),
            _ => {}
        }
        prev_space = ch == ' ';
    }
    found
}

/// Splits a `[ find ... ]` selector off the front of `args`.
fn split_selector(args: &str) -> (Option<&str>, &str) {
    let Some(inner) = args.strip_prefix('[') else {
        return (None, args);
    };
    match inner.find(']') {
        Some(end) => (Some(inner[..end].trim()), inner[end + 1..].trim_start()),
        None => (None, args),
    }
}

fn parse_command(line: &str, line_number: usize) -> ExportCommand {
    let (body, comment) = match inline_comment_start(line) {
        Some(idx) if idx > 0 => (
            line[..idx].trim(),
            Some(line[idx + 2..].trim().to_string()),
        ),
        _ => (line.trim(), None),
    };

    let (action, args) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
    let (selector, args) = split_selector(args.trim());

    let properties: BTreeMap<String, String> =
        tokenizer::EXPORT.pairs(args).into_iter().collect();

    ExportCommand {
        action: action.to_string(),
        properties,
        selector: selector.map(str::to_string),
        comment: comment.filter(|c| !c.is_empty()),
        line_number,
    }
}

impl ExportStrategy {
    pub fn new(normalizer: Arc<Normalizer>) -> Self {
        Self { normalizer }
    }

    /// Groups the commands of an export by path section.
    pub fn parse_sections(&self, raw: &str) -> Result<Vec<ExportSection>, ParseError> {
        scan(raw, &CancelToken::new(), &mut |_: usize, _: &str| {})
    }
}

/// Walks the export once. Lines that are neither comments, paths nor
/// commands are reported through `unrecognized`.
fn scan(
    raw: &str,
    cancel: &CancelToken,
    unrecognized: &mut dyn FnMut(usize, &str),
) -> Result<Vec<ExportSection>, ParseError> {
    let mut sections: Vec<ExportSection> = Vec::new();
    let mut current: Option<ExportSection> = None;
    let mut pending = String::new();
    let mut pending_start = 0;

    for (idx, line) in raw.lines().enumerate() {
        cancel.check()?;
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || (pending.is_empty() && trimmed.starts_with('#')) {
            continue;
        }

        if pending.is_empty() && is_path_line(trimmed) {
            sections.extend(current.take());
            current = Some(ExportSection {
                path: trimmed.to_string(),
                commands: Vec::new(),
            });
            continue;
        }

        if let Some(head) = trimmed.strip_suffix('\\') {
            if pending.is_empty() {
                pending_start = line_no;
            }
            // wraps may fall inside a value; join without a separator
            pending.push_str(head);
            continue;
        }

        let (full, start) = if pending.is_empty() {
            (trimmed.to_string(), line_no)
        } else {
            pending.push_str(trimmed);
            (std::mem::take(&mut pending), pending_start)
        };

        if !is_command(&full) {
            unrecognized(start, &full);
            continue;
        }
        current
            .get_or_insert_with(|| ExportSection {
                path: "/".to_string(),
                commands: Vec::new(),
            })
            .commands
            .push(parse_command(&full, start));
    }

    if !pending.is_empty() {
        return Err(ParseError::malformed_export(
            pending_start,
            "line continuation at end of output",
        ));
    }
    sections.extend(current);
    Ok(sections)
}

impl ParserStrategy for ExportStrategy {
    fn name(&self) -> &str {
        "export"
    }

    fn priority(&self) -> u32 {
        4
    }

    fn can_parse(&self, raw: &str, hints: &ParseHints) -> bool {
        if hinted(hints, OutputFormat::Export) {
            return true;
        }
        let (mut header, mut path, mut command) = (false, false, false);
        for line in raw.lines().take(DETECT_LINES) {
            let trimmed = line.trim();
            if trimmed.starts_with('#') {
                header |= is_export_header(trimmed);
            } else if is_path_line(trimmed) {
                path = true;
            } else {
                command |= is_command(trimmed);
            }
        }
        command && (path || header)
    }

    fn parse(
        &self,
        raw: &str,
        _hints: &ParseHints,
        cancel: &CancelToken,
    ) -> Result<ParseResult, ParseError> {
        let mut skipped: Vec<(usize, String)> = Vec::new();
        let sections = scan(raw, cancel, &mut |line: usize, text: &str| {
            skipped.push((line, text.to_string()));
        })?;

        if sections.is_empty() {
            let line = skipped.first().map_or(0, |(line, _)| *line);
            return Err(ParseError::malformed_export(line, "no path sections or commands found"));
        }

        let mut out = ResultBuilder::new(&self.normalizer, OutputFormat::Export, self.name());
        for (line, text) in &skipped {
            out.skip(*line, text, "not an export command");
        }
        for section in &sections {
            for cmd in &section.commands {
                // synthetic keys are added after normalization so they keep their names
                let mut resource = self.normalizer.normalize_resource(
                    cmd.properties
                        .iter()
                        .map(|(k, v)| (k.as_str(), Value::from(v.as_str()))),
                );
                resource.insert("_path".to_string(), Value::from(section.path.as_str()));
                resource.insert("_action".to_string(), Value::from(cmd.action.as_str()));
                if let Some(comment) = &cmd.comment {
                    resource.insert("_comment".to_string(), Value::from(comment.as_str()));
                }
                if let Some(selector) = &cmd.selector {
                    resource.insert("_find".to_string(), Value::from(selector.as_str()));
                }
                out.push_normalized(cmd.line_number, resource);
            }
        }

        Ok(out.finish(export_version(raw).unwrap_or_default()))
    }
}

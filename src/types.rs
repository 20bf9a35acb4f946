//! Data model shared by every parsing strategy.
//!
//! A [`ParseResult`] is created once per `parse_response` call and is never
//! mutated after it is returned. Resource keys are always canonical
//! (camelCase) field names.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single field value.
///
/// Parsed values stay strings unless a strategy derives a boolean (row
/// flags). Typed values come from [`crate::convert::TypeConverter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int64(n) => write!(f, "{n}"),
            Value::Float64(n) => write!(f, "{n}"),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int64(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float64(n)
    }
}

/// One logical record, keyed by canonical field name.
pub type Resource = BTreeMap<String, Value>;

/// Result of parsing one command response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParseResult {
    /// Parsed records in device emission order.
    pub resources: Vec<Resource>,
    pub metadata: ParseMetadata,
    /// Non-fatal issues, in the order they were found.
    pub warnings: Vec<ParseWarning>,
    /// Present when at least one line had to be skipped.
    pub partial_data: Option<PartialParseData>,
}

impl ParseResult {
    pub fn empty(format: OutputFormat) -> Self {
        Self {
            metadata: ParseMetadata {
                format,
                ..ParseMetadata::default()
            },
            ..Self::default()
        }
    }
}

/// Information about the parse operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ParseMetadata {
    pub format: OutputFormat,
    pub row_count: usize,
    pub parse_time: Duration,
    /// Name of the strategy that produced the result.
    pub strategy_used: String,
    /// RouterOS version, empty if unknown.
    pub router_os_version: String,
}

/// A non-fatal issue found while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ParseWarning {
    /// 1-indexed line number, 0 when unknown.
    pub line: usize,
    pub message: String,
    pub code: WarningCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    UnknownField,
    TypeConversion,
    TruncatedValue,
    MalformedLine,
    MissingColumn,
}

/// Lines a strategy skipped while still producing a result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PartialParseData {
    pub parsed_count: usize,
    pub failed_count: usize,
    pub unparseable_lines: Vec<String>,
    /// 1-indexed line of the last record that parsed, 0 if none did.
    pub last_successful_line: usize,
}

/// Textual layout of a command response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Unknown,
    /// Fixed-width columns under a header line.
    Table,
    /// Numbered rows of key=value pairs with indented continuations.
    Detail,
    /// One semicolon-separated key=value line per item.
    Terse,
    /// Script format from `/export`.
    Export,
    /// `key: value` lines describing a single item.
    KeyValue,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Unknown => "unknown",
            OutputFormat::Table => "table",
            OutputFormat::Detail => "detail",
            OutputFormat::Terse => "terse",
            OutputFormat::Export => "export",
            OutputFormat::KeyValue => "keyvalue",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of command that produced the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    /// `print`, returns table or detail output.
    Print,
    PrintDetail,
    PrintTerse,
    Export,
    ExportVerbose,
    /// Single-item query.
    Get,
    /// `/system resource print`.
    SystemResource,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::Print => "print",
            CommandType::PrintDetail => "print_detail",
            CommandType::PrintTerse => "print_terse",
            CommandType::Export => "export",
            CommandType::ExportVerbose => "export_verbose",
            CommandType::Get => "get",
            CommandType::SystemResource => "system_resource",
        }
    }

    /// The format this command always produces, if it is unambiguous.
    pub fn implied_format(&self) -> Option<OutputFormat> {
        match self {
            CommandType::PrintTerse => Some(OutputFormat::Terse),
            CommandType::PrintDetail => Some(OutputFormat::Detail),
            CommandType::Export | CommandType::ExportVerbose => Some(OutputFormat::Export),
            CommandType::SystemResource => Some(OutputFormat::KeyValue),
            CommandType::Print | CommandType::Get => None,
        }
    }
}

/// Caller-supplied context for strategy selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ParseHints {
    pub command_type: Option<CommandType>,
    /// Device path being queried, e.g. `/interface/wireguard`.
    pub resource_path: String,
    pub expected_format: Option<OutputFormat>,
    pub router_os_version: Option<RouterOsVersion>,
}

impl ParseHints {
    pub fn new(command_type: CommandType, resource_path: impl Into<String>) -> Self {
        Self {
            command_type: Some(command_type),
            resource_path: resource_path.into(),
            ..Self::default()
        }
    }

    pub fn for_command(command_type: CommandType) -> Self {
        Self {
            command_type: Some(command_type),
            ..Self::default()
        }
    }

    /// Format the caller says to expect. An explicit `expected_format` wins
    /// over the one implied by `command_type`.
    pub fn implied_format(&self) -> Option<OutputFormat> {
        match self.expected_format {
            Some(OutputFormat::Unknown) | None => {
                self.command_type.and_then(|c| c.implied_format())
            }
            Some(format) => Some(format),
        }
    }
}

static VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    match Regex::new(r"^v?(\d+)\.(\d+)(?:\.(\d+))?(?:\s*\(([a-z]+)\))?") {
        Ok(re) => re,
        Err(err) => panic!("invalid VERSION_PATTERN regex: {err}"),
    }
});

/// Parsed RouterOS version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RouterOsVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    /// stable, testing, development, long-term.
    pub channel: String,
    /// Original version string.
    pub raw: String,
}

impl RouterOsVersion {
    /// Parses strings such as `7.13.2`, `6.49 (long-term)` or `7.14beta3`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let caps = VERSION_PATTERN.captures(trimmed)?;
        let num = |i: usize| {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .unwrap_or(0)
        };
        Some(Self {
            major: num(1),
            minor: num(2),
            patch: num(3),
            channel: caps
                .get(4)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            raw: trimmed.to_string(),
        })
    }

    pub fn is_ros7(&self) -> bool {
        self.major >= 7
    }

    pub fn is_ros6(&self) -> bool {
        self.major == 6
    }

    /// REST API is available from 7.1.
    pub fn supports_rest(&self) -> bool {
        self.major > 7 || (self.major == 7 && self.minor >= 1)
    }

    /// Terse print output is available from 6.43.
    pub fn supports_terse(&self) -> bool {
        self.major > 6 || (self.major == 6 && self.minor >= 43)
    }
}

/// Expected type of a canonical field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Int,
    Int64,
    Bool,
    Duration,
    Ip,
    Ipv6,
    Mac,
    Time,
    Bytes,
    Float,
}

/// Row state flags decoded from the letters before a table or detail row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TableFlags {
    /// X
    pub disabled: bool,
    /// R
    pub running: bool,
    /// D
    pub dynamic: bool,
    /// I
    pub invalid: bool,
    /// A
    pub active: bool,
    /// C
    pub connected: bool,
    /// S
    pub static_: bool,
    /// Flag characters as they appeared.
    pub raw: String,
}

impl TableFlags {
    pub fn parse(flags: &str) -> Self {
        let mut out = TableFlags {
            raw: flags.to_string(),
            ..TableFlags::default()
        };
        for ch in flags.chars() {
            match ch {
                'X' => out.disabled = true,
                'R' => out.running = true,
                'D' => out.dynamic = true,
                'I' => out.invalid = true,
                'A' => out.active = true,
                'C' => out.connected = true,
                'S' => out.static_ = true,
                _ => {}
            }
        }
        out
    }

    /// Device field names of the flags that are set. Unset flags are omitted.
    pub fn set_fields(&self) -> Vec<&'static str> {
        [
            (self.disabled, "disabled"),
            (self.running, "running"),
            (self.dynamic, "dynamic"),
            (self.invalid, "invalid"),
            (self.active, "active"),
            (self.connected, "connected"),
            (self.static_, "static"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }
}

/// A column of table output, derived once per header line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnInfo {
    /// Header text, e.g. `LISTEN-PORT`.
    pub name: String,
    /// First character position (inclusive).
    pub start: usize,
    /// Last character position (exclusive). `usize::MAX` for the last
    /// column, which runs to the end of each row.
    pub end: usize,
    pub normalized_name: String,
}

/// A path section of `/export` output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExportSection {
    /// Device path, e.g. `/interface wireguard`.
    pub path: String,
    pub commands: Vec<ExportCommand>,
}

/// One command inside an export section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExportCommand {
    /// add, set, remove, ...
    pub action: String,
    pub properties: BTreeMap<String, String>,
    /// Inner text of a `[ find ... ]` selector.
    pub selector: Option<String>,
    pub comment: Option<String>,
    pub line_number: usize,
}

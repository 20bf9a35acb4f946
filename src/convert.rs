//! Conversion of raw field text into typed values.
//!
//! Every conversion is total: input that does not fit the target type falls
//! back to the zero value of that type instead of failing.

use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ErrorCode, ParseError};
use crate::normalizer::Normalizer;
use crate::types::{FieldType, Resource, Value};

macro_rules! lazy_regex {
    ($name:ident, $pattern:expr) => {
        static $name: Lazy<Regex> = Lazy::new(|| match Regex::new($pattern) {
            Ok(re) => re,
            Err(err) => panic!("invalid {} regex: {err}", stringify!($name)),
        });
    };
}

lazy_regex!(WEEKS, r"(\d+)w");
lazy_regex!(DAYS, r"(\d+)d");
lazy_regex!(CLOCK, r"^(\d+):(\d{1,2}):(\d{1,2})$");
lazy_regex!(GO_DURATION_PART, r"^(\d+(?:\.\d*)?|\.\d+)(ns|us|µs|μs|ms|s|m|h)");
// A bare number is not a duration.
lazy_regex!(DURATION_LITERAL, r"^(?:\d+w)?(?:\d+d)?(?:\d+h)?(?:\d+m)?(?:\d+s)?(?:\d+ms)?$");
lazy_regex!(IPV4, r"^\d{1,3}(?:\.\d{1,3}){3}(?:/\d{1,2})?$");
lazy_regex!(MAC, r"^(?:[0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}$");
lazy_regex!(BYTE_SIZE, r"(?i)^\d+(?:\.\d+)?\s*(?:[KMGT]i?B|B)$");
lazy_regex!(INTEGER, r"^-?\d+$");
lazy_regex!(FLOAT, r"^-?\d+\.\d+$");

const TRUE_LITERALS: &[&str] = &["true", "yes", "1", "on", "enabled"];

// Longest suffix first so `KiB` is not read as `B`.
const BYTE_UNITS: &[(&str, f64)] = &[
    ("tib", 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("gib", 1024.0 * 1024.0 * 1024.0),
    ("mib", 1024.0 * 1024.0),
    ("kib", 1024.0),
    ("tb", 1_000_000_000_000.0),
    ("gb", 1_000_000_000.0),
    ("mb", 1_000_000.0),
    ("kb", 1_000.0),
    ("b", 1.0),
];

/// Converts field text using the types registered in a [`Normalizer`].
#[derive(Debug, Clone)]
pub struct TypeConverter {
    normalizer: Arc<Normalizer>,
}

impl TypeConverter {
    pub fn new(normalizer: Arc<Normalizer>) -> Self {
        Self { normalizer }
    }

    /// Converts `raw` to the type registered for the canonical `field`.
    pub fn convert_value(&self, field: &str, raw: &str) -> Value {
        convert_to_type(raw, self.normalizer.field_type(field))
    }

    /// Converts every string value of a resource in place.
    pub fn convert_resource(&self, resource: &mut Resource) {
        for (field, value) in resource.iter_mut() {
            if let Value::String(raw) = value {
                let converted = self.convert_value(field, raw);
                *value = converted;
            }
        }
    }
}

/// Converts `raw` to `field_type`.
pub fn convert_to_type(raw: &str, field_type: FieldType) -> Value {
    let raw = raw.trim();
    match field_type {
        FieldType::Int | FieldType::Int64 => {
            let cleaned: String = raw.chars().filter(|c| *c != '%' && *c != ',').collect();
            Value::Int64(cleaned.trim().parse().unwrap_or(0))
        }
        FieldType::Bool => Value::Bool(parse_bool(raw)),
        FieldType::Duration => Value::Int64(
            parse_duration(raw)
                .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
                .unwrap_or(0),
        ),
        FieldType::Bytes => Value::Int64(parse_bytes(raw).unwrap_or(0)),
        FieldType::Float => Value::Float64(raw.parse().unwrap_or(0.0)),
        FieldType::Ip
        | FieldType::Ipv6
        | FieldType::Mac
        | FieldType::Time
        | FieldType::String => Value::String(raw.to_string()),
    }
}

pub fn parse_bool(raw: &str) -> bool {
    let lower = raw.trim().to_ascii_lowercase();
    TRUE_LITERALS.contains(&lower.as_str())
}

/// Parses RouterOS durations: `1w2d3h4m5s`, `1d02:03:04`, `00:05:00`, `30s`.
pub fn parse_duration(raw: &str) -> Result<Duration, ParseError> {
    let s = raw.trim();
    if let Some(d) = parse_go_duration(s) {
        return Ok(d);
    }

    let mut total = Duration::ZERO;
    let mut rest = s.to_string();
    for (re, unit_secs) in [(&*WEEKS, 7 * 24 * 3600u64), (&*DAYS, 24 * 3600)] {
        if let Some(caps) = re.captures(&rest) {
            let secs = caps[1]
                .parse::<u64>()
                .ok()
                .and_then(|n| n.checked_mul(unit_secs))
                .ok_or_else(|| invalid_duration(raw))?;
            total = total
                .checked_add(Duration::from_secs(secs))
                .ok_or_else(|| invalid_duration(raw))?;
            rest = re.replace(&rest, "").into_owned();
        }
    }

    let rest = rest.trim();
    if rest.is_empty() {
        return if s.is_empty() {
            Err(invalid_duration(raw))
        } else {
            Ok(total)
        };
    }
    parse_go_duration(rest)
        .or_else(|| {
            let caps = CLOCK.captures(rest)?;
            let part = |i: usize| caps[i].parse::<u64>().ok();
            let secs = part(1)?
                .checked_mul(3600)?
                .checked_add(part(2)?.checked_mul(60)?)?
                .checked_add(part(3)?)?;
            Some(Duration::from_secs(secs))
        })
        .and_then(|d| total.checked_add(d))
        .ok_or_else(|| invalid_duration(raw))
}

fn invalid_duration(raw: &str) -> ParseError {
    ParseError::new(ErrorCode::InvalidFormat, format!("invalid duration: {raw:?}"))
}

// `300ms`, `1h30m`, `1.5h`, `0`. Negative values are rejected.
fn parse_go_duration(s: &str) -> Option<Duration> {
    if s == "0" {
        return Some(Duration::ZERO);
    }
    if s.is_empty() {
        return None;
    }
    let mut rest = s;
    let mut nanos = 0f64;
    while !rest.is_empty() {
        let caps = GO_DURATION_PART.captures(rest)?;
        let whole = caps.get(0)?;
        let value: f64 = caps[1].parse().ok()?;
        let scale = match &caps[2] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };
        nanos += value * scale;
        rest = &rest[whole.end()..];
    }
    // values past u64 nanoseconds are rejected
    (nanos <= u64::MAX as f64).then(|| Duration::from_nanos(nanos as u64))
}

/// Parses sizes such as `1024`, `256.0MiB` or `2GB` into bytes.
pub fn parse_bytes(raw: &str) -> Result<i64, ParseError> {
    let s = raw.trim();
    let lower = s.to_ascii_lowercase();
    let (number, multiplier) = BYTE_UNITS
        .iter()
        .find_map(|(unit, mult)| lower.strip_suffix(unit).map(|n| (n, *mult)))
        .unwrap_or((lower.as_str(), 1.0));

    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| ParseError::new(ErrorCode::InvalidFormat, format!("invalid byte size: {raw:?}")))?;
    Ok((value * multiplier) as i64)
}

/// Guesses the type of an untyped value.
pub fn infer_type(value: &str) -> FieldType {
    let v = value.trim();
    let lower = v.to_ascii_lowercase();

    if matches!(lower.as_str(), "true" | "false" | "yes" | "no") {
        return FieldType::Bool;
    }
    if !v.is_empty() && !INTEGER.is_match(v) && DURATION_LITERAL.is_match(v) {
        return FieldType::Duration;
    }
    if IPV4.is_match(v) {
        return FieldType::Ip;
    }
    if v.contains(':') {
        let addr = v.split('/').next().unwrap_or(v);
        if addr.parse::<Ipv6Addr>().is_ok() {
            return FieldType::Ipv6;
        }
    }
    if MAC.is_match(v) {
        return FieldType::Mac;
    }
    if BYTE_SIZE.is_match(v) {
        return FieldType::Bytes;
    }
    if INTEGER.is_match(v) {
        return FieldType::Int64;
    }
    if FLOAT.is_match(v) {
        return FieldType::Float;
    }
    FieldType::String
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converter() -> TypeConverter {
        TypeConverter::new(Arc::new(Normalizer::with_defaults()))
    }

    #[test]
    fn converts_registered_field_types() {
        let c = converter();
        assert_eq!(c.convert_value("disabled", "true"), Value::Bool(true));
        assert_eq!(c.convert_value("running", "yes"), Value::Bool(true));
        assert_eq!(c.convert_value("running", "no"), Value::Bool(false));
        assert_eq!(c.convert_value("listenPort", "51820"), Value::Int64(51820));
        assert_eq!(c.convert_value("cpuLoad", "5%"), Value::Int64(5));
        assert_eq!(c.convert_value("name", "wg0"), Value::from("wg0"));
        assert_eq!(c.convert_value("uptime", "1w2d"), Value::Int64(9 * 24 * 3600));
        assert_eq!(
            c.convert_value("freeMemory", "256.0MiB"),
            Value::Int64(256 * 1024 * 1024)
        );
    }

    #[test]
    fn unparseable_values_fall_back_to_zero() {
        assert_eq!(convert_to_type("abc", FieldType::Int), Value::Int64(0));
        assert_eq!(convert_to_type("abc", FieldType::Float), Value::Float64(0.0));
        assert_eq!(convert_to_type("soon", FieldType::Duration), Value::Int64(0));
        assert_eq!(convert_to_type("lots", FieldType::Bytes), Value::Int64(0));
        assert_eq!(convert_to_type("maybe", FieldType::Bool), Value::Bool(false));
        assert_eq!(convert_to_type("1,500", FieldType::Int64), Value::Int64(1500));
    }

    #[test]
    fn durations() {
        let cases = [
            ("0", 0),
            ("0s", 0),
            ("1h", 3600),
            ("1h30m", 5400),
            ("1d", 86_400),
            ("1w", 604_800),
            ("1w2d3h4m5s", 604_800 + 2 * 86_400 + 3 * 3600 + 4 * 60 + 5),
            ("1d02:03:04", 86_400 + 2 * 3600 + 3 * 60 + 4),
            ("00:05:00", 300),
        ];
        for (input, secs) in cases {
            let d = parse_duration(input).expect(input);
            assert_eq!(d, Duration::from_secs(secs), "{input}");
        }
        assert_eq!(parse_duration("300ms").expect("ms"), Duration::from_millis(300));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("forever").is_err());
    }

    #[test]
    fn oversized_durations_are_errors() {
        assert!(parse_duration("3000000000000000w1d").is_err());
        assert!(parse_duration("18446744073709551615w").is_err());
        assert!(parse_duration("99999999999999999999d").is_err());
        assert!(parse_duration("9999999999999999:00:00").is_err());
        assert!(parse_duration("30000000000000w10000000000000d").is_err());
        assert!(parse_duration("30000000000000w100000000000000:00:00").is_err());
        assert!(parse_duration("99999999999999999999h").is_err());
        assert_eq!(
            convert_to_type("3000000000000000w1d", FieldType::Duration),
            Value::Int64(0)
        );
    }

    #[test]
    fn conversion_is_total_and_deterministic() {
        let types = [
            FieldType::String,
            FieldType::Int,
            FieldType::Int64,
            FieldType::Bool,
            FieldType::Duration,
            FieldType::Bytes,
            FieldType::Ip,
            FieldType::Ipv6,
            FieldType::Mac,
            FieldType::Time,
            FieldType::Float,
        ];
        let inputs = [
            "",
            "   ",
            "0",
            "-1",
            "18446744073709551615",
            "99999999999999999999999999999999",
            "-99999999999999999999999999999999",
            "18446744073709551615w18446744073709551615d",
            "3000000000000000w1d",
            "9999999999999999:00:00",
            "1d99999999999999999999:99:99",
            "99999999999999999999999h",
            "1e400",
            "1e400MiB",
            "NaN",
            "inf",
            "-inf",
            "99999999999999999999TiB",
            "überlänge",
            "日本語",
            "1w2d3h4m5s",
            "%,%",
        ];
        for field_type in types {
            for input in inputs {
                let first = convert_to_type(input, field_type);
                let second = convert_to_type(input, field_type);
                // NaN never equals itself, so compare the rendered form
                assert_eq!(
                    format!("{first:?}"),
                    format!("{second:?}"),
                    "{input:?} as {field_type:?}"
                );
            }
        }
    }

    #[test]
    fn byte_sizes() {
        assert_eq!(parse_bytes("1024").expect("plain"), 1024);
        assert_eq!(parse_bytes("1KiB").expect("kib"), 1024);
        assert_eq!(parse_bytes("1kb").expect("kb"), 1000);
        assert_eq!(parse_bytes("2GB").expect("gb"), 2_000_000_000);
        assert_eq!(parse_bytes("1.5MiB").expect("mib"), 1_572_864);
        assert_eq!(parse_bytes("10B").expect("b"), 10);
        assert!(parse_bytes("many").is_err());
    }

    #[test]
    fn infers_types_in_priority_order() {
        let cases = [
            ("true", FieldType::Bool),
            ("no", FieldType::Bool),
            ("1h30m", FieldType::Duration),
            ("2w1d", FieldType::Duration),
            ("192.168.88.1", FieldType::Ip),
            ("10.0.0.0/24", FieldType::Ip),
            ("fe80::1", FieldType::Ipv6),
            ("2001:db8::/32", FieldType::Ipv6),
            ("00:11:22:AA:BB:CC", FieldType::Mac),
            ("64MiB", FieldType::Bytes),
            ("1420", FieldType::Int64),
            ("-3", FieldType::Int64),
            ("3.14", FieldType::Float),
            ("ether1", FieldType::String),
            ("", FieldType::String),
        ];
        for (input, expected) in cases {
            assert_eq!(infer_type(input), expected, "{input}");
        }
    }

    #[test]
    fn convert_resource_only_touches_strings() {
        let c = converter();
        let mut resource = Resource::new();
        resource.insert("mtu".into(), Value::from("1420"));
        resource.insert("running".into(), Value::Bool(true));
        resource.insert("comment".into(), Value::from("office"));
        c.convert_resource(&mut resource);
        assert_eq!(resource["mtu"], Value::Int64(1420));
        assert_eq!(resource["running"], Value::Bool(true));
        assert_eq!(resource["comment"], Value::from("office"));
    }
}

//! Field name normalization between RouterOS and canonical names.
//!
//! RouterOS emits kebab-case names (`listen-port`, `LISTEN-PORT` in table
//! headers, `.id` for internal fields) while the rest of the system uses
//! camelCase (`listenPort`). The normalizer keeps both directions:
//!
//! - forward: canonical → device, used when building outbound commands
//! - reverse: lowercased device → canonical, used while parsing
//!
//! Registration takes `&mut self`; share the finished normalizer behind an
//! `Arc` so the tables are read-only once parsing starts.

use std::collections::{HashMap, HashSet};

use crate::mappings;
use crate::types::{FieldType, Resource, Value};

/// Replacement for sensitive values in log output.
pub const REDACTED: &str = "[REDACTED]";

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    /// listenPort → listen-port
    forward: HashMap<String, String>,
    /// listen-port → listenPort
    reverse: HashMap<String, String>,
    types: HashMap<String, FieldType>,
    sensitive: HashSet<String>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A normalizer with the built-in mappings, types and sensitive fields.
    pub fn with_defaults() -> Self {
        let mut n = Self::new();
        n.load_default_mappings();
        n
    }

    /// Registers a canonical ↔ device name pair.
    pub fn register_mapping(&mut self, canonical: &str, device: &str) {
        self.forward
            .insert(canonical.to_string(), device.to_string());
        self.reverse
            .insert(device.to_lowercase(), canonical.to_string());
    }

    pub fn register_type(&mut self, canonical: &str, field_type: FieldType) {
        self.types.insert(canonical.to_string(), field_type);
    }

    pub fn mark_sensitive(&mut self, canonical: &str) {
        self.sensitive.insert(canonical.to_string());
    }

    /// Loads the tables from [`crate::mappings`].
    pub fn load_default_mappings(&mut self) {
        for (canonical, device) in mappings::default_mappings() {
            self.register_mapping(canonical, device);
        }
        for field in mappings::SENSITIVE_FIELDS {
            self.mark_sensitive(field);
        }
        for (field, field_type) in mappings::FIELD_TYPES {
            self.register_type(field, *field_type);
        }
    }

    /// Converts a device field name to its canonical name.
    pub fn normalize_field_name(&self, device: &str) -> String {
        if let Some(canonical) = self.reverse.get(&device.to_lowercase()) {
            return canonical.clone();
        }
        // .nextid -> nextid, !disabled -> disabled
        if let Some(rest) = device
            .strip_prefix('.')
            .or_else(|| device.strip_prefix('!'))
        {
            return to_camel_case(rest);
        }
        to_camel_case(device)
    }

    /// Builds a resource from device-named entries. Later entries win when
    /// two device names normalize to the same canonical name.
    pub fn normalize_resource<I, K>(&self, entries: I) -> Resource
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        entries
            .into_iter()
            .map(|(k, v)| (self.normalize_field_name(k.as_ref()), v))
            .collect()
    }

    pub fn normalize_resources<I, R, K>(&self, records: I) -> Vec<Resource>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        records
            .into_iter()
            .map(|r| self.normalize_resource(r))
            .collect()
    }

    /// Registered type of a canonical field, `String` if unregistered.
    pub fn field_type(&self, canonical: &str) -> FieldType {
        self.types.get(canonical).copied().unwrap_or_default()
    }

    pub fn is_sensitive(&self, canonical: &str) -> bool {
        self.sensitive.contains(canonical)
    }

    /// Device field name for a canonical name, for outbound commands.
    pub fn router_os_field(&self, canonical: &str) -> String {
        match self.forward.get(canonical) {
            Some(device) => device.clone(),
            None => to_kebab_case(canonical),
        }
    }

    /// Copy of `resource` with sensitive values replaced by [`REDACTED`].
    pub fn sanitize_for_logging(&self, resource: &Resource) -> Resource {
        resource
            .iter()
            .map(|(k, v)| {
                if self.is_sensitive(k) {
                    (k.clone(), Value::String(REDACTED.to_string()))
                } else {
                    (k.clone(), v.clone())
                }
            })
            .collect()
    }

    /// Canonical names with an explicit mapping.
    pub fn mapped_fields(&self) -> impl Iterator<Item = &str> {
        self.forward.keys().map(String::as_str)
    }
}

/// `listen-port`, `LISTEN-PORT` and `listen_port` all become `listenPort`.
pub fn to_camel_case(name: &str) -> String {
    let lower = name.to_lowercase();
    let sep = if lower.contains('-') { '-' } else { '_' };

    let mut out = String::with_capacity(lower.len());
    for part in lower.split(sep).filter(|p| !p.is_empty()) {
        if out.is_empty() {
            out.push_str(part);
        } else {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

/// `listenPort` becomes `listen-port`.
pub fn to_kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

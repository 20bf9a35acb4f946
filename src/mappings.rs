//! Built-in field mappings.
//!
//! Canonical (camelCase) to device (kebab-case) field names, grouped by the
//! RouterOS menu they come from, plus the sensitive-field list and the
//! expected type of common fields. [`crate::normalizer::Normalizer`] loads
//! these at startup.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, ParseError};
use crate::types::FieldType;

/// Namespaces with built-in mappings.
pub const BUILTIN_NAMESPACES: &[&str] = &[
    "interface", "ip", "dhcp", "firewall", "wireguard", "system", "special",
];

const INTERFACE_FIELDS: &[(&str, &str)] = &[
    ("listenPort", "listen-port"),
    ("mtu", "mtu"),
    ("name", "name"),
    ("comment", "comment"),
    ("disabled", "disabled"),
    ("running", "running"),
    ("macAddress", "mac-address"),
    ("actualMtu", "actual-mtu"),
    ("defaultName", "default-name"),
    ("l2Mtu", "l2mtu"),
];

const IP_FIELDS: &[(&str, &str)] = &[
    ("address", "address"),
    ("network", "network"),
    ("interface", "interface"),
    ("gateway", "gateway"),
    ("dstAddress", "dst-address"),
    ("srcAddress", "src-address"),
    ("prefSrc", "pref-src"),
    ("distance", "distance"),
    ("scope", "scope"),
    ("targetScope", "target-scope"),
];

const DHCP_FIELDS: &[(&str, &str)] = &[
    ("activeAddress", "active-address"),
    ("activeMacAddress", "active-mac-address"),
    ("hostName", "host-name"),
    ("expiresAfter", "expires-after"),
    ("leaseTime", "lease-time"),
    ("server", "server"),
    ("clientId", "client-id"),
];

const FIREWALL_FIELDS: &[(&str, &str)] = &[
    ("chain", "chain"),
    ("action", "action"),
    ("protocol", "protocol"),
    ("srcPort", "src-port"),
    ("dstPort", "dst-port"),
    ("connectionState", "connection-state"),
    ("inInterface", "in-interface"),
    ("outInterface", "out-interface"),
    ("log", "log"),
    ("logPrefix", "log-prefix"),
];

const WIREGUARD_FIELDS: &[(&str, &str)] = &[
    ("privateKey", "private-key"),
    ("publicKey", "public-key"),
    ("presharedKey", "preshared-key"),
    ("endpoint", "endpoint"),
    ("endpointPort", "endpoint-port"),
    ("allowedAddress", "allowed-address"),
    ("persistentKeepalive", "persistent-keepalive"),
];

const SYSTEM_FIELDS: &[(&str, &str)] = &[
    ("uptime", "uptime"),
    ("version", "version"),
    ("boardName", "board-name"),
    ("platform", "platform"),
    ("cpuLoad", "cpu-load"),
    ("freeMemory", "free-memory"),
    ("totalMemory", "total-memory"),
    ("freeHddSpace", "free-hdd-space"),
    ("totalHddSpace", "total-hdd-space"),
    ("architectureName", "architecture-name"),
    ("identity", "identity"),
];

// Device-internal fields prefixed with `.`.
const SPECIAL_FIELDS: &[(&str, &str)] = &[
    ("id", ".id"),
    ("nextId", ".nextid"),
    ("dead", ".dead"),
];

/// Canonical fields whose values must never be logged.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "privateKey",
    "presharedKey",
    "password",
    "secret",
    "apiKey",
    "token",
];

/// Expected types of common canonical fields. Unlisted fields are strings.
pub const FIELD_TYPES: &[(&str, FieldType)] = &[
    ("listenPort", FieldType::Int),
    ("mtu", FieldType::Int),
    ("l2Mtu", FieldType::Int),
    ("actualMtu", FieldType::Int),
    ("disabled", FieldType::Bool),
    ("running", FieldType::Bool),
    ("dynamic", FieldType::Bool),
    ("invalid", FieldType::Bool),
    ("log", FieldType::Bool),
    ("uptime", FieldType::Duration),
    ("expiresAfter", FieldType::Duration),
    ("leaseTime", FieldType::Duration),
    ("macAddress", FieldType::Mac),
    ("address", FieldType::Ip),
    ("gateway", FieldType::Ip),
    ("dstAddress", FieldType::Ip),
    ("srcAddress", FieldType::Ip),
    ("cpuLoad", FieldType::Int),
    ("freeMemory", FieldType::Bytes),
    ("totalMemory", FieldType::Bytes),
    ("freeHddSpace", FieldType::Bytes),
    ("totalHddSpace", FieldType::Bytes),
    ("distance", FieldType::Int),
    ("scope", FieldType::Int),
    ("targetScope", FieldType::Int),
    ("srcPort", FieldType::Int),
    ("dstPort", FieldType::Int),
    ("endpointPort", FieldType::Int),
    ("persistentKeepalive", FieldType::Duration),
];

/// Returns the (canonical, device) pairs of one namespace.
pub fn namespace_fields(name: &str) -> Option<&'static [(&'static str, &'static str)]> {
    let fields = match name {
        "interface" => INTERFACE_FIELDS,
        "ip" => IP_FIELDS,
        "dhcp" => DHCP_FIELDS,
        "firewall" => FIREWALL_FIELDS,
        "wireguard" => WIREGUARD_FIELDS,
        "system" => SYSTEM_FIELDS,
        "special" => SPECIAL_FIELDS,
        _ => return None,
    };
    Some(fields)
}

/// All built-in (canonical, device) pairs, namespace by namespace.
pub fn default_mappings() -> impl Iterator<Item = (&'static str, &'static str)> {
    BUILTIN_NAMESPACES
        .iter()
        .filter_map(|ns| namespace_fields(ns))
        .flat_map(|fields| fields.iter().copied())
}

/// Summary of one mapping namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NamespaceSummary {
    pub name: String,
    pub field_count: usize,
    pub sensitive_fields: Vec<String>,
    pub typed_fields: Vec<String>,
}

/// Summaries of every built-in namespace.
pub fn catalog() -> Vec<NamespaceSummary> {
    BUILTIN_NAMESPACES
        .iter()
        .filter_map(|name| {
            let fields = namespace_fields(name)?;
            let in_ns = |canonical: &str| fields.iter().any(|(c, _)| *c == canonical);
            Some(NamespaceSummary {
                name: name.to_string(),
                field_count: fields.len(),
                sensitive_fields: SENSITIVE_FIELDS
                    .iter()
                    .filter(|f| in_ns(f))
                    .map(|f| f.to_string())
                    .collect(),
                typed_fields: FIELD_TYPES
                    .iter()
                    .filter(|(f, _)| in_ns(f))
                    .map(|(f, _)| f.to_string())
                    .collect(),
            })
        })
        .collect()
}

/// Catalog as pretty JSON.
pub fn catalog_json() -> Result<String, ParseError> {
    serde_json::to_string_pretty(&catalog()).map_err(|e| {
        ParseError::new(
            ErrorCode::InvalidFormat,
            format!("catalog encode error: {e}"),
        )
    })
}

//! Name and attribute sanitization.
//!
//! Dashboard device names are free text. Entity ids need a strict
//! `[a-z0-9_]` form, display names need printable characters only, and
//! attribute maps should carry snake_case keys without the identity fields
//! that already live in the device info.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};

/// Fallback for names that sanitize to nothing.
pub const UNKNOWN_DEVICE: &str = "Unknown Device";

/// Device fields that never become attributes.
const EXCLUDED_ATTRIBUTES: [&str; 6] =
    ["name", "serial", "mac", "id", "networkId", "organizationId"];

fn pattern(re: &str) -> Regex {
    Regex::new(re).unwrap_or_else(|e| unreachable!("invalid built-in pattern {re}: {e}"))
}

static NON_ID_CHARS: LazyLock<Regex> = LazyLock::new(|| pattern(r"[^a-z0-9_]+"));
static UNDERSCORE_RUNS: LazyLock<Regex> = LazyLock::new(|| pattern(r"_+"));
static NON_NAME_CHARS: LazyLock<Regex> = LazyLock::new(|| pattern(r"[^\w\s\-()]+"));
static NAME_GAPS: LazyLock<Regex> = LazyLock::new(|| pattern(r"[\s_]+"));
static CAMEL_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| pattern(r"([a-z])([A-Z])"));

/// Reduce arbitrary text to a valid entity-id fragment.
pub fn sanitize_entity_id(name: &str) -> String {
    let lowered = name.to_lowercase();
    let replaced = NON_ID_CHARS.replace_all(&lowered, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches('_');

    if trimmed.is_empty() {
        return "unknown".to_owned();
    }
    if trimmed
        .chars()
        .next()
        .is_some_and(|c| !c.is_ascii_alphabetic())
    {
        return format!("device_{trimmed}");
    }
    trimmed.to_owned()
}

/// Clean a device name for display. `None` stays `None`.
pub fn sanitize_device_name(name: Option<&str>) -> Option<String> {
    let name = name?;
    if name.is_empty() {
        return Some(UNKNOWN_DEVICE.to_owned());
    }

    let replaced = NON_NAME_CHARS.replace_all(name, "_");
    let spaced = NAME_GAPS.replace_all(&replaced, " ");
    let trimmed = spaced.trim();

    if trimmed.is_empty() {
        Some(UNKNOWN_DEVICE.to_owned())
    } else {
        Some(trimmed.to_owned())
    }
}

pub fn sanitize_device_name_for_entity_id(name: &str) -> String {
    let display = sanitize_device_name(Some(name)).unwrap_or_else(|| UNKNOWN_DEVICE.to_owned());
    sanitize_entity_id(&display)
}

/// Normalize an attribute value. Scalars pass through as-is; arrays and
/// objects are rebuilt element by element.
pub fn sanitize_attribute_value(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(sanitize_attribute_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), sanitize_attribute_value(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// `lanIp` → `lan_ip`.
pub fn camel_to_snake(key: &str) -> String {
    CAMEL_BOUNDARY.replace_all(key, "${1}_${2}").to_lowercase()
}

/// Turn a raw device object into display attributes.
pub fn sanitize_device_attributes(device: &Map<String, Value>) -> IndexMap<String, Value> {
    device
        .iter()
        .filter(|(key, value)| !EXCLUDED_ATTRIBUTES.contains(&key.as_str()) && !value.is_null())
        .map(|(key, value)| (camel_to_snake(key), sanitize_attribute_value(value)))
        .collect()
}

/// Best human label for a device: name, serial, MAC, in that order.
pub fn get_device_display_name(device: &meraki_api::models::Device) -> String {
    if let Some(name) = device.name.as_deref().filter(|n| !n.is_empty()) {
        if let Some(clean) = sanitize_device_name(Some(name)) {
            return clean;
        }
    }
    if !device.serial.is_empty() {
        return device.serial.clone();
    }
    device
        .mac
        .clone()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| UNKNOWN_DEVICE.to_owned())
}

// Field-level validators for config-entry values.
//
// Each check returns `ConfigError::Validation` with a user-facing message;
// the first failing check wins.

use std::fmt;
use std::sync::LazyLock;

use meraki_api::Region;
use regex::Regex;
use serde_json::Value;

use crate::ConfigError;

static API_KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-fA-F0-9]{40}$").unwrap_or_else(|e| unreachable!("static pattern: {e}"))
});
static ORG_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9\-]+$").unwrap_or_else(|e| unreachable!("static pattern: {e}"))
});
static SERIAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z0-9\-]+$").unwrap_or_else(|e| unreachable!("static pattern: {e}"))
});

/// Length of a Dashboard API key.
pub const API_KEY_LEN: usize = 40;

// ── Scalars ─────────────────────────────────────────────────────────

pub fn validate_api_key(value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid("API key cannot be empty"));
    }
    let len = value.chars().count();
    if len != API_KEY_LEN {
        return Err(ConfigError::invalid(format!(
            "API key must be {API_KEY_LEN} characters long, got {len}"
        )));
    }
    if !API_KEY_PATTERN.is_match(value) {
        return Err(ConfigError::invalid(
            "API key must contain only hexadecimal characters (0-9, a-f, A-F)",
        ));
    }
    Ok(())
}

/// Base URL must be HTTPS and one of the regional Dashboard endpoints.
pub fn validate_base_url(value: &str) -> Result<(), ConfigError> {
    let allowed: Vec<&str> = Region::ALL.iter().map(|r| r.base_url()).collect();
    validate_base_url_in(value, &allowed)
}

pub fn validate_base_url_in(value: &str, allowed: &[&str]) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid("Base URL cannot be empty"));
    }
    if !value.starts_with("https://") {
        return Err(ConfigError::invalid("Base URL must use HTTPS"));
    }
    if !allowed.contains(&value) {
        return Err(ConfigError::invalid(format!(
            "Base URL must be one of: {}",
            allowed.join(", ")
        )));
    }
    Ok(())
}

pub fn validate_organization_id(value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid("Organization ID cannot be empty"));
    }
    if !ORG_ID_PATTERN.is_match(value) {
        return Err(ConfigError::invalid(
            "Organization ID must contain only letters, numbers, and hyphens",
        ));
    }
    Ok(())
}

pub fn validate_device_serial(value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid("Device serial cannot be empty"));
    }
    if !SERIAL_PATTERN.is_match(value) {
        return Err(ConfigError::invalid(
            "Device serial must contain only uppercase letters, digits, and hyphens",
        ));
    }
    Ok(())
}

// ── Intervals ───────────────────────────────────────────────────────

/// Inclusive range of accepted seconds for one interval field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalBounds {
    pub min_seconds: i64,
    pub max_seconds: i64,
}

impl IntervalBounds {
    pub const DEFAULT: Self = Self::new(60, 86_400);
    pub const SCAN: Self = Self::new(60, 3_600);
    pub const DISCOVERY: Self = Self::new(300, 86_400);
    pub const STATIC: Self = Self::new(3_600, 86_400);
    pub const SEMI_STATIC: Self = Self::new(1_800, 43_200);
    pub const DYNAMIC: Self = Self::new(300, 7_200);

    pub const fn new(min_seconds: i64, max_seconds: i64) -> Self {
        Self {
            min_seconds,
            max_seconds,
        }
    }

    pub fn check(self, value: i64) -> Result<(), ConfigError> {
        if value < self.min_seconds {
            return Err(self.too_small(value));
        }
        if value > self.max_seconds {
            return Err(self.too_large(value));
        }
        Ok(())
    }

    /// Type-check a raw JSON value, then range-check it.
    pub fn check_value(self, value: &Value) -> Result<u64, ConfigError> {
        if let Some(big) = value.as_u64().filter(|n| i64::try_from(*n).is_err()) {
            return Err(self.too_large(big));
        }
        let secs = interval_from_value(value)?;
        self.check(secs)?;
        u64::try_from(secs).map_err(|_| self.too_small(secs))
    }

    fn too_small(self, got: impl fmt::Display) -> ConfigError {
        ConfigError::invalid(format!(
            "Interval must be at least {} seconds, got {got}",
            self.min_seconds
        ))
    }

    fn too_large(self, got: impl fmt::Display) -> ConfigError {
        ConfigError::invalid(format!(
            "Interval must be at most {} seconds, got {got}",
            self.max_seconds
        ))
    }
}

impl Default for IntervalBounds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Accept only JSON integers; floats and strings are rejected by name.
///
/// Integers beyond `i64::MAX` saturate.
pub fn interval_from_value(value: &Value) -> Result<i64, ConfigError> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.as_i64().unwrap_or(i64::MAX)),
        other => Err(ConfigError::invalid(format!(
            "Interval must be an integer, got {}",
            json_type_name(other)
        ))),
    }
}

/// Short type name used in validation messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

// ── Tiered refresh ──────────────────────────────────────────────────

/// Refresh intervals for organization data, slowest to fastest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TieredRefresh {
    pub static_interval: u64,
    pub semi_static_interval: u64,
    pub dynamic_interval: u64,
}

impl TieredRefresh {
    pub fn validate(&self) -> Result<(), ConfigError> {
        IntervalBounds::STATIC.check(as_signed(self.static_interval))?;
        IntervalBounds::SEMI_STATIC.check(as_signed(self.semi_static_interval))?;
        IntervalBounds::DYNAMIC.check(as_signed(self.dynamic_interval))?;

        if self.dynamic_interval >= self.semi_static_interval {
            return Err(ConfigError::invalid(format!(
                "Dynamic interval ({}s) must be less than semi-static interval ({}s)",
                self.dynamic_interval, self.semi_static_interval
            )));
        }
        if self.semi_static_interval >= self.static_interval {
            return Err(ConfigError::invalid(format!(
                "Semi-static interval ({}s) must be less than static interval ({}s)",
                self.semi_static_interval, self.static_interval
            )));
        }
        Ok(())
    }
}

// ── Per-hub overrides ───────────────────────────────────────────────

/// Optional per-hub overrides keyed by `{network_id}_{device_type}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HubIntervalConfig {
    pub hub_id: String,
    pub scan_interval: Option<u64>,
    pub discovery_interval: Option<u64>,
    pub auto_discovery: Option<bool>,
}

impl HubIntervalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hub_id.trim().is_empty() {
            return Err(ConfigError::invalid("Hub ID must be a non-empty string"));
        }
        if let Some(scan) = self.scan_interval {
            IntervalBounds::SCAN.check(as_signed(scan))?;
        }
        if let Some(discovery) = self.discovery_interval {
            IntervalBounds::DISCOVERY.check(as_signed(discovery))?;
        }
        Ok(())
    }
}

fn as_signed(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

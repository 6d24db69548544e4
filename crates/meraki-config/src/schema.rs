//! Config-entry schema: the validated view over a `data` + `options` pair.
//!
//! `data` holds the connection settings that identify an entry (API key,
//! base URL, organization). `options` holds everything a user may tune
//! later: intervals, discovery, device selection, and per-hub overrides.

use std::collections::BTreeMap;
use std::fmt;

use meraki_api::Region;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ConfigError;
use crate::validate::{
    HubIntervalConfig, IntervalBounds, TieredRefresh, validate_api_key, validate_base_url,
    validate_device_serial, validate_organization_id,
};

/// A JSON object as stored in a config entry.
pub type ConfigMap = Map<String, Value>;

/// Config-entry keys.
pub mod keys {
    pub const API_KEY: &str = "api_key";
    pub const BASE_URL: &str = "base_url";
    pub const ORGANIZATION_ID: &str = "organization_id";
    pub const SCAN_INTERVAL: &str = "scan_interval";
    pub const AUTO_DISCOVERY: &str = "auto_discovery";
    pub const DISCOVERY_INTERVAL: &str = "discovery_interval";
    pub const SELECTED_DEVICES: &str = "selected_devices";
    pub const HUB_SCAN_INTERVALS: &str = "hub_scan_intervals";
    pub const HUB_DISCOVERY_INTERVALS: &str = "hub_discovery_intervals";
    pub const HUB_AUTO_DISCOVERY: &str = "hub_auto_discovery";
    pub const STATIC_DATA_INTERVAL: &str = "static_data_interval";
    pub const SEMI_STATIC_DATA_INTERVAL: &str = "semi_static_data_interval";
    pub const DYNAMIC_DATA_INTERVAL: &str = "dynamic_data_interval";

    /// Keys that live in `data`; every other key lives in `options`.
    pub const DATA_KEYS: [&str; 3] = [API_KEY, BASE_URL, ORGANIZATION_ID];
}

pub const DEFAULT_SCAN_INTERVAL: u64 = 300;
pub const DEFAULT_DISCOVERY_INTERVAL: u64 = 3_600;
pub const DEFAULT_STATIC_DATA_INTERVAL: u64 = 14_400;
pub const DEFAULT_SEMI_STATIC_DATA_INTERVAL: u64 = 3_600;
pub const DEFAULT_DYNAMIC_DATA_INTERVAL: u64 = 600;

// ── Schema ──────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerakiConfigSchema {
    pub api_key: String,
    pub base_url: String,
    pub organization_id: String,
    pub scan_interval: u64,
    pub auto_discovery: bool,
    pub discovery_interval: u64,
    pub selected_devices: Vec<String>,
    pub hub_scan_intervals: BTreeMap<String, u64>,
    pub hub_discovery_intervals: BTreeMap<String, u64>,
    pub hub_auto_discovery: BTreeMap<String, bool>,
    pub static_data_interval: u64,
    pub semi_static_data_interval: u64,
    pub dynamic_data_interval: u64,
}

impl fmt::Debug for MerakiConfigSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerakiConfigSchema")
            .field("api_key", &"**REDACTED**")
            .field("base_url", &self.base_url)
            .field("organization_id", &self.organization_id)
            .field("scan_interval", &self.scan_interval)
            .field("auto_discovery", &self.auto_discovery)
            .field("discovery_interval", &self.discovery_interval)
            .field("selected_devices", &self.selected_devices)
            .field("hub_scan_intervals", &self.hub_scan_intervals)
            .field("hub_discovery_intervals", &self.hub_discovery_intervals)
            .field("hub_auto_discovery", &self.hub_auto_discovery)
            .field("static_data_interval", &self.static_data_interval)
            .field("semi_static_data_interval", &self.semi_static_data_interval)
            .field("dynamic_data_interval", &self.dynamic_data_interval)
            .finish()
    }
}

impl MerakiConfigSchema {
    /// A schema with every default applied. Not validated.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Region::Global.base_url().to_owned(),
            organization_id: String::new(),
            scan_interval: DEFAULT_SCAN_INTERVAL,
            auto_discovery: true,
            discovery_interval: DEFAULT_DISCOVERY_INTERVAL,
            selected_devices: Vec::new(),
            hub_scan_intervals: BTreeMap::new(),
            hub_discovery_intervals: BTreeMap::new(),
            hub_auto_discovery: BTreeMap::new(),
            static_data_interval: DEFAULT_STATIC_DATA_INTERVAL,
            semi_static_data_interval: DEFAULT_SEMI_STATIC_DATA_INTERVAL,
            dynamic_data_interval: DEFAULT_DYNAMIC_DATA_INTERVAL,
        }
    }

    /// Run every field check; the first failure wins.
    ///
    /// Order: API key, base URL, organization, scan interval, discovery
    /// interval, selected devices, per-hub maps, then the refresh tiers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_api_key(&self.api_key)?;
        validate_base_url(&self.base_url)?;
        if !self.organization_id.is_empty() {
            validate_organization_id(&self.organization_id)?;
        }
        IntervalBounds::SCAN.check(signed(self.scan_interval))?;
        IntervalBounds::DISCOVERY.check(signed(self.discovery_interval))?;

        for serial in &self.selected_devices {
            validate_device_serial(serial)?;
        }

        for (hub_id, &scan) in &self.hub_scan_intervals {
            HubIntervalConfig {
                hub_id: hub_id.clone(),
                scan_interval: Some(scan),
                ..HubIntervalConfig::default()
            }
            .validate()?;
        }
        for (hub_id, &discovery) in &self.hub_discovery_intervals {
            HubIntervalConfig {
                hub_id: hub_id.clone(),
                discovery_interval: Some(discovery),
                ..HubIntervalConfig::default()
            }
            .validate()?;
        }
        for (hub_id, &auto) in &self.hub_auto_discovery {
            HubIntervalConfig {
                hub_id: hub_id.clone(),
                auto_discovery: Some(auto),
                ..HubIntervalConfig::default()
            }
            .validate()?;
        }

        self.tiers().validate()
    }

    pub fn tiers(&self) -> TieredRefresh {
        TieredRefresh {
            static_interval: self.static_data_interval,
            semi_static_interval: self.semi_static_data_interval,
            dynamic_interval: self.dynamic_data_interval,
        }
    }

    pub fn region(&self) -> Option<Region> {
        Region::from_base_url(&self.base_url)
    }

    /// Per-hub scan override, if one is configured.
    pub fn hub_scan_interval(&self, hub_id: &str) -> Option<u64> {
        self.hub_scan_intervals.get(hub_id).copied()
    }

    pub fn hub_discovery_interval(&self, hub_id: &str) -> u64 {
        self.hub_discovery_intervals
            .get(hub_id)
            .copied()
            .unwrap_or(self.discovery_interval)
    }

    pub fn hub_auto_discovery(&self, hub_id: &str) -> bool {
        self.hub_auto_discovery
            .get(hub_id)
            .copied()
            .unwrap_or(self.auto_discovery)
    }

    /// Whether a device passes the `selected_devices` filter.
    pub fn is_device_selected(&self, serial: &str) -> bool {
        self.selected_devices.is_empty() || self.selected_devices.iter().any(|s| s == serial)
    }

    // ── Config-entry conversion ─────────────────────────────────────

    /// Build and validate a schema from a config entry's maps.
    ///
    /// Connection keys come from `data`, tunables from `options`; missing
    /// tunables fall back to their defaults. Each field is type-checked and
    /// range-checked in the same order `validate` uses, so the first bad
    /// field reported is the same whichever path catches it.
    pub fn from_config_entry(
        data: &ConfigMap,
        options: Option<&ConfigMap>,
    ) -> Result<Self, ConfigError> {
        let empty = ConfigMap::new();
        let options = options.unwrap_or(&empty);

        let api_key = match data.get(keys::API_KEY) {
            None | Some(Value::Null) => String::new(),
            Some(v) => string_field(v, "API key")?,
        };
        validate_api_key(&api_key)?;

        let mut schema = Self::with_api_key(api_key);

        if let Some(v) = data.get(keys::BASE_URL) {
            schema.base_url = string_field(v, "Base URL")?;
        }
        validate_base_url(&schema.base_url)?;

        if let Some(v) = data.get(keys::ORGANIZATION_ID) {
            schema.organization_id = string_field(v, "Organization ID")?;
            if !schema.organization_id.is_empty() {
                validate_organization_id(&schema.organization_id)?;
            }
        }

        if let Some(v) = options.get(keys::SCAN_INTERVAL) {
            schema.scan_interval = IntervalBounds::SCAN.check_value(v)?;
        }
        if let Some(v) = options.get(keys::DISCOVERY_INTERVAL) {
            schema.discovery_interval = IntervalBounds::DISCOVERY.check_value(v)?;
        }
        if let Some(v) = options.get(keys::AUTO_DISCOVERY) {
            schema.auto_discovery = bool_field(v)?;
        }
        if let Some(v) = options.get(keys::SELECTED_DEVICES) {
            schema.selected_devices = serial_list(v)?;
        }
        if let Some(v) = options.get(keys::HUB_SCAN_INTERVALS) {
            schema.hub_scan_intervals = mapping(v, "Hub scan intervals", |v| {
                IntervalBounds::SCAN.check_value(v)
            })?;
        }
        if let Some(v) = options.get(keys::HUB_DISCOVERY_INTERVALS) {
            schema.hub_discovery_intervals = mapping(v, "Hub discovery intervals", |v| {
                IntervalBounds::DISCOVERY.check_value(v)
            })?;
        }
        if let Some(v) = options.get(keys::HUB_AUTO_DISCOVERY) {
            schema.hub_auto_discovery = mapping(v, "Hub auto discovery", bool_field)?;
        }
        if let Some(v) = options.get(keys::STATIC_DATA_INTERVAL) {
            schema.static_data_interval = IntervalBounds::STATIC.check_value(v)?;
        }
        if let Some(v) = options.get(keys::SEMI_STATIC_DATA_INTERVAL) {
            schema.semi_static_data_interval = IntervalBounds::SEMI_STATIC.check_value(v)?;
        }
        if let Some(v) = options.get(keys::DYNAMIC_DATA_INTERVAL) {
            schema.dynamic_data_interval = IntervalBounds::DYNAMIC.check_value(v)?;
        }

        schema.validate()?;
        Ok(schema)
    }

    /// Flat map of all thirteen keys.
    pub fn to_dict(&self) -> ConfigMap {
        let mut map = self.data_map();
        map.extend(self.options_map());
        map
    }

    /// The `data` half: connection settings.
    pub fn data_map(&self) -> ConfigMap {
        let mut map = ConfigMap::new();
        map.insert(keys::API_KEY.into(), Value::from(self.api_key.clone()));
        map.insert(keys::BASE_URL.into(), Value::from(self.base_url.clone()));
        map.insert(
            keys::ORGANIZATION_ID.into(),
            Value::from(self.organization_id.clone()),
        );
        map
    }

    /// The `options` half: every tunable.
    pub fn options_map(&self) -> ConfigMap {
        let mut map = ConfigMap::new();
        map.insert(keys::SCAN_INTERVAL.into(), Value::from(self.scan_interval));
        map.insert(
            keys::AUTO_DISCOVERY.into(),
            Value::from(self.auto_discovery),
        );
        map.insert(
            keys::DISCOVERY_INTERVAL.into(),
            Value::from(self.discovery_interval),
        );
        map.insert(
            keys::SELECTED_DEVICES.into(),
            Value::from(self.selected_devices.clone()),
        );
        map.insert(
            keys::HUB_SCAN_INTERVALS.into(),
            to_object(&self.hub_scan_intervals),
        );
        map.insert(
            keys::HUB_DISCOVERY_INTERVALS.into(),
            to_object(&self.hub_discovery_intervals),
        );
        map.insert(
            keys::HUB_AUTO_DISCOVERY.into(),
            to_object(&self.hub_auto_discovery),
        );
        map.insert(
            keys::STATIC_DATA_INTERVAL.into(),
            Value::from(self.static_data_interval),
        );
        map.insert(
            keys::SEMI_STATIC_DATA_INTERVAL.into(),
            Value::from(self.semi_static_data_interval),
        );
        map.insert(
            keys::DYNAMIC_DATA_INTERVAL.into(),
            Value::from(self.dynamic_data_interval),
        );
        map
    }
}

// ── Migration ───────────────────────────────────────────────────────

/// Check that `new` is an acceptable replacement for `old`.
///
/// Identity keys (API key, organization) must not change; the result must
/// still pass full schema validation.
pub fn validate_config_migration(old: &ConfigMap, new: &ConfigMap) -> Result<(), ConfigError> {
    if old.get(keys::API_KEY) != new.get(keys::API_KEY) {
        return Err(ConfigError::invalid(
            "API key cannot be changed during migration",
        ));
    }
    if old.get(keys::ORGANIZATION_ID) != new.get(keys::ORGANIZATION_ID) {
        return Err(ConfigError::invalid(
            "Organization ID cannot be changed during migration",
        ));
    }

    let (data, options) = split_entry(new);
    MerakiConfigSchema::from_config_entry(&data, Some(&options))
        .map_err(|e| ConfigError::invalid(format!("Invalid configuration after migration: {e}")))?;
    Ok(())
}

/// Split a flat map into its `data` and `options` halves.
pub fn split_entry(flat: &ConfigMap) -> (ConfigMap, ConfigMap) {
    flat.iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .partition(|(k, _)| keys::DATA_KEYS.contains(&k.as_str()))
}

// ── Field parsing ───────────────────────────────────────────────────

fn string_field(value: &Value, label: &str) -> Result<String, ConfigError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| ConfigError::invalid(format!("{label} must be a string")))
}

fn bool_field(value: &Value) -> Result<bool, ConfigError> {
    value
        .as_bool()
        .ok_or_else(|| ConfigError::invalid("Auto discovery must be a boolean"))
}

fn serial_list(value: &Value) -> Result<Vec<String>, ConfigError> {
    let Value::Array(items) = value else {
        return Err(ConfigError::invalid("Selected devices must be a list"));
    };
    items
        .iter()
        .map(|item| {
            let serial = string_field(item, "Device serial")?;
            validate_device_serial(&serial)?;
            Ok(serial)
        })
        .collect()
}

fn mapping<T>(
    value: &Value,
    label: &str,
    parse: impl Fn(&Value) -> Result<T, ConfigError>,
) -> Result<BTreeMap<String, T>, ConfigError> {
    let Value::Object(entries) = value else {
        return Err(ConfigError::invalid(format!("{label} must be a mapping")));
    };
    entries
        .iter()
        .map(|(k, v)| {
            if k.trim().is_empty() {
                return Err(ConfigError::invalid("Hub ID must be a non-empty string"));
            }
            Ok((k.clone(), parse(v)?))
        })
        .collect()
}

fn to_object<T: Clone + Into<Value>>(map: &BTreeMap<String, T>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), v.clone().into()))
            .collect(),
    )
}

fn signed(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const KEY: &str = "0123456789abcdef0123456789abcdef01234567";

    fn obj(value: Value) -> ConfigMap {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn data() -> ConfigMap {
        obj(json!({ "api_key": KEY, "organization_id": "123456" }))
    }

    #[test]
    fn defaults_applied_when_options_missing() {
        let schema = MerakiConfigSchema::from_config_entry(&data(), None).unwrap();
        assert_eq!(schema.base_url, "https://api.meraki.com/api/v1");
        assert_eq!(schema.scan_interval, 300);
        assert_eq!(schema.discovery_interval, 3600);
        assert!(schema.auto_discovery);
        assert_eq!(schema.static_data_interval, 14400);
        assert_eq!(schema.semi_static_data_interval, 3600);
        assert_eq!(schema.dynamic_data_interval, 600);
        assert_eq!(schema.region(), Some(Region::Global));
    }

    #[test]
    fn missing_api_key_is_empty_error() {
        let err = MerakiConfigSchema::from_config_entry(&ConfigMap::new(), None).unwrap_err();
        assert_eq!(err.to_string(), "API key cannot be empty");
    }

    #[test]
    fn empty_org_id_is_allowed() {
        let data = obj(json!({ "api_key": KEY }));
        let schema = MerakiConfigSchema::from_config_entry(&data, None).unwrap();
        assert!(schema.organization_id.is_empty());
    }

    #[test]
    fn options_override_defaults() {
        let options = obj(json!({
            "scan_interval": 120,
            "auto_discovery": false,
            "selected_devices": ["Q2MT-0000-0001"],
            "hub_scan_intervals": { "N_1_MT": 600 },
            "hub_auto_discovery": { "N_1_MR": true },
        }));
        let schema = MerakiConfigSchema::from_config_entry(&data(), Some(&options)).unwrap();
        assert_eq!(schema.scan_interval, 120);
        assert!(!schema.auto_discovery);
        assert_eq!(schema.hub_scan_interval("N_1_MT"), Some(600));
        assert_eq!(schema.hub_scan_interval("N_1_MS"), None);
        assert!(schema.hub_auto_discovery("N_1_MR"));
        assert!(!schema.hub_auto_discovery("N_1_MS"));
        assert_eq!(schema.hub_discovery_interval("N_1_MT"), 3600);
        assert!(schema.is_device_selected("Q2MT-0000-0001"));
        assert!(!schema.is_device_selected("Q2MT-0000-0002"));
    }

    #[test]
    fn wrong_types_are_rejected() {
        let cases = [
            (
                json!({ "selected_devices": "Q2MT" }),
                "Selected devices must be a list",
            ),
            (
                json!({ "auto_discovery": "yes" }),
                "Auto discovery must be a boolean",
            ),
            (
                json!({ "scan_interval": 300.0 }),
                "Interval must be an integer, got float",
            ),
            (
                json!({ "hub_auto_discovery": { "N_1_MT": 1 } }),
                "Auto discovery must be a boolean",
            ),
        ];
        for (options, expected) in cases {
            let err =
                MerakiConfigSchema::from_config_entry(&data(), Some(&obj(options))).unwrap_err();
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn first_bad_field_wins_across_data_and_options() {
        let short_key = obj(json!({ "api_key": "short" }));
        let options = obj(json!({ "scan_interval": 10 }));
        let err = MerakiConfigSchema::from_config_entry(&short_key, Some(&options)).unwrap_err();
        assert_eq!(err.to_string(), "API key must be 40 characters long, got 5");

        let bad_url = obj(json!({ "api_key": KEY, "base_url": "https://evil.example.com" }));
        let err = MerakiConfigSchema::from_config_entry(&bad_url, Some(&options)).unwrap_err();
        assert!(
            err.to_string().starts_with("Base URL must be one of:"),
            "{err}"
        );

        let bad_org = obj(json!({ "api_key": KEY, "organization_id": "org_1" }));
        let err = MerakiConfigSchema::from_config_entry(&bad_org, Some(&options)).unwrap_err();
        assert!(err.to_string().starts_with("Organization ID"), "{err}");
    }

    #[test]
    fn option_checks_follow_field_order() {
        let options = obj(json!({
            "dynamic_data_interval": 10,
            "selected_devices": ["lowercase"],
            "auto_discovery": "yes",
            "discovery_interval": 10,
            "scan_interval": 10,
        }));
        let err = MerakiConfigSchema::from_config_entry(&data(), Some(&options)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Interval must be at least 60 seconds, got 10"
        );

        let options = obj(json!({
            "dynamic_data_interval": 10,
            "selected_devices": ["lowercase"],
            "auto_discovery": "yes",
            "discovery_interval": 10,
        }));
        let err = MerakiConfigSchema::from_config_entry(&data(), Some(&options)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Interval must be at least 300 seconds, got 10"
        );

        let options = obj(json!({
            "dynamic_data_interval": 10,
            "selected_devices": ["lowercase"],
        }));
        let err = MerakiConfigSchema::from_config_entry(&data(), Some(&options)).unwrap_err();
        assert!(err.to_string().starts_with("Device serial"), "{err}");
    }

    #[test]
    fn tier_ordering_enforced_through_options() {
        let options = obj(json!({ "dynamic_data_interval": 3600 }));
        let err = MerakiConfigSchema::from_config_entry(&data(), Some(&options)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Dynamic interval (3600s) must be less than semi-static interval (3600s)"
        );
    }

    #[test]
    fn round_trip_through_dict() {
        let options = obj(json!({
            "scan_interval": 900,
            "discovery_interval": 7200,
            "selected_devices": ["Q2MT-0000-0001", "Q2MR-0000-0002"],
            "hub_scan_intervals": { "N_1_MT": 600 },
            "hub_discovery_intervals": { "N_1_MT": 1800 },
            "hub_auto_discovery": { "N_1_MT": false },
            "static_data_interval": 43200,
            "semi_static_data_interval": 7200,
            "dynamic_data_interval": 900,
        }));
        let original = MerakiConfigSchema::from_config_entry(&data(), Some(&options)).unwrap();
        let dict = original.to_dict();
        assert_eq!(dict.len(), 13);
        let restored = MerakiConfigSchema::from_config_entry(&dict, Some(&dict)).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn debug_redacts_api_key() {
        let schema = MerakiConfigSchema::with_api_key(KEY);
        let rendered = format!("{schema:?}");
        assert!(!rendered.contains(KEY));
        assert!(rendered.contains("**REDACTED**"));
    }

    // ── Migration ───────────────────────────────────────────────────

    #[test]
    fn migration_rejects_identity_changes() {
        let old = MerakiConfigSchema::from_config_entry(&data(), None)
            .unwrap()
            .to_dict();

        let mut new_key = old.clone();
        new_key.insert(
            keys::API_KEY.into(),
            json!("ffffffffffffffffffffffffffffffffffffffff"),
        );
        assert_eq!(
            validate_config_migration(&old, &new_key)
                .unwrap_err()
                .to_string(),
            "API key cannot be changed during migration"
        );

        let mut new_org = old.clone();
        new_org.insert(keys::ORGANIZATION_ID.into(), json!("654321"));
        assert_eq!(
            validate_config_migration(&old, &new_org)
                .unwrap_err()
                .to_string(),
            "Organization ID cannot be changed during migration"
        );
    }

    #[test]
    fn migration_wraps_validation_failure() {
        let old = MerakiConfigSchema::from_config_entry(&data(), None)
            .unwrap()
            .to_dict();
        let mut new = old.clone();
        new.insert(keys::SCAN_INTERVAL.into(), json!(10));
        assert_eq!(
            validate_config_migration(&old, &new)
                .unwrap_err()
                .to_string(),
            "Invalid configuration after migration: Interval must be at least 60 seconds, got 10"
        );

        let mut tuned = old.clone();
        tuned.insert(keys::SCAN_INTERVAL.into(), json!(600));
        validate_config_migration(&old, &tuned).unwrap();
    }

    #[test]
    fn split_entry_separates_data_keys() {
        let flat = MerakiConfigSchema::with_api_key(KEY).to_dict();
        let (data, options) = split_entry(&flat);
        assert_eq!(data.len(), 3);
        assert_eq!(options.len(), 10);
        assert!(options.get(keys::API_KEY).is_none());
    }
}

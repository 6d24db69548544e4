//! Response types for the Meraki Dashboard API v1.
//!
//! All types match the JSON bodies of `/api/v1/` endpoints. Field names use
//! camelCase via `#[serde(rename_all = "camelCase")]`. Fields the Dashboard
//! omits on some device families are `Option` or `#[serde(default)]`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Organizations & networks ─────────────────────────────────────────

/// Organization -- from `GET /organizations` and `GET /organizations/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api: Option<ApiAccess>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAccess {
    pub enabled: bool,
}

/// Network -- from `GET /organizations/{id}/networks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub product_types: Vec<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
}

// ── Devices ──────────────────────────────────────────────────────────

/// Device inventory entry -- from `GET /networks/{id}/devices` and
/// `GET /organizations/{id}/devices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub serial: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub network_id: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub lan_ip: Option<String>,
    #[serde(default)]
    pub firmware: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
}

/// Device availability -- from `GET /organizations/{id}/devices/statuses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub serial: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub network_id: Option<String>,
    /// One of: `online`, `alerting`, `offline`, `dormant`.
    pub status: String,
    #[serde(default)]
    pub last_reported_at: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
}

/// Uplink addressing -- from
/// `GET /organizations/{id}/devices/uplinks/addresses/byDevice`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UplinkAddresses {
    pub serial: String,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub uplinks: Vec<Uplink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Uplink {
    pub interface: String,
    #[serde(default)]
    pub addresses: Vec<Value>,
}

/// Memory usage history for one device -- from
/// `GET /organizations/{id}/devices/system/memory/usage/history/byInterval`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMemoryUsage {
    pub serial: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub provisioned: Option<u64>,
    #[serde(default)]
    pub intervals: Vec<MemoryInterval>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryInterval {
    #[serde(default)]
    pub start_ts: Option<String>,
    #[serde(default)]
    pub end_ts: Option<String>,
    pub memory: MemoryStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub used: MemoryUsed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsed {
    #[serde(default)]
    pub median: Option<u64>,
    #[serde(default)]
    pub maximum: Option<u64>,
    #[serde(default)]
    pub percentages: Option<MemoryPercentages>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryPercentages {
    #[serde(default)]
    pub maximum: Option<f64>,
}

/// Envelope used by the newer `items`/`meta` list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemsPage<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub meta: Option<Value>,
}

// ── Licensing ────────────────────────────────────────────────────────

/// Co-termination licensing summary -- from
/// `GET /organizations/{id}/licenses/overview`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicensesOverview {
    #[serde(default)]
    pub status: Option<String>,
    /// Either `"Mar 16, 2023 UTC"` or RFC 3339, depending on the org.
    #[serde(default)]
    pub expiration_date: Option<String>,
    #[serde(default)]
    pub licensed_device_counts: HashMap<String, u64>,
}

/// Per-device license -- from `GET /organizations/{id}/licenses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub id: String,
    #[serde(default)]
    pub license_type: Option<String>,
    #[serde(default)]
    pub device_serial: Option<String>,
    #[serde(default)]
    pub expiration_date: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub seat_count: Option<u64>,
}

// ── Organization summaries ───────────────────────────────────────────

/// Client totals -- from `GET /organizations/{id}/clients/overview`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientsOverview {
    #[serde(default)]
    pub counts: ClientCounts,
    #[serde(default)]
    pub usage: ClientUsage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientCounts {
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientUsage {
    #[serde(default)]
    pub overall: UsageTotals,
    #[serde(default)]
    pub average: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTotals {
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub downstream: f64,
    #[serde(default)]
    pub upstream: f64,
}

/// One organization event -- from `GET /organizations/{id}/events`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationEvent {
    pub event_type: Option<String>,
    pub event_description: Option<String>,
    pub timestamp: Option<String>,
    pub network_id: Option<String>,
    pub device_serial: Option<String>,
    pub device_name: Option<String>,
    pub client_id: Option<String>,
    pub client_description: Option<String>,
}

// ── Environmental sensors (MT) ───────────────────────────────────────

/// Latest readings for one sensor -- from
/// `GET /organizations/{id}/sensor/readings/latest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReadings {
    pub serial: String,
    #[serde(default)]
    pub network: Option<NetworkRef>,
    #[serde(default)]
    pub readings: Vec<SensorReading>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// One metric reading. Exactly one of the metric-specific fields is
/// populated, matching `metric`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    #[serde(default)]
    pub ts: Option<String>,
    pub metric: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Temperature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<Humidity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co2: Option<Concentration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pm25: Option<Concentration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvoc: Option<Concentration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<Battery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise: Option<Noise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indoor_air_quality: Option<AirQuality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_power: Option<Measurement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apparent_power: Option<Measurement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage: Option<Measurement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<Measurement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Measurement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_factor: Option<Measurement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub door: Option<BinaryState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water: Option<BinaryState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<BinaryState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_lockout_switch: Option<BinaryState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downstream_power: Option<BinaryState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    #[serde(default)]
    pub celsius: Option<f64>,
    #[serde(default)]
    pub fahrenheit: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Humidity {
    #[serde(default)]
    pub relative_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Concentration {
    #[serde(default)]
    pub concentration: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    #[serde(default)]
    pub percentage: Option<f64>,
}

/// Ambient noise. Older firmware reports a flat `level`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Noise {
    #[serde(default)]
    pub ambient: Option<NoiseLevel>,
    #[serde(default)]
    pub level: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoiseLevel {
    #[serde(default)]
    pub level: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirQuality {
    #[serde(default)]
    pub score: Option<f64>,
}

/// Electrical measurement. The Dashboard uses `draw` for power and
/// current, `level` for voltage and frequency, `percentage` for power
/// factor. `value`/`unit` appear on some firmware.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(default)]
    pub draw: Option<f64>,
    #[serde(default)]
    pub level: Option<f64>,
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Two-state reading shared by door, water, button, lockout and
/// downstream-power metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryState {
    #[serde(default)]
    pub open: Option<bool>,
    #[serde(default)]
    pub present: Option<bool>,
    #[serde(default)]
    pub detected: Option<bool>,
    #[serde(default)]
    pub pressed: Option<bool>,
    #[serde(default)]
    pub press_type: Option<String>,
    #[serde(default)]
    pub locked: Option<bool>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

// ── Wireless (MR) ────────────────────────────────────────────────────

/// SSID definition -- from `GET /networks/{id}/wireless/ssids`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirelessSsid {
    pub number: u32,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub auth_mode: Option<String>,
    #[serde(default)]
    pub visible: Option<bool>,
}

/// Radio status -- from `GET /devices/{serial}/wireless/status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirelessStatus {
    #[serde(default)]
    pub basic_service_sets: Vec<BasicServiceSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicServiceSet {
    #[serde(default)]
    pub ssid_name: Option<String>,
    #[serde(default)]
    pub ssid_number: Option<u32>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub band: Option<String>,
    #[serde(default)]
    pub channel: Option<u32>,
    #[serde(default)]
    pub channel_width: Option<String>,
    #[serde(default)]
    pub power: Option<String>,
    #[serde(default)]
    pub broadcasting: Option<bool>,
    #[serde(default)]
    pub channel_utilization: Option<ChannelUtilization>,
}

/// Per-radio airtime usage, in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelUtilization {
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub wifi: Option<f64>,
    #[serde(default)]
    pub non_wifi: Option<f64>,
}

/// Client seen by a device -- from `GET /devices/{serial}/clients`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceClient {
    pub id: String,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub usage: Option<Value>,
}

// ── Switches (MS) ────────────────────────────────────────────────────

/// Port status -- from `GET /devices/{serial}/switch/ports/statuses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchPortStatus {
    pub port_id: String,
    #[serde(default)]
    pub enabled: bool,
    /// `Connected` or `Disconnected`.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub speed: Option<String>,
    #[serde(default)]
    pub duplex: Option<String>,
    #[serde(default)]
    pub usage_in_kb: Option<UsageInKb>,
    #[serde(default)]
    pub traffic_in_kbps: Option<TrafficInKbps>,
    #[serde(default)]
    pub client_count: u64,
    #[serde(default)]
    pub power_usage_in_wh: Option<f64>,
    #[serde(default)]
    pub poe: Option<PoeStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageInKb {
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub sent: f64,
    #[serde(default)]
    pub recv: f64,
}

/// Average throughput over the status timespan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficInKbps {
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub sent: f64,
    #[serde(default)]
    pub recv: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoeStatus {
    #[serde(default)]
    pub is_allocated: bool,
}

/// Power supply slots of one device -- from
/// `GET /organizations/{id}/devices/powerModules/statuses/byDevice`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DevicePowerModules {
    pub serial: String,
    #[serde(default)]
    pub slots: Vec<PowerModuleSlot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerModuleSlot {
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

// ── Error envelope ───────────────────────────────────────────────────

/// Error body returned by the Dashboard on non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub errors: Vec<String>,
}

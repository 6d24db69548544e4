//! Payload transformers.
//!
//! Turn Dashboard responses into [`DeviceReadings`] for the device hubs and
//! into small summary records for the organization hub. Nothing here does
//! I/O; the hubs fetch, these functions reshape.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use meraki_api::models::{
    ClientsOverview, DeviceMemoryUsage, DeviceStatus, License, LicensesOverview, Measurement,
    PowerModuleSlot, SensorReading, SensorReadings, SwitchPortStatus, WirelessSsid, WirelessStatus,
};
use serde::Serialize;
use tracing::debug;

use crate::model::{DeviceReadings, MetricValue, MrMetric, MsMetric, MtMetric};

/// Nominal switch port speed used for utilization percentages.
pub const DEFAULT_PORT_SPEED_MBPS: f64 = 1000.0;

/// Licenses expiring within this many days count as expiring.
pub const LICENSE_EXPIRY_WINDOW_DAYS: i64 = 90;

/// Per-device license detail kept on the summary.
const MAX_EXPIRING_DETAILS: usize = 5;

// ── Unit conversion ──────────────────────────────────────────────────

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// PoE figures arrive in deciwatts.
pub fn deciwatts_to_watts(deciwatts: f64) -> f64 {
    deciwatts / 10.0
}

pub fn bytes_to_mbps(bytes: f64, timespan_secs: u32) -> f64 {
    if bytes <= 0.0 || timespan_secs == 0 {
        return 0.0;
    }
    round_to(bytes * 8.0 / (1_000_000.0 * f64::from(timespan_secs)), 3)
}

/// Share of a port's capacity consumed by `kb` kilobits, capped at 100.
pub fn kb_to_percentage(kb: f64, port_speed_mbps: f64) -> f64 {
    if kb <= 0.0 || port_speed_mbps <= 0.0 {
        return 0.0;
    }
    round_to(((kb / 1000.0) / port_speed_mbps * 100.0).min(100.0), 2)
}

pub fn calculate_percentage(used: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    round_to(used / total * 100.0, 1)
}

fn parse_ts(raw: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw?)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ── Environmental sensors (MT) ───────────────────────────────────────

/// Flatten the latest readings of one sensor into metric → value.
///
/// Readings whose metric is unknown or whose payload carries no value are
/// skipped rather than reported as zero.
pub fn transform_mt_readings(sensor: &SensorReadings) -> DeviceReadings {
    let mut out = DeviceReadings::new();

    for reading in &sensor.readings {
        let Ok(metric) = reading.metric.parse::<MtMetric>() else {
            debug!(serial = %sensor.serial, metric = %reading.metric, "skipping unknown MT metric");
            continue;
        };
        if let Some(value) = mt_value(reading, metric) {
            out.insert(metric, value);
        }
        if let Some(ts) = parse_ts(reading.ts.as_deref()) {
            out.observe_timestamp(ts);
        }
    }

    out
}

fn mt_value(reading: &SensorReading, metric: MtMetric) -> Option<MetricValue> {
    let value = match metric {
        MtMetric::Temperature => reading.temperature.as_ref()?.celsius?.into(),
        MtMetric::Humidity => reading.humidity.as_ref()?.relative_percentage?.into(),
        MtMetric::Co2 => reading.co2.as_ref()?.concentration?.into(),
        MtMetric::Pm25 => reading.pm25.as_ref()?.concentration?.into(),
        MtMetric::Tvoc => reading.tvoc.as_ref()?.concentration?.into(),
        MtMetric::Battery => reading.battery.as_ref()?.percentage?.into(),
        MtMetric::Noise => {
            let noise = reading.noise.as_ref()?;
            noise
                .ambient
                .as_ref()
                .and_then(|a| a.level)
                .or(noise.level)?
                .into()
        }
        MtMetric::IndoorAirQuality => reading.indoor_air_quality.as_ref()?.score?.into(),
        MtMetric::RealPower => power_watts(reading.real_power.as_ref()?)?.into(),
        MtMetric::ApparentPower => power_watts(reading.apparent_power.as_ref()?)?.into(),
        MtMetric::Voltage => measurement(reading.voltage.as_ref()?)?.into(),
        MtMetric::Current => measurement(reading.current.as_ref()?)?.into(),
        MtMetric::Frequency => measurement(reading.frequency.as_ref()?)?.into(),
        MtMetric::PowerFactor => measurement(reading.power_factor.as_ref()?)?.into(),
        MtMetric::Door => reading.door.as_ref()?.open?.into(),
        MtMetric::Water => reading.water.as_ref()?.present?.into(),
        MtMetric::Button => {
            let button = reading.button.as_ref()?;
            button
                .pressed
                .or(button.press_type.as_ref().map(|_| true))?
                .into()
        }
        MtMetric::RemoteLockoutSwitch => reading.remote_lockout_switch.as_ref()?.locked?.into(),
        MtMetric::DownstreamPower => reading.downstream_power.as_ref()?.enabled?.into(),
        // Integrated locally, never read from a payload.
        MtMetric::RealPowerEnergy => return None,
    };
    Some(value)
}

/// Power in watts; `value` wins over `draw`, and `kW`/`mW` units are scaled.
fn power_watts(m: &Measurement) -> Option<f64> {
    let raw = m.value.or(m.draw)?;
    Some(match m.unit.as_deref() {
        Some("kW") => raw * 1000.0,
        Some("mW") => raw / 1000.0,
        _ => raw,
    })
}

fn measurement(m: &Measurement) -> Option<f64> {
    m.value.or(m.level).or(m.draw).or(m.percentage)
}

// ── Switches (MS) ────────────────────────────────────────────────────

/// Aggregate one switch's port statuses.
pub fn transform_ms_ports(ports: &[SwitchPortStatus]) -> DeviceReadings {
    let mut connected = 0_usize;
    let mut links = 0_usize;
    let mut poe_ports = 0_usize;
    let mut poe_power = 0.0_f64;
    let mut clients = 0_u64;
    let mut sent = Vec::new();
    let mut recv = Vec::new();
    let mut traffic_sent = 0.0_f64;
    let mut traffic_recv = 0.0_f64;
    let mut errors = 0_usize;
    let mut discards = 0_usize;

    for port in ports {
        let is_connected = port.status.eq_ignore_ascii_case("connected");
        if is_connected {
            links += 1;
            if port.enabled {
                connected += 1;
            }
        }

        if let Some(wh) = port.power_usage_in_wh {
            poe_ports += 1;
            if wh > 0.0 {
                poe_power += deciwatts_to_watts(wh);
            }
        }

        clients += port.client_count;

        if let Some(usage) = &port.usage_in_kb {
            if usage.sent > 0.0 {
                sent.push(kb_to_percentage(usage.sent, DEFAULT_PORT_SPEED_MBPS));
            }
            if usage.recv > 0.0 {
                recv.push(kb_to_percentage(usage.recv, DEFAULT_PORT_SPEED_MBPS));
            }
        }
        if let Some(traffic) = &port.traffic_in_kbps {
            traffic_sent += traffic.sent;
            traffic_recv += traffic.recv;
        }

        if !port.errors.is_empty() {
            errors += 1;
        }
        if port
            .warnings
            .iter()
            .any(|w| w.to_ascii_lowercase().contains("discard"))
        {
            discards += 1;
        }
    }

    let overall: Vec<f64> = sent.iter().chain(recv.iter()).copied().collect();

    let mut out = DeviceReadings::new();
    out.insert(MsMetric::PortCount, ports.len());
    out.insert(MsMetric::ConnectedPorts, connected);
    out.insert(MsMetric::PortLinkCount, links);
    out.insert(MsMetric::PoePorts, poe_ports);
    out.insert(MsMetric::PoePower, round_to(poe_power, 1));
    out.insert(MsMetric::ConnectedClients, clients);
    out.insert(MsMetric::PortUtilizationSent, round_to(average(&sent), 2));
    out.insert(MsMetric::PortUtilizationRecv, round_to(average(&recv), 2));
    out.insert(MsMetric::PortUtilization, round_to(average(&overall), 2));
    out.insert(
        MsMetric::PortTrafficSent,
        round_to(traffic_sent / 1000.0, 3),
    );
    out.insert(
        MsMetric::PortTrafficRecv,
        round_to(traffic_recv / 1000.0, 3),
    );
    out.insert(MsMetric::PortErrors, errors);
    out.insert(MsMetric::PortDiscards, discards);
    out
}

/// Power supplies reporting as working.
pub fn operational_power_modules(slots: &[PowerModuleSlot]) -> usize {
    slots
        .iter()
        .filter_map(|slot| slot.status.as_deref())
        .filter(|status| {
            status.eq_ignore_ascii_case("operational") || status.eq_ignore_ascii_case("powering")
        })
        .count()
}

// ── Wireless (MR) ────────────────────────────────────────────────────

/// Network-wide SSID counts.
pub fn transform_ssids(ssids: &[WirelessSsid]) -> DeviceReadings {
    let enabled: Vec<&WirelessSsid> = ssids.iter().filter(|s| s.enabled).collect();
    let open = enabled
        .iter()
        .filter(|s| s.auth_mode.as_deref() == Some("open"))
        .count();

    let mut out = DeviceReadings::new();
    out.insert(MrMetric::SsidCount, ssids.len());
    out.insert(MrMetric::EnabledSsids, enabled.len());
    out.insert(MrMetric::OpenSsids, open);
    out
}

/// Per-access-point readings: client count plus per-band channel use.
pub fn transform_mr_device(status: &WirelessStatus, client_count: usize) -> DeviceReadings {
    let mut bands: BTreeMap<&str, [Vec<f64>; 3]> = BTreeMap::new();

    for bss in &status.basic_service_sets {
        let (Some(band), Some(util)) = (bss.band.as_deref(), bss.channel_utilization.as_ref())
        else {
            continue;
        };
        let slot = bands.entry(band).or_default();
        if let Some(v) = util.total {
            slot[0].push(v);
        }
        if let Some(v) = util.wifi {
            slot[1].push(v);
        }
        if let Some(v) = util.non_wifi {
            slot[2].push(v);
        }
    }

    let mut out = DeviceReadings::new();
    out.insert(MrMetric::ClientCount, client_count);

    for (band, [total, wifi, non_wifi]) in &bands {
        let metrics = match *band {
            "2.4" => [
                MrMetric::ChannelUtilizationTotal24,
                MrMetric::ChannelUtilizationWifi24,
                MrMetric::ChannelUtilizationNonWifi24,
            ],
            "5" => [
                MrMetric::ChannelUtilizationTotal5,
                MrMetric::ChannelUtilizationWifi5,
                MrMetric::ChannelUtilizationNonWifi5,
            ],
            _ => continue,
        };
        for (metric, samples) in metrics.into_iter().zip([total, wifi, non_wifi]) {
            if !samples.is_empty() {
                out.insert(metric, round_to(average(samples), 1));
            }
        }
    }

    out
}

// ── Memory ───────────────────────────────────────────────────────────

/// Latest memory use of one device, in percent.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn memory_usage_percent(usage: &DeviceMemoryUsage) -> Option<f64> {
    let latest = usage.intervals.last()?;
    if let Some(pct) = latest
        .memory
        .used
        .percentages
        .as_ref()
        .and_then(|p| p.maximum)
    {
        return Some(round_to(pct, 1));
    }
    let used = latest.memory.used.median.or(latest.memory.used.maximum)?;
    let provisioned = usage.provisioned?;
    Some(calculate_percentage(used as f64, provisioned as f64))
}

// ── Organization ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceStatusSummary {
    pub total: usize,
    pub online: usize,
    /// `offline` plus `dormant`.
    pub offline: usize,
    pub availability_percentage: f64,
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn summarize_device_statuses(statuses: &[DeviceStatus]) -> DeviceStatusSummary {
    let mut online = 0;
    let mut offline = 0;
    for status in statuses {
        match status.status.to_ascii_lowercase().as_str() {
            "online" => online += 1,
            "offline" | "dormant" => offline += 1,
            _ => {}
        }
    }
    DeviceStatusSummary {
        total: statuses.len(),
        online,
        offline,
        availability_percentage: calculate_percentage(online as f64, statuses.len() as f64),
    }
}

/// Parse a license expiry as `Mar 16, 2023 UTC` or RFC 3339.
pub fn parse_license_expiration(raw: &str) -> Option<DateTime<Utc>> {
    if raw.contains("UTC") {
        let date = NaiveDate::parse_from_str(raw.replace(" UTC", "").trim(), "%b %d, %Y").ok()?;
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    let normalized = raw.replace('Z', "+00:00");
    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// Whole days from `now` until `expiry`, rounded down.
pub fn days_until(expiry: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expiry - now).num_seconds().div_euclid(86_400)
}

fn is_expiring(days: i64) -> bool {
    (0..=LICENSE_EXPIRY_WINDOW_DAYS).contains(&days)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LicensingModel {
    #[serde(rename = "co-term")]
    CoTerm,
    #[serde(rename = "per-device")]
    PerDevice,
    #[default]
    #[serde(rename = "unavailable")]
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiringLicense {
    /// Org status (co-term) or device serial (per-device).
    pub label: String,
    pub expiry_date: String,
    pub days_remaining: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LicenseSummary {
    pub licensing_model: LicensingModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub licensed_device_counts: BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub licenses_by_type: BTreeMap<String, u64>,
    pub total_licenses: u64,
    pub expiring_count: usize,
    pub expiring_soon: Vec<ExpiringLicense>,
}

impl LicenseSummary {
    /// Co-termination model: one shared expiry for the whole org.
    pub fn from_overview(overview: &LicensesOverview, now: DateTime<Utc>) -> Self {
        let status = overview.status.clone().unwrap_or_else(|| "Unknown".into());
        let mut expiring_soon = Vec::new();

        if let Some(raw) = overview.expiration_date.as_deref() {
            match parse_license_expiration(raw) {
                Some(expiry) => {
                    let days = days_until(expiry, now);
                    if is_expiring(days) {
                        expiring_soon.push(ExpiringLicense {
                            label: status.clone(),
                            expiry_date: raw.to_owned(),
                            days_remaining: days,
                        });
                    }
                }
                None => debug!(expiration = raw, "could not parse co-term expiry date"),
            }
        }

        Self {
            licensing_model: LicensingModel::CoTerm,
            status: Some(status),
            expiration_date: overview.expiration_date.clone(),
            licensed_device_counts: overview
                .licensed_device_counts
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            licenses_by_type: BTreeMap::new(),
            total_licenses: overview.licensed_device_counts.values().sum(),
            expiring_count: expiring_soon.len(),
            expiring_soon,
        }
    }

    /// Per-device model: every license has its own expiry.
    pub fn from_licenses(licenses: &[License], now: DateTime<Utc>) -> Self {
        let mut expiring_soon: Vec<ExpiringLicense> = licenses
            .iter()
            .filter_map(|license| {
                let raw = license.expiration_date.as_deref()?;
                let days = days_until(parse_license_expiration(raw)?, now);
                is_expiring(days).then(|| ExpiringLicense {
                    label: license
                        .device_serial
                        .clone()
                        .unwrap_or_else(|| "Unknown".into()),
                    expiry_date: raw.to_owned(),
                    days_remaining: days,
                })
            })
            .collect();
        let expiring_count = expiring_soon.len();
        expiring_soon.truncate(MAX_EXPIRING_DETAILS);

        let mut licenses_by_type = BTreeMap::new();
        for license in licenses {
            let kind = license
                .license_type
                .clone()
                .unwrap_or_else(|| "Unknown".into());
            *licenses_by_type.entry(kind).or_insert(0) += 1;
        }

        Self {
            licensing_model: LicensingModel::PerDevice,
            status: None,
            expiration_date: None,
            licensed_device_counts: BTreeMap::new(),
            licenses_by_type,
            total_licenses: u64::try_from(licenses.len()).unwrap_or(u64::MAX),
            expiring_count,
            expiring_soon,
        }
    }

    /// Neither licensing endpoint answered (subscription licensing or no access).
    pub fn unavailable() -> Self {
        Self {
            status: Some("Unable to determine licensing model".into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientsSummary {
    pub total_count: u64,
    pub usage_overall_total: f64,
    pub usage_overall_downstream: f64,
    pub usage_overall_upstream: f64,
    pub usage_average_total: f64,
}

impl From<&ClientsOverview> for ClientsSummary {
    fn from(overview: &ClientsOverview) -> Self {
        Self {
            total_count: overview.counts.total,
            usage_overall_total: round_to(overview.usage.overall.total, 2),
            usage_overall_downstream: round_to(overview.usage.overall.downstream, 2),
            usage_overall_upstream: round_to(overview.usage.overall.upstream, 2),
            usage_average_total: round_to(overview.usage.average, 2),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        "2024-06-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn unit_helpers() {
        assert_eq!(deciwatts_to_watts(155.0), 15.5);
        assert_eq!(bytes_to_mbps(1_250_000.0, 1), 10.0);
        assert_eq!(bytes_to_mbps(-5.0, 1), 0.0);
        assert_eq!(kb_to_percentage(250_000.0, DEFAULT_PORT_SPEED_MBPS), 25.0);
        assert_eq!(
            kb_to_percentage(5_000_000.0, DEFAULT_PORT_SPEED_MBPS),
            100.0
        );
        assert_eq!(calculate_percentage(1.0, 3.0), 33.3);
        assert_eq!(calculate_percentage(1.0, 0.0), 0.0);
    }

    #[test]
    fn mt_readings_flatten() {
        let sensor: SensorReadings = serde_json::from_value(json!({
            "serial": "Q2MT-0000-0001",
            "readings": [
                { "ts": "2024-05-01T10:00:00Z", "metric": "temperature",
                  "temperature": { "celsius": 21.5 } },
                { "ts": "2024-05-01T10:02:00Z", "metric": "door", "door": { "open": true } },
                { "metric": "noise", "noise": { "ambient": { "level": 38.0 } } },
                { "metric": "realPower", "realPower": { "value": 1.5, "unit": "kW" } },
                { "metric": "voltage", "voltage": { "level": 230.1 } },
                { "metric": "humidity", "humidity": {} },
                { "metric": "sparkles" }
            ]
        }))
        .unwrap();

        let readings = transform_mt_readings(&sensor);
        assert_eq!(
            readings.keys().collect::<Vec<_>>(),
            vec!["temperature", "door", "noise", "realPower", "voltage"]
        );
        assert_eq!(readings.get("realPower"), Some(&MetricValue::Float(1500.0)));
        assert_eq!(readings.get("door"), Some(&MetricValue::Bool(true)));
        assert_eq!(
            readings.timestamp,
            Some("2024-05-01T10:02:00Z".parse().unwrap())
        );
    }

    #[test]
    fn switch_ports_aggregate() {
        let ports: Vec<SwitchPortStatus> = serde_json::from_value(json!([
            { "portId": "1", "enabled": true, "status": "Connected",
              "usageInKb": { "total": 300_000, "sent": 100_000, "recv": 200_000 },
              "trafficInKbps": { "total": 1500, "sent": 500, "recv": 1000 },
              "clientCount": 2, "powerUsageInWh": 55.0 },
            { "portId": "2", "enabled": false, "status": "connected",
              "errors": ["CRC errors"], "warnings": ["Excessive discards"],
              "powerUsageInWh": 0.0 },
            { "portId": "3", "enabled": true, "status": "Disconnected", "clientCount": 1 }
        ]))
        .unwrap();

        let r = transform_ms_ports(&ports);
        assert_eq!(r.metric(MsMetric::PortCount), Some(&MetricValue::Int(3)));
        assert_eq!(
            r.metric(MsMetric::ConnectedPorts),
            Some(&MetricValue::Int(1))
        );
        assert_eq!(
            r.metric(MsMetric::PortLinkCount),
            Some(&MetricValue::Int(2))
        );
        assert_eq!(r.metric(MsMetric::PoePorts), Some(&MetricValue::Int(2)));
        assert_eq!(r.metric(MsMetric::PoePower), Some(&MetricValue::Float(5.5)));
        assert_eq!(
            r.metric(MsMetric::ConnectedClients),
            Some(&MetricValue::Int(3))
        );
        assert_eq!(
            r.metric(MsMetric::PortUtilizationSent),
            Some(&MetricValue::Float(10.0))
        );
        assert_eq!(
            r.metric(MsMetric::PortUtilization),
            Some(&MetricValue::Float(15.0))
        );
        assert_eq!(
            r.metric(MsMetric::PortTrafficRecv),
            Some(&MetricValue::Float(1.0))
        );
        assert_eq!(r.metric(MsMetric::PortErrors), Some(&MetricValue::Int(1)));
        assert_eq!(r.metric(MsMetric::PortDiscards), Some(&MetricValue::Int(1)));
    }

    #[test]
    fn power_modules_count_working_slots() {
        let slots: Vec<PowerModuleSlot> = serde_json::from_value(json!([
            { "number": 1, "status": "Operational" },
            { "number": 2, "status": "powering" },
            { "number": 3, "status": "not connected" },
            { "number": 4 }
        ]))
        .unwrap();
        assert_eq!(operational_power_modules(&slots), 2);
        assert_eq!(operational_power_modules(&[]), 0);
    }

    #[test]
    fn ssid_counts() {
        let ssids: Vec<WirelessSsid> = serde_json::from_value(json!([
            { "number": 0, "name": "Corp", "enabled": true, "authMode": "psk" },
            { "number": 1, "name": "Guest", "enabled": true, "authMode": "open" },
            { "number": 2, "name": "Unconfigured SSID 3", "enabled": false, "authMode": "open" }
        ]))
        .unwrap();
        let r = transform_ssids(&ssids);
        assert_eq!(r.metric(MrMetric::SsidCount), Some(&MetricValue::Int(3)));
        assert_eq!(r.metric(MrMetric::EnabledSsids), Some(&MetricValue::Int(2)));
        assert_eq!(r.metric(MrMetric::OpenSsids), Some(&MetricValue::Int(1)));
    }

    #[test]
    fn access_point_bands() {
        let status: WirelessStatus = serde_json::from_value(json!({
            "basicServiceSets": [
                { "band": "2.4", "channelUtilization": { "total": 40.0, "wifi": 30.0, "nonWifi": 10.0 } },
                { "band": "2.4", "channelUtilization": { "total": 20.0 } },
                { "band": "5", "channelUtilization": { "total": 12.5 } },
                { "band": "6", "channelUtilization": { "total": 1.0 } }
            ]
        }))
        .unwrap();
        let r = transform_mr_device(&status, 7);
        assert_eq!(r.metric(MrMetric::ClientCount), Some(&MetricValue::Int(7)));
        assert_eq!(
            r.metric(MrMetric::ChannelUtilizationTotal24),
            Some(&MetricValue::Float(30.0))
        );
        assert_eq!(
            r.metric(MrMetric::ChannelUtilizationWifi24),
            Some(&MetricValue::Float(30.0))
        );
        assert_eq!(
            r.metric(MrMetric::ChannelUtilizationTotal5),
            Some(&MetricValue::Float(12.5))
        );
        assert!(r.metric(MrMetric::ChannelUtilizationWifi5).is_none());
    }

    #[test]
    fn device_status_summary() {
        let statuses: Vec<DeviceStatus> = serde_json::from_value(json!([
            { "serial": "A", "status": "online" },
            { "serial": "B", "status": "Offline" },
            { "serial": "C", "status": "dormant" },
            { "serial": "D", "status": "alerting" }
        ]))
        .unwrap();
        let s = summarize_device_statuses(&statuses);
        assert_eq!((s.total, s.online, s.offline), (4, 1, 2));
        assert_eq!(s.availability_percentage, 25.0);
    }

    #[test]
    fn license_dates_parse_both_formats() {
        assert_eq!(
            parse_license_expiration("Mar 16, 2023 UTC"),
            Some("2023-03-16T00:00:00Z".parse().unwrap())
        );
        assert_eq!(
            parse_license_expiration("2024-07-01T00:00:00Z"),
            Some("2024-07-01T00:00:00Z".parse().unwrap())
        );
        assert_eq!(parse_license_expiration("someday"), None);
    }

    #[test]
    fn coterm_overview_within_window() {
        let overview: LicensesOverview = serde_json::from_value(json!({
            "status": "OK",
            "expirationDate": "Jul 15, 2024 UTC",
            "licensedDeviceCounts": { "MS": 3, "MR": 5 }
        }))
        .unwrap();
        let s = LicenseSummary::from_overview(&overview, now());
        assert_eq!(s.licensing_model, LicensingModel::CoTerm);
        assert_eq!(s.total_licenses, 8);
        assert_eq!(s.expiring_count, 1);
        assert_eq!(s.expiring_soon[0].days_remaining, 44);
    }

    #[test]
    fn per_device_licenses_cap_details() {
        let licenses: Vec<License> = (0..7)
            .map(|i| {
                serde_json::from_value(json!({
                    "id": format!("L{i}"),
                    "licenseType": if i % 2 == 0 { "ENT" } else { "MT" },
                    "deviceSerial": format!("Q2XX-000{i}"),
                    "expirationDate": "2024-06-20T00:00:00Z"
                }))
                .unwrap()
            })
            .chain(std::iter::once(
                serde_json::from_value(json!({
                    "id": "L-late",
                    "expirationDate": "2025-06-20T00:00:00Z"
                }))
                .unwrap(),
            ))
            .collect();

        let s = LicenseSummary::from_licenses(&licenses, now());
        assert_eq!(s.licensing_model, LicensingModel::PerDevice);
        assert_eq!(s.total_licenses, 8);
        assert_eq!(s.expiring_count, 7);
        assert_eq!(s.expiring_soon.len(), 5);
        assert_eq!(s.licenses_by_type.get("ENT"), Some(&4));
        assert_eq!(s.licenses_by_type.get("Unknown"), Some(&1));
    }

    #[test]
    fn expired_licenses_are_not_expiring() {
        let expired = "2024-05-31T12:00:00Z".parse().unwrap();
        assert_eq!(days_until(expired, now()), -1);
        assert!(!is_expiring(-1));
        assert!(is_expiring(90));
        assert!(!is_expiring(91));
    }

    #[test]
    fn memory_usage_per_device() {
        let usages: Vec<DeviceMemoryUsage> = serde_json::from_value(json!([
            { "serial": "A", "provisioned": 1000,
              "intervals": [{ "memory": { "used": { "median": 250 } } }] },
            { "serial": "B",
              "intervals": [{ "memory": { "used": { "percentages": { "maximum": 75.0 } } } }] },
            { "serial": "C", "intervals": [] }
        ]))
        .unwrap();
        let percents: Vec<Option<f64>> = usages.iter().map(memory_usage_percent).collect();
        assert_eq!(percents, vec![Some(25.0), Some(75.0), None]);
    }
}

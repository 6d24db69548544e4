// ── Entity descriptions ──
//
// Display metadata per metric: name, unit, device class, state class, icon.

use serde::Serialize;
use strum::{Display, IntoStaticStr};

use crate::model::{Metric, MrMetric, MsMetric, MtMetric, OrgMetric};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Platform {
    Sensor,
    BinarySensor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StateClass {
    Measurement,
    Total,
    TotalIncreasing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityCategory {
    Diagnostic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EntityDescription {
    pub metric: Metric,
    pub name: &'static str,
    pub platform: Platform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<StateClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<EntityCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'static str>,
}

impl EntityDescription {
    const fn sensor(metric: Metric, name: &'static str) -> Self {
        Self {
            metric,
            name,
            platform: Platform::Sensor,
            unit: None,
            device_class: None,
            state_class: Some(StateClass::Measurement),
            category: None,
            icon: None,
        }
    }

    const fn binary(metric: Metric, name: &'static str, device_class: &'static str) -> Self {
        Self {
            metric,
            name,
            platform: Platform::BinarySensor,
            unit: None,
            device_class: Some(device_class),
            state_class: None,
            category: None,
            icon: None,
        }
    }

    const fn unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    const fn class(mut self, device_class: &'static str) -> Self {
        self.device_class = Some(device_class);
        self
    }

    const fn icon(mut self, icon: &'static str) -> Self {
        self.icon = Some(icon);
        self
    }

    const fn total(mut self) -> Self {
        self.state_class = Some(StateClass::Total);
        self
    }

    const fn total_increasing(mut self) -> Self {
        self.state_class = Some(StateClass::TotalIncreasing);
        self
    }

    const fn diagnostic(mut self) -> Self {
        self.category = Some(EntityCategory::Diagnostic);
        self
    }

    pub fn key(&self) -> &'static str {
        self.metric.key()
    }
}

const PERCENT: &str = "%";
const MICROGRAMS_M3: &str = "µg/m³";

const fn mt(m: MtMetric) -> Metric {
    Metric::Mt(m)
}

const fn mr(m: MrMetric) -> Metric {
    Metric::Mr(m)
}

const fn ms(m: MsMetric) -> Metric {
    Metric::Ms(m)
}

const fn org(m: OrgMetric) -> Metric {
    Metric::Org(m)
}

type D = EntityDescription;

static DESCRIPTIONS: &[EntityDescription] = &[
    // MT
    D::sensor(mt(MtMetric::Temperature), "Temperature")
        .unit("°C")
        .class("temperature"),
    D::sensor(mt(MtMetric::Humidity), "Humidity")
        .unit(PERCENT)
        .class("humidity"),
    D::sensor(mt(MtMetric::Co2), "CO2")
        .unit("ppm")
        .class("carbon_dioxide"),
    D::sensor(mt(MtMetric::Tvoc), "TVOC")
        .unit(MICROGRAMS_M3)
        .class("volatile_organic_compounds"),
    D::sensor(mt(MtMetric::Pm25), "PM2.5")
        .unit(MICROGRAMS_M3)
        .class("pm25"),
    D::sensor(mt(MtMetric::Noise), "Noise")
        .unit("dB")
        .class("sound_pressure"),
    D::sensor(mt(MtMetric::IndoorAirQuality), "Indoor Air Quality").class("aqi"),
    D::sensor(mt(MtMetric::Battery), "Battery")
        .unit(PERCENT)
        .class("battery"),
    D::sensor(mt(MtMetric::RealPower), "Real Power")
        .unit("W")
        .class("power"),
    D::sensor(mt(MtMetric::RealPowerEnergy), "Energy")
        .unit("kWh")
        .class("energy")
        .total_increasing(),
    D::sensor(mt(MtMetric::ApparentPower), "Apparent Power")
        .unit("VA")
        .class("apparent_power"),
    D::sensor(mt(MtMetric::Voltage), "Voltage")
        .unit("V")
        .class("voltage"),
    D::sensor(mt(MtMetric::Current), "Current")
        .unit("A")
        .class("current"),
    D::sensor(mt(MtMetric::Frequency), "Frequency")
        .unit("Hz")
        .class("frequency"),
    D::sensor(mt(MtMetric::PowerFactor), "Power Factor")
        .unit(PERCENT)
        .class("power_factor"),
    D::binary(mt(MtMetric::Door), "Door", "door"),
    D::binary(mt(MtMetric::Water), "Water Detection", "moisture"),
    D::binary(mt(MtMetric::Button), "Button", "occupancy").icon("mdi:gesture-tap-button"),
    D::binary(mt(MtMetric::RemoteLockoutSwitch), "Remote Lockout", "lock"),
    D::binary(mt(MtMetric::DownstreamPower), "Downstream Power", "power"),
    // MR
    D::sensor(mr(MrMetric::SsidCount), "SSID Count").icon("mdi:wifi"),
    D::sensor(mr(MrMetric::EnabledSsids), "Enabled SSIDs").icon("mdi:wifi-check"),
    D::sensor(mr(MrMetric::OpenSsids), "Open SSIDs").icon("mdi:wifi-off"),
    D::sensor(mr(MrMetric::ClientCount), "Client Count").icon("mdi:account-multiple"),
    D::sensor(mr(MrMetric::MemoryUsage), "Memory Usage")
        .unit(PERCENT)
        .icon("mdi:memory")
        .diagnostic(),
    D::sensor(
        mr(MrMetric::ChannelUtilizationTotal24),
        "Channel Utilization 2.4GHz",
    )
    .unit(PERCENT),
    D::sensor(
        mr(MrMetric::ChannelUtilizationTotal5),
        "Channel Utilization 5GHz",
    )
    .unit(PERCENT),
    D::sensor(
        mr(MrMetric::ChannelUtilizationWifi24),
        "WiFi Utilization 2.4GHz",
    )
    .unit(PERCENT),
    D::sensor(
        mr(MrMetric::ChannelUtilizationWifi5),
        "WiFi Utilization 5GHz",
    )
    .unit(PERCENT),
    D::sensor(
        mr(MrMetric::ChannelUtilizationNonWifi24),
        "Non-WiFi Utilization 2.4GHz",
    )
    .unit(PERCENT),
    D::sensor(
        mr(MrMetric::ChannelUtilizationNonWifi5),
        "Non-WiFi Utilization 5GHz",
    )
    .unit(PERCENT),
    // MS
    D::sensor(ms(MsMetric::PortCount), "Port Count").icon("mdi:ethernet"),
    D::sensor(ms(MsMetric::ConnectedPorts), "Connected Ports").icon("mdi:ethernet-cable"),
    D::sensor(ms(MsMetric::PoePorts), "PoE Ports").icon("mdi:power-plug"),
    D::sensor(ms(MsMetric::PortUtilizationSent), "Port Utilization Sent").unit(PERCENT),
    D::sensor(
        ms(MsMetric::PortUtilizationRecv),
        "Port Utilization Received",
    )
    .unit(PERCENT),
    D::sensor(ms(MsMetric::PortUtilization), "Port Utilization").unit(PERCENT),
    D::sensor(ms(MsMetric::PortTrafficSent), "Port Traffic Sent")
        .unit("Mbit/s")
        .class("data_rate"),
    D::sensor(ms(MsMetric::PortTrafficRecv), "Port Traffic Received")
        .unit("Mbit/s")
        .class("data_rate"),
    D::sensor(ms(MsMetric::PoePower), "PoE Power")
        .unit("W")
        .class("power"),
    D::sensor(ms(MsMetric::PoeLimit), "PoE Limit")
        .unit("W")
        .class("power"),
    D::sensor(ms(MsMetric::ConnectedClients), "Connected Clients").icon("mdi:account-network"),
    D::sensor(ms(MsMetric::PowerModuleStatus), "Power Module Status").diagnostic(),
    D::sensor(ms(MsMetric::PortErrors), "Port Errors")
        .icon("mdi:alert-circle")
        .diagnostic(),
    D::sensor(ms(MsMetric::PortDiscards), "Port Discards").diagnostic(),
    D::sensor(ms(MsMetric::PortLinkCount), "Port Link Count").icon("mdi:link"),
    D::sensor(ms(MsMetric::MemoryUsage), "Memory Usage")
        .unit(PERCENT)
        .icon("mdi:memory")
        .diagnostic(),
    // Organization
    D::sensor(org(OrgMetric::ApiCalls), "API Calls")
        .icon("mdi:api")
        .total()
        .diagnostic(),
    D::sensor(org(OrgMetric::FailedApiCalls), "Failed API Calls")
        .icon("mdi:api-off")
        .total()
        .diagnostic(),
    D::sensor(org(OrgMetric::DeviceCount), "Device Count").icon("mdi:devices"),
    D::sensor(org(OrgMetric::NetworkCount), "Network Count").icon("mdi:lan"),
    D::sensor(org(OrgMetric::OfflineDevices), "Offline Devices").icon("mdi:lan-disconnect"),
    D::sensor(org(OrgMetric::AlertsCount), "Alerts Count").icon("mdi:alert"),
    D::sensor(org(OrgMetric::LicenseExpiring), "Licenses Expiring").icon("mdi:license"),
    D::sensor(org(OrgMetric::ClientsTotalCount), "Clients Total Count")
        .icon("mdi:account-multiple"),
    D::sensor(
        org(OrgMetric::ClientsUsageOverallTotal),
        "Clients Usage Total",
    )
    .unit("KB")
    .class("data_size"),
    D::sensor(
        org(OrgMetric::ClientsUsageOverallDownstream),
        "Clients Usage Downstream",
    )
    .unit("KB")
    .class("data_size"),
    D::sensor(
        org(OrgMetric::ClientsUsageOverallUpstream),
        "Clients Usage Upstream",
    )
    .unit("KB")
    .class("data_size"),
    D::sensor(
        org(OrgMetric::ClientsUsageAverageTotal),
        "Clients Usage Average",
    )
    .unit("KB")
    .class("data_size"),
    D::sensor(
        org(OrgMetric::BluetoothClientsTotalCount),
        "Bluetooth Clients",
    )
    .icon("mdi:bluetooth"),
];

/// Display metadata for a metric.
pub fn describe(metric: Metric) -> Option<&'static EntityDescription> {
    DESCRIPTIONS.iter().find(|d| d.metric == metric)
}

/// All described metrics, in table order.
pub fn all() -> &'static [EntityDescription] {
    DESCRIPTIONS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use strum::IntoEnumIterator;

    #[test]
    fn every_metric_is_described_once() {
        let metrics: Vec<Metric> = MtMetric::iter()
            .map(Metric::from)
            .chain(MrMetric::iter().map(Metric::from))
            .chain(MsMetric::iter().map(Metric::from))
            .chain(OrgMetric::iter().map(Metric::from))
            .collect();
        for metric in &metrics {
            assert!(describe(*metric).is_some(), "{metric} has no description");
        }
        let unique: HashSet<Metric> = all().iter().map(|d| d.metric).collect();
        assert_eq!(unique.len(), all().len());
        assert_eq!(all().len(), metrics.len());
    }

    #[test]
    fn binary_metrics_use_binary_platform() {
        for metric in MtMetric::BINARY {
            assert_eq!(
                describe(metric.into()).map(|d| d.platform),
                Some(Platform::BinarySensor)
            );
        }
        assert_eq!(
            describe(MtMetric::Temperature.into()).and_then(|d| d.unit),
            Some("°C")
        );
    }
}

// ── Metric keys ──
//
// One enum per device family plus the organization hub. The string forms
// are the keys the Dashboard (MT) or the transformers (everything else)
// put into reading maps.

use std::fmt;

use serde::{Serialize, Serializer};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Environmental sensor metrics, keyed exactly as the Dashboard names them.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "camelCase")]
pub enum MtMetric {
    ApparentPower,
    Battery,
    Button,
    Co2,
    Current,
    Door,
    DownstreamPower,
    Frequency,
    Humidity,
    IndoorAirQuality,
    Noise,
    Pm25,
    PowerFactor,
    RealPower,
    RemoteLockoutSwitch,
    Temperature,
    Tvoc,
    Voltage,
    Water,
    /// Daily energy integrated from `realPower`; never sent by the Dashboard.
    #[strum(serialize = "realPower_energy")]
    RealPowerEnergy,
}

impl MtMetric {
    pub const BINARY: [Self; 5] = [
        Self::Button,
        Self::Door,
        Self::DownstreamPower,
        Self::RemoteLockoutSwitch,
        Self::Water,
    ];

    /// Metrics whose transitions are published as events.
    pub const EVENTS: [Self; 3] = [Self::Button, Self::Door, Self::Water];

    pub const POWER: [Self; 6] = [
        Self::ApparentPower,
        Self::RealPower,
        Self::Current,
        Self::Voltage,
        Self::Frequency,
        Self::PowerFactor,
    ];

    pub fn is_binary(self) -> bool {
        Self::BINARY.contains(&self)
    }

    pub fn is_event(self) -> bool {
        Self::EVENTS.contains(&self)
    }
}

/// Access point metrics.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum MrMetric {
    SsidCount,
    EnabledSsids,
    OpenSsids,
    ClientCount,
    MemoryUsage,
    #[strum(serialize = "channel_utilization_total_24")]
    ChannelUtilizationTotal24,
    #[strum(serialize = "channel_utilization_total_5")]
    ChannelUtilizationTotal5,
    #[strum(serialize = "channel_utilization_wifi_24")]
    ChannelUtilizationWifi24,
    #[strum(serialize = "channel_utilization_wifi_5")]
    ChannelUtilizationWifi5,
    #[strum(serialize = "channel_utilization_non_wifi_24")]
    ChannelUtilizationNonWifi24,
    #[strum(serialize = "channel_utilization_non_wifi_5")]
    ChannelUtilizationNonWifi5,
}

/// Switch metrics.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum MsMetric {
    PortCount,
    ConnectedPorts,
    PoePorts,
    PortUtilizationSent,
    PortUtilizationRecv,
    PortTrafficSent,
    PortTrafficRecv,
    PoePower,
    ConnectedClients,
    PowerModuleStatus,
    PortErrors,
    PortDiscards,
    PortLinkCount,
    PoeLimit,
    PortUtilization,
    MemoryUsage,
}

/// Organization hub metrics.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum OrgMetric {
    ApiCalls,
    FailedApiCalls,
    DeviceCount,
    NetworkCount,
    OfflineDevices,
    AlertsCount,
    LicenseExpiring,
    ClientsTotalCount,
    ClientsUsageOverallTotal,
    ClientsUsageOverallDownstream,
    ClientsUsageOverallUpstream,
    ClientsUsageAverageTotal,
    BluetoothClientsTotalCount,
}

// ── Metric ───────────────────────────────────────────────────────────

/// Any metric key, tagged with the family it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Mt(MtMetric),
    Mr(MrMetric),
    Ms(MsMetric),
    Org(OrgMetric),
}

impl Metric {
    /// The reading-map key for this metric.
    pub fn key(self) -> &'static str {
        match self {
            Self::Mt(m) => m.into(),
            Self::Mr(m) => m.into(),
            Self::Ms(m) => m.into(),
            Self::Org(m) => m.into(),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl From<MtMetric> for Metric {
    fn from(m: MtMetric) -> Self {
        Self::Mt(m)
    }
}

impl From<MrMetric> for Metric {
    fn from(m: MrMetric) -> Self {
        Self::Mr(m)
    }
}

impl From<MsMetric> for Metric {
    fn from(m: MsMetric) -> Self {
        Self::Ms(m)
    }
}

impl From<OrgMetric> for Metric {
    fn from(m: OrgMetric) -> Self {
        Self::Org(m)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn mt_keys_match_dashboard_names() {
        assert_eq!(
            Metric::from(MtMetric::IndoorAirQuality).key(),
            "indoorAirQuality"
        );
        assert_eq!(Metric::from(MtMetric::Pm25).key(), "pm25");
        assert_eq!(Metric::from(MtMetric::Co2).key(), "co2");
        assert_eq!(
            "remoteLockoutSwitch".parse::<MtMetric>().unwrap(),
            MtMetric::RemoteLockoutSwitch
        );
        assert_eq!(MtMetric::iter().count(), 20);
        assert_eq!(
            Metric::from(MtMetric::RealPowerEnergy).key(),
            "realPower_energy"
        );
    }

    #[test]
    fn band_suffixes_keep_their_underscore() {
        assert_eq!(
            MrMetric::ChannelUtilizationNonWifi24.to_string(),
            "channel_utilization_non_wifi_24"
        );
        assert_eq!(
            "channel_utilization_total_5".parse::<MrMetric>().unwrap(),
            MrMetric::ChannelUtilizationTotal5
        );
    }

    #[test]
    fn event_metrics_are_binary() {
        for metric in MtMetric::EVENTS {
            assert!(metric.is_binary());
        }
        assert!(!MtMetric::Temperature.is_binary());
        assert!(!MtMetric::DownstreamPower.is_event());
    }

    #[test]
    fn metric_serializes_as_key() {
        let value =
            serde_json::to_value(Metric::from(OrgMetric::ClientsUsageOverallDownstream)).unwrap();
        assert_eq!(value, serde_json::json!("clients_usage_overall_downstream"));
    }
}

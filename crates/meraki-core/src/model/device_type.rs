// ── Device families ──

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Meraki product family, derived from the first two letters of a model.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum DeviceType {
    /// Environmental sensors.
    Mt,
    /// Wireless access points.
    Mr,
    /// Switches.
    Ms,
    /// Cameras.
    Mv,
}

impl DeviceType {
    /// Families that get a network hub.
    pub const HUB_TYPES: [Self; 3] = [Self::Mt, Self::Mr, Self::Ms];

    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Derive the family from a model string such as `MT15` or `ms220-8p`.
    pub fn from_model(model: &str) -> Option<Self> {
        let prefix = model.get(..2)?;
        prefix.parse().ok()
    }

    pub fn matches_model(self, model: &str) -> bool {
        Self::from_model(model) == Some(self)
    }

    /// Suffix appended to hub and device names.
    pub fn name_suffix(self) -> &'static str {
        match self {
            Self::Mt => "Environmental Sensor",
            Self::Mr => "Wireless Access Point",
            Self::Ms => "Switch",
            Self::Mv => "Camera",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Mt => {
                "Environmental monitoring sensors for temperature, humidity, air quality, etc."
            }
            Self::Mr => "Wireless access points providing WiFi connectivity and network metrics",
            Self::Ms => "Network switches providing port status, PoE power, and traffic metrics",
            Self::Mv => "Security cameras providing video analytics and motion detection",
        }
    }

    /// Poll interval used when neither the hub nor the entry overrides it.
    pub fn default_scan_interval(self) -> Duration {
        match self {
            Self::Mt | Self::Mv => Duration::from_secs(600),
            Self::Mr | Self::Ms => Duration::from_secs(300),
        }
    }
}

// ── Device registry view ──

use meraki_api::models::Device;
use serde::Serialize;

use super::device_type::DeviceType;
use crate::sanitize::sanitize_device_name;

pub const MANUFACTURER: &str = "Cisco Meraki";

/// Suffix of the organization hub's display name.
pub const ORG_HUB_SUFFIX: &str = "Organisation";

/// Registry record for an organization, a network hub, or a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sw_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration_url: Option<String>,
    /// Identifier of the parent record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_device: Option<String>,
}

/// Dashboard web origin for an API base URL (`.../api/v1` stripped).
pub fn dashboard_origin(base_url: &str) -> &str {
    base_url.trim_end_matches('/').trim_end_matches("/api/v1")
}

impl DeviceInfo {
    fn base(identifier: String, name: String, model: String) -> Self {
        Self {
            identifier,
            name,
            manufacturer: MANUFACTURER.to_owned(),
            model,
            serial_number: None,
            sw_version: None,
            mac: None,
            configuration_url: None,
            via_device: None,
        }
    }

    pub fn organization_identifier(org_id: &str) -> String {
        format!("{org_id}_org")
    }

    pub fn network_hub_identifier(network_id: &str, device_type: DeviceType) -> String {
        format!("{network_id}_{device_type}")
    }

    pub fn for_organization(org_id: &str, name: &str, base_url: Option<&str>) -> Self {
        let mut info = Self::base(
            Self::organization_identifier(org_id),
            name.to_owned(),
            "Organization".to_owned(),
        );
        info.configuration_url = base_url.map(|base| {
            format!(
                "{}/o/{org_id}/manage/organization/overview",
                dashboard_origin(base)
            )
        });
        info
    }

    pub fn for_network_hub(
        network_id: &str,
        device_type: DeviceType,
        name: &str,
        org_id: Option<&str>,
        base_url: Option<&str>,
    ) -> Self {
        let mut info = Self::base(
            Self::network_hub_identifier(network_id, device_type),
            name.to_owned(),
            format!("{device_type} Network Hub"),
        );
        info.via_device = org_id.map(Self::organization_identifier);
        if !network_id.is_empty() {
            info.configuration_url = base_url.map(|base| {
                format!(
                    "{}/n/{network_id}/manage/nodes/list",
                    dashboard_origin(base)
                )
            });
        }
        info
    }

    /// Registry record for a physical device, parented to its network hub.
    pub fn for_device(
        device: &Device,
        entry_id: &str,
        network_id: Option<&str>,
        device_type: Option<DeviceType>,
        base_url: Option<&str>,
    ) -> Self {
        let name =
            sanitize_device_name(device.name.as_deref()).unwrap_or_else(|| device.serial.clone());
        let model = if device.model.is_empty() {
            "Unknown".to_owned()
        } else {
            device.model.clone()
        };

        let mut info = Self::base(format!("{entry_id}_{}", device.serial), name, model);
        info.serial_number = Some(device.serial.clone());
        info.sw_version.clone_from(&device.firmware);
        info.mac = device.mac.clone().filter(|m| !m.is_empty());

        info.configuration_url = match device.lan_ip.as_deref().filter(|ip| !ip.is_empty()) {
            Some(ip) => Some(format!("http://{ip}")),
            None if !device.serial.is_empty() => base_url.map(|base| {
                format!(
                    "{}/manage/nodes/new_list/{}",
                    dashboard_origin(base),
                    device.serial
                )
            }),
            None => None,
        };

        let network_id = network_id.or(device.network_id.as_deref());
        if let (Some(network_id), Some(device_type)) = (network_id, device_type) {
            info.via_device = Some(Self::network_hub_identifier(network_id, device_type));
        }
        info
    }

    pub fn with_via_device(mut self, identifier: impl Into<String>) -> Self {
        self.via_device = Some(identifier.into());
        self
    }
}

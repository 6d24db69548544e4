// ── Entities ──
//
// An entity is one metric of one device (or of the organization / a network
// hub), with a stable unique id, registry metadata, and its latest state.

pub mod description;
pub mod registry;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use meraki_api::models::Device;
use serde::Serialize;
use serde_json::Value;

pub use description::{EntityCategory, EntityDescription, Platform, StateClass, describe};
pub use registry::{
    EntityKind, Factory, create_entities, create_hub_entities, create_organization_entities,
};

use crate::error::CoreError;
use crate::model::{DeviceInfo, DeviceReadings, DeviceType, Metric, MetricValue};
use crate::sanitize::{
    camel_to_snake, get_device_display_name, sanitize_device_attributes,
    sanitize_device_name_for_entity_id, sanitize_entity_id,
};

/// What every factory needs besides the device itself.
#[derive(Debug, Clone, Default)]
pub struct EntityContext {
    pub entry_id: String,
    pub organization_id: Option<String>,
    pub base_url: Option<String>,
    pub network_id: Option<String>,
}

impl EntityContext {
    pub fn new(entry_id: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_network(mut self, network_id: impl Into<String>) -> Self {
        self.network_id = Some(network_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub unique_id: String,
    /// Suggested `{platform}.{object_id}`.
    pub entity_id: String,
    pub name: String,
    pub description: EntityDescription,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    pub device_info: DeviceInfo,
    pub state: Option<MetricValue>,
    pub attributes: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reported: Option<DateTime<Utc>>,
}

fn object_id(owner: &str, metric: Metric) -> String {
    format!(
        "{}_{}",
        sanitize_device_name_for_entity_id(owner),
        sanitize_entity_id(&camel_to_snake(metric.key()))
    )
}

fn lookup(device_type: &str, metric: Metric) -> Result<&'static EntityDescription, CoreError> {
    describe(metric).ok_or_else(|| CoreError::UnknownEntityType {
        device_type: device_type.to_owned(),
        metric: metric.key().to_owned(),
    })
}

impl Entity {
    /// Entity for one metric of a physical device.
    pub fn for_device(
        device: &Device,
        device_type: DeviceType,
        metric: Metric,
        ctx: &EntityContext,
    ) -> Result<Self, CoreError> {
        let description = *lookup(device_type.as_str(), metric)?;
        let display = get_device_display_name(device);
        let device_info = DeviceInfo::for_device(
            device,
            &ctx.entry_id,
            ctx.network_id.as_deref(),
            Some(device_type),
            ctx.base_url.as_deref(),
        );

        let attributes = match serde_json::to_value(device) {
            Ok(Value::Object(map)) => sanitize_device_attributes(&map).into_iter().collect(),
            _ => BTreeMap::new(),
        };

        Ok(Self {
            unique_id: format!("{}_{}_{}", ctx.entry_id, device.serial, metric.key()),
            entity_id: format!("{}.{}", description.platform, object_id(&display, metric)),
            name: format!("{display} {}", description.name),
            description,
            serial: Some(device.serial.clone()),
            device_info,
            state: None,
            attributes,
            last_reported: None,
        })
    }

    /// Entity for an organization-level metric.
    pub fn for_organization(
        org_id: &str,
        org_name: &str,
        metric: Metric,
        ctx: &EntityContext,
    ) -> Result<Self, CoreError> {
        let description = *lookup("org", metric)?;
        Ok(Self {
            unique_id: format!("{}_{}", ctx.entry_id, metric.key()),
            entity_id: format!("{}.{}", description.platform, object_id(org_name, metric)),
            name: format!("{org_name} {}", description.name),
            description,
            serial: None,
            device_info: DeviceInfo::for_organization(org_id, org_name, ctx.base_url.as_deref()),
            state: None,
            attributes: BTreeMap::new(),
            last_reported: None,
        })
    }

    /// Entity for a network-wide metric such as the SSID counts.
    pub fn for_network_hub(
        network_id: &str,
        hub_name: &str,
        device_type: DeviceType,
        metric: Metric,
        ctx: &EntityContext,
    ) -> Result<Self, CoreError> {
        let description = *lookup(device_type.as_str(), metric)?;
        Ok(Self {
            unique_id: format!(
                "{}_{network_id}_{device_type}_{}",
                ctx.entry_id,
                metric.key()
            ),
            entity_id: format!("{}.{}", description.platform, object_id(hub_name, metric)),
            name: format!("{hub_name} {}", description.name),
            description,
            serial: None,
            device_info: DeviceInfo::for_network_hub(
                network_id,
                device_type,
                hub_name,
                ctx.organization_id.as_deref(),
                ctx.base_url.as_deref(),
            ),
            state: None,
            attributes: BTreeMap::new(),
            last_reported: None,
        })
    }

    pub fn metric(&self) -> Metric {
        self.description.metric
    }

    pub fn key(&self) -> &'static str {
        self.description.key()
    }

    pub fn platform(&self) -> Platform {
        self.description.platform
    }

    /// An entity is available once it has a state.
    pub fn is_available(&self) -> bool {
        self.state.is_some()
    }

    /// Pull this entity's value out of a reading map. Missing data clears
    /// the state rather than keeping a stale value.
    pub fn update(&mut self, readings: Option<&DeviceReadings>) {
        self.state = readings.and_then(|r| r.get(self.key())).cloned();
        if let Some(ts) = readings.and_then(|r| r.timestamp) {
            self.last_reported = Some(ts);
        }
    }

    /// State as shown to a user: binary sensors render `on`/`off`.
    pub fn display_state(&self) -> String {
        match (&self.state, self.platform()) {
            (None, _) => "unavailable".to_owned(),
            (Some(value), Platform::BinarySensor) => {
                let on = value.is_on();
                (if on { "on" } else { "off" }).to_owned()
            }
            (Some(value), Platform::Sensor) => value.to_string(),
        }
    }
}

//! Entity factory registry.
//!
//! A compile-time table from `(device type, metric)` to the constructor that
//! builds that entity. Lookups never mutate it; adding an entity kind means
//! adding a row.

use std::fmt;

use meraki_api::models::Device;
use tracing::{debug, warn};

use super::{Entity, EntityContext, description};
use crate::capabilities::should_create_entity;
use crate::error::CoreError;
use crate::model::{DeviceReadings, DeviceType, Metric, MrMetric, MsMetric, MtMetric, OrgMetric};

/// Row key: a metric as produced by one device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKind {
    pub device_type: DeviceType,
    pub metric: Metric,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.device_type, self.metric)
    }
}

pub type Factory = fn(&Device, &EntityContext) -> Result<Entity, CoreError>;

pub type OrgFactory =
    fn(org_id: &str, org_name: &str, ctx: &EntityContext) -> Result<Entity, CoreError>;

macro_rules! device_row {
    ($ty:ident, $metric:expr) => {
        (
            EntityKind {
                device_type: DeviceType::$ty,
                metric: Metric::$ty($metric),
            },
            |device, ctx| Entity::for_device(device, DeviceType::$ty, Metric::$ty($metric), ctx),
        )
    };
}

static REGISTRY: &[(EntityKind, Factory)] = &[
    device_row!(Mt, MtMetric::Temperature),
    device_row!(Mt, MtMetric::Humidity),
    device_row!(Mt, MtMetric::Co2),
    device_row!(Mt, MtMetric::Tvoc),
    device_row!(Mt, MtMetric::Pm25),
    device_row!(Mt, MtMetric::Noise),
    device_row!(Mt, MtMetric::IndoorAirQuality),
    device_row!(Mt, MtMetric::Battery),
    device_row!(Mt, MtMetric::Water),
    device_row!(Mt, MtMetric::Door),
    device_row!(Mt, MtMetric::RealPowerEnergy),
    device_row!(Mr, MrMetric::ClientCount),
    device_row!(Mr, MrMetric::MemoryUsage),
    device_row!(Ms, MsMetric::PortCount),
    device_row!(Ms, MsMetric::MemoryUsage),
];

macro_rules! org_row {
    ($metric:expr) => {
        ($metric, |org_id, org_name, ctx| {
            Entity::for_organization(org_id, org_name, Metric::Org($metric), ctx)
        })
    };
}

static ORGANIZATION_REGISTRY: &[(OrgMetric, OrgFactory)] = &[
    org_row!(OrgMetric::ApiCalls),
    org_row!(OrgMetric::FailedApiCalls),
    org_row!(OrgMetric::DeviceCount),
    org_row!(OrgMetric::NetworkCount),
    org_row!(OrgMetric::OfflineDevices),
    org_row!(OrgMetric::AlertsCount),
    org_row!(OrgMetric::LicenseExpiring),
    org_row!(OrgMetric::ClientsTotalCount),
    org_row!(OrgMetric::ClientsUsageOverallTotal),
    org_row!(OrgMetric::ClientsUsageOverallDownstream),
    org_row!(OrgMetric::ClientsUsageOverallUpstream),
    org_row!(OrgMetric::ClientsUsageAverageTotal),
    org_row!(OrgMetric::BluetoothClientsTotalCount),
];

fn find(device_type: DeviceType, metric: Metric) -> Option<Factory> {
    REGISTRY
        .iter()
        .find(|(kind, _)| kind.device_type == device_type && kind.metric == metric)
        .map(|(_, factory)| *factory)
}

/// Build one registered entity.
pub fn create_entity(
    device_type: DeviceType,
    metric: Metric,
    device: &Device,
    ctx: &EntityContext,
) -> Result<Entity, CoreError> {
    let factory = find(device_type, metric).ok_or_else(|| CoreError::UnknownEntityType {
        device_type: device_type.to_string(),
        metric: metric.key().to_owned(),
    })?;
    factory(device, ctx)
}

/// Build every registered entity the device supports.
///
/// Each row passes through the capability filter: observed readings decide,
/// and an empty payload falls back to the model's documented metrics. Indoor
/// air quality is also created when only TVOC is reported. A failing
/// constructor is logged and skipped; an unrecognized model yields nothing.
pub fn create_entities(
    device: &Device,
    readings: Option<&DeviceReadings>,
    ctx: &EntityContext,
) -> Vec<Entity> {
    let Some(device_type) = DeviceType::from_model(&device.model) else {
        debug!(serial = %device.serial, model = %device.model, "no entity kinds for model");
        return Vec::new();
    };
    let Some(readings) = readings else {
        return Vec::new();
    };

    let tvoc = Metric::from(MtMetric::Tvoc).key();
    let iaq = Metric::from(MtMetric::IndoorAirQuality);

    let mut entities = Vec::new();
    for (kind, factory) in REGISTRY
        .iter()
        .filter(|(k, _)| k.device_type == device_type)
    {
        let supported = should_create_entity(kind.metric.key(), &device.model, Some(readings))
            || (kind.metric == iaq && readings.contains(tvoc));
        if !supported {
            continue;
        }
        match factory(device, ctx) {
            Ok(mut entity) => {
                entity.update(Some(readings));
                entities.push(entity);
            }
            Err(e) => {
                warn!(serial = %device.serial, kind = %kind, error = %e, "failed to create entity")
            }
        }
    }
    entities
}

/// Organization-hub entities for every metric the hub currently reports.
pub fn create_organization_entities(
    org_id: &str,
    org_name: &str,
    readings: &DeviceReadings,
    ctx: &EntityContext,
) -> Vec<Entity> {
    ORGANIZATION_REGISTRY
        .iter()
        .filter(|(metric, _)| readings.contains(Metric::Org(*metric).key()))
        .filter_map(|(metric, factory)| match factory(org_id, org_name, ctx) {
            Ok(mut entity) => {
                entity.update(Some(readings));
                Some(entity)
            }
            Err(e) => {
                warn!(metric = %metric, error = %e, "failed to create organization entity");
                None
            }
        })
        .collect()
}

/// Network-wide entities of a hub: one per described metric in `readings`.
pub fn create_hub_entities(
    network_id: &str,
    hub_name: &str,
    device_type: DeviceType,
    readings: &DeviceReadings,
    ctx: &EntityContext,
) -> Vec<Entity> {
    description::all()
        .iter()
        .filter(|d| readings.contains(d.key()))
        .filter_map(|d| {
            Entity::for_network_hub(network_id, hub_name, device_type, d.metric, ctx)
                .inspect_err(|e| warn!(hub = hub_name, error = %e, "failed to create hub entity"))
                .ok()
        })
        .map(|mut entity| {
            entity.update(Some(readings));
            entity
        })
        .collect()
}

/// Every registered kind as `"{device}_{metric}"`.
pub fn get_registered_types() -> Vec<String> {
    REGISTRY.iter().map(|(kind, _)| kind.to_string()).collect()
}

/// Registered metrics of one device family, in table order.
pub fn get_device_capabilities(device_type: DeviceType) -> Vec<Metric> {
    REGISTRY
        .iter()
        .filter(|(kind, _)| kind.device_type == device_type)
        .map(|(kind, _)| kind.metric)
        .collect()
}

pub fn is_registered(device_type: DeviceType, metric: Metric) -> bool {
    find(device_type, metric).is_some()
}

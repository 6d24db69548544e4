// ── Entity store ──
//
// Every entity of a config entry, keyed by unique id. Hubs and coordinators
// push fresh readings in; the CLI reads snapshots or subscribes.

mod collection;

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use collection::EntityCollection;

use crate::entity::Entity;
use crate::hub::HubSnapshot;
use crate::model::{DeviceInfo, DeviceReadings};

/// Entity counts by platform, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct EntityCounts {
    pub total: usize,
    pub available: usize,
    pub by_platform: BTreeMap<String, usize>,
}

#[derive(Debug)]
pub struct EntityStore {
    entities: EntityCollection<Entity>,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            entities: EntityCollection::new(),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn get(&self, unique_id: &str) -> Option<Arc<Entity>> {
        self.entities.get(unique_id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.len() == 0
    }

    pub fn version(&self) -> u64 {
        self.entities.version()
    }

    /// All entities sorted by entity id.
    pub fn snapshot(&self) -> Vec<Arc<Entity>> {
        let mut all: Vec<Arc<Entity>> = self.entities.snapshot().iter().cloned().collect();
        all.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        all
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<Entity>>>> {
        self.entities.subscribe()
    }

    /// Entities belonging to one device serial.
    pub fn for_serial(&self, serial: &str) -> Vec<Arc<Entity>> {
        self.snapshot()
            .into_iter()
            .filter(|e| e.serial.as_deref() == Some(serial))
            .collect()
    }

    pub fn counts(&self) -> EntityCounts {
        let snapshot = self.entities.snapshot();
        let mut counts = EntityCounts {
            total: snapshot.len(),
            ..EntityCounts::default()
        };
        for entity in snapshot.iter() {
            if entity.is_available() {
                counts.available += 1;
            }
            *counts
                .by_platform
                .entry(entity.platform().to_string())
                .or_default() += 1;
        }
        counts
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Replace the whole set, pruning entities that are gone.
    pub fn replace_all(&self, entities: Vec<Entity>) {
        self.entities.upsert_and_prune(
            entities
                .into_iter()
                .map(|e| (e.unique_id.clone(), e))
                .collect(),
        );
    }

    /// Add entities whose unique id is not yet known. Existing ones keep
    /// their state. Returns how many were added.
    pub fn add_missing(&self, entities: Vec<Entity>) -> usize {
        let fresh: Vec<(String, Entity)> = entities
            .into_iter()
            .filter(|e| !self.entities.contains(&e.unique_id))
            .map(|e| (e.unique_id.clone(), e))
            .collect();
        let added = self.entities.upsert_many(fresh);
        if added > 0 {
            debug!(added, "new entities registered");
        }
        added
    }

    /// Apply a hub poll: device entities parented to `hub_identifier` take
    /// their device's readings, the hub's own entities take the hub readings.
    /// A device absent from the poll goes unavailable.
    pub fn apply_hub_snapshot(&self, hub_identifier: &str, snapshot: &HubSnapshot) -> usize {
        self.apply(|entity| {
            if entity.device_info.identifier == hub_identifier {
                Some(Some(&snapshot.hub))
            } else if entity.device_info.via_device.as_deref() == Some(hub_identifier) {
                let serial = entity.serial.as_deref()?;
                Some(snapshot.devices.get(serial))
            } else {
                None
            }
        })
    }

    /// Apply the organization hub's readings to its entities.
    pub fn apply_organization_readings(&self, org_id: &str, readings: &DeviceReadings) -> usize {
        let identifier = DeviceInfo::organization_identifier(org_id);
        self.apply(|entity| (entity.device_info.identifier == identifier).then_some(Some(readings)))
    }

    /// Drop every entity of a device, e.g. after it left a hub.
    pub fn remove_serial(&self, serial: &str) -> usize {
        self.entities
            .remove_where(|e| e.serial.as_deref() == Some(serial))
    }

    pub fn remove(&self, unique_id: &str) -> Option<Arc<Entity>> {
        self.entities.remove(unique_id)
    }

    pub fn clear(&self) {
        self.entities.clear();
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Re-evaluate entities selected by `pick`. `pick` returns `None` to
    /// leave an entity alone, `Some(readings)` to update it. Only entities
    /// whose state actually changed are written back.
    fn apply<'a>(&self, pick: impl Fn(&Entity) -> Option<Option<&'a DeviceReadings>>) -> usize {
        let updated: Vec<(String, Entity)> = self
            .entities
            .snapshot()
            .iter()
            .filter_map(|current| {
                let readings = pick(current)?;
                let mut next = Entity::clone(current);
                next.update(readings);
                (next != **current).then(|| (next.unique_id.clone(), next))
            })
            .collect();
        self.entities.upsert_many(updated)
    }
}

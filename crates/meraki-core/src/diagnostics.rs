// ── Diagnostics ──
//
// A JSON snapshot of a loaded entry for bug reports. Secrets never leave
// this module unredacted.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::controller::Controller;
use crate::coordinator::CoordinatorStatus;
use crate::hub::{ApiStatsSnapshot, NetworkHubStatus, TierAges};
use crate::model::EntryState;
use crate::store::EntityCounts;

pub const REDACTED: &str = "**REDACTED**";

/// Keys whose values are replaced by [`REDACTED`].
const SENSITIVE_KEYS: &[&str] = &["api_key"];

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub entry: EntryDiagnostics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrganizationDiagnostics>,
    pub network_hubs: Vec<NetworkHubStatus>,
    pub coordinators: Vec<CoordinatorStatus>,
    pub entities: EntityCounts,
    pub events_tracked: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryDiagnostics {
    pub entry_id: String,
    pub title: String,
    pub state: EntryState,
    pub data: Map<String, Value>,
    pub options: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrganizationDiagnostics {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub network_count: usize,
    pub api: ApiStatsSnapshot,
    pub tier_ages: TierAges,
    pub cache_entries: usize,
}

/// Replace sensitive values in a config map.
pub fn redact(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| {
            let v = if SENSITIVE_KEYS.contains(&k.as_str()) {
                Value::String(REDACTED.to_owned())
            } else {
                v.clone()
            };
            (k.clone(), v)
        })
        .collect()
}

/// Collect diagnostics for a controller, loaded or not.
pub async fn collect(controller: &Controller) -> Diagnostics {
    let entry = controller.entry().await;
    let entry = EntryDiagnostics {
        data: redact(&entry.data),
        options: redact(&entry.options),
        entry_id: entry.entry_id,
        title: entry.title,
        state: entry.state,
    };

    let organization = match controller.organization_hub().await {
        Some(hub) => Some(OrganizationDiagnostics {
            id: hub.organization_id().to_owned(),
            name: hub.organization_name().await,
            network_count: hub.networks().await.len(),
            api: hub.stats().await,
            tier_ages: hub.tier_ages(),
            cache_entries: hub.context().cache.len(),
        }),
        None => None,
    };

    let mut network_hubs = Vec::new();
    let mut coordinators = Vec::new();
    for coordinator in controller.coordinators().await {
        network_hubs.push(coordinator.hub().status().await);
        coordinators.push(coordinator.status().await);
    }

    Diagnostics {
        entry,
        organization,
        network_hubs,
        coordinators,
        entities: controller.store().counts(),
        events_tracked: controller.event_service().tracked_count(),
    }
}

/// [`collect`] as a JSON value.
pub async fn collect_json(controller: &Controller) -> Value {
    serde_json::to_value(collect(controller).await).unwrap_or(Value::Null)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::ConfigEntry;
    use meraki_api::TransportConfig;
    use serde_json::json;

    #[test]
    fn api_key_is_redacted() {
        let map = json!({ "api_key": "secret", "organization_id": "1" });
        let out = redact(map.as_object().unwrap());
        assert_eq!(out["api_key"], json!(REDACTED));
        assert_eq!(out["organization_id"], json!("1"));
    }

    #[tokio::test]
    async fn unloaded_controller_has_no_hubs() {
        let data = json!({
            "api_key": "0123456789abcdef0123456789abcdef01234567",
            "organization_id": "1",
        });
        let entry = ConfigEntry::new("e1", "Acme", data.as_object().unwrap().clone());
        let controller = Controller::new(entry, TransportConfig::default());

        let json = collect_json(&controller).await;
        assert_eq!(json["entry"]["data"]["api_key"], json!(REDACTED));
        assert_eq!(json["entry"]["state"], json!("not_loaded"));
        assert!(json.get("organization").is_none());
        assert_eq!(json["entities"]["total"], json!(0));
    }
}

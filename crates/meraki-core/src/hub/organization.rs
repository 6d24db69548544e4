// ── Organization hub ──
//
// Owns the connection to one organization. Fetches the organization and
// its networks on setup, keeps org-wide data fresh on three tiers (static,
// semi-static, dynamic), and creates the network hubs.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use meraki_api::models::{Device, Network, Organization};
use serde::Serialize;
use strum::{Display, EnumIter, IntoEnumIterator};
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::network::{DISCOVERY_CACHE_TTL, NetworkHub, devices_cache_key};
use super::{ApiStatsSnapshot, HubContext};
use crate::error::CoreError;
use crate::events::OrganizationEventData;
use crate::model::{DeviceReadings, DeviceType, OrgMetric};
use crate::retry::RetryStrategy;
use crate::transform::{
    ClientsSummary, DeviceStatusSummary, LicenseSummary, LicensingModel, summarize_device_statuses,
};

const OVERVIEW_TIMESPAN_SECS: u32 = 3_600;
const EVENTS_WINDOW_HOURS: i64 = 24;
const RECENT_ALERTS_KEPT: usize = 5;

// ── Tiers ────────────────────────────────────────────────────────────

/// Refresh class of organization data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Tier {
    /// Licensing.
    Static,
    /// Device statuses.
    SemiStatic,
    /// Client overview and organization events.
    Dynamic,
}

/// Minutes since each tier last refreshed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TierAges {
    pub static_minutes: Option<f64>,
    pub semi_static_minutes: Option<f64>,
    pub dynamic_minutes: Option<f64>,
}

/// Everything the tiers have fetched so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrganizationData {
    pub licenses: Option<LicenseSummary>,
    pub device_statuses: Option<DeviceStatusSummary>,
    /// Alert-type events in the last day.
    pub active_alerts: usize,
    /// The first few of those alerts, as returned by the Dashboard.
    pub recent_alerts: Vec<OrganizationEventData>,
    pub clients: Option<ClientsSummary>,
    pub last_license_update: Option<DateTime<Utc>>,
    pub last_device_status_update: Option<DateTime<Utc>>,
    pub last_dynamic_update: Option<DateTime<Utc>>,
}

fn minutes_since(ts: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<f64> {
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    ts.map(|t| ((now - t).num_seconds() as f64 / 60.0 * 10.0).round() / 10.0)
}

impl OrganizationData {
    pub fn tier_ages(&self, now: DateTime<Utc>) -> TierAges {
        TierAges {
            static_minutes: minutes_since(self.last_license_update, now),
            semi_static_minutes: minutes_since(self.last_device_status_update, now),
            dynamic_minutes: minutes_since(self.last_dynamic_update, now),
        }
    }

    /// Organization metrics as a reading map for the org entities.
    pub fn readings(&self, stats: &ApiStatsSnapshot, network_count: usize) -> DeviceReadings {
        let mut readings = DeviceReadings::new();
        readings.insert(OrgMetric::ApiCalls, stats.total_api_calls);
        readings.insert(OrgMetric::FailedApiCalls, stats.failed_api_calls);
        readings.insert(OrgMetric::NetworkCount, network_count);
        readings.insert(OrgMetric::AlertsCount, self.active_alerts);

        if let Some(statuses) = &self.device_statuses {
            readings.insert(OrgMetric::DeviceCount, statuses.total);
            readings.insert(OrgMetric::OfflineDevices, statuses.offline);
        }
        if let Some(licenses) = self
            .licenses
            .as_ref()
            .filter(|l| l.licensing_model != LicensingModel::Unavailable)
        {
            readings.insert(OrgMetric::LicenseExpiring, licenses.expiring_count);
        }
        if let Some(clients) = &self.clients {
            readings.insert(OrgMetric::ClientsTotalCount, clients.total_count);
            readings.insert(
                OrgMetric::ClientsUsageOverallTotal,
                clients.usage_overall_total,
            );
            readings.insert(
                OrgMetric::ClientsUsageOverallDownstream,
                clients.usage_overall_downstream,
            );
            readings.insert(
                OrgMetric::ClientsUsageOverallUpstream,
                clients.usage_overall_upstream,
            );
            readings.insert(
                OrgMetric::ClientsUsageAverageTotal,
                clients.usage_average_total,
            );
        }
        readings
    }
}

// ── OrganizationHub ──────────────────────────────────────────────────

/// Cheaply cloneable handle to an organization hub.
#[derive(Debug, Clone)]
pub struct OrganizationHub {
    inner: Arc<OrgInner>,
}

#[derive(Debug)]
struct OrgInner {
    ctx: Arc<HubContext>,
    organization: RwLock<Option<Organization>>,
    networks: RwLock<Vec<Network>>,
    data: watch::Sender<OrganizationData>,
    network_hubs: RwLock<BTreeMap<String, NetworkHub>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Setup failures split into "fix your credentials" and "try again later".
fn setup_error(err: meraki_api::Error) -> CoreError {
    let err = CoreError::from(err);
    if err.is_auth_failure() {
        error!(error = %err, "invalid API key for organization");
        err
    } else {
        error!(error = %err, "organization hub setup failed");
        CoreError::NotReady {
            message: err.to_string(),
        }
    }
}

impl OrganizationHub {
    pub fn new(ctx: Arc<HubContext>) -> Self {
        let (data, _) = watch::channel(OrganizationData::default());
        Self {
            inner: Arc::new(OrgInner {
                ctx,
                organization: RwLock::new(None),
                networks: RwLock::new(Vec::new()),
                data,
                network_hubs: RwLock::new(BTreeMap::new()),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn context(&self) -> &Arc<HubContext> {
        &self.inner.ctx
    }

    pub fn organization_id(&self) -> &str {
        &self.inner.ctx.organization_id
    }

    pub async fn organization_name(&self) -> Option<String> {
        self.inner
            .organization
            .read()
            .await
            .as_ref()
            .map(|o| o.name.clone())
    }

    pub async fn networks(&self) -> Vec<Network> {
        self.inner.networks.read().await.clone()
    }

    pub async fn network_hubs(&self) -> Vec<NetworkHub> {
        self.inner
            .network_hubs
            .read()
            .await
            .values()
            .cloned()
            .collect()
    }

    pub async fn network_hub(&self, hub_id: &str) -> Result<NetworkHub, CoreError> {
        self.inner
            .network_hubs
            .read()
            .await
            .get(hub_id)
            .cloned()
            .ok_or_else(|| CoreError::HubNotFound {
                hub_id: hub_id.to_owned(),
            })
    }

    /// Latest org-wide data.
    pub fn data(&self) -> OrganizationData {
        self.inner.data.borrow().clone()
    }

    /// Subscribe to org-wide data changes.
    pub fn subscribe(&self) -> watch::Receiver<OrganizationData> {
        self.inner.data.subscribe()
    }

    pub async fn stats(&self) -> ApiStatsSnapshot {
        self.inner.ctx.stats.snapshot().await
    }

    pub async fn readings(&self) -> DeviceReadings {
        let stats = self.stats().await;
        let network_count = self.inner.networks.read().await.len();
        self.data().readings(&stats, network_count)
    }

    pub fn tier_ages(&self) -> TierAges {
        self.data().tier_ages(Utc::now())
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Connect to the organization, load every tier once, and start the
    /// tier refresh tasks.
    pub async fn setup(&self) -> Result<(), CoreError> {
        let started = Instant::now();
        let ctx = &self.inner.ctx;
        let org_id = ctx.organization_id.as_str();

        let organization = ctx
            .call("getOrganization", RetryStrategy::Setup, || {
                ctx.client.get_organization(org_id)
            })
            .await
            .map_err(setup_error)?;
        info!(organization = %organization.name, "connected to Meraki organization");
        *self.inner.organization.write().await = Some(organization);

        let networks = ctx
            .call("getOrganizationNetworks", RetryStrategy::Setup, || {
                ctx.client.get_organization_networks(org_id)
            })
            .await
            .map_err(setup_error)?;
        debug!(count = networks.len(), "found networks in organization");
        *self.inner.networks.write().await = networks;
        ctx.stats.clear_error().await;

        self.update_all().await;
        self.spawn_tier_tasks().await;

        debug!(
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            avg_call_ms = self.stats().await.average_call_duration_ms,
            "organization hub setup complete"
        );
        Ok(())
    }

    async fn spawn_tier_tasks(&self) {
        let tiers = self.inner.ctx.config.tiers();
        let mut handles = self.inner.task_handles.lock().await;
        for tier in Tier::iter() {
            let secs = match tier {
                Tier::Static => tiers.static_interval,
                Tier::SemiStatic => tiers.semi_static_interval,
                Tier::Dynamic => tiers.dynamic_interval,
            };
            if secs == 0 {
                continue;
            }
            let hub = self.clone();
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(tier_task(
                hub,
                tier,
                Duration::from_secs(secs),
                cancel,
            )));
        }
    }

    /// Refresh every tier now, in tier order.
    pub async fn update_all(&self) {
        for tier in Tier::iter() {
            self.refresh_tier(tier).await;
        }
    }

    pub async fn refresh_tier(&self, tier: Tier) {
        match tier {
            Tier::Static => self.fetch_license_data().await,
            Tier::SemiStatic => self.fetch_device_statuses().await,
            Tier::Dynamic => self.fetch_dynamic_data().await,
        }
        debug!(tier = %tier, "organization tier refreshed");
    }

    /// Stop the tier tasks and unload every network hub.
    pub async fn unload(&self) {
        debug!("unloading organization hub");
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        let hubs = std::mem::take(&mut *self.inner.network_hubs.write().await);
        for hub in hubs.values() {
            hub.unload().await;
        }
        self.inner.ctx.cache.clear();
        debug!("organization hub unloaded");
    }

    // ── Network hubs ─────────────────────────────────────────────────

    /// One hub per (network, device family) that has at least one device.
    ///
    /// A network whose device list cannot be fetched, or a hub whose setup
    /// fails, is logged and skipped.
    pub async fn create_network_hubs(&self) -> Vec<NetworkHub> {
        let networks = self.networks().await;
        if networks.is_empty() {
            warn!("no networks found in organization");
            return Vec::new();
        }

        let ctx = &self.inner.ctx;
        let mut hubs = BTreeMap::new();
        for network in &networks {
            let network_id = network.id.as_str();
            let devices = match ctx
                .call("getNetworkDevices", RetryStrategy::Discovery, || {
                    ctx.client.get_network_devices(network_id)
                })
                .await
            {
                Ok(devices) => devices,
                Err(e) => {
                    error!(network = %network.name, error = %e, "error checking network devices");
                    continue;
                }
            };

            for device_type in DeviceType::HUB_TYPES {
                let typed: Vec<Device> = devices
                    .iter()
                    .filter(|d| device_type.matches_model(&d.model))
                    .cloned()
                    .collect();
                if typed.is_empty() {
                    continue;
                }
                // The hub's first discovery reads this instead of refetching.
                ctx.cache.insert_as(
                    devices_cache_key(network_id, device_type),
                    &typed,
                    DISCOVERY_CACHE_TTL,
                );

                let hub =
                    NetworkHub::new(Arc::clone(ctx), network, device_type, &self.inner.cancel);
                match hub.setup().await {
                    Ok(()) => {
                        debug!(
                            hub = %hub.hub_name(),
                            devices = hub.device_count().await,
                            "created network hub"
                        );
                        hubs.insert(hub.hub_id().to_owned(), hub);
                    }
                    Err(e) => {
                        warn!(
                            network = %network.name,
                            device_type = %device_type,
                            error = %e,
                            "failed to set up network hub"
                        );
                        hub.unload().await;
                    }
                }
            }
        }

        info!(
            hubs = hubs.len(),
            networks = networks.len(),
            "created network hubs"
        );
        let created: Vec<NetworkHub> = hubs.values().cloned().collect();
        *self.inner.network_hubs.write().await = hubs;
        created
    }

    // ── Tier fetches ─────────────────────────────────────────────────

    /// Co-term overview first; per-device licensing orgs reject it, so fall
    /// back to the license list, then to "unavailable".
    async fn fetch_license_data(&self) {
        let ctx = &self.inner.ctx;
        let org_id = ctx.organization_id.as_str();
        let now = Utc::now();

        let summary = match ctx
            .call(
                "getOrganizationLicensesOverview",
                RetryStrategy::Static,
                || ctx.client.get_organization_licenses_overview(org_id),
            )
            .await
        {
            Ok(overview) => LicenseSummary::from_overview(&overview, now),
            Err(e) => {
                debug!(error = %e, "co-term license overview unavailable, trying per-device");
                match ctx
                    .call("getOrganizationLicenses", RetryStrategy::Static, || {
                        ctx.client.get_organization_licenses(org_id)
                    })
                    .await
                {
                    Ok(licenses) => LicenseSummary::from_licenses(&licenses, now),
                    Err(e) => {
                        warn!(error = %e, "license information unavailable");
                        LicenseSummary::unavailable()
                    }
                }
            }
        };

        self.inner.data.send_modify(|data| {
            data.licenses = Some(summary);
            data.last_license_update = Some(now);
        });
    }

    async fn fetch_device_statuses(&self) {
        let ctx = &self.inner.ctx;
        let org_id = ctx.organization_id.as_str();

        let statuses = match ctx
            .call(
                "getOrganizationDevicesStatuses",
                RetryStrategy::Static,
                || ctx.client.get_organization_devices_statuses(org_id),
            )
            .await
        {
            Ok(statuses) => Some(statuses),
            Err(e) => {
                warn!(error = %e, "could not fetch device statuses");
                None
            }
        };

        let now = Utc::now();
        self.inner.data.send_modify(|data| {
            if let Some(statuses) = &statuses {
                data.device_statuses = Some(summarize_device_statuses(statuses));
            }
            data.last_device_status_update = Some(now);
        });
    }

    async fn fetch_dynamic_data(&self) {
        let ctx = &self.inner.ctx;
        let org_id = ctx.organization_id.as_str();

        let clients = match ctx
            .call(
                "getOrganizationClientsOverview",
                RetryStrategy::Default,
                || {
                    ctx.client
                        .get_organization_clients_overview(org_id, OVERVIEW_TIMESPAN_SECS)
                },
            )
            .await
        {
            Ok(overview) => Some(ClientsSummary::from(&overview)),
            Err(e) => {
                warn!(error = %e, "could not fetch clients overview");
                None
            }
        };

        let alerts = self.fetch_organization_events().await;

        ctx.cache.cleanup_expired();

        let now = Utc::now();
        self.inner.data.send_modify(|data| {
            if clients.is_some() {
                data.clients = clients;
            }
            if let Some(alerts) = alerts {
                data.active_alerts = alerts.len();
                data.recent_alerts = alerts.into_iter().take(RECENT_ALERTS_KEPT).collect();
            }
            data.last_dynamic_update = Some(now);
        });
    }

    /// Publish every event of the last day and return the alert-type ones.
    /// `None` when the events could not be fetched.
    async fn fetch_organization_events(&self) -> Option<Vec<OrganizationEventData>> {
        let ctx = &self.inner.ctx;
        let org_id = ctx.organization_id.as_str();
        let ending_before = Utc::now();
        let starting_after = ending_before - chrono::Duration::hours(EVENTS_WINDOW_HOURS);
        let (start, end) = (starting_after.to_rfc3339(), ending_before.to_rfc3339());

        let events = match ctx
            .call("getOrganizationEvents", RetryStrategy::Default, || {
                ctx.client.get_organization_events(org_id, &start, &end)
            })
            .await
        {
            Ok(events) => events,
            Err(e) => {
                debug!(error = %e, "could not fetch organization events");
                return None;
            }
        };

        let org_name = self.organization_name().await;
        let mut alerts = Vec::new();
        for event in &events {
            let data = OrganizationEventData::from_api(org_id, org_name.as_deref(), event);
            if data.is_alert() {
                alerts.push(data.clone());
            }
            ctx.events.publish_organization_event(data);
        }
        debug!(
            events = events.len(),
            alerts = alerts.len(),
            "processed organization events"
        );
        Some(alerts)
    }
}

// ── Background tasks ─────────────────────────────────────────────────

async fn tier_task(hub: OrganizationHub, tier: Tier, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => hub.refresh_tier(tier).await,
        }
    }
}

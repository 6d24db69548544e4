// ── Network hub ──
//
// One polling context per (network, device family). Owns the discovered
// device list for its family, refreshes it periodically, and turns the
// family's Dashboard endpoints into per-device readings.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use meraki_api::models::{
    Device, Network, PowerModuleSlot, SwitchPortStatus, WirelessSsid, WirelessStatus,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::HubContext;
use crate::batch::{BatchConfig, batch_async};
use crate::error::CoreError;
use crate::model::{DeviceReadings, DeviceType, MrMetric, MsMetric};
use crate::retry::RetryStrategy;
use crate::transform::{
    memory_usage_percent, operational_power_modules, transform_mr_device, transform_ms_ports,
    transform_mt_readings, transform_ssids,
};

/// Discovered device lists stay cached this long.
pub const DISCOVERY_CACHE_TTL: Duration = Duration::from_secs(600);
/// Wireless and switch payloads stay cached this long.
pub const DATA_CACHE_TTL: Duration = Duration::from_secs(300);
/// Discovery never runs more often than this.
pub const MIN_DISCOVERY_GAP: Duration = Duration::from_secs(30);

const DISCOVERY_HISTORY: usize = 50;
const CLIENT_TIMESPAN_SECS: u32 = 3_600;
const MEMORY_TIMESPAN_SECS: u32 = 300;

pub(crate) fn devices_cache_key(network_id: &str, device_type: DeviceType) -> String {
    format!("devices_{network_id}_{device_type}")
}

// ── Cached payloads ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RadioPayload {
    status: WirelessStatus,
    client_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WirelessPayload {
    ssids: Vec<WirelessSsid>,
    radios: BTreeMap<String, RadioPayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SwitchPayload {
    ports: BTreeMap<String, Vec<SwitchPortStatus>>,
    #[serde(default)]
    power_modules: BTreeMap<String, Vec<PowerModuleSlot>>,
}

// ── Public views ─────────────────────────────────────────────────────

/// One poll's worth of data.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HubSnapshot {
    /// Readings per device serial.
    pub devices: BTreeMap<String, DeviceReadings>,
    /// Network-wide readings (SSID counts on access-point hubs).
    pub hub: DeviceReadings,
    pub fetched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkHubStatus {
    pub hub_id: String,
    pub hub_name: String,
    pub network_id: String,
    pub device_type: DeviceType,
    pub device_count: usize,
    pub auto_discovery: bool,
    pub discovery_interval_secs: u64,
    pub average_discovery_duration_ms: f64,
    pub seconds_since_discovery: Option<u64>,
}

// ── NetworkHub ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct DiscoveryState {
    last_run: Option<Instant>,
    durations: VecDeque<Duration>,
}

/// Cheaply cloneable handle to a network hub.
#[derive(Debug, Clone)]
pub struct NetworkHub {
    inner: Arc<NetworkInner>,
}

#[derive(Debug)]
struct NetworkInner {
    ctx: Arc<HubContext>,
    network_id: String,
    network_name: String,
    device_type: DeviceType,
    hub_id: String,
    hub_name: String,
    devices: RwLock<Vec<Device>>,
    hub_readings: RwLock<DeviceReadings>,
    discovery_in_progress: AtomicBool,
    discovery: Mutex<DiscoveryState>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Clears the in-progress flag even if discovery is cancelled midway.
struct DiscoveryGuard<'a>(&'a AtomicBool);

impl Drop for DiscoveryGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl NetworkHub {
    /// Create a hub. Nothing is fetched until [`setup`](Self::setup).
    pub fn new(
        ctx: Arc<HubContext>,
        network: &Network,
        device_type: DeviceType,
        parent_cancel: &CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(NetworkInner {
                ctx,
                hub_id: format!("{}_{device_type}", network.id),
                hub_name: format!("{}_{device_type}", network.name),
                network_id: network.id.clone(),
                network_name: network.name.clone(),
                device_type,
                devices: RwLock::new(Vec::new()),
                hub_readings: RwLock::new(DeviceReadings::new()),
                discovery_in_progress: AtomicBool::new(false),
                discovery: Mutex::new(DiscoveryState::default()),
                cancel: parent_cancel.child_token(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn hub_id(&self) -> &str {
        &self.inner.hub_id
    }

    pub fn hub_name(&self) -> &str {
        &self.inner.hub_name
    }

    pub fn network_id(&self) -> &str {
        &self.inner.network_id
    }

    pub fn network_name(&self) -> &str {
        &self.inner.network_name
    }

    pub fn device_type(&self) -> DeviceType {
        self.inner.device_type
    }

    pub fn context(&self) -> &Arc<HubContext> {
        &self.inner.ctx
    }

    /// Devices of this hub's family found by the last discovery.
    pub async fn devices(&self) -> Vec<Device> {
        self.inner.devices.read().await.clone()
    }

    pub async fn device_count(&self) -> usize {
        self.inner.devices.read().await.len()
    }

    /// Network-wide readings from the last poll.
    pub async fn hub_readings(&self) -> DeviceReadings {
        self.inner.hub_readings.read().await.clone()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Discover devices, prime the family's data, and start periodic
    /// discovery when it is enabled for this hub.
    pub async fn setup(&self) -> Result<(), CoreError> {
        debug!(hub = %self.inner.hub_name, "setting up network hub");

        self.discover_devices().await?;
        match self.inner.device_type {
            DeviceType::Mr => {
                let payload = self.wireless_payload().await?;
                *self.inner.hub_readings.write().await = transform_ssids(&payload.ssids);
            }
            DeviceType::Ms => {
                self.switch_payload().await?;
            }
            DeviceType::Mt | DeviceType::Mv => {}
        }

        let config = &self.inner.ctx.config;
        if config.hub_auto_discovery(&self.inner.hub_id) {
            let period = Duration::from_secs(config.hub_discovery_interval(&self.inner.hub_id));
            if !period.is_zero() {
                debug!(
                    hub = %self.inner.hub_name,
                    every_secs = period.as_secs(),
                    "scheduling periodic discovery"
                );
                let hub = self.clone();
                let cancel = self.inner.cancel.clone();
                self.inner
                    .task_handles
                    .lock()
                    .await
                    .push(tokio::spawn(discovery_task(hub, period, cancel)));
            }
        }

        info!(
            hub = %self.inner.hub_name,
            devices = self.device_count().await,
            "network hub ready"
        );
        Ok(())
    }

    /// Stop periodic discovery and forget this hub's event history.
    pub async fn unload(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        for device in self.inner.devices.read().await.iter() {
            self.inner.ctx.events.clear_device_history(&device.serial);
        }
        debug!(hub = %self.inner.hub_name, "network hub unloaded");
    }

    // ── Discovery ────────────────────────────────────────────────────

    /// Refresh the device list. Returns `false` when the run was skipped
    /// because another run is in flight or the last one was too recent.
    pub async fn discover_devices(&self) -> Result<bool, CoreError> {
        if self
            .inner
            .discovery_in_progress
            .swap(true, Ordering::SeqCst)
        {
            debug!(hub = %self.inner.hub_name, "discovery already in progress, skipping");
            return Ok(false);
        }
        let _guard = DiscoveryGuard(&self.inner.discovery_in_progress);

        if let Some(last) = self.inner.discovery.lock().await.last_run {
            let since = last.elapsed();
            if since < MIN_DISCOVERY_GAP {
                debug!(
                    hub = %self.inner.hub_name,
                    since_secs = since.as_secs(),
                    "discovery rate limited"
                );
                return Ok(false);
            }
        }

        let started = Instant::now();
        let ctx = &self.inner.ctx;
        let device_type = self.inner.device_type;
        let cache_key = devices_cache_key(&self.inner.network_id, device_type);

        let typed: Vec<Device> = if let Some(cached) = ctx.cache.get_as(&cache_key) {
            debug!(hub = %self.inner.hub_name, "using cached device list");
            cached
        } else {
            let network_id = self.inner.network_id.as_str();
            let all = ctx
                .call("getNetworkDevices", RetryStrategy::Discovery, || {
                    ctx.client.get_network_devices(network_id)
                })
                .await?;
            let typed: Vec<Device> = all
                .into_iter()
                .filter(|d| device_type.matches_model(&d.model))
                .collect();
            ctx.cache.insert_as(cache_key, &typed, DISCOVERY_CACHE_TTL);
            typed
        };

        let selected: Vec<Device> = typed
            .into_iter()
            .filter(|d| ctx.config.is_device_selected(&d.serial))
            .collect();

        let mut devices = self.inner.devices.write().await;
        if devices.len() != selected.len() {
            info!(
                hub = %self.inner.hub_name,
                before = devices.len(),
                after = selected.len(),
                "device count changed"
            );
        }
        *devices = selected;
        drop(devices);

        let mut state = self.inner.discovery.lock().await;
        state.last_run = Some(Instant::now());
        state.durations.push_back(started.elapsed());
        while state.durations.len() > DISCOVERY_HISTORY {
            state.durations.pop_front();
        }
        Ok(true)
    }

    pub async fn average_discovery_duration(&self) -> Duration {
        let state = self.inner.discovery.lock().await;
        let Ok(count) = u32::try_from(state.durations.len()) else {
            return Duration::ZERO;
        };
        if count == 0 {
            return Duration::ZERO;
        }
        state.durations.iter().sum::<Duration>() / count
    }

    pub async fn status(&self) -> NetworkHubStatus {
        let config = &self.inner.ctx.config;
        let seconds_since_discovery = self
            .inner
            .discovery
            .lock()
            .await
            .last_run
            .map(|t| t.elapsed().as_secs());
        NetworkHubStatus {
            hub_id: self.inner.hub_id.clone(),
            hub_name: self.inner.hub_name.clone(),
            network_id: self.inner.network_id.clone(),
            device_type: self.inner.device_type,
            device_count: self.device_count().await,
            auto_discovery: config.hub_auto_discovery(&self.inner.hub_id),
            discovery_interval_secs: config.hub_discovery_interval(&self.inner.hub_id),
            average_discovery_duration_ms: self.average_discovery_duration().await.as_secs_f64()
                * 1_000.0,
            seconds_since_discovery,
        }
    }

    // ── Polling ──────────────────────────────────────────────────────

    /// Latest readings for every device of this hub, keyed by serial.
    pub async fn get_sensor_data(&self) -> Result<BTreeMap<String, DeviceReadings>, CoreError> {
        match self.inner.device_type {
            DeviceType::Mt => self.sensor_readings().await,
            DeviceType::Mr => self.wireless_readings().await,
            DeviceType::Ms => self.switch_readings().await,
            DeviceType::Mv => Ok(BTreeMap::new()),
        }
    }

    /// Device readings plus the hub's network-wide readings.
    pub async fn poll(&self) -> Result<HubSnapshot, CoreError> {
        let devices = self.get_sensor_data().await?;
        Ok(HubSnapshot {
            devices,
            hub: self.hub_readings().await,
            fetched_at: Some(Utc::now()),
        })
    }

    async fn serials(&self) -> Vec<String> {
        self.inner
            .devices
            .read()
            .await
            .iter()
            .map(|d| d.serial.clone())
            .collect()
    }

    /// Environmental sensors: always fresh, and every poll feeds the event
    /// service so door/water/button transitions are published.
    async fn sensor_readings(&self) -> Result<BTreeMap<String, DeviceReadings>, CoreError> {
        let serials = self.serials().await;
        if serials.is_empty() {
            debug!(hub = %self.inner.hub_name, "no devices to read");
            return Ok(BTreeMap::new());
        }

        let ctx = &self.inner.ctx;
        let org_id = ctx.organization_id.as_str();
        let payload = ctx
            .call(
                "getOrganizationSensorReadingsLatest",
                RetryStrategy::Realtime,
                || {
                    ctx.client
                        .get_organization_sensor_readings_latest(org_id, &serials)
                },
            )
            .await?;

        let mut result = BTreeMap::new();
        for sensor in payload.iter().filter(|s| serials.contains(&s.serial)) {
            let readings = transform_mt_readings(sensor);
            let device_id = format!("{}_{}", ctx.entry_id, sensor.serial);
            let events = ctx
                .events
                .track_sensor_changes(&sensor.serial, &device_id, &readings);
            if !events.is_empty() {
                debug!(serial = %sensor.serial, count = events.len(), "published sensor events");
            }
            result.insert(sensor.serial.clone(), readings);
        }
        debug!(
            hub = %self.inner.hub_name,
            requested = serials.len(),
            received = result.len(),
            "sensor readings fetched"
        );
        Ok(result)
    }

    async fn wireless_readings(&self) -> Result<BTreeMap<String, DeviceReadings>, CoreError> {
        let payload = self.wireless_payload().await?;
        *self.inner.hub_readings.write().await = transform_ssids(&payload.ssids);

        let memory = self.memory_usage().await;
        Ok(payload
            .radios
            .iter()
            .map(|(serial, radio)| {
                let mut readings = transform_mr_device(&radio.status, radio.client_count);
                if let Some(pct) = memory.get(serial) {
                    readings.insert(MrMetric::MemoryUsage, *pct);
                }
                (serial.clone(), readings)
            })
            .collect())
    }

    async fn switch_readings(&self) -> Result<BTreeMap<String, DeviceReadings>, CoreError> {
        let payload = self.switch_payload().await?;
        let memory = self.memory_usage().await;
        Ok(payload
            .ports
            .iter()
            .map(|(serial, ports)| {
                let mut readings = transform_ms_ports(ports);
                let slots = payload
                    .power_modules
                    .get(serial)
                    .map_or(&[][..], Vec::as_slice);
                readings.insert(
                    MsMetric::PowerModuleStatus,
                    operational_power_modules(slots),
                );
                if let Some(pct) = memory.get(serial) {
                    readings.insert(MsMetric::MemoryUsage, *pct);
                }
                (serial.clone(), readings)
            })
            .collect())
    }

    /// SSIDs plus per-radio status and client counts.
    async fn wireless_payload(&self) -> Result<WirelessPayload, CoreError> {
        let ctx = &self.inner.ctx;
        let cache_key = format!("wireless_data_{}", self.inner.network_id);
        if let Some(cached) = ctx.cache.get_as::<WirelessPayload>(&cache_key) {
            return Ok(cached);
        }

        let network_id = self.inner.network_id.as_str();
        let ssids = match ctx
            .call("getNetworkWirelessSsids", RetryStrategy::Default, || {
                ctx.client.get_network_wireless_ssids(network_id)
            })
            .await
        {
            Ok(ssids) => ssids,
            Err(e) => {
                warn!(hub = %self.inner.hub_name, error = %e, "could not fetch SSIDs");
                Vec::new()
            }
        };

        let serials = self.serials().await;
        let calls: Vec<_> = serials
            .iter()
            .map(|serial| async move {
                let status = ctx
                    .call("getDeviceWirelessStatus", RetryStrategy::Default, || {
                        ctx.client.get_device_wireless_status(serial)
                    })
                    .await?;
                let clients = ctx
                    .call("getDeviceClients", RetryStrategy::Default, || {
                        ctx.client.get_device_clients(serial, CLIENT_TIMESPAN_SECS)
                    })
                    .await
                    .map(|c| c.len())
                    .unwrap_or_else(|e| {
                        debug!(serial = %serial, error = %e, "client list unavailable");
                        0
                    });
                Ok::<_, meraki_api::Error>((serial.clone(), status, clients))
            })
            .collect();

        let mut payload = WirelessPayload {
            ssids,
            radios: BTreeMap::new(),
        };
        let mut last_error = None;
        for outcome in batch_async(calls, BatchConfig::default()).await {
            match outcome {
                Ok((serial, status, client_count)) => {
                    payload.radios.insert(
                        serial,
                        RadioPayload {
                            status,
                            client_count,
                        },
                    );
                }
                Err(e) => {
                    debug!(hub = %self.inner.hub_name, error = %e, "wireless status unavailable");
                    last_error = Some(e);
                }
            }
        }

        if let Some(e) = last_error.filter(|_| payload.radios.is_empty()) {
            return Err(e.into());
        }
        ctx.cache.insert_as(cache_key, &payload, DATA_CACHE_TTL);
        Ok(payload)
    }

    /// Port statuses per switch.
    async fn switch_payload(&self) -> Result<SwitchPayload, CoreError> {
        let ctx = &self.inner.ctx;
        let cache_key = format!("switch_data_{}", self.inner.network_id);
        if let Some(cached) = ctx.cache.get_as::<SwitchPayload>(&cache_key) {
            return Ok(cached);
        }

        let serials = self.serials().await;
        let calls: Vec<_> = serials
            .iter()
            .map(|serial| async move {
                let ports = ctx
                    .call(
                        "getDeviceSwitchPortsStatuses",
                        RetryStrategy::Default,
                        || ctx.client.get_device_switch_ports_statuses(serial),
                    )
                    .await;
                (serial.clone(), ports)
            })
            .collect();

        let mut payload = SwitchPayload::default();
        let mut last_error = None;
        for (serial, outcome) in batch_async(calls, BatchConfig::default()).await {
            match outcome {
                Ok(ports) => {
                    payload.ports.insert(serial, ports);
                }
                Err(e) => {
                    debug!(serial = %serial, error = %e, "port statuses unavailable");
                    last_error = Some(e);
                }
            }
        }

        if let Some(e) = last_error.filter(|_| payload.ports.is_empty()) {
            return Err(e.into());
        }

        // Missing power-module data only zeroes that one metric.
        let org_id = ctx.organization_id.as_str();
        match ctx
            .call(
                "getOrganizationDevicesPowerModulesStatusesByDevice",
                RetryStrategy::Default,
                || {
                    ctx.client
                        .get_organization_devices_power_modules_statuses(org_id, &serials)
                },
            )
            .await
        {
            Ok(devices) => {
                payload.power_modules = devices.into_iter().map(|d| (d.serial, d.slots)).collect();
            }
            Err(e) => debug!(hub = %self.inner.hub_name, error = %e, "power modules unavailable"),
        }
        ctx.cache.insert_as(cache_key, &payload, DATA_CACHE_TTL);
        Ok(payload)
    }

    /// Memory use per serial of this hub. Failures only cost the metric.
    async fn memory_usage(&self) -> BTreeMap<String, f64> {
        let serials = self.serials().await;
        if serials.is_empty() {
            return BTreeMap::new();
        }
        let ctx = &self.inner.ctx;
        let org_id = ctx.organization_id.as_str();
        match ctx
            .call(
                "getOrganizationDevicesMemoryUsage",
                RetryStrategy::Default,
                || {
                    ctx.client
                        .get_organization_devices_memory_usage(org_id, MEMORY_TIMESPAN_SECS)
                },
            )
            .await
        {
            Ok(usages) => usages
                .iter()
                .filter(|u| serials.contains(&u.serial))
                .filter_map(|u| Some((u.serial.clone(), memory_usage_percent(u)?)))
                .collect(),
            Err(e) => {
                debug!(hub = %self.inner.hub_name, error = %e, "memory usage unavailable");
                BTreeMap::new()
            }
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────────

async fn discovery_task(hub: NetworkHub, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = hub.discover_devices().await {
                    warn!(hub = %hub.hub_name(), error = %e, "periodic discovery failed");
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cache_keys_name_network_and_family() {
        assert_eq!(devices_cache_key("N_1", DeviceType::Mt), "devices_N_1_MT");
    }

    #[test]
    fn discovery_guard_resets_flag() {
        let flag = AtomicBool::new(true);
        {
            let _guard = DiscoveryGuard(&flag);
        }
        assert!(!flag.load(Ordering::SeqCst));
    }
}

// ── Sensor coordinator ──
//
// Periodic poller for one network hub. Publishes each successful poll on a
// `watch` channel and records whether the last poll succeeded. Consumers
// can ask for an immediate or a delayed refresh. Power readings are
// integrated into daily energy before a snapshot goes out.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use meraki_config::MerakiConfigSchema;
use serde::Serialize;
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::energy::EnergyTracker;
use crate::error::CoreError;
use crate::hub::{HubSnapshot, NetworkHub};
use crate::model::DeviceType;

/// Delay used by [`SensorCoordinator::request_delayed_refresh`] callers
/// that have no better value.
pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_secs(5);

/// Poll interval for a hub: the per-hub override, else the family default
/// for environmental sensors, else the entry-wide scan interval.
pub fn scan_interval_for(
    config: &MerakiConfigSchema,
    hub_id: &str,
    device_type: DeviceType,
) -> Duration {
    if let Some(secs) = config.hub_scan_interval(hub_id) {
        return Duration::from_secs(secs);
    }
    match device_type {
        DeviceType::Mt => device_type.default_scan_interval(),
        _ => Duration::from_secs(config.scan_interval),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoordinatorStatus {
    pub name: String,
    pub hub_id: String,
    pub update_interval_secs: u64,
    pub last_update_success: bool,
    pub last_update: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Cheaply cloneable handle to a hub's poller.
#[derive(Debug, Clone)]
pub struct SensorCoordinator {
    inner: Arc<CoordinatorInner>,
}

#[derive(Debug)]
struct CoordinatorInner {
    name: String,
    hub: NetworkHub,
    update_interval: Duration,
    data: watch::Sender<Arc<HubSnapshot>>,
    energy: EnergyTracker,
    last_update_success: AtomicBool,
    last_update: Mutex<Option<DateTime<Utc>>>,
    last_error: Mutex<Option<String>>,
    refresh_requested: Notify,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl SensorCoordinator {
    pub fn new(hub: NetworkHub, config: &MerakiConfigSchema) -> Self {
        let update_interval = scan_interval_for(config, hub.hub_id(), hub.device_type());
        Self::with_interval(hub, update_interval)
    }

    pub fn with_interval(hub: NetworkHub, update_interval: Duration) -> Self {
        let (data, _) = watch::channel(Arc::new(HubSnapshot::default()));
        debug!(
            hub = %hub.hub_name(),
            interval_secs = update_interval.as_secs(),
            "creating sensor coordinator"
        );
        Self {
            inner: Arc::new(CoordinatorInner {
                name: format!("meraki_dashboard_{}", hub.hub_name()),
                hub,
                update_interval,
                data,
                energy: EnergyTracker::new(),
                last_update_success: AtomicBool::new(false),
                last_update: Mutex::new(None),
                last_error: Mutex::new(None),
                refresh_requested: Notify::new(),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn hub(&self) -> &NetworkHub {
        &self.inner.hub
    }

    pub fn update_interval(&self) -> Duration {
        self.inner.update_interval
    }

    pub fn last_update_success(&self) -> bool {
        self.inner.last_update_success.load(Ordering::SeqCst)
    }

    /// Latest successful poll.
    pub fn data(&self) -> Arc<HubSnapshot> {
        self.inner.data.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<HubSnapshot>> {
        self.inner.data.subscribe()
    }

    pub async fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            name: self.inner.name.clone(),
            hub_id: self.inner.hub.hub_id().to_owned(),
            update_interval_secs: self.inner.update_interval.as_secs(),
            last_update_success: self.last_update_success(),
            last_update: *self.inner.last_update.lock().await,
            last_error: self.inner.last_error.lock().await.clone(),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Poll once now, then keep polling every interval until shutdown.
    ///
    /// A failing first poll is returned but the task still starts, so the
    /// hub recovers on its own once the Dashboard answers again.
    pub async fn start(&self) -> Result<(), CoreError> {
        let first = self.refresh().await;
        let coordinator = self.clone();
        let cancel = self.inner.cancel.clone();
        self.inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(poll_task(coordinator, cancel)));
        info!(
            coordinator = %self.inner.name,
            interval_secs = self.inner.update_interval.as_secs(),
            "sensor coordinator started"
        );
        first
    }

    /// Poll the hub and publish the result.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        match self.inner.hub.poll().await {
            Ok(mut snapshot) => {
                let now = snapshot.fetched_at.unwrap_or_else(Utc::now);
                self.inner
                    .energy
                    .integrate(&mut snapshot.devices, Local::now().date_naive());
                debug!(
                    coordinator = %self.inner.name,
                    devices = snapshot.devices.len(),
                    "poll succeeded"
                );
                self.inner.data.send_replace(Arc::new(snapshot));
                self.inner.last_update_success.store(true, Ordering::SeqCst);
                *self.inner.last_update.lock().await = Some(now);
                *self.inner.last_error.lock().await = None;
                Ok(())
            }
            Err(e) => {
                let err = CoreError::update_failed(&e);
                warn!(coordinator = %self.inner.name, error = %err, "poll failed");
                self.inner
                    .last_update_success
                    .store(false, Ordering::SeqCst);
                *self.inner.last_error.lock().await = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Ask the poll task for an immediate refresh.
    pub fn request_refresh(&self) {
        self.inner.refresh_requested.notify_one();
    }

    /// Ask for a refresh after `delay`, e.g. to let a device settle.
    pub async fn request_delayed_refresh(&self, delay: Duration) {
        let coordinator = self.clone();
        let cancel = self.inner.cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => coordinator.request_refresh(),
            }
        });
        let mut handles = self.inner.task_handles.lock().await;
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Stop polling and wait for the task to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!(coordinator = %self.inner.name, "sensor coordinator stopped");
    }
}

// ── Background task ──────────────────────────────────────────────────

async fn poll_task(coordinator: SensorCoordinator, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(coordinator.inner.update_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = coordinator.inner.refresh_requested.notified() => {
                let _ = coordinator.refresh().await;
                interval.reset();
            }
            _ = interval.tick() => {
                let _ = coordinator.refresh().await;
            }
        }
    }
}

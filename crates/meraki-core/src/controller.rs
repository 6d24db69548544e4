// ── Controller abstraction ──
//
// Lifecycle of one config entry: validate, connect, build the hub tree,
// start the coordinators, and keep the entity store in step with them.

use std::sync::Arc;

use meraki_api::models::Organization;
use meraki_api::{MerakiClient, TransportConfig};
use meraki_config::{ConfigMap, MerakiConfigSchema, validate_config_migration};
use secrecy::SecretString;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::coordinator::{DEFAULT_REFRESH_DELAY, SensorCoordinator};
use crate::entity::{
    Entity, EntityContext, create_entities, create_hub_entities, create_organization_entities,
};
use crate::error::CoreError;
use crate::events::{EventService, MerakiEvent, OrganizationEventData};
use crate::hub::{HubContext, HubSnapshot, NetworkHub, OrganizationHub};
use crate::model::{ConfigEntry, EntryState};
use crate::store::EntityStore;

/// Build a Dashboard client for a validated schema.
pub fn build_client(
    schema: &MerakiConfigSchema,
    transport: &TransportConfig,
) -> Result<MerakiClient, CoreError> {
    let api_key = SecretString::from(schema.api_key.clone());
    Ok(MerakiClient::from_api_key(
        &schema.base_url,
        &api_key,
        transport,
    )?)
}

/// Pick the organization an entry without an explicit id should use.
///
/// The first organization the key can see wins; an empty list is an error.
pub async fn resolve_organization(client: &MerakiClient) -> Result<Organization, CoreError> {
    let mut organizations = client.get_organizations().await?;
    if organizations.is_empty() {
        return Err(CoreError::NoOrganizations);
    }
    if organizations.len() > 1 {
        info!(
            count = organizations.len(),
            "API key sees several organizations, using the first"
        );
    }
    Ok(organizations.remove(0))
}

/// Outcome of a manual refresh or discovery run across every hub.
#[derive(Debug, Default)]
pub struct HubRunReport {
    pub hubs: usize,
    /// Hubs that skipped the run (discovery in flight or too recent).
    pub skipped: usize,
    /// Hub name and error of every hub that failed.
    pub failures: Vec<(String, CoreError)>,
}

impl HubRunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

// ── Controller ───────────────────────────────────────────────────

/// Owner of one config entry's hubs, coordinators and entities.
///
/// Cheaply cloneable via `Arc<ControllerInner>`.
#[derive(Debug, Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

#[derive(Debug)]
struct ControllerInner {
    entry: Mutex<ConfigEntry>,
    transport: TransportConfig,
    /// Used instead of a client built from the entry when set.
    client: Option<MerakiClient>,
    events: Arc<EventService>,
    store: Arc<EntityStore>,
    state: watch::Sender<EntryState>,
    runtime: Mutex<Option<Runtime>>,
}

/// Everything that exists only while the entry is loaded.
#[derive(Debug)]
struct Runtime {
    schema: Arc<MerakiConfigSchema>,
    org_hub: OrganizationHub,
    coordinators: Vec<SensorCoordinator>,
    cancel: CancellationToken,
    task_handles: Vec<JoinHandle<()>>,
}

impl Controller {
    /// Create a controller for `entry`. Does NOT connect; call
    /// [`setup()`](Self::setup).
    pub fn new(entry: ConfigEntry, transport: TransportConfig) -> Self {
        Self::build(entry, transport, None)
    }

    /// Create a controller that talks through `client` (a proxy, a mock
    /// server) rather than the entry's base URL.
    pub fn with_client(entry: ConfigEntry, client: MerakiClient) -> Self {
        Self::build(entry, TransportConfig::default(), Some(client))
    }

    fn build(entry: ConfigEntry, transport: TransportConfig, client: Option<MerakiClient>) -> Self {
        let (state, _) = watch::channel(EntryState::NotLoaded);
        Self {
            inner: Arc::new(ControllerInner {
                entry: Mutex::new(entry),
                transport,
                client,
                events: Arc::new(EventService::new()),
                store: Arc::new(EntityStore::new()),
                state,
                runtime: Mutex::new(None),
            }),
        }
    }

    pub async fn entry(&self) -> ConfigEntry {
        let mut entry = self.inner.entry.lock().await.clone();
        entry.state = self.state();
        entry
    }

    pub fn state(&self) -> EntryState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<EntryState> {
        self.inner.state.subscribe()
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.inner.store
    }

    pub fn events(&self) -> broadcast::Receiver<MerakiEvent> {
        self.inner.events.subscribe()
    }

    pub fn organization_events(&self) -> broadcast::Receiver<OrganizationEventData> {
        self.inner.events.subscribe_organization()
    }

    pub fn event_service(&self) -> &Arc<EventService> {
        &self.inner.events
    }

    pub async fn organization_hub(&self) -> Option<OrganizationHub> {
        self.inner
            .runtime
            .lock()
            .await
            .as_ref()
            .map(|rt| rt.org_hub.clone())
    }

    pub async fn coordinators(&self) -> Vec<SensorCoordinator> {
        self.inner
            .runtime
            .lock()
            .await
            .as_ref()
            .map(|rt| rt.coordinators.clone())
            .unwrap_or_default()
    }

    /// The validated schema of the loaded entry.
    pub async fn schema(&self) -> Option<Arc<MerakiConfigSchema>> {
        self.inner
            .runtime
            .lock()
            .await
            .as_ref()
            .map(|rt| Arc::clone(&rt.schema))
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Load the entry. Setup either fully succeeds or leaves nothing
    /// running behind.
    ///
    /// Bad credentials and invalid config put the entry in `SetupError`;
    /// anything else in `SetupRetry`.
    pub async fn setup(&self) -> Result<(), CoreError> {
        if self.inner.runtime.lock().await.is_some() {
            debug!("entry already loaded");
            return Ok(());
        }

        let started = Instant::now();
        match self.build_runtime().await {
            Ok(runtime) => {
                info!(
                    hubs = runtime.coordinators.len(),
                    entities = self.inner.store.len(),
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Meraki Dashboard entry loaded"
                );
                *self.inner.runtime.lock().await = Some(runtime);
                self.inner.state.send_replace(EntryState::Loaded);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to set up Meraki Dashboard entry");
                let state = match e {
                    CoreError::AuthenticationFailed { .. }
                    | CoreError::Validation { .. }
                    | CoreError::NoOrganizations => EntryState::SetupError,
                    _ => EntryState::SetupRetry,
                };
                self.inner.state.send_replace(state);
                Err(e)
            }
        }
    }

    /// Stop every task and drop the hub tree. Entities are cleared.
    pub async fn unload(&self) {
        let Some(runtime) = self.inner.runtime.lock().await.take() else {
            return;
        };
        debug!("unloading entry");

        runtime.cancel.cancel();
        for handle in runtime.task_handles {
            let _ = handle.await;
        }
        for coordinator in &runtime.coordinators {
            coordinator.shutdown().await;
        }
        runtime.org_hub.unload().await;

        self.inner.store.clear();
        self.inner.state.send_replace(EntryState::NotLoaded);
        info!("entry unloaded");
    }

    pub async fn reload(&self) -> Result<(), CoreError> {
        self.unload().await;
        self.setup().await
    }

    /// Replace the entry's options.
    ///
    /// The merged entry must pass the migration check (identity keys are
    /// fixed, the result validates). A loaded entry is reloaded.
    pub async fn update_options(&self, options: ConfigMap) -> Result<(), CoreError> {
        {
            let mut entry = self.inner.entry.lock().await;
            let old = flatten(&entry.data, &entry.options);
            let new = flatten(&entry.data, &options);
            validate_config_migration(&old, &new)?;
            entry.options = options;
        }
        info!("entry options updated");

        if self.state() == EntryState::Loaded {
            self.reload().await?;
        }
        Ok(())
    }

    async fn loaded(&self) -> Result<(OrganizationHub, Vec<SensorCoordinator>), CoreError> {
        let runtime = self.inner.runtime.lock().await;
        let rt = runtime.as_ref().ok_or_else(|| CoreError::NotReady {
            message: "entry is not loaded".into(),
        })?;
        Ok((rt.org_hub.clone(), rt.coordinators.clone()))
    }

    /// Refresh every tier and poll every hub right now.
    ///
    /// A failing hub does not stop the others; its error lands in the
    /// report.
    pub async fn refresh_all(&self) -> Result<HubRunReport, CoreError> {
        let (org_hub, coordinators) = self.loaded().await?;
        info!(
            hubs = coordinators.len(),
            "manual sensor data update requested"
        );
        org_hub.update_all().await;

        let mut report = HubRunReport {
            hubs: coordinators.len(),
            ..HubRunReport::default()
        };
        for coordinator in &coordinators {
            if let Err(e) = coordinator.refresh().await {
                warn!(hub = %coordinator.hub().hub_name(), error = %e, "manual refresh failed");
                report
                    .failures
                    .push((coordinator.hub().hub_name().to_owned(), e));
            }
        }
        Ok(report)
    }

    /// Run device discovery on every network hub, then poll the hubs whose
    /// discovery ran so new devices get their entities.
    pub async fn discover_all(&self) -> Result<HubRunReport, CoreError> {
        let (_, coordinators) = self.loaded().await?;
        info!(
            hubs = coordinators.len(),
            "manual device discovery requested"
        );

        let mut report = HubRunReport {
            hubs: coordinators.len(),
            ..HubRunReport::default()
        };
        for coordinator in &coordinators {
            let hub = coordinator.hub();
            let outcome = match hub.discover_devices().await {
                Ok(true) => coordinator.refresh().await,
                Ok(false) => {
                    report.skipped += 1;
                    Ok(())
                }
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                warn!(hub = %hub.hub_name(), error = %e, "manual discovery failed");
                report.failures.push((hub.hub_name().to_owned(), e));
            }
        }
        info!(
            hubs = report.hubs,
            skipped = report.skipped,
            failed = report.failures.len(),
            "device discovery complete"
        );
        Ok(report)
    }

    // ── Setup internals ──────────────────────────────────────────

    async fn build_runtime(&self) -> Result<Runtime, CoreError> {
        let entry = self.inner.entry.lock().await.clone();
        let mut schema = entry.schema()?;
        let client = match &self.inner.client {
            Some(client) => client.clone(),
            None => build_client(&schema, &self.inner.transport)?,
        };

        if schema.organization_id.is_empty() {
            let organization = resolve_organization(&client).await?;
            info!(organization = %organization.name, id = %organization.id, "resolved organization");
            schema.organization_id = organization.id;
        }
        info!(organization = %schema.organization_id, "setting up Meraki Dashboard entry");

        let schema = Arc::new(schema);
        let ctx = Arc::new(HubContext::new(
            entry.entry_id.clone(),
            client,
            Arc::clone(&schema),
            Arc::clone(&self.inner.events),
        ));
        let org_hub = OrganizationHub::new(ctx);
        org_hub.setup().await?;

        let hubs = org_hub.create_network_hubs().await;
        if hubs.is_empty() {
            warn!("no network hubs were created, no compatible devices found");
        }

        let mut coordinators = Vec::new();
        for hub in hubs {
            if hub.device_count().await == 0 {
                continue;
            }
            let coordinator = SensorCoordinator::new(hub, &schema);
            coordinators.push(coordinator.clone());
            if let Err(e) = coordinator.start().await {
                for c in &coordinators {
                    c.shutdown().await;
                }
                org_hub.unload().await;
                return Err(e);
            }
            coordinator
                .request_delayed_refresh(DEFAULT_REFRESH_DELAY)
                .await;
            info!(
                hub = %coordinator.hub().hub_name(),
                devices = coordinator.hub().device_count().await,
                interval_secs = coordinator.update_interval().as_secs(),
                "created coordinator"
            );
        }

        let entity_ctx = EntityContext {
            entry_id: entry.entry_id.clone(),
            organization_id: Some(schema.organization_id.clone()),
            base_url: Some(schema.base_url.clone()),
            network_id: None,
        };
        let org_name = org_hub
            .organization_name()
            .await
            .unwrap_or_else(|| entry.title.clone());

        let mut entities = create_organization_entities(
            org_hub.organization_id(),
            &org_name,
            &org_hub.readings().await,
            &entity_ctx,
        );
        for coordinator in &coordinators {
            let snapshot = coordinator.data();
            entities.extend(hub_entities(coordinator.hub(), &snapshot, &entity_ctx).await);
        }
        self.inner.store.replace_all(entities);

        let cancel = CancellationToken::new();
        let mut task_handles = Vec::with_capacity(coordinators.len() + 1);
        for coordinator in &coordinators {
            task_handles.push(tokio::spawn(hub_sync_task(
                coordinator.clone(),
                Arc::clone(&self.inner.store),
                entity_ctx.clone(),
                cancel.clone(),
            )));
        }
        task_handles.push(tokio::spawn(organization_sync_task(
            org_hub.clone(),
            Arc::clone(&self.inner.store),
            cancel.clone(),
        )));

        Ok(Runtime {
            schema,
            org_hub,
            coordinators,
            cancel,
            task_handles,
        })
    }
}

fn flatten(data: &ConfigMap, options: &ConfigMap) -> ConfigMap {
    let mut flat = data.clone();
    flat.extend(options.iter().map(|(k, v)| (k.clone(), v.clone())));
    flat
}

/// Device and network-wide entities of one hub, given its latest poll.
async fn hub_entities(
    hub: &NetworkHub,
    snapshot: &HubSnapshot,
    ctx: &EntityContext,
) -> Vec<Entity> {
    let ctx = ctx.clone().with_network(hub.network_id());
    let mut entities: Vec<Entity> = hub
        .devices()
        .await
        .iter()
        .flat_map(|device| create_entities(device, snapshot.devices.get(&device.serial), &ctx))
        .collect();
    entities.extend(create_hub_entities(
        hub.network_id(),
        hub.hub_name(),
        hub.device_type(),
        &snapshot.hub,
        &ctx,
    ));
    entities
}

// ── Background tasks ─────────────────────────────────────────────

/// Push each coordinator poll into the store. Devices discovered after
/// setup get their entities on the first poll that has readings for them.
async fn hub_sync_task(
    coordinator: SensorCoordinator,
    store: Arc<EntityStore>,
    ctx: EntityContext,
    cancel: CancellationToken,
) {
    let mut rx = coordinator.subscribe();
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                let hub = coordinator.hub();
                let added = store.add_missing(hub_entities(hub, &snapshot, &ctx).await);
                let updated = store.apply_hub_snapshot(hub.hub_id(), &snapshot);
                debug!(hub = %hub.hub_name(), added, updated, "entity states refreshed");
            }
        }
    }
}

async fn organization_sync_task(
    org_hub: OrganizationHub,
    store: Arc<EntityStore>,
    cancel: CancellationToken,
) {
    let mut rx = org_hub.subscribe();
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                rx.borrow_and_update();
                let readings = org_hub.readings().await;
                store.apply_organization_readings(org_hub.organization_id(), &readings);
            }
        }
    }
}

//! Polling and entity layer between `meraki-api` and the `meraki-dash` CLI.
//!
//! This crate turns a validated config entry into a running tree of hubs
//! and keeps a reactive set of entities up to date:
//!
//! - **[`Controller`]**: lifecycle of one config entry.
//!   [`setup()`](Controller::setup) connects, builds the organization hub
//!   and its network hubs, starts one [`SensorCoordinator`] per hub and
//!   fills the [`EntityStore`]. [`update_options()`](Controller::update_options)
//!   runs the migration check before reloading.
//!
//! - **Hubs** ([`hub`]): [`OrganizationHub`] owns org-wide data on three
//!   refresh tiers (licenses, device statuses, clients and events).
//!   [`NetworkHub`] covers one (network, device family) pair, discovers its
//!   devices and reads their metrics.
//!
//! - **Entities** ([`entity`]): a compile-time registry maps each
//!   (device family, metric) pair to the factory that builds its entity.
//!
//! - **Events** ([`events`]): sensor state changes (door, water, button)
//!   and Dashboard organization events, published on broadcast channels.
//!
//! - **Plumbing**: [`retry`] policies, [`batch`] helpers that pace calls
//!   under the Dashboard rate limit, and a TTL [`cache`].

pub mod batch;
pub mod cache;
pub mod capabilities;
pub mod controller;
pub mod coordinator;
pub mod diagnostics;
pub mod energy;
pub mod entity;
pub mod error;
pub mod events;
pub mod hub;
pub mod model;
pub mod retry;
pub mod sanitize;
pub mod store;
pub mod transform;

// ── Primary re-exports ──────────────────────────────────────────────
pub use controller::{Controller, HubRunReport, build_client, resolve_organization};
pub use coordinator::{CoordinatorStatus, SensorCoordinator};
pub use diagnostics::Diagnostics;
pub use entity::{Entity, EntityContext, EntityDescription, Platform};
pub use error::{CoreError, FlowErrorCode};
pub use events::{EventFilter, EventKind, EventService, MerakiEvent, OrganizationEventData};
pub use hub::{HubSnapshot, NetworkHub, OrganizationHub};
pub use store::{EntityCounts, EntityStore};

pub use model::{
    ConfigEntry, DeviceInfo, DeviceReadings, DeviceType, EntryState, Metric, MetricValue, MrMetric,
    MsMetric, MtMetric, OrgMetric,
};

//! Sensor state-change events.
//!
//! The environmental-sensor hub feeds each poll's readings through
//! [`EventService::track_sensor_changes`]. The service remembers the last
//! value of every event-capable metric (button, door, water) per device and
//! publishes a [`MerakiEvent`] on a `tokio::sync::broadcast` channel when a
//! value changes after it has been seen at least once. A per-device throttle
//! keeps flapping sensors from flooding subscribers.
//!
//! Organization events fetched by the dynamic tier go out unthrottled on a
//! second channel as [`OrganizationEventData`].

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use strum::{Display, EnumString};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use meraki_api::models::OrganizationEvent;

use crate::model::{DeviceReadings, Metric, MetricValue, MtMetric};

/// Event type name on the host bus.
pub const EVENT_TYPE: &str = "meraki_dashboard_event";
pub const ORGANIZATION_EVENT_TYPE: &str = "meraki_dashboard_organization_event";

/// Dashboard event types that count toward the alerts sensor.
pub const ALERT_EVENT_TYPES: [&str; 5] = [
    "device_went_offline",
    "device_came_online",
    "device_alert",
    "sensor_alert",
    "gateway_alert",
];

const DEFAULT_CAPACITY: usize = 256;
const DEFAULT_THROTTLE: Duration = Duration::from_millis(500);
const THROTTLE_CLEANUP_THRESHOLD: usize = 1000;
const THROTTLE_MAX_AGE: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    ButtonPressed,
    ButtonReleased,
    DoorOpened,
    DoorClosed,
    WaterDetected,
    WaterCleared,
    StateChanged,
}

impl EventKind {
    /// Classify a new value of an event metric.
    pub fn for_change(metric: MtMetric, value: &MetricValue) -> Self {
        let on = value.is_on();
        match metric {
            MtMetric::Button if on => Self::ButtonPressed,
            MtMetric::Button => Self::ButtonReleased,
            MtMetric::Door if on => Self::DoorOpened,
            MtMetric::Door => Self::DoorClosed,
            MtMetric::Water if on => Self::WaterDetected,
            MtMetric::Water => Self::WaterCleared,
            _ => Self::StateChanged,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerakiEvent {
    pub event_type: EventKind,
    /// Registry identifier of the device.
    pub device_id: String,
    pub device_serial: String,
    pub sensor_type: &'static str,
    pub value: MetricValue,
    pub previous_value: MetricValue,
    pub timestamp: DateTime<Utc>,
}

/// One Dashboard organization event as published to subscribers. Absent
/// fields are left out of the serialized payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrganizationEventData {
    pub organization_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_description: Option<String>,
}

impl OrganizationEventData {
    pub fn from_api(
        organization_id: &str,
        organization_name: Option<&str>,
        event: &OrganizationEvent,
    ) -> Self {
        Self {
            organization_id: organization_id.to_owned(),
            organization_name: organization_name.map(str::to_owned),
            event_type: event.event_type.clone(),
            event_description: event.event_description.clone(),
            timestamp: event.timestamp.clone(),
            network_id: event.network_id.clone(),
            device_serial: event.device_serial.clone(),
            device_name: event.device_name.clone(),
            client_id: event.client_id.clone(),
            client_description: event.client_description.clone(),
        }
    }

    /// Whether the Dashboard event type is one of [`ALERT_EVENT_TYPES`].
    pub fn is_alert(&self) -> bool {
        is_alert_event(self.event_type.as_deref())
    }
}

pub fn is_alert_event(event_type: Option<&str>) -> bool {
    event_type.is_some_and(|t| ALERT_EVENT_TYPES.iter().any(|a| a.eq_ignore_ascii_case(t)))
}

// ── Filtering ────────────────────────────────────────────────────────

/// Allow-lists; `None` means "any".
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    event_types: Option<HashSet<EventKind>>,
    device_serials: Option<HashSet<String>>,
    sensor_types: Option<HashSet<String>>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn event_types(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        self.event_types = Some(kinds.into_iter().collect());
        self
    }

    #[must_use]
    pub fn device_serials(mut self, serials: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.device_serials = Some(serials.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn sensor_types(mut self, sensors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.sensor_types = Some(sensors.into_iter().map(Into::into).collect());
        self
    }

    pub fn matches(&self, event: &MerakiEvent) -> bool {
        self.event_types
            .as_ref()
            .is_none_or(|set| set.contains(&event.event_type))
            && self
                .device_serials
                .as_ref()
                .is_none_or(|set| set.contains(&event.device_serial))
            && self
                .sensor_types
                .as_ref()
                .is_none_or(|set| set.contains(event.sensor_type))
    }
}

// ── Throttling ───────────────────────────────────────────────────────

#[derive(Debug)]
pub struct EventThrottle {
    min_interval: Duration,
    last_seen: DashMap<String, Instant>,
}

impl Default for EventThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE)
    }
}

impl EventThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_seen: DashMap::new(),
        }
    }

    /// `true` (and the key is stamped) unless `key` fired within the window.
    pub fn should_allow(&self, key: &str) -> bool {
        let now = Instant::now();
        if let Some(last) = self.last_seen.get(key) {
            if now.duration_since(*last) < self.min_interval {
                return false;
            }
        }
        self.last_seen.insert(key.to_owned(), now);
        true
    }

    pub fn clear_old_entries(&self, max_age: Duration) {
        let now = Instant::now();
        self.last_seen
            .retain(|_, last| now.duration_since(*last) <= max_age);
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}

// ── Service ──────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct EventService {
    tx: broadcast::Sender<MerakiEvent>,
    org_tx: broadcast::Sender<OrganizationEventData>,
    previous: DashMap<String, MetricValue>,
    throttle: EventThrottle,
}

impl Default for EventService {
    fn default() -> Self {
        Self::new()
    }
}

impl EventService {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        let (org_tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            org_tx,
            previous: DashMap::new(),
            throttle: EventThrottle::default(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MerakiEvent> {
        self.tx.subscribe()
    }

    pub fn subscribe_filtered(&self, filter: EventFilter) -> EventSubscription {
        EventSubscription {
            rx: self.tx.subscribe(),
            filter,
        }
    }

    pub fn subscribe_organization(&self) -> broadcast::Receiver<OrganizationEventData> {
        self.org_tx.subscribe()
    }

    /// Send one organization event. Returns the number of receivers.
    pub fn publish_organization_event(&self, event: OrganizationEventData) -> usize {
        debug!(
            event_type = event.event_type.as_deref().unwrap_or("unknown"),
            "organization event"
        );
        self.org_tx.send(event).unwrap_or(0)
    }

    /// Send one event unless throttled. Returns whether it went out.
    pub fn publish(&self, event: MerakiEvent) -> bool {
        let key = format!("{}:{}", event.event_type, event.device_serial);
        if !self.throttle.should_allow(&key) {
            debug!(key = %key, "event throttled");
            return false;
        }

        match event.event_type {
            EventKind::ButtonPressed => info!(serial = %event.device_serial, "button pressed"),
            EventKind::WaterDetected => info!(serial = %event.device_serial, "water detected"),
            _ => {}
        }

        // No receivers is fine; events are fire-and-forget.
        let _ = self.tx.send(event);

        if self.throttle.len() > THROTTLE_CLEANUP_THRESHOLD {
            self.throttle.clear_old_entries(THROTTLE_MAX_AGE);
        }
        true
    }

    /// Compare a poll's readings against the last seen values and publish
    /// an event for each change. Returns the events that were published.
    pub fn track_sensor_changes(
        &self,
        serial: &str,
        device_id: &str,
        readings: &DeviceReadings,
    ) -> Vec<MerakiEvent> {
        let timestamp = readings.timestamp.unwrap_or_else(Utc::now);
        let mut published = Vec::new();

        for metric in MtMetric::EVENTS {
            let sensor_type = Metric::from(metric).key();
            let Some(value) = readings.get(sensor_type) else {
                continue;
            };
            let key = format!("{serial}_{sensor_type}");
            let previous = self.previous.insert(key, value.clone());

            let Some(previous) = previous.filter(|p| p != value) else {
                continue;
            };
            let event = MerakiEvent {
                event_type: EventKind::for_change(metric, value),
                device_id: device_id.to_owned(),
                device_serial: serial.to_owned(),
                sensor_type,
                value: value.clone(),
                previous_value: previous,
                timestamp,
            };
            if self.publish(event.clone()) {
                published.push(event);
            }
        }

        published
    }

    /// Forget every remembered value of one device.
    pub fn clear_device_history(&self, serial: &str) {
        let prefix = format!("{serial}_");
        self.previous.retain(|key, _| !key.starts_with(&prefix));
    }

    pub fn tracked_count(&self) -> usize {
        self.previous.len()
    }
}

/// A receiver that only yields events passing its filter.
#[derive(Debug)]
pub struct EventSubscription {
    rx: broadcast::Receiver<MerakiEvent>,
    filter: EventFilter,
}

impl EventSubscription {
    /// Next matching event; `None` once the service is gone.
    pub async fn recv(&mut self) -> Option<MerakiEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn door(open: bool) -> DeviceReadings {
        let mut r = DeviceReadings::new();
        r.insert(MtMetric::Door, open);
        r.insert(MtMetric::Temperature, 20.0);
        r
    }

    #[tokio::test(start_paused = true)]
    async fn first_observation_is_silent() {
        let service = EventService::new();
        let mut rx = service.subscribe();
        assert!(
            service
                .track_sensor_changes("Q2", "e_Q2", &door(false))
                .is_empty()
        );
        assert!(
            service
                .track_sensor_changes("Q2", "e_Q2", &door(false))
                .is_empty()
        );
        assert!(rx.try_recv().is_err());
        assert_eq!(service.tracked_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn change_publishes_typed_event() {
        let service = EventService::new();
        let mut rx = service.subscribe();
        service.track_sensor_changes("Q2", "e_Q2", &door(false));

        let events = service.track_sensor_changes("Q2", "e_Q2", &door(true));
        assert_eq!(events.len(), 1);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.event_type, EventKind::DoorOpened);
        assert_eq!(event.sensor_type, "door");
        assert_eq!(event.previous_value, MetricValue::Bool(false));
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_changes_are_throttled() {
        let service = EventService::new();
        service.track_sensor_changes("Q2", "e_Q2", &door(false));
        assert_eq!(
            service
                .track_sensor_changes("Q2", "e_Q2", &door(true))
                .len(),
            1
        );
        assert_eq!(
            service
                .track_sensor_changes("Q2", "e_Q2", &door(false))
                .len(),
            1
        );
        // door_opened again within 500 ms
        assert!(
            service
                .track_sensor_changes("Q2", "e_Q2", &door(true))
                .is_empty()
        );

        tokio::time::advance(Duration::from_millis(600)).await;
        assert_eq!(
            service
                .track_sensor_changes("Q2", "e_Q2", &door(false))
                .len(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn filtered_subscription_skips_other_devices() {
        let service = EventService::new();
        let mut sub = service.subscribe_filtered(
            EventFilter::new()
                .device_serials(["B"])
                .event_types([EventKind::DoorOpened]),
        );
        for serial in ["A", "B"] {
            service.track_sensor_changes(serial, serial, &door(false));
            service.track_sensor_changes(serial, serial, &door(true));
        }
        let event = sub.recv().await.unwrap();
        assert_eq!(event.device_serial, "B");
    }

    #[test]
    fn history_cleared_per_device() {
        let service = EventService::new();
        service.track_sensor_changes("A", "a", &door(true));
        service.track_sensor_changes("AB", "ab", &door(true));
        service.clear_device_history("A");
        assert_eq!(service.tracked_count(), 1);
    }

    #[test]
    fn organization_events_skip_absent_fields() {
        let service = EventService::new();
        let mut rx = service.subscribe_organization();
        let api = OrganizationEvent {
            event_type: Some("Device_Went_Offline".into()),
            device_serial: Some("Q2MR-0000-0001".into()),
            ..OrganizationEvent::default()
        };
        let event = OrganizationEventData::from_api("123", Some("Acme"), &api);
        assert!(event.is_alert());
        assert_eq!(service.publish_organization_event(event), 1);

        let received = rx.try_recv().unwrap();
        let json = serde_json::to_value(&received).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "organization_id": "123",
                "organization_name": "Acme",
                "event_type": "Device_Went_Offline",
                "device_serial": "Q2MR-0000-0001"
            })
        );
        assert!(!is_alert_event(Some("client_connected")));
        assert!(!is_alert_event(None));
    }

    #[test]
    fn event_kinds() {
        assert_eq!(
            EventKind::for_change(MtMetric::Water, &MetricValue::Bool(true)),
            EventKind::WaterDetected
        );
        assert_eq!(
            EventKind::for_change(MtMetric::Button, &MetricValue::Bool(false)),
            EventKind::ButtonReleased
        );
        assert_eq!(
            EventKind::for_change(MtMetric::Battery, &MetricValue::Float(3.0)),
            EventKind::StateChanged
        );
        assert_eq!(EventKind::DoorClosed.to_string(), "door_closed");
    }
}

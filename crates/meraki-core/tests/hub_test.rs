#![allow(clippy::unwrap_used)]
// Integration tests for hubs, coordinators and the controller against a
// mocked Dashboard.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use meraki_api::models::Network;
use meraki_api::{MerakiClient, TransportConfig};
use meraki_config::MerakiConfigSchema;
use meraki_core::events::EventKind;
use meraki_core::hub::HubContext;
use meraki_core::{
    ConfigEntry, Controller, CoreError, DeviceType, EntryState, EventService, NetworkHub,
    OrganizationHub, SensorCoordinator,
};

const KEY: &str = "0123456789abcdef0123456789abcdef01234567";
const ORG: &str = "123456";

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, MerakiClient) {
    let server = MockServer::start().await;
    let secret: secrecy::SecretString = KEY.to_string().into();
    let client =
        MerakiClient::from_api_key(&server.uri(), &secret, &TransportConfig::default()).unwrap();
    (server, client)
}

fn schema() -> MerakiConfigSchema {
    let mut schema = MerakiConfigSchema::with_api_key(KEY);
    schema.organization_id = ORG.to_owned();
    schema.auto_discovery = false;
    schema
}

fn context(client: MerakiClient, schema: MerakiConfigSchema) -> Arc<HubContext> {
    Arc::new(HubContext::new(
        "entry1",
        client,
        Arc::new(schema),
        Arc::new(EventService::new()),
    ))
}

fn network() -> Network {
    serde_json::from_value(json!({ "id": "N_1", "name": "Main Office" })).unwrap()
}

fn devices() -> Value {
    json!([
        { "serial": "Q2MT-0000-0001", "model": "MT10", "name": "Fridge", "networkId": "N_1" },
        { "serial": "Q2MT-0000-0002", "model": "MT20", "name": "Back Door", "networkId": "N_1" },
        { "serial": "Q2MR-0000-0001", "model": "MR46", "name": "Lobby AP", "networkId": "N_1" }
    ])
}

fn readings(door_open: bool) -> Value {
    json!([
        {
            "serial": "Q2MT-0000-0001",
            "network": { "id": "N_1", "name": "Main Office" },
            "readings": [
                { "ts": "2026-10-16T08:00:00Z", "metric": "temperature",
                  "temperature": { "celsius": 4.5, "fahrenheit": 40.1 } },
                { "ts": "2026-10-16T08:00:00Z", "metric": "humidity",
                  "humidity": { "relativePercentage": 61 } }
            ]
        },
        {
            "serial": "Q2MT-0000-0002",
            "network": { "id": "N_1", "name": "Main Office" },
            "readings": [
                { "ts": "2026-10-16T08:00:00Z", "metric": "door", "door": { "open": door_open } }
            ]
        }
    ])
}

async fn mount_organization(server: &MockServer) {
    mount_organization_with(server, json!([{ "id": "N_1", "name": "Main Office" }])).await;
}

async fn mount_organization_with(server: &MockServer, networks: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/organizations/{ORG}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": ORG, "name": "Acme" })),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/organizations/{ORG}/networks")))
        .respond_with(ResponseTemplate::new(200).set_body_json(networks))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/api/v1/organizations/{ORG}/devices/statuses"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "serial": "Q2MT-0000-0001", "status": "online" },
            { "serial": "Q2MT-0000-0002", "status": "offline" },
            { "serial": "Q2MR-0000-0001", "status": "alerting" }
        ])))
        .mount(server)
        .await;
}

async fn mount_sensor_readings(server: &MockServer, door_open: bool, times: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path(format!(
            "/api/v1/organizations/{ORG}/sensor/readings/latest"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(readings(door_open)));
    let mock = match times {
        Some(n) => mock.up_to_n_times(n),
        None => mock,
    };
    mock.mount(server).await;
}

// ── Discovery ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_discovery_filters_by_family_and_selection() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/networks/N_1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(devices()))
        .expect(1)
        .mount(&server)
        .await;

    let mut schema = schema();
    schema.selected_devices = vec!["Q2MT-0000-0002".into()];
    let ctx = context(client, schema);
    let hub = NetworkHub::new(ctx, &network(), DeviceType::Mt, &CancellationToken::new());

    assert_eq!(hub.hub_id(), "N_1_MT");
    assert_eq!(hub.hub_name(), "Main Office_MT");
    assert!(hub.discover_devices().await.unwrap());
    let found = hub.devices().await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].serial, "Q2MT-0000-0002");

    // A second run inside the minimum gap is skipped without a request.
    assert!(!hub.discover_devices().await.unwrap());
    hub.unload().await;
}

#[tokio::test]
async fn test_switch_poll_counts_working_power_modules() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/networks/N_1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "serial": "Q2MS-0000-0001", "model": "MS120-8LP", "name": "Core", "networkId": "N_1" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/devices/Q2MS-0000-0001/switch/ports/statuses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "portId": "1", "enabled": true, "status": "Connected", "clientCount": 1 }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/api/v1/organizations/{ORG}/devices/powerModules/statuses/byDevice"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "serial": "Q2MS-0000-0001",
            "slots": [
                { "number": 1, "status": "operational" },
                { "number": 2, "status": "operational" },
                { "number": 3, "status": "failed" }
            ]
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let hub = NetworkHub::new(
        context(client, schema()),
        &network(),
        DeviceType::Ms,
        &CancellationToken::new(),
    );
    hub.setup().await.unwrap();

    // Setup cached the switch payload, so the poll reuses it.
    let snapshot = hub.poll().await.unwrap();
    let core = snapshot.devices.get("Q2MS-0000-0001").unwrap();
    assert_eq!(
        core.get("power_module_status"),
        Some(&meraki_core::MetricValue::Int(2))
    );
    assert_eq!(
        core.get("port_count"),
        Some(&meraki_core::MetricValue::Int(1))
    );
    hub.unload().await;
}

// ── Organization hub ────────────────────────────────────────────────

#[tokio::test]
async fn test_organization_setup_creates_hubs_per_family() {
    let (server, client) = setup().await;
    mount_organization(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/networks/N_1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(devices()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/networks/N_1/wireless/ssids"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "number": 0, "name": "Guest", "enabled": true },
            { "number": 1, "name": "Unconfigured SSID 2", "enabled": false }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/devices/Q2MR-0000-0001/wireless/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "basicServiceSets": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/organizations/{ORG}/events")))
        .and(query_param("perPage", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "eventType": "device_went_offline", "deviceSerial": "Q2MT-0000-0002",
              "networkId": "N_1", "timestamp": "2026-10-16T07:55:00Z" },
            { "eventType": "client_connected", "clientId": "k74272e",
              "timestamp": "2026-10-16T07:56:00Z" },
            { "eventType": "sensor_alert", "deviceSerial": "Q2MT-0000-0001",
              "eventDescription": "Temperature above 8 C" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context(client, schema());
    let mut org_events = ctx.events.subscribe_organization();
    let hub = OrganizationHub::new(ctx);
    hub.setup().await.unwrap();
    assert_eq!(hub.organization_name().await.as_deref(), Some("Acme"));

    let data = hub.data();
    let statuses = data.device_statuses.as_ref().unwrap();
    assert_eq!(statuses.total, 3);
    assert_eq!(statuses.offline, 1);
    assert_eq!(data.active_alerts, 2);
    assert_eq!(
        data.recent_alerts[1].event_type.as_deref(),
        Some("sensor_alert")
    );
    assert_eq!(
        hub.readings().await.get("alerts_count"),
        Some(&meraki_core::MetricValue::Int(2))
    );

    // Every event of the window is published, alert or not.
    let mut published = Vec::new();
    while let Ok(event) = org_events.try_recv() {
        assert_eq!(event.organization_id, ORG);
        assert_eq!(event.organization_name.as_deref(), Some("Acme"));
        published.push(event.event_type.unwrap());
    }
    assert_eq!(
        published,
        vec!["device_went_offline", "client_connected", "sensor_alert"]
    );

    let hubs = hub.create_network_hubs().await;
    let ids: Vec<&str> = hubs.iter().map(NetworkHub::hub_id).collect();
    assert_eq!(ids, vec!["N_1_MR", "N_1_MT"]);
    assert_eq!(
        hub.network_hub("N_1_MT")
            .await
            .unwrap()
            .device_count()
            .await,
        2
    );
    assert!(matches!(
        hub.network_hub("N_1_MS").await,
        Err(CoreError::HubNotFound { .. })
    ));

    let stats = hub.stats().await;
    assert!(stats.total_api_calls >= 4);
    hub.unload().await;
}

#[tokio::test]
async fn test_organization_setup_rejects_bad_key() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/organizations/{ORG}")))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "errors": ["Invalid API key"] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let hub = OrganizationHub::new(context(client, schema()));
    let err = hub.setup().await.unwrap_err();
    assert!(err.is_auth_failure(), "got {err:?}");
    assert_eq!(err.flow_code().as_str(), "invalid_auth");
}

#[tokio::test]
async fn test_organization_setup_not_ready_on_missing_org() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/organizations/{ORG}")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "errors": ["Not found"] })))
        .mount(&server)
        .await;

    let hub = OrganizationHub::new(context(client, schema()));
    let err = hub.setup().await.unwrap_err();
    assert!(matches!(err, CoreError::NotReady { .. }), "got {err:?}");
    assert_eq!(hub.stats().await.failed_api_calls, 1);
}

// ── Coordinator ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_coordinator_polls_and_publishes_events() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/networks/N_1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(devices()))
        .mount(&server)
        .await;
    mount_sensor_readings(&server, false, Some(1)).await;
    mount_sensor_readings(&server, true, None).await;

    let ctx = context(client, schema());
    let mut events = ctx.events.subscribe();
    let hub = NetworkHub::new(
        Arc::clone(&ctx),
        &network(),
        DeviceType::Mt,
        &CancellationToken::new(),
    );
    hub.setup().await.unwrap();

    let coordinator = SensorCoordinator::with_interval(hub, Duration::from_secs(3600));
    assert_eq!(coordinator.name(), "meraki_dashboard_Main Office_MT");
    coordinator.refresh().await.unwrap();
    assert!(coordinator.last_update_success());

    let data = coordinator.data();
    let fridge = data.devices.get("Q2MT-0000-0001").unwrap();
    assert_eq!(fridge.get("temperature").unwrap().as_f64(), Some(4.5));
    assert!(
        events.try_recv().is_err(),
        "first observation must not fire"
    );

    coordinator.refresh().await.unwrap();
    let event = events.try_recv().unwrap();
    assert_eq!(event.event_type, EventKind::DoorOpened);
    assert_eq!(event.device_serial, "Q2MT-0000-0002");
    assert_eq!(event.device_id, "entry1_Q2MT-0000-0002");

    coordinator.shutdown().await;
}

fn power_reading(watts: f64, ts: &str) -> Value {
    json!([{
        "serial": "Q2MT-0000-0040",
        "network": { "id": "N_1", "name": "Main Office" },
        "readings": [{ "ts": ts, "metric": "realPower", "realPower": { "draw": watts } }]
    }])
}

#[tokio::test]
async fn test_coordinator_integrates_power_into_energy() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/networks/N_1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "serial": "Q2MT-0000-0040", "model": "MT40", "name": "Rack PDU", "networkId": "N_1" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/api/v1/organizations/{ORG}/sensor/readings/latest"
        )))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(power_reading(1000.0, "2026-10-16T08:00:00Z")),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/api/v1/organizations/{ORG}/sensor/readings/latest"
        )))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(power_reading(2000.0, "2026-10-16T08:30:00Z")),
        )
        .mount(&server)
        .await;

    let ctx = context(client, schema());
    let hub = NetworkHub::new(
        Arc::clone(&ctx),
        &network(),
        DeviceType::Mt,
        &CancellationToken::new(),
    );
    hub.setup().await.unwrap();
    let coordinator = SensorCoordinator::with_interval(hub, Duration::from_secs(3600));

    coordinator.refresh().await.unwrap();
    let energy = |c: &SensorCoordinator| {
        c.data()
            .devices
            .get("Q2MT-0000-0040")
            .and_then(|d| d.get("realPower_energy"))
            .and_then(|v| v.as_f64())
    };
    assert_eq!(energy(&coordinator), Some(0.0));

    coordinator.refresh().await.unwrap();
    // Half an hour averaging 1.5 kW.
    assert_eq!(energy(&coordinator), Some(0.75));

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_coordinator_failure_is_wrapped() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/networks/N_1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(devices()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/api/v1/organizations/{ORG}/sensor/readings/latest"
        )))
        .and(query_param("perPage", "100"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "errors": ["bad serials"] })),
        )
        .mount(&server)
        .await;

    let hub = NetworkHub::new(
        context(client, schema()),
        &network(),
        DeviceType::Mt,
        &CancellationToken::new(),
    );
    hub.setup().await.unwrap();
    let coordinator = SensorCoordinator::with_interval(hub, Duration::from_secs(3600));

    let err = coordinator.refresh().await.unwrap_err();
    assert!(
        err.to_string()
            .starts_with("Error communicating with API: ")
    );
    assert!(!coordinator.last_update_success());
    assert!(coordinator.status().await.last_error.is_some());
}

#[tokio::test]
async fn test_coordinator_request_refresh_wakes_poll_task() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/networks/N_1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(devices()))
        .mount(&server)
        .await;
    mount_sensor_readings(&server, false, None).await;

    let hub = NetworkHub::new(
        context(client, schema()),
        &network(),
        DeviceType::Mt,
        &CancellationToken::new(),
    );
    hub.setup().await.unwrap();
    let coordinator = SensorCoordinator::with_interval(hub, Duration::from_secs(3600));
    let mut rx = coordinator.subscribe();

    coordinator.start().await.unwrap();
    rx.borrow_and_update();
    coordinator.request_refresh();
    tokio::time::timeout(Duration::from_secs(5), rx.changed())
        .await
        .unwrap()
        .unwrap();

    coordinator.shutdown().await;
    let polls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().ends_with("/sensor/readings/latest"))
        .count();
    assert_eq!(polls, 2);
}

// ── Controller ──────────────────────────────────────────────────────

fn entry() -> ConfigEntry {
    let data = json!({ "api_key": KEY, "organization_id": ORG });
    let options = json!({ "auto_discovery": false });
    ConfigEntry::new("entry1", "Acme", data.as_object().unwrap().clone())
        .with_options(options.as_object().unwrap().clone())
}

#[tokio::test]
async fn test_controller_setup_builds_entities() {
    let (server, client) = setup().await;
    mount_organization(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/networks/N_1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "serial": "Q2MT-0000-0001", "model": "MT10", "name": "Fridge", "networkId": "N_1" },
            { "serial": "Q2MT-0000-0002", "model": "MT20", "name": "Back Door", "networkId": "N_1" }
        ])))
        .mount(&server)
        .await;
    mount_sensor_readings(&server, false, None).await;

    let controller = Controller::with_client(entry(), client);
    controller.setup().await.unwrap();
    assert_eq!(controller.state(), EntryState::Loaded);
    assert_eq!(controller.coordinators().await.len(), 1);

    let store = controller.store();
    let temp = store.get("entry1_Q2MT-0000-0001_temperature").unwrap();
    assert_eq!(temp.entity_id, "sensor.fridge_temperature");
    assert!(temp.is_available());
    let door = store.get("entry1_Q2MT-0000-0002_door").unwrap();
    assert_eq!(door.display_state(), "off");
    assert!(store.get("entry1_device_count").unwrap().is_available());

    let diagnostics = meraki_core::diagnostics::collect_json(&controller).await;
    assert_eq!(
        diagnostics["entry"]["data"]["api_key"],
        json!("**REDACTED**")
    );
    assert_eq!(diagnostics["network_hubs"][0]["hub_id"], json!("N_1_MT"));

    controller.unload().await;
    assert_eq!(controller.state(), EntryState::NotLoaded);
    assert!(controller.store().is_empty());
}

#[tokio::test]
async fn test_controller_resolves_first_organization() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let data = json!({ "api_key": KEY });
    let entry = ConfigEntry::new("entry1", "Acme", data.as_object().unwrap().clone());
    let controller = Controller::with_client(entry, client);

    let err = controller.setup().await.unwrap_err();
    assert!(matches!(err, CoreError::NoOrganizations));
    assert_eq!(err.flow_code().as_str(), "no_organizations");
    assert_eq!(controller.state(), EntryState::SetupError);
}

/// Two MT hubs whose readings succeed for setup; the warehouse one fails
/// every poll after that.
async fn two_hub_controller(server: &MockServer, client: MerakiClient) -> Controller {
    mount_organization_with(
        server,
        json!([
            { "id": "N_1", "name": "Main Office" },
            { "id": "N_2", "name": "Warehouse" }
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/networks/N_1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "serial": "Q2MT-0000-0001", "model": "MT10", "name": "Fridge", "networkId": "N_1" }
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/networks/N_2/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "serial": "Q2MT-0000-0009", "model": "MT11", "name": "Freezer", "networkId": "N_2" }
        ])))
        .mount(server)
        .await;

    let readings_path = format!("/api/v1/organizations/{ORG}/sensor/readings/latest");
    Mock::given(method("GET"))
        .and(path(readings_path.as_str()))
        .and(query_param("serials[]", "Q2MT-0000-0001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(readings(false)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(readings_path.as_str()))
        .and(query_param("serials[]", "Q2MT-0000-0009"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "serial": "Q2MT-0000-0009",
            "network": { "id": "N_2", "name": "Warehouse" },
            "readings": [
                { "ts": "2026-10-16T08:00:00Z", "metric": "temperature",
                  "temperature": { "celsius": -18.0, "fahrenheit": -0.4 } }
            ]
        }])))
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(readings_path.as_str()))
        .and(query_param("serials[]", "Q2MT-0000-0009"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "errors": ["bad serials"] })),
        )
        .mount(server)
        .await;

    let controller = Controller::with_client(entry(), client);
    controller.setup().await.unwrap();
    assert_eq!(controller.coordinators().await.len(), 2);
    controller
}

#[tokio::test]
async fn test_controller_refresh_all_keeps_going_past_a_failing_hub() {
    let (server, client) = setup().await;
    let controller = two_hub_controller(&server, client).await;

    let report = controller.refresh_all().await.unwrap();
    assert_eq!(report.hubs, 2);
    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "Warehouse_MT");
    assert!(matches!(
        report.failures[0].1,
        CoreError::UpdateFailed { .. }
    ));

    // The healthy hub polled again after setup even though the other failed.
    let office_polls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| {
            r.url.path().ends_with("/sensor/readings/latest")
                && r.url.query().is_some_and(|q| q.contains("Q2MT-0000-0001"))
        })
        .count();
    assert!(office_polls >= 2, "office hub polled {office_polls} times");
    let coordinators = controller.coordinators().await;
    assert!(coordinators[0].last_update_success());
    assert!(!coordinators[1].last_update_success());

    controller.unload().await;
}

#[tokio::test]
async fn test_controller_discover_all_skips_hubs_that_just_ran() {
    let (server, client) = setup().await;
    let controller = two_hub_controller(&server, client).await;

    // Setup discovered both hubs moments ago.
    let report = controller.discover_all().await.unwrap();
    assert_eq!(report.hubs, 2);
    assert_eq!(report.skipped, 2);
    assert!(report.is_success());

    controller.unload().await;
    assert!(matches!(
        controller.discover_all().await,
        Err(CoreError::NotReady { .. })
    ));
    assert!(matches!(
        controller.refresh_all().await,
        Err(CoreError::NotReady { .. })
    ));
}

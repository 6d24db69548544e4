#![allow(clippy::unwrap_used)]
// Integration tests for `MerakiClient` using wiremock.

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use meraki_api::{Error, MerakiClient, TransportConfig};

const KEY: &str = "0123456789abcdef0123456789abcdef01234567";

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, MerakiClient) {
    let server = MockServer::start().await;
    let secret: secrecy::SecretString = KEY.to_string().into();
    let client =
        MerakiClient::from_api_key(&server.uri(), &secret, &TransportConfig::default()).unwrap();
    (server, client)
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_api_key_header_is_sent() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/organizations"))
        .and(header("X-Cisco-Meraki-API-Key", KEY))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": "123", "name": "Acme" }])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let orgs = client.get_organizations().await.unwrap();
    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0].name, "Acme");
}

#[tokio::test]
async fn test_unauthorized_maps_to_invalid_api_key() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/organizations"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": ["Invalid API key"]
        })))
        .mount(&server)
        .await;

    let result = client.get_organizations().await;
    assert!(
        matches!(result, Err(Error::InvalidApiKey)),
        "expected InvalidApiKey, got: {result:?}"
    );
}

#[tokio::test]
async fn test_forbidden_carries_dashboard_message() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/organizations/999"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "errors": ["API is not enabled for this organization"]
        })))
        .mount(&server)
        .await;

    let err = client.get_organization("999").await.unwrap_err();
    match err {
        Error::Forbidden { message } => {
            assert_eq!(message, "API is not enabled for this organization");
        }
        other => panic!("expected Forbidden, got: {other:?}"),
    }
}

// ── Rate limiting ───────────────────────────────────────────────────

#[tokio::test]
async fn test_rate_limited_reads_retry_after() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/organizations/123/devices/statuses"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "3"))
        .mount(&server)
        .await;

    let err = client
        .get_organization_devices_statuses("123")
        .await
        .unwrap_err();
    assert_eq!(err.retry_after(), Some(3));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_rate_limited_without_header_defaults() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/organizations"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = client.get_organizations().await.unwrap_err();
    assert!(matches!(
        err,
        Error::RateLimited {
            retry_after_secs: 1
        }
    ));
}

// ── Errors & decoding ───────────────────────────────────────────────

#[tokio::test]
async fn test_server_error_joins_error_list() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/networks/N_1/devices"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "errors": ["first", "second"]
        })))
        .mount(&server)
        .await;

    let err = client.get_network_devices("N_1").await.unwrap_err();
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "first; second");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client.get_organizations().await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert_eq!(body, "not json"),
        other => panic!("expected Deserialization, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_with_multibyte_name_at_preview_cut() {
    let (server, client) = setup().await;

    // `ü` occupies bytes 199..201, straddling the preview cut.
    let mut body = String::from(r#"[{"id": "1", "name": ""#);
    body.push_str(&"x".repeat(199 - body.len()));
    body.push_str("ü Büro");
    assert!(!body.is_char_boundary(200));

    Mock::given(method("GET"))
        .and(path("/api/v1/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .mount(&server)
        .await;

    let err = client.get_organizations().await.unwrap_err();
    match err {
        Error::Deserialization { message, body: raw } => {
            assert_eq!(raw, body);
            assert!(message.contains("body preview"), "{message}");
        }
        other => panic!("expected Deserialization, got: {other:?}"),
    }
}

// ── Pagination ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_devices_follow_link_header() {
    let (server, client) = setup().await;
    let next = format!(
        "<{}/api/v1/organizations/123/devices?perPage=1000&startingAfter=Q2AA>; rel=next",
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/api/v1/organizations/123/devices"))
        .and(query_param("startingAfter", "Q2AA"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "serial": "Q2BB-0000-0002", "model": "MR46" }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/organizations/123/devices"))
        .and(query_param("perPage", "1000"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Link", next.as_str())
                .set_body_json(json!([
                    { "serial": "Q2AA-0000-0001", "model": "MT10" }
                ])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let devices = client.get_organization_devices("123").await.unwrap();
    let serials: Vec<_> = devices.iter().map(|d| d.serial.as_str()).collect();
    assert_eq!(serials, vec!["Q2AA-0000-0001", "Q2BB-0000-0002"]);
}

// ── Sensors ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sensor_readings_filter_by_serial() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/organizations/123/sensor/readings/latest"))
        .and(query_param("serials[]", "Q2MT-0000-0001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "serial": "Q2MT-0000-0001",
            "network": { "id": "N_1", "name": "HQ" },
            "readings": [
                { "ts": "2024-05-01T10:00:00Z", "metric": "humidity",
                  "humidity": { "relativePercentage": 41 } },
                { "ts": "2024-05-01T10:00:00Z", "metric": "door",
                  "door": { "open": false } }
            ]
        }])))
        .mount(&server)
        .await;

    let readings = client
        .get_organization_sensor_readings_latest("123", &["Q2MT-0000-0001".to_owned()])
        .await
        .unwrap();
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].readings.len(), 2);
    assert_eq!(
        readings[0].readings[0]
            .humidity
            .as_ref()
            .unwrap()
            .relative_percentage,
        Some(41.0)
    );
}

// ── Switches ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_switch_port_statuses() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/devices/Q2MS-0000-0001/switch/ports/statuses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "portId": "1", "enabled": true, "status": "Connected",
              "usageInKb": { "total": 300, "sent": 100, "recv": 200 },
              "clientCount": 2, "powerUsageInWh": 55.0 },
            { "portId": "2", "enabled": true, "status": "Disconnected" }
        ])))
        .mount(&server)
        .await;

    let ports = client
        .get_device_switch_ports_statuses("Q2MS-0000-0001")
        .await
        .unwrap();
    assert_eq!(ports.len(), 2);
    assert_eq!(ports[0].client_count, 2);
    assert_eq!(ports[1].usage_in_kb, None);
}

#[tokio::test]
async fn test_switch_power_modules_by_device() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/organizations/123/devices/powerModules/statuses/byDevice"))
        .and(query_param("productTypes[]", "switch"))
        .and(query_param("serials[]", "Q2MS-0000-0001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "serial": "Q2MS-0000-0001",
            "name": "Core",
            "slots": [
                { "number": 1, "serial": "QABC-1", "model": "PWR-MS320-640WAC", "status": "operational" },
                { "number": 2, "status": "not connected" }
            ]
        }])))
        .mount(&server)
        .await;

    let devices = client
        .get_organization_devices_power_modules_statuses("123", &["Q2MS-0000-0001".to_owned()])
        .await
        .unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].slots.len(), 2);
    assert_eq!(devices[0].slots[1].serial, None);
    assert_eq!(devices[0].slots[0].status.as_deref(), Some("operational"));
}

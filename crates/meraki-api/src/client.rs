// Hand-crafted async HTTP client for the Meraki Dashboard API v1.
//
// Base path: /api/v1/
// Auth: X-Cisco-Meraki-API-Key header
// Pagination: RFC 5988 `Link` header with `rel=next`

use reqwest::header::{HeaderMap, HeaderValue, LINK, RETRY_AFTER};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::models::{self, ErrorResponse};
use crate::{Error, TransportConfig};

/// Header carrying the Dashboard API key.
pub const API_KEY_HEADER: &str = "X-Cisco-Meraki-API-Key";

/// Retry-After fallback when a 429 carries no usable header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Upper bound on followed `Link: rel=next` pages for one listing.
const MAX_PAGES: usize = 1000;

/// Characters of a bad body quoted in a deserialization error.
const PREVIEW_CHARS: usize = 200;

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the Meraki Dashboard API.
///
/// Uses API-key authentication and talks JSON to endpoints under
/// `/api/v1/` on one of the regional Dashboard hosts.
#[derive(Debug, Clone)]
pub struct MerakiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl MerakiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API key and transport config.
    ///
    /// Injects `X-Cisco-Meraki-API-Key` as a sensitive default header on
    /// every request.
    pub fn from_api_key(
        base_url: &str,
        api_key: &secrecy::SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut key_value =
            HeaderValue::from_str(api_key.expose_secret()).map_err(|e| Error::Authentication {
                message: format!("invalid API key header value: {e}"),
            })?;
        key_value.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key_value);

        let http = transport.build_client_with_headers(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;

        Ok(Self { http, base_url })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Ensure the base URL ends with `/api/v1/` so relative joins work.
    ///
    /// Accepts `https://api.meraki.com`, `https://api.meraki.com/api/v1`
    /// and the same with a trailing slash.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();

        if path.ends_with("/api/v1") {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}/api/v1/"));
        }

        Ok(url)
    }

    /// The normalized `/api/v1/` base this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"organizations"`) onto the base URL.
    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        self.handle_response(resp).await.map(|(body, _)| body)
    }

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        self.handle_response(resp).await.map(|(body, _)| body)
    }

    // ── Response handling ────────────────────────────────────────────

    /// Decode a success body, returning the `rel=next` link alongside it.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<(T, Option<Url>), Error> {
        let status = resp.status();
        if status.is_success() {
            let next = next_link(resp.headers());
            let body = resp.text().await?;
            let parsed = serde_json::from_str(&body).map_err(|e| {
                let preview = body_preview(&body);
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body: body.clone(),
                }
            })?;
            Ok((parsed, next))
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::InvalidApiKey;
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Error::RateLimited { retry_after_secs };
        }

        let raw = resp.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorResponse>(&raw) {
            Ok(err) if !err.errors.is_empty() => err.errors.join("; "),
            _ if raw.is_empty() => status.to_string(),
            _ => raw,
        };

        if status == reqwest::StatusCode::FORBIDDEN {
            Error::Forbidden { message }
        } else {
            Error::Api {
                status: status.as_u16(),
                message,
            }
        }
    }

    // ── Pagination helper ────────────────────────────────────────────

    /// Fetch every page of a list endpoint by following `Link: rel=next`.
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, Error> {
        let first = self.url(path)?;
        debug!("GET {first} params={params:?} (paginated)");

        let resp = self.http.get(first).query(params).send().await?;
        let (mut all, mut next): (Vec<T>, _) = self.handle_response(resp).await?;

        let mut pages = 1;
        while let Some(url) = next.take() {
            if pages >= MAX_PAGES {
                debug!(pages, "pagination limit reached, stopping");
                break;
            }
            trace!("GET {url} (next page)");
            let resp = self.http.get(url).send().await?;
            let (page, following): (Vec<T>, _) = self.handle_response(resp).await?;
            all.extend(page);
            next = following;
            pages += 1;
        }

        Ok(all)
    }

    /// Same as [`get_all`](Self::get_all) for `{items, meta}` envelopes.
    async fn get_all_items<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, Error> {
        let first = self.url(path)?;
        debug!("GET {first} params={params:?} (paginated items)");

        let resp = self.http.get(first).query(params).send().await?;
        let (page, mut next): (models::ItemsPage<T>, _) = self.handle_response(resp).await?;
        let mut all = page.items;

        let mut pages = 1;
        while let Some(url) = next.take() {
            if pages >= MAX_PAGES {
                break;
            }
            let resp = self.http.get(url).send().await?;
            let (page, following): (models::ItemsPage<T>, _) = self.handle_response(resp).await?;
            all.extend(page.items);
            next = following;
            pages += 1;
        }

        Ok(all)
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Organizations ────────────────────────────────────────────────

    pub async fn get_organizations(&self) -> Result<Vec<models::Organization>, Error> {
        self.get("organizations").await
    }

    pub async fn get_organization(&self, org_id: &str) -> Result<models::Organization, Error> {
        self.get(&format!("organizations/{org_id}")).await
    }

    pub async fn get_organization_networks(
        &self,
        org_id: &str,
    ) -> Result<Vec<models::Network>, Error> {
        self.get_all(
            &format!("organizations/{org_id}/networks"),
            &[("perPage", "10000".into())],
        )
        .await
    }

    pub async fn get_organization_devices(
        &self,
        org_id: &str,
    ) -> Result<Vec<models::Device>, Error> {
        self.get_all(
            &format!("organizations/{org_id}/devices"),
            &[("perPage", "1000".into())],
        )
        .await
    }

    pub async fn get_organization_devices_statuses(
        &self,
        org_id: &str,
    ) -> Result<Vec<models::DeviceStatus>, Error> {
        self.get_all(
            &format!("organizations/{org_id}/devices/statuses"),
            &[("perPage", "1000".into())],
        )
        .await
    }

    pub async fn get_organization_devices_uplinks_addresses(
        &self,
        org_id: &str,
    ) -> Result<Vec<models::UplinkAddresses>, Error> {
        self.get_all(
            &format!("organizations/{org_id}/devices/uplinks/addresses/byDevice"),
            &[("perPage", "1000".into())],
        )
        .await
    }

    /// Memory usage over the last `timespan_secs`, one interval per device.
    pub async fn get_organization_devices_memory_usage(
        &self,
        org_id: &str,
        timespan_secs: u32,
    ) -> Result<Vec<models::DeviceMemoryUsage>, Error> {
        self.get_all_items(
            &format!("organizations/{org_id}/devices/system/memory/usage/history/byInterval"),
            &[
                ("timespan", timespan_secs.to_string()),
                ("interval", timespan_secs.to_string()),
                ("perPage", "20".into()),
            ],
        )
        .await
    }

    // ── Licensing ────────────────────────────────────────────────────

    pub async fn get_organization_licenses_overview(
        &self,
        org_id: &str,
    ) -> Result<models::LicensesOverview, Error> {
        self.get(&format!("organizations/{org_id}/licenses/overview"))
            .await
    }

    pub async fn get_organization_licenses(
        &self,
        org_id: &str,
    ) -> Result<Vec<models::License>, Error> {
        self.get_all(
            &format!("organizations/{org_id}/licenses"),
            &[("perPage", "1000".into())],
        )
        .await
    }

    // ── Organization summaries ───────────────────────────────────────

    pub async fn get_organization_clients_overview(
        &self,
        org_id: &str,
        timespan_secs: u32,
    ) -> Result<models::ClientsOverview, Error> {
        self.get_with_params(
            &format!("organizations/{org_id}/clients/overview"),
            &[("timespan", timespan_secs.to_string())],
        )
        .await
    }

    /// Organization events in a time window, first page only.
    ///
    /// Bounds are RFC 3339 timestamps.
    pub async fn get_organization_events(
        &self,
        org_id: &str,
        starting_after: &str,
        ending_before: &str,
    ) -> Result<Vec<models::OrganizationEvent>, Error> {
        self.get_with_params(
            &format!("organizations/{org_id}/events"),
            &[
                ("startingAfter", starting_after.to_owned()),
                ("endingBefore", ending_before.to_owned()),
                ("perPage", "100".into()),
            ],
        )
        .await
    }

    /// Power supply slots of the given switches.
    pub async fn get_organization_devices_power_modules_statuses(
        &self,
        org_id: &str,
        serials: &[String],
    ) -> Result<Vec<models::DevicePowerModules>, Error> {
        let mut params: Vec<(&str, String)> = vec![
            ("perPage", "100".into()),
            ("productTypes[]", "switch".into()),
        ];
        params.extend(serials.iter().map(|s| ("serials[]", s.clone())));

        self.get_all(
            &format!("organizations/{org_id}/devices/powerModules/statuses/byDevice"),
            &params,
        )
        .await
    }

    // ── Sensors ──────────────────────────────────────────────────────

    /// Latest readings for the given serials (all sensors when empty).
    pub async fn get_organization_sensor_readings_latest(
        &self,
        org_id: &str,
        serials: &[String],
    ) -> Result<Vec<models::SensorReadings>, Error> {
        let mut params: Vec<(&str, String)> = vec![("perPage", "100".into())];
        params.extend(serials.iter().map(|s| ("serials[]", s.clone())));

        self.get_all(
            &format!("organizations/{org_id}/sensor/readings/latest"),
            &params,
        )
        .await
    }

    // ── Networks ─────────────────────────────────────────────────────

    pub async fn get_network_devices(
        &self,
        network_id: &str,
    ) -> Result<Vec<models::Device>, Error> {
        self.get(&format!("networks/{network_id}/devices")).await
    }

    pub async fn get_network_wireless_ssids(
        &self,
        network_id: &str,
    ) -> Result<Vec<models::WirelessSsid>, Error> {
        self.get(&format!("networks/{network_id}/wireless/ssids"))
            .await
    }

    // ── Devices ──────────────────────────────────────────────────────

    pub async fn get_device_wireless_status(
        &self,
        serial: &str,
    ) -> Result<models::WirelessStatus, Error> {
        self.get(&format!("devices/{serial}/wireless/status")).await
    }

    pub async fn get_device_clients(
        &self,
        serial: &str,
        timespan_secs: u32,
    ) -> Result<Vec<models::DeviceClient>, Error> {
        self.get_with_params(
            &format!("devices/{serial}/clients"),
            &[("timespan", timespan_secs.to_string())],
        )
        .await
    }

    pub async fn get_device_switch_ports_statuses(
        &self,
        serial: &str,
    ) -> Result<Vec<models::SwitchPortStatus>, Error> {
        self.get(&format!("devices/{serial}/switch/ports/statuses"))
            .await
    }
}

/// First 200 characters of a body, cut on a char boundary.
fn body_preview(body: &str) -> &str {
    body.char_indices()
        .nth(PREVIEW_CHARS)
        .map_or(body, |(end, _)| &body[..end])
}

/// Extract the `rel=next` target from a `Link` header, if present.
fn next_link(headers: &HeaderMap) -> Option<Url> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .find_map(|part| {
            let mut pieces = part.split(';');
            let target = pieces.next()?.trim();
            let is_next = pieces.any(|p| {
                let p = p.trim();
                p == "rel=next" || p == "rel=\"next\""
            });
            if !is_next {
                return None;
            }
            let target = target.strip_prefix('<')?.strip_suffix('>')?;
            Url::parse(target).ok()
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn normalize_appends_api_prefix() {
        let url = MerakiClient::normalize_base_url("https://api.meraki.com").unwrap();
        assert_eq!(url.as_str(), "https://api.meraki.com/api/v1/");
    }

    #[test]
    fn normalize_keeps_existing_prefix() {
        for raw in [
            "https://api.meraki.ca/api/v1",
            "https://api.meraki.ca/api/v1/",
        ] {
            let url = MerakiClient::normalize_base_url(raw).unwrap();
            assert_eq!(url.as_str(), "https://api.meraki.ca/api/v1/");
        }
    }

    #[test]
    fn next_link_picks_rel_next() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static(
                "<https://api.meraki.com/api/v1/organizations/1/devices?startingAfter=a>; rel=first, \
                 <https://api.meraki.com/api/v1/organizations/1/devices?startingAfter=Q2>; rel=next",
            ),
        );
        let next = next_link(&headers).unwrap();
        assert_eq!(next.query(), Some("startingAfter=Q2"));
    }

    #[test]
    fn next_link_absent_on_last_page() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static("<https://api.meraki.com/api/v1/x?a=1>; rel=prev"),
        );
        assert!(next_link(&headers).is_none());
    }
}

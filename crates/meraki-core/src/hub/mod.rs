// ── Hubs ──
//
// An organization hub owns the Dashboard connection and the org-wide
// tiers; it spawns one network hub per (network, device family) that has
// devices. All hubs of an entry share one `HubContext`.

pub mod network;
pub mod organization;
pub mod stats;

use std::future::Future;
use std::sync::Arc;

use meraki_api::MerakiClient;
use meraki_config::MerakiConfigSchema;

pub use network::{HubSnapshot, NetworkHub, NetworkHubStatus};
pub use organization::{OrganizationData, OrganizationHub, Tier, TierAges};
pub use stats::{ApiStats, ApiStatsSnapshot};

use crate::cache::ApiCache;
use crate::events::EventService;
use crate::retry::{RetryStrategy, retry_with};

/// State shared by an organization hub and its network hubs.
#[derive(Debug)]
pub struct HubContext {
    pub entry_id: String,
    pub client: MerakiClient,
    pub config: Arc<MerakiConfigSchema>,
    pub organization_id: String,
    pub stats: ApiStats,
    pub cache: ApiCache,
    pub events: Arc<EventService>,
}

impl HubContext {
    pub fn new(
        entry_id: impl Into<String>,
        client: MerakiClient,
        config: Arc<MerakiConfigSchema>,
        events: Arc<EventService>,
    ) -> Self {
        Self {
            entry_id: entry_id.into(),
            client,
            organization_id: config.organization_id.clone(),
            config,
            stats: ApiStats::new(),
            cache: ApiCache::new(),
            events,
        }
    }

    /// One Dashboard call under a retry policy. Every attempt is counted.
    pub(crate) async fn call<T, F, Fut>(
        &self,
        label: &str,
        strategy: RetryStrategy,
        mut op: F,
    ) -> Result<T, meraki_api::Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, meraki_api::Error>>,
    {
        let stats: &ApiStats = &self.stats;
        retry_with(strategy, label, move || stats.track(op())).await
    }
}

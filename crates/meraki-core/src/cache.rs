// ── TTL cache ──
//
// Short-lived memo of Dashboard responses keyed by a caller-chosen string.
// Entries expire on their own TTL; reads drop expired entries.

use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct ApiCache {
    entries: DashMap<String, CacheEntry>,
}

impl ApiCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Cached value for `key`, unless it has expired.
    pub fn get(&self, key: &str) -> Option<Value> {
        {
            let entry = self.entries.get(key)?;
            if Instant::now() <= entry.expires_at {
                return Some(entry.value.clone());
            }
        }
        // Shard guard released above; removing while holding it deadlocks.
        self.entries.remove(key);
        None
    }

    /// Typed view of a cached value. A value that no longer deserializes is
    /// treated as a miss.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        serde_json::from_value(self.get(key)?).ok()
    }

    pub fn insert_as<T: serde::Serialize>(&self, key: impl Into<String>, value: &T, ttl: Duration) {
        match serde_json::to_value(value) {
            Ok(v) => self.insert(key, v, ttl),
            Err(e) => debug!(error = %e, "value not cacheable"),
        }
    }

    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now <= entry.expires_at);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "cleaned up expired cache entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = ApiCache::new();
        cache.insert("devices_N_1_MT", json!([1, 2]), Duration::from_secs(10));
        assert_eq!(cache.get("devices_N_1_MT"), Some(json!([1, 2])));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get("devices_N_1_MT"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_removes_only_expired() {
        let cache = ApiCache::new();
        cache.insert("short", json!(1), Duration::from_secs(1));
        cache.insert("long", json!(2), DEFAULT_TTL);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_as::<u32>("long"), Some(2));

        cache.clear();
        assert!(cache.is_empty());
    }
}

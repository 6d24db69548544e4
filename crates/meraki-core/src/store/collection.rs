// ── Reactive keyed collection ──
//
// `DashMap` storage with a `watch` snapshot that is rebuilt on every
// mutation, so subscribers always see a consistent list.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

pub(crate) struct EntityCollection<T: Clone + Send + Sync + 'static> {
    by_key: DashMap<String, Arc<T>>,
    /// Bumped on every mutation.
    version: watch::Sender<u64>,
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> std::fmt::Debug for EntityCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityCollection")
            .field("len", &self.by_key.len())
            .field("version", &*self.version.borrow())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            by_key: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Insert or replace one item. Returns `true` if the key was new.
    pub(crate) fn upsert(&self, key: String, item: T) -> bool {
        let is_new = self.by_key.insert(key, Arc::new(item)).is_none();
        self.publish();
        is_new
    }

    /// Insert or replace many items with a single snapshot rebuild.
    pub(crate) fn upsert_many(&self, items: impl IntoIterator<Item = (String, T)>) -> usize {
        let mut changed = 0;
        for (key, item) in items {
            self.by_key.insert(key, Arc::new(item));
            changed += 1;
        }
        if changed > 0 {
            self.publish();
        }
        changed
    }

    /// Upsert everything in `items`, then drop keys that were not in it.
    /// Subscribers never observe an empty intermediate state.
    pub(crate) fn upsert_and_prune(&self, items: Vec<(String, T)>) {
        let incoming: HashSet<String> = items.iter().map(|(k, _)| k.clone()).collect();
        for (key, item) in items {
            self.by_key.insert(key, Arc::new(item));
        }
        self.by_key.retain(|key, _| incoming.contains(key));
        self.publish();
    }

    pub(crate) fn remove(&self, key: &str) -> Option<Arc<T>> {
        let removed = self.by_key.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            self.publish();
        }
        removed
    }

    /// Drop every item matching `pred`. Returns how many went.
    pub(crate) fn remove_where(&self, pred: impl Fn(&T) -> bool) -> usize {
        let before = self.by_key.len();
        self.by_key.retain(|_, item| !pred(item));
        let removed = before - self.by_key.len();
        if removed > 0 {
            self.publish();
        }
        removed
    }

    pub(crate) fn get(&self, key: &str) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub(crate) fn clear(&self) {
        self.by_key.clear();
        self.publish();
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn publish(&self) {
        let values: Vec<Arc<T>> = self.by_key.iter().map(|r| Arc::clone(r.value())).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        self.version.send_modify(|v| *v += 1);
    }
}

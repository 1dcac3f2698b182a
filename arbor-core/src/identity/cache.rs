use std::sync::Arc;

use arbor_model::{BaseItem, ItemId};
use dashmap::DashMap;
use parking_lot::RwLock;

/// An entity shared between the cache, the reference map and callers.
/// Mutation happens in place behind the lock.
pub type SharedItem = Arc<RwLock<BaseItem>>;

pub fn shared(item: BaseItem) -> SharedItem {
    Arc::new(RwLock::new(item))
}

/// Process-wide map from id to entity; the authoritative in-memory source
/// once an entity has been resolved or loaded.
#[derive(Debug, Default)]
pub struct ItemCache {
    items: DashMap<ItemId, SharedItem>,
}

impl ItemCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert keyed by the entity's id. Racing writers on the same id end
    /// with whichever inserted last; nothing is merged.
    pub fn insert(&self, item: SharedItem) -> Option<SharedItem> {
        let id = item.read().id;
        self.items.insert(id, item)
    }

    /// Insert unless the id is already cached; returns the cached instance
    /// either way.
    pub fn get_or_insert(&self, item: SharedItem) -> SharedItem {
        let id = item.read().id;
        self.items.entry(id).or_insert(item).value().clone()
    }

    pub fn get(&self, id: &ItemId) -> Option<SharedItem> {
        self.items.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    pub fn remove(&self, id: &ItemId) -> Option<SharedItem> {
        self.items.remove(id).map(|(_, item)| item)
    }

    /// Drop every entry matching `predicate`, returning how many went.
    pub fn remove_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&BaseItem) -> bool,
    {
        let before = self.items.len();
        self.items.retain(|_, item| !predicate(&item.read()));
        before.saturating_sub(self.items.len())
    }

    /// Snapshot of all cached entities.
    pub fn values(&self) -> Vec<SharedItem> {
        self.items.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn find<F>(&self, predicate: F) -> Option<SharedItem>
    where
        F: Fn(&BaseItem) -> bool,
    {
        self.items
            .iter()
            .find(|entry| predicate(&entry.value().read()))
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Keeps exactly one instance per referentially unique entity (people,
/// artists). First registration wins.
#[derive(Debug, Default)]
pub struct ReferenceMap {
    items: DashMap<ItemId, SharedItem>,
}

impl ReferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `item` if its id is unknown; otherwise discard it and return
    /// the instance already stored.
    pub fn get_or_add(&self, item: SharedItem) -> SharedItem {
        let id = item.read().id;
        self.items.entry(id).or_insert(item).value().clone()
    }

    pub fn get(&self, id: &ItemId) -> Option<SharedItem> {
        self.items.get(id).map(|entry| entry.value().clone())
    }

    pub fn find<F>(&self, predicate: F) -> Option<SharedItem>
    where
        F: Fn(&BaseItem) -> bool,
    {
        self.items
            .iter()
            .find(|entry| predicate(&entry.value().read()))
            .map(|entry| entry.value().clone())
    }

    pub fn remove(&self, id: &ItemId) -> Option<SharedItem> {
        self.items.remove(id).map(|(_, item)| item)
    }

    pub fn remove_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&BaseItem) -> bool,
    {
        let before = self.items.len();
        self.items.retain(|_, item| !predicate(&item.read()));
        before.saturating_sub(self.items.len())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use arbor_model::{BaseItem, ItemId, ItemUpdateReason};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::{LibraryError, Result};
use crate::ports::{
    ItemRepository, LibraryMonitor, ProviderManager, ScheduledTaskKind,
    TaskScheduler,
};

/// Item repository kept entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryItemRepository {
    items: DashMap<ItemId, BaseItem>,
    deleted: Mutex<Vec<ItemId>>,
    failing_deletes: Mutex<HashSet<ItemId>>,
    saves: AtomicUsize,
}

impl InMemoryItemRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an item without counting it as a save.
    pub fn seed(&self, item: BaseItem) {
        self.items.insert(item.id, item);
    }

    pub fn get(&self, id: &ItemId) -> Option<BaseItem> {
        self.items.get(id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn all(&self) -> Vec<BaseItem> {
        self.items.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Ids passed to `delete_item`, in call order.
    pub fn deleted_ids(&self) -> Vec<ItemId> {
        self.deleted.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make `delete_item` fail for `id`.
    pub fn fail_delete_of(&self, id: ItemId) {
        self.failing_deletes.lock().insert(id);
    }
}

#[async_trait]
impl ItemRepository for InMemoryItemRepository {
    async fn save_items(&self, items: &[BaseItem]) -> Result<()> {
        for item in items {
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.items.insert(item.id, item.clone());
        }
        Ok(())
    }

    async fn retrieve_item(&self, id: ItemId) -> Result<Option<BaseItem>> {
        Ok(self.get(&id))
    }

    async fn delete_item(&self, id: ItemId) -> Result<()> {
        self.deleted.lock().push(id);
        if self.failing_deletes.lock().contains(&id) {
            return Err(LibraryError::Repository(format!(
                "delete rejected for {id}"
            )));
        }
        self.items.remove(&id);
        Ok(())
    }
}

/// Library monitor that only counts start/stop calls.
#[derive(Debug, Default)]
pub struct RecordingLibraryMonitor {
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl RecordingLibraryMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LibraryMonitor for RecordingLibraryMonitor {
    async fn start(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Task scheduler that records requests instead of running anything.
#[derive(Debug, Default)]
pub struct RecordingTaskScheduler {
    queued: Mutex<Vec<ScheduledTaskKind>>,
    restarted: Mutex<Vec<ScheduledTaskKind>>,
}

impl RecordingTaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queued(&self) -> Vec<ScheduledTaskKind> {
        self.queued.lock().clone()
    }

    pub fn restarted(&self) -> Vec<ScheduledTaskKind> {
        self.restarted.lock().clone()
    }
}

#[async_trait]
impl TaskScheduler for RecordingTaskScheduler {
    async fn queue_scheduled_task(&self, kind: ScheduledTaskKind) {
        self.queued.lock().push(kind);
    }

    async fn cancel_if_running_and_queue(&self, kind: ScheduledTaskKind) {
        self.restarted.lock().push(kind);
    }
}

/// Provider manager that records which items had metadata saved.
#[derive(Debug, Default)]
pub struct RecordingProviderManager {
    saved: Mutex<Vec<(ItemId, ItemUpdateReason)>>,
}

impl RecordingProviderManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<(ItemId, ItemUpdateReason)> {
        self.saved.lock().clone()
    }
}

#[async_trait]
impl ProviderManager for RecordingProviderManager {
    async fn save_metadata(
        &self,
        item: &BaseItem,
        reason: ItemUpdateReason,
    ) -> Result<()> {
        self.saved.lock().push((item.id, reason));
        Ok(())
    }
}

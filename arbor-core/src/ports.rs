//! Capabilities the library engine consumes but does not implement:
//! durable storage, live file watching, task scheduling and sidecar
//! metadata persistence.

use std::fmt;

use arbor_model::{BaseItem, ItemId, ItemUpdateReason};
use async_trait::async_trait;

use crate::error::Result;

/// Durable item storage. The source of truth on cache miss and the sink on
/// every create, update and delete.
#[async_trait]
pub trait ItemRepository: Send + Sync + fmt::Debug {
    async fn save_items(&self, items: &[BaseItem]) -> Result<()>;

    async fn save_item(&self, item: &BaseItem) -> Result<()> {
        self.save_items(std::slice::from_ref(item)).await
    }

    async fn retrieve_item(&self, id: ItemId) -> Result<Option<BaseItem>>;

    async fn delete_item(&self, id: ItemId) -> Result<()>;
}

/// Live file-change watching, paused for the duration of a scan.
#[async_trait]
pub trait LibraryMonitor: Send + Sync + fmt::Debug {
    async fn start(&self);

    async fn stop(&self);
}

/// Named tasks the external scheduler knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduledTaskKind {
    RefreshMediaLibrary,
}

#[async_trait]
pub trait TaskScheduler: Send + Sync + fmt::Debug {
    /// Queue the task unless an equivalent run is already queued.
    async fn queue_scheduled_task(&self, kind: ScheduledTaskKind);

    /// Cancel a running instance, then queue a fresh one.
    async fn cancel_if_running_and_queue(&self, kind: ScheduledTaskKind);
}

/// Persists sidecar metadata next to file-system items.
#[async_trait]
pub trait ProviderManager: Send + Sync + fmt::Debug {
    async fn save_metadata(
        &self,
        item: &BaseItem,
        reason: ItemUpdateReason,
    ) -> Result<()>;
}

//! Outbound item-change notifications.

use std::fmt;
use std::sync::Arc;

use arbor_model::ItemChange;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::error;

use crate::error::Result;

/// Observer registered on the [`LibraryEventBus`]. Failures are logged by
/// the bus and never reach the publisher.
#[async_trait]
pub trait ItemEventListener: Send + Sync {
    fn name(&self) -> &str;

    async fn on_item_change(&self, change: &ItemChange) -> Result<()>;
}

/// In-process fan-out of item-added/updated/removed events: registered
/// listeners are awaited in registration order, then the change is
/// broadcast to channel subscribers.
pub struct LibraryEventBus {
    sender: broadcast::Sender<ItemChange>,
    capacity: usize,
    listeners: RwLock<Vec<Arc<dyn ItemEventListener>>>,
}

impl fmt::Debug for LibraryEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryEventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.sender.receiver_count())
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl Default for LibraryEventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl LibraryEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            capacity,
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ItemChange> {
        self.sender.subscribe()
    }

    pub fn register_listener(&self, listener: Arc<dyn ItemEventListener>) {
        self.listeners.write().push(listener);
    }

    pub async fn publish(&self, change: ItemChange) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            if let Err(err) = listener.on_item_change(&change).await {
                error!(
                    listener = listener.name(),
                    item_id = %change.item_id(),
                    "item event listener failed: {err}"
                );
            }
        }
        // No subscribers is not an error.
        let _ = self.sender.send(change);
    }
}

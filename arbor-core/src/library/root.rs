use std::future::Future;

use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::identity::SharedItem;

/// Lazily built root folder. The first caller runs the initializer under
/// `init`; everyone after that reads the published reference without
/// touching the mutex.
#[derive(Debug, Default)]
pub struct LazyFolder {
    published: RwLock<Option<SharedItem>>,
    init: Mutex<()>,
}

impl LazyFolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<SharedItem> {
        self.published.read().clone()
    }

    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<SharedItem>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SharedItem>>,
    {
        if let Some(folder) = self.get() {
            return Ok(folder);
        }

        let _guard = self.init.lock().await;
        // Another caller may have finished while we waited.
        if let Some(folder) = self.get() {
            return Ok(folder);
        }

        let folder = init().await?;
        *self.published.write() = Some(folder.clone());
        Ok(folder)
    }

    /// Forget the published folder; the next access rebuilds it.
    pub fn invalidate(&self) {
        self.published.write().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::shared;
    use arbor_model::{BaseItem, ItemType};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_access_initializes_once() {
        let folder = Arc::new(LazyFolder::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let folder = folder.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    folder
                        .get_or_try_init(|| async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::task::yield_now().await;
                            Ok(shared(BaseItem::new(
                                ItemType::AggregateFolder,
                            )))
                        })
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn invalidate_forces_a_rebuild() {
        let folder = LazyFolder::new();
        let first = folder
            .get_or_try_init(|| async {
                Ok(shared(BaseItem::new(ItemType::UserRootFolder)))
            })
            .await
            .unwrap();
        folder.invalidate();
        assert!(folder.get().is_none());

        let second = folder
            .get_or_try_init(|| async {
                Ok(shared(BaseItem::new(ItemType::UserRootFolder)))
            })
            .await
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }
}

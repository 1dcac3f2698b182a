use std::io;
use std::path::Path;

use arbor_model::{ItemChange, ItemId};
use tracing::{debug, error, info};

use crate::error::{LibraryError, Result};
use crate::identity::SharedItem;

use super::LibraryManager;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Also remove the item's own file or directory.
    pub delete_file_location: bool,
}

impl LibraryManager {
    /// Delete an item and everything below it.
    ///
    /// Metadata directories that are already gone count as deleted; other
    /// failures removing them are logged and skipped. Repository failures
    /// are logged too, and the items still leave the cache.
    pub async fn delete_item(
        &self,
        item: &SharedItem,
        options: DeleteOptions,
    ) -> Result<()> {
        let snapshot = item.read().clone();
        if snapshot.id.is_nil() {
            return Err(LibraryError::invalid_argument(
                "cannot delete an item without an id",
            ));
        }

        let children = self.recursive_children(item).await?;
        let child_snapshots: Vec<_> =
            children.iter().map(|child| child.read().clone()).collect();
        info!(
            id = %snapshot.id,
            name = %snapshot.name,
            children = child_snapshots.len(),
            "deleting item"
        );

        let metadata_paths: Vec<_> = std::iter::once(&snapshot)
            .chain(child_snapshots.iter())
            .map(|item| self.item_metadata_path(item))
            .collect();
        for path in &metadata_paths {
            self.remove_metadata_path(path).await;
        }

        if options.delete_file_location
            && !snapshot.is_remote_or_virtual()
            && let Some(path) = snapshot.path.as_deref()
        {
            self.remove_file_location(path, snapshot.is_folder()).await?;
        }

        if let Some(parent_id) = snapshot.parent_id {
            self.unlink_from_parent(parent_id, snapshot.id).await;
        }

        let ids: Vec<ItemId> = std::iter::once(snapshot.id)
            .chain(child_snapshots.iter().map(|child| child.id))
            .collect();
        for id in &ids {
            if let Err(err) = self.repository.delete_item(*id).await {
                error!(%id, "failed to delete item from repository: {err}");
            }
        }
        for id in &ids {
            self.cache.remove(id);
            self.by_reference.remove(id);
        }

        let parent_id = snapshot.parent_id;
        self.events
            .publish(ItemChange::removed(snapshot, parent_id))
            .await;
        Ok(())
    }

    async fn remove_metadata_path(&self, path: &Path) {
        match self.fs.remove_dir_all(path).await {
            Ok(()) => debug!(path = %path.display(), "metadata removed"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => error!(
                path = %path.display(),
                "failed to remove metadata directory: {err}"
            ),
        }
    }

    async fn remove_file_location(
        &self,
        path: &Path,
        is_folder: bool,
    ) -> Result<()> {
        info!(path = %path.display(), "deleting file location");
        let removed = if is_folder {
            self.fs.remove_dir_all(path).await
        } else {
            self.fs.remove_file(path).await
        };
        match removed {
            Err(err) if err.kind() != io::ErrorKind::NotFound => {
                Err(err.into())
            }
            _ => Ok(()),
        }
    }

    async fn unlink_from_parent(&self, parent_id: ItemId, child_id: ItemId) {
        let Some(parent) = self.cache.get(&parent_id) else {
            return;
        };
        let unlinked = {
            let mut guard = parent.write();
            let before = guard.children.len();
            guard.children.retain(|id| *id != child_id);
            before != guard.children.len()
        };
        if unlinked && let Err(err) = self.persist_item(&parent).await {
            error!(%parent_id, "failed to save parent after delete: {err}");
        }
    }
}

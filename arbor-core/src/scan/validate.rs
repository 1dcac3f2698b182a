use std::collections::{HashMap, HashSet};
use std::ops::AddAssign;

use arbor_model::{BaseItem, ItemUpdateReason};
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{LibraryError, Result};
use crate::fs::FsEntry;
use crate::identity::SharedItem;
use crate::library::{DeleteOptions, LibraryManager};
use crate::progress::Progress;
use crate::resolve::DirectoryService;

/// Share of a folder's progress spent reconciling its own children before
/// recursing.
const RECONCILE_WEIGHT: f64 = 10.0;

/// What a validation pass changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

impl AddAssign for ScanSummary {
    fn add_assign(&mut self, other: Self) {
        self.added += other.added;
        self.updated += other.updated;
        self.removed += other.removed;
    }
}

/// Copy the file-system derived fields of a fresh resolution onto a known
/// item. Metadata-owned fields (name, genres, ...) are left alone.
pub fn apply_resolved(existing: &mut BaseItem, resolved: &BaseItem) -> bool {
    fn sync<T: PartialEq + Clone>(target: &mut T, value: &T) -> bool {
        if target == value {
            return false;
        }
        *target = value.clone();
        true
    }

    let mut changed = false;
    changed |= sync(&mut existing.path, &resolved.path);
    changed |= sync(&mut existing.parent_id, &resolved.parent_id);
    changed |= sync(&mut existing.date_modified, &resolved.date_modified);
    changed |= sync(&mut existing.collection_type, &resolved.collection_type);
    changed |= sync(
        &mut existing.physical_locations,
        &resolved.physical_locations,
    );
    changed |=
        sync(&mut existing.additional_parts, &resolved.additional_parts);
    changed |= sync(&mut existing.index_number, &resolved.index_number);
    changed |=
        sync(&mut existing.index_number_end, &resolved.index_number_end);
    changed |= sync(
        &mut existing.parent_index_number,
        &resolved.parent_index_number,
    );
    changed |= sync(&mut existing.premiere_date, &resolved.premiere_date);
    changed |= sync(&mut existing.extra_type, &resolved.extra_type);
    if existing.production_year.is_none() && resolved.production_year.is_some()
    {
        existing.production_year = resolved.production_year;
        changed = true;
    }
    changed
}

/// Reconciles folder children with the file system, optionally all the way
/// down. Listings come from the scan's [`DirectoryService`].
pub struct FolderValidator<'a> {
    library: &'a LibraryManager,
    dirs: &'a DirectoryService,
    cancel: &'a CancellationToken,
}

impl std::fmt::Debug for FolderValidator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderValidator")
            .field("cached_listings", &self.dirs.cached_listings())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl<'a> FolderValidator<'a> {
    pub fn new(
        library: &'a LibraryManager,
        dirs: &'a DirectoryService,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            library,
            dirs,
            cancel,
        }
    }

    fn ensure_not_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(LibraryError::Cancelled(
                "library validation".to_string(),
            ));
        }
        Ok(())
    }

    /// Make `folder`'s children match the file system. With `recursive`
    /// every child folder is validated too; a failing subtree is logged and
    /// skipped, cancellation unwinds the whole walk.
    pub fn validate_children<'s>(
        &'s self,
        folder: SharedItem,
        recursive: bool,
        progress: Progress,
    ) -> BoxFuture<'s, Result<ScanSummary>> {
        Box::pin(async move {
            self.ensure_not_cancelled()?;
            let path = folder.read().path.clone();
            let mut summary = ScanSummary::default();

            if let Some(path) = path {
                match self
                    .library
                    .resolver()
                    .list_children(&path, self.dirs)
                    .await
                {
                    Ok(entries) => {
                        summary += self.reconcile(&folder, &entries).await?;
                    }
                    Err(err) => {
                        warn!(
                            path = %path.display(),
                            "folder unavailable, keeping children: {err}"
                        );
                        progress.report(100.0);
                        return Ok(summary);
                    }
                }
            }

            if !recursive {
                progress.report(100.0);
                return Ok(summary);
            }
            progress.report(RECONCILE_WEIGHT);

            let child_folders = self.child_folders(&folder).await?;
            let count = child_folders.len() as f64;
            let span = 100.0 - RECONCILE_WEIGHT;
            for (index, child) in child_folders.into_iter().enumerate() {
                self.ensure_not_cancelled()?;
                let start = RECONCILE_WEIGHT + span * index as f64 / count;
                let end =
                    RECONCILE_WEIGHT + span * (index + 1) as f64 / count;
                let band = progress.scaled(start, end);

                match self.validate_children(child.clone(), true, band).await {
                    Ok(child_summary) => summary += child_summary,
                    Err(err) if err.is_cancelled() => return Err(err),
                    Err(err) => {
                        let path =
                            child.read().path.clone().unwrap_or_default();
                        error!(
                            path = %path.display(),
                            "failed to validate folder: {err}"
                        );
                    }
                }
            }

            progress.report(100.0);
            Ok(summary)
        })
    }

    async fn child_folders(
        &self,
        folder: &SharedItem,
    ) -> Result<Vec<SharedItem>> {
        let ids = folder.read().children.clone();
        let mut folders = Vec::new();
        for id in ids {
            let Some(child) = self.library.get_item_by_id(id).await? else {
                continue;
            };
            let is_folder = child.read().is_folder();
            if is_folder {
                folders.push(child);
            }
        }
        Ok(folders)
    }

    async fn reconcile(
        &self,
        folder: &SharedItem,
        entries: &[FsEntry],
    ) -> Result<ScanSummary> {
        let resolved = self
            .library
            .resolver()
            .resolve_paths(entries, Some(folder), None, self.dirs)
            .await;
        // Nothing has been registered yet; bail before anything is.
        self.ensure_not_cancelled()?;

        let (folder_id, known_ids) = {
            let guard = folder.read();
            (guard.id, guard.children.clone())
        };
        let mut known = HashMap::with_capacity(known_ids.len());
        for id in &known_ids {
            if let Some(item) = self.library.get_item_by_id(*id).await? {
                known.insert(*id, item);
            }
        }

        let mut child_ids = Vec::with_capacity(resolved.len());
        let mut seen = HashSet::with_capacity(resolved.len());
        let mut created = Vec::new();
        let mut changed = Vec::new();
        for item in resolved {
            if !seen.insert(item.id) {
                debug!(id = %item.id, "duplicate resolution skipped");
                continue;
            }
            child_ids.push(item.id);

            let existing = match known.get(&item.id) {
                Some(existing) => Some(existing.clone()),
                None => self.library.get_item_by_id(item.id).await?,
            };
            match existing {
                Some(existing) => {
                    let updated = apply_resolved(&mut existing.write(), &item);
                    if updated {
                        changed.push(existing);
                    }
                }
                None => created.push(item),
            }
        }

        let mut summary = ScanSummary {
            added: created.len(),
            updated: changed.len(),
            removed: 0,
        };

        for (id, item) in &known {
            if seen.contains(id) {
                continue;
            }
            let path = item.read().path.clone().unwrap_or_default();
            info!(%id, path = %path.display(), "item no longer exists");
            match self
                .library
                .delete_item(item, DeleteOptions::default())
                .await
            {
                Ok(()) => summary.removed += 1,
                Err(err) => error!(%id, "failed to remove item: {err}"),
            }
        }

        self.library.create_items(created).await?;
        if !changed.is_empty() {
            self.library
                .update_items(&changed, ItemUpdateReason::FileSystemChange)
                .await?;
        }

        let relinked = {
            let mut guard = folder.write();
            if guard.children == child_ids {
                false
            } else {
                guard.children = child_ids;
                true
            }
        };
        if relinked {
            self.library.persist_item(folder).await?;
        }

        debug!(
            folder = %folder_id,
            added = summary.added,
            updated = summary.updated,
            removed = summary.removed,
            "children reconciled"
        );
        Ok(summary)
    }
}

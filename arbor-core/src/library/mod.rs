//! The library manager: the entry point that owns the item cache, the
//! by-reference map, the resolver and the root folders, and that every
//! create, update and delete goes through.

pub mod delete;
pub mod named;
pub mod root;
pub mod virtual_folders;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arbor_model::{BaseItem, ItemChange, ItemId, ItemType, ItemUpdateReason};
use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::LibraryConfig;
use crate::error::{LibraryError, Result};
use crate::events::LibraryEventBus;
use crate::fs::FileSystem;
use crate::identity::{ItemCache, ReferenceMap, SharedItem, shared};
use crate::ports::{
    ItemRepository, ProviderManager, ScheduledTaskKind, TaskScheduler,
};
use crate::resolve::{CollectionRoot, DirectoryService, LibraryResolver};

pub use delete::DeleteOptions;
pub use named::{NamedItemKind, NamedItemPolicy};
pub use root::LazyFolder;

/// External capabilities the manager is wired to.
#[derive(Debug, Clone)]
pub struct LibraryCollaborators {
    pub fs: Arc<dyn FileSystem>,
    pub repository: Arc<dyn ItemRepository>,
    pub provider_manager: Arc<dyn ProviderManager>,
    pub scheduler: Arc<dyn TaskScheduler>,
}

#[derive(Debug)]
pub struct LibraryManager {
    fs: Arc<dyn FileSystem>,
    repository: Arc<dyn ItemRepository>,
    provider_manager: Arc<dyn ProviderManager>,
    scheduler: Arc<dyn TaskScheduler>,
    resolver: LibraryResolver,
    cache: ItemCache,
    by_reference: ReferenceMap,
    events: LibraryEventBus,
    root_folder: LazyFolder,
    user_root_folder: LazyFolder,
}

impl LibraryManager {
    /// Manager with the built-in resolvers and ignore rules.
    pub fn new(
        config: Arc<LibraryConfig>,
        collaborators: LibraryCollaborators,
    ) -> Self {
        let resolver =
            LibraryResolver::new(collaborators.fs.clone(), config);
        Self::with_resolver(resolver, collaborators)
    }

    pub fn with_resolver(
        resolver: LibraryResolver,
        collaborators: LibraryCollaborators,
    ) -> Self {
        Self {
            fs: collaborators.fs,
            repository: collaborators.repository,
            provider_manager: collaborators.provider_manager,
            scheduler: collaborators.scheduler,
            resolver,
            cache: ItemCache::new(),
            by_reference: ReferenceMap::new(),
            events: LibraryEventBus::default(),
            root_folder: LazyFolder::new(),
            user_root_folder: LazyFolder::new(),
        }
    }

    pub fn config(&self) -> Arc<LibraryConfig> {
        self.resolver.config()
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn repository(&self) -> &Arc<dyn ItemRepository> {
        &self.repository
    }

    pub fn resolver(&self) -> &LibraryResolver {
        &self.resolver
    }

    pub fn cache(&self) -> &ItemCache {
        &self.cache
    }

    pub fn by_reference(&self) -> &ReferenceMap {
        &self.by_reference
    }

    pub fn events(&self) -> &LibraryEventBus {
        &self.events
    }

    /// Deterministic id for `key` under `item_type`.
    pub fn get_new_item_id(
        &self,
        key: &str,
        item_type: ItemType,
    ) -> Result<ItemId> {
        self.resolver.derive_id(key, item_type)
    }

    /// Upsert into the cache. Last writer wins on racing registrations.
    pub fn register_item(&self, item: SharedItem) -> Result<()> {
        if item.read().id.is_nil() {
            return Err(LibraryError::invalid_argument(
                "cannot register an item without an id",
            ));
        }
        self.cache.insert(item);
        Ok(())
    }

    /// Cache first, then the repository. A repository hit is registered
    /// before it is returned; a miss on both is `Ok(None)`.
    pub async fn get_item_by_id(
        &self,
        id: ItemId,
    ) -> Result<Option<SharedItem>> {
        if id.is_nil() {
            return Err(LibraryError::invalid_argument("item id is empty"));
        }
        if let Some(item) = self.cache.get(&id) {
            return Ok(Some(item));
        }

        let Some(item) = self.repository.retrieve_item(id).await? else {
            return Ok(None);
        };
        debug!(%id, "loaded item from repository");
        Ok(Some(self.cache.get_or_insert(shared(item))))
    }

    /// Keep one instance per referent: the first registration wins and
    /// later callers get that instance back.
    pub fn get_or_add_by_reference(&self, item: SharedItem) -> SharedItem {
        self.by_reference.get_or_add(item)
    }

    pub async fn create_item(&self, item: BaseItem) -> Result<SharedItem> {
        let mut created = self.create_items(vec![item]).await?;
        created.pop().ok_or_else(|| {
            LibraryError::Internal("created item went missing".to_string())
        })
    }

    /// Persist, register and announce new items.
    pub async fn create_items(
        &self,
        items: Vec<BaseItem>,
    ) -> Result<Vec<SharedItem>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        if items.iter().any(|item| item.id.is_nil()) {
            return Err(LibraryError::invalid_argument(
                "cannot create an item without an id",
            ));
        }

        self.repository.save_items(&items).await?;

        let mut created = Vec::with_capacity(items.len());
        for item in items {
            let entry = shared(item.clone());
            self.cache.insert(entry.clone());
            self.events.publish(ItemChange::added(item)).await;
            created.push(entry);
        }
        Ok(created)
    }

    /// Persist an in-place modification and announce it. Sidecar metadata
    /// is written for file-system items only.
    pub async fn update_item(
        &self,
        item: &SharedItem,
        reason: ItemUpdateReason,
    ) -> Result<()> {
        self.update_items(std::slice::from_ref(item), reason).await
    }

    pub async fn update_items(
        &self,
        items: &[SharedItem],
        reason: ItemUpdateReason,
    ) -> Result<()> {
        let mut snapshots = Vec::with_capacity(items.len());
        for item in items {
            let snapshot = item.read().clone();
            if !snapshot.is_remote_or_virtual() {
                self.provider_manager
                    .save_metadata(&snapshot, reason)
                    .await?;
            }
            let stamped = {
                let mut guard = item.write();
                guard.date_last_saved = Some(Utc::now());
                guard.clone()
            };
            snapshots.push(stamped);
        }

        self.repository.save_items(&snapshots).await?;

        for (item, snapshot) in items.iter().zip(snapshots) {
            self.register_item(item.clone())?;
            self.events
                .publish(ItemChange::updated(snapshot, reason))
                .await;
        }
        Ok(())
    }

    /// Write the current state of `item` without sidecars or events; used
    /// for bookkeeping such as child lists.
    pub async fn persist_item(&self, item: &SharedItem) -> Result<()> {
        let snapshot = item.read().clone();
        self.repository.save_item(&snapshot).await
    }

    /// The physical root aggregating every library location.
    pub async fn get_root_folder(&self) -> Result<SharedItem> {
        self.root_folder
            .get_or_try_init(|| async {
                let path = self.config().paths.root_folder_path();
                self.fs.create_dir_all(&path).await?;
                self.materialize_folder(&path, None).await
            })
            .await
    }

    /// The default user root, whose children are the collection folders.
    pub async fn get_user_root_folder(&self) -> Result<SharedItem> {
        self.user_root_folder
            .get_or_try_init(|| async {
                let path = self.config().paths.default_user_views_path();
                self.fs.create_dir_all(&path).await?;
                self.materialize_folder(&path, None).await
            })
            .await
    }

    /// Resolve a folder and prefer the instance already cached or
    /// persisted under the same id.
    async fn materialize_folder(
        &self,
        path: &Path,
        parent: Option<&SharedItem>,
    ) -> Result<SharedItem> {
        let entry = self.fs.metadata(path).await?;
        let dirs = DirectoryService::new(self.fs.clone());
        let resolved = self
            .resolver
            .resolve_path(&entry, parent, None, &dirs)
            .await?
            .ok_or_else(|| LibraryError::Resolution {
                path: path.to_path_buf(),
                reason: "no resolver claimed the folder".to_string(),
            })?;

        if let Some(existing) = self.get_item_by_id(resolved.id).await? {
            return Ok(existing);
        }
        info!(
            path = %path.display(),
            item_type = %resolved.item_type,
            "created root folder"
        );
        self.create_item(resolved).await
    }

    /// Sync a folder's modification stamp with the file system, saving it
    /// when it moved. Returns whether anything changed.
    pub async fn refresh_folder(&self, folder: &SharedItem) -> Result<bool> {
        let Some(path) = folder.read().path.clone() else {
            return Ok(false);
        };
        let entry = self.fs.metadata(&path).await?;
        let changed = {
            let mut guard = folder.write();
            match entry.modified {
                Some(modified) if modified != guard.date_modified => {
                    guard.date_modified = modified;
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.update_item(folder, ItemUpdateReason::FileSystemChange)
                .await?;
        }
        Ok(changed)
    }

    /// Rebuild the resolver's collection roots from the library folders on
    /// disk, so media roots get their collection type before they are
    /// validated.
    pub async fn refresh_collection_roots(
        &self,
        dirs: &DirectoryService,
    ) -> Result<Vec<CollectionRoot>> {
        let user_root = self.get_user_root_folder().await?;
        let path = self.config().paths.default_user_views_path();
        let entries = self.resolver.list_children(&path, dirs).await?;
        let folders: Vec<_> =
            entries.into_iter().filter(|entry| entry.is_dir).collect();

        let roots: Vec<CollectionRoot> = self
            .resolver
            .resolve_paths(&folders, Some(&user_root), None, dirs)
            .await
            .into_iter()
            .filter(|item| item.item_type == ItemType::CollectionFolder)
            .flat_map(|item| {
                let collection_type = item.collection_type;
                item.physical_locations.into_iter().map(move |path| {
                    CollectionRoot {
                        path,
                        collection_type,
                    }
                })
            })
            .collect();

        debug!(count = roots.len(), "collection roots refreshed");
        self.resolver.set_collection_roots(roots.clone());
        Ok(roots)
    }

    /// Every descendant reachable through child links, parents before
    /// children. Ids that resolve to nothing are skipped.
    pub async fn recursive_children(
        &self,
        item: &SharedItem,
    ) -> Result<Vec<SharedItem>> {
        let mut seen = HashSet::new();
        seen.insert(item.read().id);
        let mut pending = item.read().children.clone();
        let mut found = Vec::new();

        while !pending.is_empty() {
            let mut next = Vec::new();
            for id in pending {
                if !seen.insert(id) {
                    continue;
                }
                let Some(child) = self.get_item_by_id(id).await? else {
                    continue;
                };
                next.extend(child.read().children.iter().copied());
                found.push(child);
            }
            pending = next;
        }
        Ok(found)
    }

    /// Directory holding an item's sidecar metadata. Named items keep
    /// theirs in their own directory.
    pub fn item_metadata_path(&self, item: &BaseItem) -> PathBuf {
        if item.item_type.is_named()
            && let Some(path) = &item.path
        {
            return path.clone();
        }
        let id = item.id.to_simple_string();
        self.config()
            .paths
            .internal_metadata_path()
            .join(&id[..2])
            .join(&id)
    }

    /// Queue a full library refresh with the external scheduler.
    pub async fn queue_library_scan(&self) {
        self.scheduler
            .queue_scheduled_task(ScheduledTaskKind::RefreshMediaLibrary)
            .await;
    }

    /// Cancel a running refresh, if any, and queue a new one.
    pub async fn restart_library_scan(&self) {
        self.scheduler
            .cancel_if_running_and_queue(ScheduledTaskKind::RefreshMediaLibrary)
            .await;
    }

    /// React to a configuration change. Settings that alter what cached
    /// items look like invalidate them and queue a rescan.
    pub async fn apply_configuration(
        &self,
        config: Arc<LibraryConfig>,
    ) -> Result<()> {
        let previous = self.config();
        if *previous == *config {
            return Ok(());
        }
        self.resolver.set_config(config.clone());

        let mut rescan = false;
        if previous.paths.root_folder_path() != config.paths.root_folder_path()
        {
            self.root_folder.invalidate();
            self.user_root_folder.invalidate();
            info!("root folder moved; root folders will be rebuilt");
            rescan = true;
        }
        if previous.season_zero_display_name != config.season_zero_display_name
        {
            let renamed = self
                .rename_season_zero(&config.season_zero_display_name)
                .await?;
            info!(renamed, "season zero display name changed");
            rescan = true;
        }
        if previous.paths.items_by_name_path()
            != config.paths.items_by_name_path()
            || previous.enable_normalized_item_by_name_ids
                != config.enable_normalized_item_by_name_ids
        {
            let removed = self.invalidate_named_items();
            info!(removed, "named item caches invalidated");
            rescan = true;
        }
        if previous.content_type_overrides != config.content_type_overrides
            || previous.enable_archive_media_files
                != config.enable_archive_media_files
        {
            rescan = true;
        }

        if rescan {
            self.queue_library_scan().await;
        }
        Ok(())
    }

    async fn rename_season_zero(&self, name: &str) -> Result<usize> {
        let mut renamed = Vec::new();
        for item in self.cache.values() {
            let mut guard = item.write();
            if guard.item_type == ItemType::Season
                && guard.index_number == Some(0)
                && guard.name != name
            {
                guard.name = name.to_string();
                drop(guard);
                renamed.push(item);
            }
        }
        if !renamed.is_empty() {
            self.update_items(&renamed, ItemUpdateReason::MetadataEdit)
                .await?;
        }
        Ok(renamed.len())
    }

    fn invalidate_named_items(&self) -> usize {
        let removed = self.cache.remove_where(|item| item.item_type.is_named());
        self.by_reference.remove_where(|item| item.item_type.is_named());
        removed
    }

    /// Apply every configuration published on `updates` until `cancel`
    /// fires or the sender goes away.
    pub fn spawn_configuration_listener(
        self: &Arc<Self>,
        mut updates: watch::Receiver<Arc<LibraryConfig>>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = updates.changed() => {
                        if changed.is_err() {
                            warn!("configuration channel closed");
                            break;
                        }
                        let config = updates.borrow_and_update().clone();
                        if let Err(err) =
                            manager.apply_configuration(config).await
                        {
                            error!("failed to apply configuration: {err}");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use crate::infra::{
        InMemoryItemRepository, RecordingProviderManager,
        RecordingTaskScheduler,
    };
    use arbor_model::LocationType;

    struct Harness {
        manager: LibraryManager,
        repository: Arc<InMemoryItemRepository>,
        providers: Arc<RecordingProviderManager>,
        scheduler: Arc<RecordingTaskScheduler>,
    }

    fn harness() -> Harness {
        let fs = Arc::new(InMemoryFs::new());
        let repository = Arc::new(InMemoryItemRepository::new());
        let providers = Arc::new(RecordingProviderManager::new());
        let scheduler = Arc::new(RecordingTaskScheduler::new());
        let manager = LibraryManager::new(
            Arc::new(LibraryConfig::with_data_path("/data")),
            LibraryCollaborators {
                fs,
                repository: repository.clone(),
                provider_manager: providers.clone(),
                scheduler: scheduler.clone(),
            },
        );
        Harness {
            manager,
            repository,
            providers,
            scheduler,
        }
    }

    fn movie(manager: &LibraryManager, path: &str) -> BaseItem {
        let mut item = BaseItem::with_path(ItemType::Movie, path);
        item.id = manager.get_new_item_id(path, ItemType::Movie).unwrap();
        item
    }

    #[tokio::test]
    async fn nil_ids_are_rejected() {
        let h = harness();
        let err = h.manager.get_item_by_id(ItemId::nil()).await.unwrap_err();
        assert!(matches!(err, LibraryError::InvalidArgument(_)));
        let err = h
            .manager
            .register_item(shared(BaseItem::new(ItemType::Movie)))
            .unwrap_err();
        assert!(matches!(err, LibraryError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn repository_hits_are_registered() {
        let h = harness();
        let item = movie(&h.manager, "/media/movies/Heat.mkv");
        let id = item.id;
        h.repository.seed(item);

        let loaded = h.manager.get_item_by_id(id).await.unwrap().unwrap();
        let cached = h.manager.cache().get(&id).expect("registered");
        assert!(Arc::ptr_eq(&loaded, &cached));

        let unknown = movie(&h.manager, "/media/movies/Ronin.mkv").id;
        assert!(h.manager.get_item_by_id(unknown).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn updates_skip_sidecars_for_virtual_items() {
        let h = harness();
        let mut virtual_item = movie(&h.manager, "/media/movies/Ghost.mkv");
        virtual_item.location_type = LocationType::Virtual;
        let real = h
            .manager
            .create_item(movie(&h.manager, "/media/movies/Heat.mkv"))
            .await
            .unwrap();
        let ghost = h.manager.create_item(virtual_item).await.unwrap();

        h.manager
            .update_items(
                &[real.clone(), ghost.clone()],
                ItemUpdateReason::MetadataEdit,
            )
            .await
            .unwrap();

        let saved = h.providers.saved();
        assert_eq!(
            saved,
            vec![(real.read().id, ItemUpdateReason::MetadataEdit)]
        );
        assert!(real.read().date_last_saved.is_some());
        assert!(ghost.read().date_last_saved.is_some());
    }

    #[tokio::test]
    async fn metadata_paths_are_sharded_by_id_prefix() {
        let h = harness();
        let item = movie(&h.manager, "/media/movies/Heat.mkv");
        let id = item.id.to_simple_string();
        assert_eq!(
            h.manager.item_metadata_path(&item),
            PathBuf::from("/data/metadata/library")
                .join(&id[..2])
                .join(&id)
        );
    }

    #[tokio::test]
    async fn season_zero_rename_queues_a_scan() {
        let h = harness();
        let mut season = BaseItem::with_path(
            ItemType::Season,
            "/media/tv/Lost/Specials",
        );
        season.id = h
            .manager
            .get_new_item_id("/media/tv/Lost/Specials", ItemType::Season)
            .unwrap();
        season.index_number = Some(0);
        season.name = "Specials".to_string();
        let season = h.manager.create_item(season).await.unwrap();

        let mut config = (*h.manager.config()).clone();
        config.season_zero_display_name = "Extras".to_string();
        h.manager.apply_configuration(Arc::new(config)).await.unwrap();

        assert_eq!(season.read().name, "Extras");
        assert_eq!(
            h.scheduler.queued(),
            vec![ScheduledTaskKind::RefreshMediaLibrary]
        );
    }

    #[tokio::test]
    async fn unchanged_configuration_is_a_no_op() {
        let h = harness();
        let same = h.manager.config();
        h.manager.apply_configuration(same).await.unwrap();
        assert!(h.scheduler.queued().is_empty());
        assert_eq!(h.repository.save_count(), 0);
    }
}

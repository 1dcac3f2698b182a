use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arbor_model::{BaseItem, CollectionType, ItemId, ItemType};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tracing::{debug, error, trace, warn};

use crate::config::LibraryConfig;
use crate::error::{LibraryError, Result};
use crate::fs::{FileSystem, FsEntry, is_same_or_sub_path, paths_equal};
use crate::identity::{ItemIdGenerator, SharedItem};
use crate::naming::{file_name, file_stem};

use super::context::{ParentInfo, ResolutionContext};
use super::directory::DirectoryService;
use super::ignore::{IgnoreRule, IgnoreRuleSet};
use super::resolver::{BatchContext, ItemResolver, MultiItemResolver};
use super::resolvers::{builtin_multi_resolvers, builtin_resolvers};
use super::roots::normalize_root_path_list;

/// A directory containing this file resolves to nothing.
pub const IGNORE_MARKER_FILE: &str = ".ignore";

/// The physical root is flattened this many levels so its children are the
/// media folders behind each view rather than the per-user view folders.
const PHYSICAL_ROOT_FLATTEN_DEPTH: u32 = 2;

/// A media folder backing a collection, with the collection's type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRoot {
    pub path: PathBuf,
    pub collection_type: Option<CollectionType>,
}

/// Turns file-system locations into entities: builds resolution contexts,
/// applies ignore rules, lists directories, runs the resolver chain and
/// fills in initial values.
#[derive(Debug)]
pub struct LibraryResolver {
    fs: Arc<dyn FileSystem>,
    config: RwLock<Arc<LibraryConfig>>,
    ids: RwLock<ItemIdGenerator>,
    ignore_rules: IgnoreRuleSet,
    resolvers: Vec<Arc<dyn ItemResolver>>,
    multi_resolvers: Vec<Arc<dyn MultiItemResolver>>,
    collection_roots: RwLock<Vec<CollectionRoot>>,
}

impl LibraryResolver {
    /// Resolver with the built-in ignore rules and resolvers.
    pub fn new(fs: Arc<dyn FileSystem>, config: Arc<LibraryConfig>) -> Self {
        let mut resolver = Self::empty(fs, config);
        resolver.ignore_rules = IgnoreRuleSet::builtin();
        for item_resolver in builtin_resolvers() {
            resolver = resolver.with_resolver(item_resolver);
        }
        resolver.multi_resolvers = builtin_multi_resolvers();
        resolver
    }

    /// Resolver with no rules and no resolvers registered.
    pub fn empty(
        fs: Arc<dyn FileSystem>,
        config: Arc<LibraryConfig>,
    ) -> Self {
        let ids = ItemIdGenerator::from_config(&config);
        Self {
            fs,
            config: RwLock::new(config),
            ids: RwLock::new(ids),
            ignore_rules: IgnoreRuleSet::new(),
            resolvers: Vec::new(),
            multi_resolvers: Vec::new(),
            collection_roots: RwLock::new(Vec::new()),
        }
    }

    /// Register a resolver; the chain stays stably sorted by priority.
    pub fn with_resolver(mut self, resolver: Arc<dyn ItemResolver>) -> Self {
        self.resolvers.push(resolver);
        self.resolvers.sort_by_key(|resolver| resolver.priority());
        self
    }

    /// Multi-item resolvers are consulted in registration order.
    pub fn with_multi_resolver(
        mut self,
        resolver: Arc<dyn MultiItemResolver>,
    ) -> Self {
        self.multi_resolvers.push(resolver);
        self
    }

    pub fn with_ignore_rule(mut self, rule: Arc<dyn IgnoreRule>) -> Self {
        self.ignore_rules.push(rule);
        self
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn config(&self) -> Arc<LibraryConfig> {
        self.config.read().clone()
    }

    pub fn set_config(&self, config: Arc<LibraryConfig>) {
        *self.ids.write() = ItemIdGenerator::from_config(&config);
        *self.config.write() = config;
    }

    pub fn ids(&self) -> ItemIdGenerator {
        self.ids.read().clone()
    }

    pub fn derive_id(&self, key: &str, item_type: ItemType) -> Result<ItemId> {
        self.ids.read().derive(key, item_type)
    }

    pub fn resolver_names(&self) -> Vec<String> {
        self.resolvers
            .iter()
            .map(|resolver| resolver.name().to_string())
            .collect()
    }

    pub fn set_collection_roots(&self, roots: Vec<CollectionRoot>) {
        *self.collection_roots.write() = roots;
    }

    pub fn collection_roots(&self) -> Vec<CollectionRoot> {
        self.collection_roots.read().clone()
    }

    /// Whether `path` is a media folder behind a collection or carries a
    /// configured content-type override.
    pub fn is_library_root(&self, path: &Path) -> bool {
        let from_collections = self
            .collection_roots
            .read()
            .iter()
            .any(|root| paths_equal(&root.path, path));
        from_collections
            || self
                .config()
                .content_type_overrides
                .iter()
                .any(|entry| paths_equal(&entry.path, path))
    }

    /// Collection type for `path`: configured overrides first, then the
    /// collection whose media folder contains it, then the parent's.
    pub fn collection_type_for(
        &self,
        path: &Path,
        parent: Option<&ParentInfo>,
    ) -> Option<CollectionType> {
        self.config()
            .content_type_override(path)
            .or_else(|| {
                self.collection_roots
                    .read()
                    .iter()
                    .filter(|root| is_same_or_sub_path(&root.path, path))
                    .max_by_key(|root| root.path.components().count())
                    .and_then(|root| root.collection_type)
            })
            .or_else(|| parent.and_then(|parent| parent.collection_type))
    }

    /// Children of a directory as resolution sees them. Below the physical
    /// root, shortcuts are replaced by their targets; the physical root is
    /// additionally flattened and de-duplicated.
    pub async fn list_children(
        &self,
        path: &Path,
        dirs: &DirectoryService,
    ) -> io::Result<Vec<FsEntry>> {
        let root = self.config().paths.root_folder_path();
        let is_physical_root = paths_equal(path, &root);
        let resolve_shortcuts = is_same_or_sub_path(&root, path);
        let depth = if is_physical_root {
            PHYSICAL_ROOT_FLATTEN_DEPTH
        } else {
            0
        };

        let entries = self
            .collect_entries(path, depth, resolve_shortcuts, dirs)
            .await?;
        if is_physical_root {
            Ok(normalize_root_path_list(entries))
        } else {
            Ok(entries)
        }
    }

    fn collect_entries<'a>(
        &'a self,
        path: &'a Path,
        depth: u32,
        resolve_shortcuts: bool,
        dirs: &'a DirectoryService,
    ) -> BoxFuture<'a, io::Result<Vec<FsEntry>>> {
        Box::pin(async move {
            let listing = dirs.list(path).await?;
            let mut entries = Vec::with_capacity(listing.len());
            for entry in listing.iter() {
                if resolve_shortcuts && self.is_shortcut_entry(entry) {
                    if let Some(target) = self.follow_shortcut(entry).await {
                        entries.push(target);
                    }
                    continue;
                }

                if entry.is_dir && depth > 0 {
                    match self
                        .collect_entries(
                            &entry.path,
                            depth - 1,
                            resolve_shortcuts,
                            dirs,
                        )
                        .await
                    {
                        Ok(nested) => entries.extend(nested),
                        Err(err) => warn!(
                            path = %entry.path.display(),
                            "skipping unreadable folder: {err}"
                        ),
                    }
                    continue;
                }

                entries.push(entry.clone());
            }
            Ok(entries)
        })
    }

    fn is_shortcut_entry(&self, entry: &FsEntry) -> bool {
        entry.is_symlink
            || (!entry.is_dir && self.fs.is_shortcut(&entry.path))
    }

    async fn follow_shortcut(&self, entry: &FsEntry) -> Option<FsEntry> {
        let target = match self.fs.resolve_shortcut(&entry.path).await {
            Ok(Some(target)) if target.is_relative() => entry
                .path
                .parent()
                .map(|dir| self.fs.normalize_path(&dir.join(&target)))
                .unwrap_or(target),
            Ok(Some(target)) => target,
            Ok(None) => {
                warn!(path = %entry.path.display(), "empty shortcut");
                return None;
            }
            Err(err) => {
                warn!(
                    path = %entry.path.display(),
                    "failed to read shortcut: {err}"
                );
                return None;
            }
        };
        match self.fs.metadata(&target).await {
            Ok(meta) => Some(meta),
            Err(err) => {
                warn!(
                    shortcut = %entry.path.display(),
                    target = %target.display(),
                    "shortcut target unavailable: {err}"
                );
                None
            }
        }
    }

    fn context_for(
        &self,
        entry: &FsEntry,
        parent: Option<&ParentInfo>,
        hint: Option<CollectionType>,
    ) -> ResolutionContext {
        let collection_type =
            hint.or_else(|| self.collection_type_for(&entry.path, parent));
        let mut ctx = ResolutionContext::new(
            entry.clone(),
            parent.cloned(),
            collection_type,
            self.config(),
        );
        ctx.is_library_root = self.is_library_root(&entry.path);
        ctx.parent_is_library_root = parent
            .and_then(|parent| parent.path.as_deref())
            .is_some_and(|path| self.is_library_root(path));
        ctx
    }

    /// Resolve one location into at most one entity.
    ///
    /// Ignored paths, directories carrying [`IGNORE_MARKER_FILE`] and paths
    /// no resolver claims all yield `Ok(None)`.
    pub async fn resolve_path(
        &self,
        entry: &FsEntry,
        parent: Option<&SharedItem>,
        hint: Option<CollectionType>,
        dirs: &DirectoryService,
    ) -> Result<Option<BaseItem>> {
        let parent = parent.map(ParentInfo::of_shared);
        self.resolve_entry(entry, parent.as_ref(), hint, dirs).await
    }

    async fn resolve_entry(
        &self,
        entry: &FsEntry,
        parent: Option<&ParentInfo>,
        hint: Option<CollectionType>,
        dirs: &DirectoryService,
    ) -> Result<Option<BaseItem>> {
        let mut ctx = self.context_for(entry, parent, hint);

        if let Some(rule) = self.ignore_rules.first_match(&ctx) {
            trace!(rule, path = %entry.path.display(), "ignored");
            return Ok(None);
        }

        if ctx.is_directory() {
            ctx.children = self.list_children(&entry.path, dirs).await?;
            if ctx.has_child_named(IGNORE_MARKER_FILE) {
                debug!(path = %entry.path.display(), "ignore marker present");
                return Ok(None);
            }
        }

        let Some(mut item) = self.run_resolvers(&ctx) else {
            return Ok(None);
        };
        self.set_initial_item_values(
            &mut item,
            &ctx.entry,
            parent,
            ctx.collection_type,
        )?;
        Ok(Some(item))
    }

    /// First non-empty result in priority order wins; failing resolvers
    /// count as declining.
    fn run_resolvers(&self, ctx: &ResolutionContext) -> Option<BaseItem> {
        for resolver in &self.resolvers {
            match resolver.resolve(ctx) {
                Ok(Some(item)) => {
                    trace!(
                        resolver = resolver.name(),
                        path = %ctx.path().display(),
                        item_type = %item.item_type,
                        "resolved"
                    );
                    return Some(item);
                }
                Ok(None) => {}
                Err(err) => warn!(
                    resolver = resolver.name(),
                    path = %ctx.path().display(),
                    "resolver failed: {err}"
                ),
            }
        }
        None
    }

    fn is_ignored(
        &self,
        entry: &FsEntry,
        parent: Option<&ParentInfo>,
        hint: Option<CollectionType>,
    ) -> bool {
        let ctx = self.context_for(entry, parent, hint);
        self.ignore_rules.first_match(&ctx).is_some()
    }

    /// Resolve the contents of one folder. Multi-item resolvers get the
    /// first look; without a claim every file is resolved on its own.
    /// Failures are logged per file and never abort the batch.
    pub async fn resolve_paths(
        &self,
        files: &[FsEntry],
        parent: Option<&SharedItem>,
        hint: Option<CollectionType>,
        dirs: &DirectoryService,
    ) -> Vec<BaseItem> {
        let parent = parent.map(ParentInfo::of_shared);
        let parent = parent.as_ref();
        let config = self.config();

        let files: Vec<FsEntry> = files
            .iter()
            .filter(|entry| !self.is_ignored(entry, parent, hint))
            .cloned()
            .collect();

        let batch_type = hint.or_else(|| {
            let parent = parent?;
            parent
                .path
                .as_deref()
                .and_then(|path| self.collection_type_for(path, None))
                .or(parent.collection_type)
        });
        let batch = BatchContext {
            files: &files,
            parent,
            collection_type: batch_type,
            config: &config,
        };

        for resolver in &self.multi_resolvers {
            let resolution = match resolver.resolve_multiple(&batch) {
                Ok(Some(resolution)) if !resolution.items.is_empty() => {
                    resolution
                }
                Ok(_) => continue,
                Err(err) => {
                    warn!(
                        resolver = resolver.name(),
                        "multi-item resolver failed: {err}"
                    );
                    continue;
                }
            };

            let mut items = Vec::with_capacity(
                resolution.items.len() + resolution.extra_files.len(),
            );
            for mut item in resolution.items {
                let Some(path) = item.path.clone() else {
                    warn!(
                        resolver = resolver.name(),
                        "claimed item without a path"
                    );
                    continue;
                };
                let entry = files
                    .iter()
                    .find(|entry| entry.path == path)
                    .cloned()
                    .unwrap_or_else(|| FsEntry::file(path.clone(), 0));
                let collection_type =
                    hint.or_else(|| self.collection_type_for(&path, parent));
                match self.set_initial_item_values(
                    &mut item,
                    &entry,
                    parent,
                    collection_type,
                ) {
                    Ok(()) => items.push(item),
                    Err(err) => error!(
                        path = %path.display(),
                        "failed to initialize resolved item: {err}"
                    ),
                }
            }
            for extra in &resolution.extra_files {
                let resolved =
                    self.resolve_isolated(extra, parent, hint, dirs).await;
                items.extend(resolved);
            }
            return items;
        }

        let mut items = Vec::with_capacity(files.len());
        for entry in &files {
            let resolved =
                self.resolve_isolated(entry, parent, hint, dirs).await;
            items.extend(resolved);
        }
        items
    }

    async fn resolve_isolated(
        &self,
        entry: &FsEntry,
        parent: Option<&ParentInfo>,
        hint: Option<CollectionType>,
        dirs: &DirectoryService,
    ) -> Option<BaseItem> {
        match self.resolve_entry(entry, parent, hint, dirs).await {
            Ok(item) => item,
            Err(err) => {
                error!(
                    path = %entry.path.display(),
                    "failed to resolve: {err}"
                );
                None
            }
        }
    }

    /// Fill in what every resolved entity needs: path, name, id, parent
    /// link, timestamps and collection type. Values a resolver already set
    /// are kept.
    pub fn set_initial_item_values(
        &self,
        item: &mut BaseItem,
        entry: &FsEntry,
        parent: Option<&ParentInfo>,
        collection_type: Option<CollectionType>,
    ) -> Result<()> {
        let path =
            item.path.get_or_insert_with(|| entry.path.clone()).clone();

        if item.name.trim().is_empty() {
            let display = if entry.is_dir {
                file_name(&path)
            } else {
                file_stem(&path)
            };
            item.name = display.unwrap_or_default().to_string();
        }

        if item.id.is_nil() {
            item.id = self
                .ids
                .read()
                .derive_for_path(&path, item.item_type)
                .map_err(|err| LibraryError::Resolution {
                    path: path.clone(),
                    reason: err.to_string(),
                })?;
        }

        if let Some(parent) = parent {
            item.parent_id = Some(parent.id);
        }
        if let Some(created) = entry.created.or(entry.modified) {
            item.date_created = created;
        }
        if let Some(modified) = entry.modified {
            item.date_modified = modified;
        }
        if item.collection_type.is_none() {
            item.collection_type = collection_type;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;

    fn resolver(fs: Arc<InMemoryFs>) -> LibraryResolver {
        let config = Arc::new(LibraryConfig::with_data_path("/data"));
        LibraryResolver::new(fs, config)
    }

    #[tokio::test]
    async fn physical_root_children_are_deduplicated_targets() {
        let fs = Arc::new(InMemoryFs::new());
        fs.add_dir("/media/movies/action");
        fs.add_dir("/media/tv");
        fs.add_file("/data/root/default/Movies/movies.collection", 0);
        fs.add_shortcut("/data/root/default/Movies/a.mblink", "/media/movies");
        fs.add_shortcut(
            "/data/root/default/Movies/b.mblink",
            "/media/movies/action",
        );
        fs.add_shortcut("/data/root/default/Shows/tv.mblink", "/media/tv");
        let resolver = resolver(fs.clone());
        let dirs = DirectoryService::new(fs);

        let children = resolver
            .list_children(Path::new("/data/root"), &dirs)
            .await
            .unwrap();
        let dirs_only: Vec<_> = children
            .iter()
            .filter(|entry| entry.is_dir)
            .map(|entry| entry.path.clone())
            .collect();
        assert_eq!(
            dirs_only,
            vec![PathBuf::from("/media/movies"), PathBuf::from("/media/tv")]
        );
    }

    #[tokio::test]
    async fn ignore_marker_suppresses_a_directory() {
        let fs = Arc::new(InMemoryFs::new());
        fs.add_file("/media/movies/Skip/.ignore", 0);
        fs.add_file("/media/movies/Skip/Heat.mkv", 10);
        let resolver = resolver(fs.clone());
        let dirs = DirectoryService::new(fs);

        let resolved = resolver
            .resolve_path(
                &FsEntry::directory("/media/movies/Skip"),
                None,
                None,
                &dirs,
            )
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn initial_values_are_populated() {
        let fs = Arc::new(InMemoryFs::new());
        fs.add_file("/media/movies/Heat (1995).mkv", 10);
        let resolver = resolver(fs.clone());
        let dirs = DirectoryService::new(fs.clone());
        let entry = fs
            .metadata(Path::new("/media/movies/Heat (1995).mkv"))
            .await
            .unwrap();

        let item = resolver
            .resolve_path(&entry, None, Some(CollectionType::Movies), &dirs)
            .await
            .unwrap()
            .expect("movie");

        assert_eq!(item.item_type, ItemType::Movie);
        assert_eq!(item.name, "Heat");
        assert_eq!(item.production_year, Some(1995));
        assert_eq!(item.collection_type, Some(CollectionType::Movies));
        assert_eq!(
            item.id,
            resolver
                .derive_id("/media/movies/Heat (1995).mkv", ItemType::Movie)
                .unwrap()
        );
        assert_eq!(Some(item.date_modified), entry.modified);
    }
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arbor_model::{BaseItem, CollectionType, ItemId, ItemType};

use crate::config::LibraryConfig;
use crate::fs::{FsEntry, paths_equal};
use crate::identity::SharedItem;

/// What resolvers may know about the containing folder. Copied out of the
/// shared entity so no lock is held while resolvers run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentInfo {
    pub id: ItemId,
    pub item_type: ItemType,
    pub path: Option<PathBuf>,
    pub index_number: Option<u32>,
    pub collection_type: Option<CollectionType>,
}

impl ParentInfo {
    pub fn of(item: &BaseItem) -> Self {
        Self {
            id: item.id,
            item_type: item.item_type,
            path: item.path.clone(),
            index_number: item.index_number,
            collection_type: item.collection_type,
        }
    }

    pub fn of_shared(item: &SharedItem) -> Self {
        Self::of(&item.read())
    }
}

/// Transient state for resolving one file-system location.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub entry: FsEntry,
    pub parent: Option<ParentInfo>,
    /// Immediate children; only populated for directories, and only after
    /// the ignore rules have passed.
    pub children: Vec<FsEntry>,
    pub collection_type: Option<CollectionType>,
    /// The path itself is a configured library root.
    pub is_library_root: bool,
    /// The containing folder is a configured library root.
    pub parent_is_library_root: bool,
    pub config: Arc<LibraryConfig>,
}

impl ResolutionContext {
    pub fn new(
        entry: FsEntry,
        parent: Option<ParentInfo>,
        collection_type: Option<CollectionType>,
        config: Arc<LibraryConfig>,
    ) -> Self {
        Self {
            entry,
            parent,
            children: Vec::new(),
            collection_type,
            is_library_root: false,
            parent_is_library_root: false,
            config,
        }
    }

    pub fn path(&self) -> &Path {
        &self.entry.path
    }

    pub fn name(&self) -> &str {
        self.entry.name()
    }

    pub fn is_directory(&self) -> bool {
        self.entry.is_dir
    }

    pub fn parent_type(&self) -> Option<ItemType> {
        self.parent.as_ref().map(|parent| parent.item_type)
    }

    pub fn parent_is(&self, item_type: ItemType) -> bool {
        self.parent_type() == Some(item_type)
    }

    /// True for the physical root that holds every per-user view.
    pub fn is_root_folder(&self) -> bool {
        paths_equal(self.path(), &self.config.paths.root_folder_path())
    }

    pub fn is_user_root_folder(&self) -> bool {
        paths_equal(self.path(), &self.config.paths.default_user_views_path())
    }

    pub fn has_child_named(&self, name: &str) -> bool {
        self.children
            .iter()
            .any(|child| child.name().eq_ignore_ascii_case(name))
    }

    pub fn child_directories(&self) -> impl Iterator<Item = &FsEntry> {
        self.children.iter().filter(|child| child.is_dir)
    }

    pub fn child_files(&self) -> impl Iterator<Item = &FsEntry> {
        self.children.iter().filter(|child| !child.is_dir)
    }
}

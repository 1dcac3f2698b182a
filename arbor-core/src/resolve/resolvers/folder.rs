use std::ffi::OsStr;
use std::str::FromStr;

use arbor_model::{BaseItem, CollectionType, ItemType};

use crate::error::Result;
use crate::resolve::context::ResolutionContext;
use crate::resolve::resolver::{ItemResolver, ResolverPriority};

/// Suffix of the empty marker file naming a collection's type.
pub const COLLECTION_MARKER_EXTENSION: &str = "collection";

/// Aggregate root, default user root and the collection folders below it.
#[derive(Debug, Default, Clone, Copy)]
pub struct RootFolderResolver;

impl RootFolderResolver {
    /// Collection type named by a `<type>.collection` marker file.
    fn marker_collection_type(
        ctx: &ResolutionContext,
    ) -> Option<CollectionType> {
        ctx.child_files().find_map(|file| {
            let is_marker = file
                .path
                .extension()
                .and_then(OsStr::to_str)
                .is_some_and(|ext| {
                    ext.eq_ignore_ascii_case(COLLECTION_MARKER_EXTENSION)
                });
            if !is_marker {
                return None;
            }
            let stem = file.path.file_stem().and_then(OsStr::to_str)?;
            CollectionType::from_str(stem).ok()
        })
    }
}

impl ItemResolver for RootFolderResolver {
    fn name(&self) -> &str {
        "root-folder"
    }

    fn priority(&self) -> ResolverPriority {
        ResolverPriority::FIRST
    }

    fn resolve(&self, ctx: &ResolutionContext) -> Result<Option<BaseItem>> {
        if !ctx.is_directory() {
            return Ok(None);
        }

        if ctx.is_root_folder() {
            let mut item = BaseItem::new(ItemType::AggregateFolder);
            item.name = "root".to_string();
            return Ok(Some(item));
        }

        if ctx.is_user_root_folder() {
            let mut item = BaseItem::new(ItemType::UserRootFolder);
            item.name = "Media Folders".to_string();
            return Ok(Some(item));
        }

        if ctx.parent_is(ItemType::UserRootFolder) {
            let mut item = BaseItem::new(ItemType::CollectionFolder);
            item.name = ctx.name().to_string();
            item.collection_type = Self::marker_collection_type(ctx);
            item.physical_locations = ctx
                .child_directories()
                .map(|dir| dir.path.clone())
                .collect();
            return Ok(Some(item));
        }

        Ok(None)
    }
}

/// Any remaining directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct FolderResolver;

impl ItemResolver for FolderResolver {
    fn name(&self) -> &str {
        "folder"
    }

    fn priority(&self) -> ResolverPriority {
        ResolverPriority::LAST
    }

    fn resolve(&self, ctx: &ResolutionContext) -> Result<Option<BaseItem>> {
        if !ctx.is_directory() {
            return Ok(None);
        }
        let mut item = BaseItem::new(ItemType::Folder);
        item.name = ctx.name().to_string();
        Ok(Some(item))
    }
}

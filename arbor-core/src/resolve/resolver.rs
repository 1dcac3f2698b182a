use std::fmt;

use arbor_model::{BaseItem, CollectionType};

use crate::config::LibraryConfig;
use crate::error::Result;
use crate::fs::FsEntry;

use super::context::{ParentInfo, ResolutionContext};

/// Ordering key for single-item resolvers; lower runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResolverPriority(pub i32);

impl ResolverPriority {
    pub const PLUGIN: Self = Self(0);
    pub const FIRST: Self = Self(1);
    pub const SECOND: Self = Self(2);
    pub const THIRD: Self = Self(3);
    pub const FOURTH: Self = Self(4);
    pub const LAST: Self = Self(100);
}

/// Turns one resolution context into at most one entity.
///
/// Returning `Ok(None)` declines; an `Err` is logged by the pipeline and
/// treated the same way.
pub trait ItemResolver: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn priority(&self) -> ResolverPriority;

    fn resolve(&self, ctx: &ResolutionContext) -> Result<Option<BaseItem>>;
}

/// Files offered together to a [`MultiItemResolver`].
#[derive(Debug, Clone, Copy)]
pub struct BatchContext<'a> {
    pub files: &'a [FsEntry],
    pub parent: Option<&'a ParentInfo>,
    pub collection_type: Option<CollectionType>,
    pub config: &'a LibraryConfig,
}

/// Items claimed by a multi-item resolver plus the entries it left for
/// per-file resolution.
#[derive(Debug, Clone, Default)]
pub struct MultiItemResolution {
    pub items: Vec<BaseItem>,
    pub extra_files: Vec<FsEntry>,
}

/// Claims several files of one folder at once (stacked parts, trailers).
pub trait MultiItemResolver: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn resolve_multiple(
        &self,
        batch: &BatchContext<'_>,
    ) -> Result<Option<MultiItemResolution>>;
}

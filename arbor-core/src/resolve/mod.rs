//! Resolution pipeline: ignore rules, multi-item and single-item resolvers,
//! and the path resolver that drives them for one location or a batch.

pub mod context;
pub mod directory;
pub mod ignore;
pub mod library_resolver;
pub mod resolver;
pub mod resolvers;
pub mod roots;

pub use context::{ParentInfo, ResolutionContext};
pub use directory::DirectoryService;
pub use ignore::{ArchiveIgnoreRule, CoreIgnoreRule, IgnoreRule, IgnoreRuleSet};
pub use library_resolver::{CollectionRoot, IGNORE_MARKER_FILE, LibraryResolver};
pub use resolver::{
    BatchContext, ItemResolver, MultiItemResolution, MultiItemResolver,
    ResolverPriority,
};
pub use roots::{dedupe_root_paths, normalize_root_path_list};

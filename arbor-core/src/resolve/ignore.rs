//! Predicates that suppress resolution of a path before any listing.

use std::fmt;
use std::sync::Arc;

use crate::naming::ARCHIVE_FILE_EXTENSIONS;

use super::context::ResolutionContext;

/// Names that never hold media, compared case-insensitively.
const SYSTEM_NAMES: &[&str] = &[
    "$recycle.bin",
    "system volume information",
    "lost+found",
    "@eadir",
    "@recycle",
    "#recycle",
    ".@__thumb",
    "metadata",
    "extrafanart",
    "extrathumbs",
    ".actors",
    "trickplay",
    "thumbs.db",
    "desktop.ini",
    ".ds_store",
];

pub trait IgnoreRule: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn should_ignore(&self, ctx: &ResolutionContext) -> bool;
}

/// Hidden entries and well-known system or metadata folders.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreIgnoreRule;

impl IgnoreRule for CoreIgnoreRule {
    fn name(&self) -> &str {
        "core"
    }

    fn should_ignore(&self, ctx: &ResolutionContext) -> bool {
        let name = ctx.name();
        if name.is_empty() || ctx.is_root_folder() {
            return false;
        }
        if name.starts_with('.') {
            return true;
        }
        let lowered = name.to_lowercase();
        SYSTEM_NAMES.contains(&lowered.as_str())
    }
}

/// Archive files, unless archive media support is switched on.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveIgnoreRule;

impl IgnoreRule for ArchiveIgnoreRule {
    fn name(&self) -> &str {
        "archive"
    }

    fn should_ignore(&self, ctx: &ResolutionContext) -> bool {
        if ctx.is_directory() || ctx.config.enable_archive_media_files {
            return false;
        }
        ctx.entry.extension_lower().is_some_and(|ext| {
            ARCHIVE_FILE_EXTENSIONS.contains(&ext.as_str())
        })
    }
}

/// OR-combination of ignore rules; the first match wins.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRuleSet {
    rules: Vec<Arc<dyn IgnoreRule>>,
}

impl IgnoreRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut set = Self::new();
        set.push(Arc::new(CoreIgnoreRule));
        set.push(Arc::new(ArchiveIgnoreRule));
        set
    }

    pub fn push(&mut self, rule: Arc<dyn IgnoreRule>) {
        self.rules.push(rule);
    }

    /// Name of the first rule that rejects the context.
    pub fn first_match(&self, ctx: &ResolutionContext) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.should_ignore(ctx))
            .map(|rule| rule.name())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LibraryConfig;
    use crate::fs::FsEntry;

    fn ctx(entry: FsEntry, config: LibraryConfig) -> ResolutionContext {
        ResolutionContext::new(entry, None, None, Arc::new(config))
    }

    #[test]
    fn hidden_and_system_entries_are_ignored() {
        let rules = IgnoreRuleSet::builtin();
        let config = LibraryConfig::with_data_path("/data");

        let hidden = ctx(FsEntry::file("/m/.secret.mkv", 1), config.clone());
        assert_eq!(rules.first_match(&hidden), Some("core"));

        let recycle =
            ctx(FsEntry::directory("/m/$RECYCLE.BIN"), config.clone());
        assert_eq!(rules.first_match(&recycle), Some("core"));

        let movie = ctx(FsEntry::file("/m/Heat.mkv", 1), config);
        assert_eq!(rules.first_match(&movie), None);
    }

    #[test]
    fn archives_depend_on_configuration() {
        let rules = IgnoreRuleSet::builtin();
        let mut config = LibraryConfig::with_data_path("/data");
        let archive = FsEntry::file("/m/Heat.rar", 1);

        assert_eq!(
            rules.first_match(&ctx(archive.clone(), config.clone())),
            Some("archive")
        );

        config.enable_archive_media_files = true;
        assert_eq!(rules.first_match(&ctx(archive, config)), None);
    }
}

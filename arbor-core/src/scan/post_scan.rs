use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use arbor_model::BaseItem;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{LibraryError, Result};
use crate::library::{DeleteOptions, LibraryManager, NamedItemKind};
use crate::progress::Progress;

/// Work run once after structural validation, in ascending priority order.
#[async_trait]
pub trait PostScanTask: Send + Sync {
    fn name(&self) -> &str;

    fn priority(&self) -> i32 {
        0
    }

    /// `progress` is this task's own 0..=100 range.
    async fn run(
        &self,
        progress: Progress,
        cancel: CancellationToken,
    ) -> Result<()>;
}

/// Materializes the genre, studio or year items referenced by the library
/// and drops the ones nothing references any more.
#[derive(Debug)]
pub struct NamedItemsValidator {
    library: Arc<LibraryManager>,
    kind: NamedItemKind,
}

impl NamedItemsValidator {
    pub fn genres(library: Arc<LibraryManager>) -> Self {
        Self {
            library,
            kind: NamedItemKind::Genre,
        }
    }

    pub fn studios(library: Arc<LibraryManager>) -> Self {
        Self {
            library,
            kind: NamedItemKind::Studio,
        }
    }

    pub fn years(library: Arc<LibraryManager>) -> Self {
        Self {
            library,
            kind: NamedItemKind::Year,
        }
    }

    fn referenced_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for item in self.library.cache().values() {
            let item = item.read();
            if item.item_type.is_named() {
                continue;
            }
            self.collect(&item, &mut names);
        }
        names.retain(|name| !name.trim().is_empty());
        debug!(kind = ?self.kind, count = names.len(), "referenced names");
        names
    }

    fn collect(&self, item: &BaseItem, names: &mut BTreeSet<String>) {
        match self.kind {
            NamedItemKind::Genre => {
                names.extend(item.genres.iter().map(|g| g.trim().to_owned()));
            }
            NamedItemKind::Studio => {
                names.extend(item.studios.iter().map(|s| s.trim().to_owned()));
            }
            NamedItemKind::Year => {
                if let Some(year) = item.production_year.filter(|y| *y > 0) {
                    names.insert(year.to_string());
                }
            }
            _ => {}
        }
    }
}

#[async_trait]
impl PostScanTask for NamedItemsValidator {
    fn name(&self) -> &str {
        match self.kind {
            NamedItemKind::Genre => "genres",
            NamedItemKind::Studio => "studios",
            NamedItemKind::Year => "years",
            _ => "named-items",
        }
    }

    async fn run(
        &self,
        progress: Progress,
        cancel: CancellationToken,
    ) -> Result<()> {
        let names = self.referenced_names();
        let total = names.len().max(1) as f64;

        let mut live = HashSet::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(LibraryError::Cancelled(self.name().to_string()));
            }
            match self.library.get_item_by_name(self.kind, name).await {
                Ok(item) => {
                    let id = item.read().id;
                    live.insert(id);
                }
                Err(err) => error!(
                    task = self.name(),
                    name = %name,
                    "failed to materialize named item: {err}"
                ),
            }
            progress.report(90.0 * (index + 1) as f64 / total);
        }

        let item_type = self.kind.policy().item_type;
        let dead: Vec<_> = self
            .library
            .cache()
            .values()
            .into_iter()
            .filter(|item| {
                let item = item.read();
                item.item_type == item_type && !live.contains(&item.id)
            })
            .collect();
        for item in &dead {
            if cancel.is_cancelled() {
                return Err(LibraryError::Cancelled(self.name().to_string()));
            }
            if let Err(err) = self
                .library
                .delete_item(item, DeleteOptions::default())
                .await
            {
                error!(task = self.name(), "failed to remove item: {err}");
            }
        }

        info!(
            task = self.name(),
            live = live.len(),
            removed = dead.len(),
            "named items validated"
        );
        progress.report(100.0);
        Ok(())
    }
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arbor_model::{BaseItem, ItemChange, ItemType};
use tracing::debug;

use crate::error::{LibraryError, Result};
use crate::identity::{SharedItem, shared};

use super::LibraryManager;

/// Entities keyed by a human name rather than a media path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedItemKind {
    Person,
    Genre,
    MusicGenre,
    GameGenre,
    Studio,
    Year,
    Artist,
}

/// How one named-item kind is laid out on disk and deduplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedItemPolicy {
    pub item_type: ItemType,
    /// Directory under the items-by-name path.
    pub directory: &'static str,
    /// Add a first-letter level to keep large directories shallow.
    pub bucket_by_first_letter: bool,
    /// One instance per real-world referent, looked up by name before a
    /// new one is created.
    pub unique_by_reference: bool,
}

impl NamedItemKind {
    pub const ALL: [NamedItemKind; 7] = [
        NamedItemKind::Person,
        NamedItemKind::Genre,
        NamedItemKind::MusicGenre,
        NamedItemKind::GameGenre,
        NamedItemKind::Studio,
        NamedItemKind::Year,
        NamedItemKind::Artist,
    ];

    pub const fn policy(self) -> NamedItemPolicy {
        let (item_type, directory, bucket, unique) = match self {
            NamedItemKind::Person => (ItemType::Person, "People", true, true),
            NamedItemKind::Genre => (ItemType::Genre, "Genre", false, false),
            NamedItemKind::MusicGenre => {
                (ItemType::MusicGenre, "MusicGenre", false, false)
            }
            NamedItemKind::GameGenre => {
                (ItemType::GameGenre, "GameGenre", false, false)
            }
            NamedItemKind::Studio => {
                (ItemType::Studio, "Studio", false, false)
            }
            NamedItemKind::Year => (ItemType::Year, "Year", false, false),
            NamedItemKind::Artist => {
                (ItemType::MusicArtist, "artists", false, true)
            }
        };
        NamedItemPolicy {
            item_type,
            directory,
            bucket_by_first_letter: bucket,
            unique_by_reference: unique,
        }
    }
}

/// First-letter bucket; anything that is not alphanumeric shares `#`.
fn bucket_for(name: &str) -> String {
    match name.chars().next() {
        Some(c) if c.is_alphanumeric() => c.to_uppercase().collect(),
        _ => "#".to_string(),
    }
}

impl LibraryManager {
    /// Named item under the configured items-by-name directory.
    pub async fn get_item_by_name(
        &self,
        kind: NamedItemKind,
        name: &str,
    ) -> Result<SharedItem> {
        let base = self
            .config()
            .paths
            .items_by_name_path()
            .join(kind.policy().directory);
        self.get_item_by_name_at(kind, &base, name).await
    }

    /// Find or materialize the named item `name` below `base_path`.
    ///
    /// An id collision always returns the cached instance. For kinds that
    /// are unique by reference an existing instance with the same name is
    /// returned even when it lives at another path.
    pub async fn get_item_by_name_at(
        &self,
        kind: NamedItemKind,
        base_path: &Path,
        name: &str,
    ) -> Result<SharedItem> {
        if base_path.as_os_str().is_empty() {
            return Err(LibraryError::invalid_argument(
                "named item base path is empty",
            ));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::invalid_argument(
                "named item name is empty",
            ));
        }

        let policy = kind.policy();
        let path = self.named_item_path(&policy, base_path, name)?;
        let id = self
            .resolver
            .ids()
            .derive_for_path(&path, policy.item_type)?;

        if let Some(existing) = self.cache.get(&id) {
            return Ok(existing);
        }
        if policy.unique_by_reference
            && let Some(existing) = self.find_by_name(policy.item_type, name)
        {
            debug!(name, item_type = %policy.item_type, "reused by name");
            return Ok(existing);
        }

        self.fs.create_dir_all(&path).await?;
        let entry = self.fs.metadata(&path).await?;

        let mut item = BaseItem::with_path(policy.item_type, path);
        item.id = id;
        item.name = name.to_string();
        if let Some(created) = entry.created.or(entry.modified) {
            item.date_created = created;
        }
        if let Some(modified) = entry.modified {
            item.date_modified = modified;
        }
        if kind == NamedItemKind::Year {
            item.production_year = name.parse().ok();
        }

        let candidate = shared(item);
        let stored = if policy.unique_by_reference {
            self.by_reference.get_or_add(candidate.clone())
        } else {
            candidate.clone()
        };
        let stored = self.cache.get_or_insert(stored);

        if Arc::ptr_eq(&stored, &candidate) {
            let snapshot = stored.read().clone();
            self.repository.save_item(&snapshot).await?;
            self.events.publish(ItemChange::added(snapshot)).await;
        }
        Ok(stored)
    }

    pub async fn get_year(&self, year: i32) -> Result<SharedItem> {
        if year <= 0 {
            return Err(LibraryError::invalid_argument(format!(
                "invalid year {year}"
            )));
        }
        self.get_item_by_name(NamedItemKind::Year, &year.to_string())
            .await
    }

    fn named_item_path(
        &self,
        policy: &NamedItemPolicy,
        base_path: &Path,
        name: &str,
    ) -> Result<PathBuf> {
        let file_name = self.fs.valid_filename(name);
        if file_name.is_empty() {
            return Err(LibraryError::invalid_argument(format!(
                "'{name}' has no file-system safe form"
            )));
        }
        let path = if policy.bucket_by_first_letter {
            base_path.join(bucket_for(&file_name)).join(&file_name)
        } else {
            base_path.join(&file_name)
        };
        Ok(path)
    }

    fn find_by_name(
        &self,
        item_type: ItemType,
        name: &str,
    ) -> Option<SharedItem> {
        let matches = |item: &BaseItem| {
            item.item_type == item_type
                && item.name.trim().to_lowercase() == name.to_lowercase()
        };
        self.by_reference
            .find(matches)
            .or_else(|| self.cache.find(matches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn people_bucket_by_first_letter() {
        assert_eq!(bucket_for("keanu"), "K");
        assert_eq!(bucket_for("50 Cent"), "5");
        assert_eq!(bucket_for("!!!"), "#");
        assert!(NamedItemKind::Person.policy().bucket_by_first_letter);
        assert!(!NamedItemKind::Genre.policy().bucket_by_first_letter);
    }

    #[test]
    fn only_people_and_artists_are_unique_by_reference() {
        let unique: Vec<_> = NamedItemKind::ALL
            .into_iter()
            .filter(|kind| kind.policy().unique_by_reference)
            .collect();
        assert_eq!(unique, vec![NamedItemKind::Person, NamedItemKind::Artist]);
    }
}

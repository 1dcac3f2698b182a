use std::path::{Path, PathBuf};

use arbor_model::CollectionType;
use tracing::info;

use crate::error::{LibraryError, Result};
use crate::fs::SHORTCUT_EXTENSION;
use crate::resolve::resolvers::COLLECTION_MARKER_EXTENSION;

use super::LibraryManager;

impl LibraryManager {
    /// Create a library under the default user root: a folder holding a
    /// `<type>.collection` marker and one shortcut per media path.
    pub async fn add_virtual_folder(
        &self,
        name: &str,
        collection_type: Option<CollectionType>,
        media_paths: &[PathBuf],
        refresh_library: bool,
    ) -> Result<PathBuf> {
        let folder_name = self.fs.valid_filename(name.trim());
        if folder_name.is_empty() {
            return Err(LibraryError::invalid_argument(
                "library name is empty",
            ));
        }

        let folder = self
            .config()
            .paths
            .default_user_views_path()
            .join(&folder_name);
        if self.fs.path_exists(&folder).await {
            return Err(LibraryError::invalid_argument(format!(
                "a library named '{folder_name}' already exists"
            )));
        }
        for media_path in media_paths {
            if !self.fs.path_exists(media_path).await {
                return Err(LibraryError::invalid_argument(format!(
                    "media path {} does not exist",
                    media_path.display()
                )));
            }
        }

        self.fs.create_dir_all(&folder).await?;
        if let Some(collection_type) = collection_type {
            let marker = folder.join(format!(
                "{}.{COLLECTION_MARKER_EXTENSION}",
                collection_type.as_str()
            ));
            self.fs.write_file(&marker, "").await?;
        }
        for media_path in media_paths {
            self.add_media_path_shortcut(&folder, media_path).await?;
        }

        info!(
            name = %folder_name,
            collection_type = ?collection_type,
            paths = media_paths.len(),
            "library added"
        );
        if refresh_library {
            self.queue_library_scan().await;
        }
        Ok(folder)
    }

    /// Delete a library folder. The media it pointed at is untouched.
    pub async fn remove_virtual_folder(
        &self,
        name: &str,
        refresh_library: bool,
    ) -> Result<()> {
        let folder_name = self.fs.valid_filename(name.trim());
        if folder_name.is_empty() {
            return Err(LibraryError::invalid_argument(
                "library name is empty",
            ));
        }
        let folder = self
            .config()
            .paths
            .default_user_views_path()
            .join(&folder_name);
        if !self.fs.path_exists(&folder).await {
            return Err(LibraryError::NotFound(format!(
                "library '{folder_name}'"
            )));
        }

        self.fs.remove_dir_all(&folder).await?;
        info!(name = %folder_name, "library removed");
        if refresh_library {
            self.queue_library_scan().await;
        }
        Ok(())
    }

    async fn add_media_path_shortcut(
        &self,
        folder: &Path,
        media_path: &Path,
    ) -> Result<()> {
        let stem = media_path
            .file_name()
            .map(|name| self.fs.valid_filename(&name.to_string_lossy()))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "media".to_string());

        let mut shortcut = folder.join(format!("{stem}.{SHORTCUT_EXTENSION}"));
        let mut suffix = 1;
        while self.fs.path_exists(&shortcut).await {
            shortcut =
                folder.join(format!("{stem}{suffix}.{SHORTCUT_EXTENSION}"));
            suffix += 1;
        }

        let target = self.fs.normalize_path(media_path);
        self.fs
            .write_file(&shortcut, &target.to_string_lossy())
            .await?;
        Ok(())
    }
}

//! Library configuration: application paths, content-type overrides and
//! feature flags, plus the change channel the library manager listens on.

use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, anyhow};
use arbor_model::CollectionType;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

use crate::fs::is_same_or_sub_path;
use crate::naming::{
    DEFAULT_AUDIO_FILE_EXTENSIONS, DEFAULT_IMAGE_FILE_EXTENSIONS,
    DEFAULT_VIDEO_FILE_EXTENSIONS,
};

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|ext| ext.to_string()).collect()
}

fn default_video_extensions() -> Vec<String> {
    owned(DEFAULT_VIDEO_FILE_EXTENSIONS)
}

fn default_audio_extensions() -> Vec<String> {
    owned(DEFAULT_AUDIO_FILE_EXTENSIONS)
}

fn default_image_extensions() -> Vec<String> {
    owned(DEFAULT_IMAGE_FILE_EXTENSIONS)
}

fn default_season_zero_name() -> String {
    "Specials".to_string()
}

/// Source that produced the library configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// On-disk locations owned by the library engine.
///
/// Only the program data path is required; the rest default to fixed
/// sub-directories of it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApplicationPaths {
    /// Base data directory. Item ids for paths below it are normalized to
    /// be portable when `enable_normalized_item_by_name_ids` is set.
    pub program_data_path: PathBuf,
    /// Override for the named-item (people, genres, ...) directory.
    pub items_by_name_path: Option<PathBuf>,
}

impl Default for ApplicationPaths {
    fn default() -> Self {
        Self {
            program_data_path: PathBuf::from("data"),
            items_by_name_path: None,
        }
    }
}

impl ApplicationPaths {
    pub fn new(program_data_path: impl Into<PathBuf>) -> Self {
        Self {
            program_data_path: program_data_path.into(),
            items_by_name_path: None,
        }
    }

    /// Physical root folder; its grandchildren are the library shortcuts.
    pub fn root_folder_path(&self) -> PathBuf {
        self.program_data_path.join("root")
    }

    /// Default user root, holding one directory per virtual folder.
    pub fn default_user_views_path(&self) -> PathBuf {
        self.root_folder_path().join("default")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.program_data_path.join("metadata")
    }

    pub fn items_by_name_path(&self) -> PathBuf {
        self.items_by_name_path
            .clone()
            .unwrap_or_else(|| self.metadata_path())
    }

    /// Root of per-item metadata directories.
    pub fn internal_metadata_path(&self) -> PathBuf {
        self.metadata_path().join("library")
    }
}

/// Forces a collection type onto a path and everything beneath it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ContentTypeOverride {
    pub path: PathBuf,
    pub collection_type: CollectionType,
}

/// Top-level library settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LibraryConfig {
    pub paths: ApplicationPaths,
    /// Explicit content types keyed by library path. The most specific
    /// (longest) matching path wins.
    pub content_type_overrides: Vec<ContentTypeOverride>,
    /// Treat `.rar`/`.zip`/... as media instead of ignoring them.
    pub enable_archive_media_files: bool,
    /// Strip the program data prefix from keys before hashing ids so that
    /// named items keep their ids when the data directory moves.
    pub enable_normalized_item_by_name_ids: bool,
    /// Display name given to season 0.
    #[serde(default = "default_season_zero_name")]
    pub season_zero_display_name: String,
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,
    #[serde(default = "default_audio_extensions")]
    pub audio_extensions: Vec<String>,
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            paths: ApplicationPaths::default(),
            content_type_overrides: Vec::new(),
            enable_archive_media_files: false,
            enable_normalized_item_by_name_ids: true,
            season_zero_display_name: default_season_zero_name(),
            video_extensions: default_video_extensions(),
            audio_extensions: default_audio_extensions(),
            image_extensions: default_image_extensions(),
        }
    }
}

impl LibraryConfig {
    pub fn with_data_path(program_data_path: impl Into<PathBuf>) -> Self {
        Self {
            paths: ApplicationPaths::new(program_data_path),
            ..Self::default()
        }
    }

    /// Load configuration overrides using environment variables.
    /// Evaluation order:
    /// 1) `$ARBOR_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$ARBOR_CONFIG_JSON` (inline JSON),
    /// 3) `arbor.toml`/`arbor.json` in the working directory,
    /// 4) defaults if none of the above is present.
    pub fn load_from_env() -> anyhow::Result<(Self, ConfigSource)> {
        if let Ok(path_str) = env::var("ARBOR_CONFIG_PATH")
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str);
            let config = Self::load_from_file(&path)?;
            return Ok((config, ConfigSource::EnvPath(path)));
        }

        if let Ok(raw) = env::var("ARBOR_CONFIG_JSON")
            && !raw.trim().is_empty()
        {
            let parsed = Self::parse_json(&raw)
                .context("failed to parse ARBOR_CONFIG_JSON")?;
            return Ok((parsed, ConfigSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file() {
            let config = Self::load_from_file(&path)?;
            return Ok((config, ConfigSource::File(path)));
        }

        Ok((Self::default(), ConfigSource::Default))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read library config from {}", path.display())
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents).with_context(|| {
                format!("invalid library config {}", path.display())
            }),
            Some("toml") | Some("tml") => {
                toml::from_str(&contents).map_err(|err| {
                    anyhow!(
                        "invalid library config {}: {}",
                        path.display(),
                        err
                    )
                })
            }
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        }
    }

    pub fn parse_from_str(
        contents: &str,
        origin: &str,
    ) -> anyhow::Result<Self> {
        // Try TOML first, then JSON for convenience.
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse library config {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw)
            .map_err(|err| anyhow!("invalid library config json: {err}"))
    }

    fn find_default_file() -> Option<PathBuf> {
        const CANDIDATES: &[&str] = &[
            "arbor.toml",
            "arbor.json",
            "config/arbor.toml",
            "config/arbor.json",
        ];

        CANDIDATES
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(|path| path.to_path_buf())
    }

    /// Collection type configured for `path` or its closest ancestor.
    pub fn content_type_override(
        &self,
        path: &Path,
    ) -> Option<CollectionType> {
        self.content_type_overrides
            .iter()
            .filter(|entry| is_same_or_sub_path(&entry.path, path))
            .max_by_key(|entry| entry.path.components().count())
            .map(|entry| entry.collection_type)
    }

    fn has_extension(list: &[String], path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                list.iter().any(|known| known.eq_ignore_ascii_case(ext))
            })
    }

    pub fn is_video_file(&self, path: &Path) -> bool {
        Self::has_extension(&self.video_extensions, path)
    }

    pub fn is_audio_file(&self, path: &Path) -> bool {
        Self::has_extension(&self.audio_extensions, path)
    }

    pub fn is_image_file(&self, path: &Path) -> bool {
        Self::has_extension(&self.image_extensions, path)
    }
}

/// Publishes the active configuration and notifies subscribers on change.
#[derive(Debug)]
pub struct ConfigurationManager {
    sender: watch::Sender<Arc<LibraryConfig>>,
}

impl ConfigurationManager {
    pub fn new(config: LibraryConfig) -> Self {
        let (sender, _) = watch::channel(Arc::new(config));
        Self { sender }
    }

    pub fn current(&self) -> Arc<LibraryConfig> {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<LibraryConfig>> {
        self.sender.subscribe()
    }

    /// Replace the configuration; subscribers are notified only when the
    /// new value differs.
    pub fn update(&self, config: LibraryConfig) -> bool {
        let config = Arc::new(config);
        let changed = self.sender.send_if_modified(|current| {
            if **current == *config {
                false
            } else {
                *current = config.clone();
                true
            }
        });
        if changed {
            info!("library configuration updated");
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_hang_off_program_data() {
        let paths = ApplicationPaths::new("/srv/arbor");
        assert_eq!(paths.root_folder_path(), PathBuf::from("/srv/arbor/root"));
        assert_eq!(
            paths.default_user_views_path(),
            PathBuf::from("/srv/arbor/root/default")
        );
        assert_eq!(
            paths.internal_metadata_path(),
            PathBuf::from("/srv/arbor/metadata/library")
        );
        assert_eq!(
            paths.items_by_name_path(),
            PathBuf::from("/srv/arbor/metadata")
        );
    }

    #[test]
    fn most_specific_override_wins() {
        let mut config = LibraryConfig::default();
        config.content_type_overrides = vec![
            ContentTypeOverride {
                path: PathBuf::from("/media"),
                collection_type: CollectionType::Mixed,
            },
            ContentTypeOverride {
                path: PathBuf::from("/media/Shows"),
                collection_type: CollectionType::TvShows,
            },
        ];

        assert_eq!(
            config.content_type_override(Path::new("/media/shows/Lost")),
            Some(CollectionType::TvShows)
        );
        assert_eq!(
            config.content_type_override(Path::new("/media/films")),
            Some(CollectionType::Mixed)
        );
        assert_eq!(config.content_type_override(Path::new("/other")), None);
    }

    #[test]
    fn parses_toml_with_defaults() {
        let raw = r#"
            season_zero_display_name = "Extras"
            enable_archive_media_files = true

            [paths]
            program_data_path = "/var/lib/arbor"

            [[content_type_overrides]]
            path = "/media/tv"
            collection_type = "tvshows"
        "#;
        let config = LibraryConfig::parse_from_str(raw, "inline").unwrap();
        assert_eq!(config.season_zero_display_name, "Extras");
        assert!(config.enable_archive_media_files);
        assert!(config.enable_normalized_item_by_name_ids);
        assert_eq!(
            config.paths.program_data_path,
            PathBuf::from("/var/lib/arbor")
        );
        assert_eq!(
            config.content_type_overrides[0].collection_type,
            CollectionType::TvShows
        );
        assert!(config.is_video_file(Path::new("/media/a.MKV")));
    }

    #[test]
    fn update_only_notifies_on_change() {
        let manager = ConfigurationManager::new(LibraryConfig::default());
        let mut rx = manager.subscribe();
        assert!(!manager.update(LibraryConfig::default()));
        assert!(!rx.has_changed().unwrap());

        let mut changed = LibraryConfig::default();
        changed.season_zero_display_name = "Bonus".into();
        assert!(manager.update(changed));
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            rx.borrow_and_update().season_zero_display_name,
            "Bonus"
        );
    }
}

use std::path::{Path, PathBuf};

use arbor_model::{ItemId, ItemType};
use sha2::{Digest, Sha256};

use crate::config::LibraryConfig;
use crate::error::{LibraryError, Result};

/// Derives item ids as a pure function of (concrete type, normalized key).
#[derive(Debug, Clone)]
pub struct ItemIdGenerator {
    program_data_path: PathBuf,
    normalize_data_paths: bool,
}

impl ItemIdGenerator {
    pub fn new(
        program_data_path: impl Into<PathBuf>,
        normalize_data_paths: bool,
    ) -> Self {
        Self {
            program_data_path: program_data_path.into(),
            normalize_data_paths,
        }
    }

    pub fn from_config(config: &LibraryConfig) -> Self {
        Self::new(
            config.paths.program_data_path.clone(),
            config.enable_normalized_item_by_name_ids,
        )
    }

    pub fn program_data_path(&self) -> &Path {
        &self.program_data_path
    }

    /// Hash `qualified type name + lower-cased key` into a 128-bit id.
    ///
    /// With normalization enabled, keys below the program data path are
    /// made relative to it with `/` separators so ids survive moving the
    /// data directory between machines.
    pub fn derive(&self, key: &str, item_type: ItemType) -> Result<ItemId> {
        if key.trim().is_empty() {
            return Err(LibraryError::invalid_argument(format!(
                "empty id key for {item_type}"
            )));
        }

        let key = self.normalize_key(key);
        let mut hasher = Sha256::new();
        hasher.update(item_type.qualified_name().as_bytes());
        hasher.update(key.to_lowercase().as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        Ok(ItemId::from_bytes(bytes))
    }

    /// Id for an item keyed by its file-system path.
    pub fn derive_for_path(
        &self,
        path: &Path,
        item_type: ItemType,
    ) -> Result<ItemId> {
        self.derive(&path.to_string_lossy(), item_type)
    }

    fn normalize_key<'a>(&self, key: &'a str) -> std::borrow::Cow<'a, str> {
        if !self.normalize_data_paths {
            return key.into();
        }
        let base = self.program_data_path.to_string_lossy();
        let base = base.trim_end_matches(['/', '\\']);
        if base.is_empty() {
            return key.into();
        }
        match key.get(..base.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(base) => {
                let rest = &key[base.len()..];
                // Only strip whole components: `/data2` is not under `/data`.
                if !rest.is_empty() && !rest.starts_with(['/', '\\']) {
                    return key.into();
                }
                rest.trim_start_matches(['/', '\\']).replace('\\', "/").into()
            }
            _ => key.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_deterministic_and_case_insensitive() {
        let ids = ItemIdGenerator::new("/data", false);
        let a = ids.derive("/media/Heat.mkv", ItemType::Movie).unwrap();
        let b = ids.derive("/media/heat.MKV", ItemType::Movie).unwrap();
        assert_eq!(a, b);
        assert!(!a.is_nil());
    }

    #[test]
    fn type_and_key_both_feed_the_id() {
        let ids = ItemIdGenerator::new("/data", false);
        let movie = ids.derive("/media/a.mkv", ItemType::Movie).unwrap();
        let video = ids.derive("/media/a.mkv", ItemType::Video).unwrap();
        let other = ids.derive("/media/b.mkv", ItemType::Movie).unwrap();
        assert_ne!(movie, video);
        assert_ne!(movie, other);
    }

    #[test]
    fn blank_keys_are_rejected() {
        let ids = ItemIdGenerator::new("/data", false);
        let err = ids.derive("   ", ItemType::Genre).unwrap_err();
        assert!(matches!(err, LibraryError::InvalidArgument(_)));
    }

    #[test]
    fn normalization_makes_data_paths_portable() {
        let unix = ItemIdGenerator::new("/srv/arbor", true);
        let windows = ItemIdGenerator::new(r"C:\arbor", true);

        let from_unix = unix
            .derive("/srv/arbor/metadata/Genre/Drama", ItemType::Genre)
            .unwrap();
        let from_windows = windows
            .derive(r"C:\arbor\metadata\Genre\Drama", ItemType::Genre)
            .unwrap();
        assert_eq!(from_unix, from_windows);

        let outside = unix
            .derive("/srv/arbor2/metadata/Genre/Drama", ItemType::Genre)
            .unwrap();
        assert_ne!(from_unix, outside);
    }

    #[test]
    fn normalization_is_off_unless_enabled() {
        let plain = ItemIdGenerator::new("/srv/arbor", false);
        let normalized = ItemIdGenerator::new("/srv/arbor", true);
        let key = "/srv/arbor/metadata/Studio/A24";
        assert_ne!(
            plain.derive(key, ItemType::Studio).unwrap(),
            normalized.derive(key, ItemType::Studio).unwrap()
        );
    }
}

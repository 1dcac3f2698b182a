use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::ids::ItemId;
use crate::item_type::ItemType;
use crate::kinds::{CollectionType, ExtraType, LocationType};

/// A typed, identity-bearing unit of the media library.
///
/// Every variant shares this record; variant specific fields (episode
/// numbering, extra classification, collection locations) are simply left
/// empty by variants that do not use them.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BaseItem {
    pub id: ItemId,
    pub item_type: ItemType,
    pub name: String,
    /// `None` for virtual and remote items
    pub path: Option<PathBuf>,
    /// Containing folder; never owning
    pub parent_id: Option<ItemId>,
    pub date_created: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    pub date_last_saved: Option<DateTime<Utc>>,
    pub location_type: LocationType,
    pub collection_type: Option<CollectionType>,

    // Episode/season numbering
    pub index_number: Option<u32>,
    pub index_number_end: Option<u32>,
    pub parent_index_number: Option<u32>,
    pub premiere_date: Option<DateTime<Utc>>,
    pub production_year: Option<i32>,

    pub extra_type: Option<ExtraType>,
    /// Stacked parts (`cd2`, `part2`, ...) beyond the primary path
    pub additional_parts: Vec<PathBuf>,
    /// Shortcut targets of a collection folder
    pub physical_locations: Vec<PathBuf>,

    pub genres: Vec<String>,
    pub studios: Vec<String>,

    /// Ids of the direct children, in file-system order
    pub children: Vec<ItemId>,
}

impl Default for BaseItem {
    fn default() -> Self {
        Self::new(ItemType::Folder)
    }
}

impl BaseItem {
    pub fn new(item_type: ItemType) -> Self {
        let now = Utc::now();
        Self {
            id: ItemId::nil(),
            item_type,
            name: String::new(),
            path: None,
            parent_id: None,
            date_created: now,
            date_modified: now,
            date_last_saved: None,
            location_type: LocationType::FileSystem,
            collection_type: None,
            index_number: None,
            index_number_end: None,
            parent_index_number: None,
            premiere_date: None,
            production_year: None,
            extra_type: None,
            additional_parts: Vec::new(),
            physical_locations: Vec::new(),
            genres: Vec::new(),
            studios: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_path(item_type: ItemType, path: impl Into<PathBuf>) -> Self {
        let mut item = Self::new(item_type);
        item.path = Some(path.into());
        item
    }

    pub fn is_folder(&self) -> bool {
        self.item_type.is_folder()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Remote and virtual items never have sidecar metadata on disk.
    pub fn is_remote_or_virtual(&self) -> bool {
        matches!(
            self.location_type,
            LocationType::Remote | LocationType::Virtual
        )
    }

    pub fn is_extra(&self) -> bool {
        self.extra_type.is_some()
    }

    /// Drops numbered episode fields; used when an episode turns out to be
    /// dated rather than numbered.
    pub fn clear_index_numbers(&mut self) {
        self.index_number = None;
        self.index_number_end = None;
        self.parent_index_number = None;
    }
}

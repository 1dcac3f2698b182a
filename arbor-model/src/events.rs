use crate::ids::ItemId;
use crate::item::BaseItem;

/// Why an item was re-saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemUpdateReason {
    #[default]
    None,
    FileSystemChange,
    MetadataImport,
    MetadataDownload,
    MetadataEdit,
    ImageUpdate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemChangeKind {
    Added,
    Updated(ItemUpdateReason),
    Removed,
}

/// Notification emitted to listeners whenever the library changes.
///
/// Carries a snapshot of the entity at the time of the change so listeners
/// never hold locks on live cache entries.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemChange {
    pub kind: ItemChangeKind,
    pub item: BaseItem,
    pub parent_id: Option<ItemId>,
}

impl ItemChange {
    pub fn added(item: BaseItem) -> Self {
        let parent_id = item.parent_id;
        Self {
            kind: ItemChangeKind::Added,
            item,
            parent_id,
        }
    }

    pub fn updated(item: BaseItem, reason: ItemUpdateReason) -> Self {
        let parent_id = item.parent_id;
        Self {
            kind: ItemChangeKind::Updated(reason),
            item,
            parent_id,
        }
    }

    pub fn removed(item: BaseItem, parent_id: Option<ItemId>) -> Self {
        Self {
            kind: ItemChangeKind::Removed,
            item,
            parent_id,
        }
    }

    pub fn item_id(&self) -> ItemId {
        self.item.id
    }
}

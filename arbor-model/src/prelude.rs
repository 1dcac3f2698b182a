//! Convenience glob import for crates that work with library entities.

pub use crate::events::{ItemChange, ItemChangeKind, ItemUpdateReason};
pub use crate::ids::ItemId;
pub use crate::item::BaseItem;
pub use crate::item_type::ItemType;
pub use crate::kinds::{CollectionType, ExtraType, LocationType};

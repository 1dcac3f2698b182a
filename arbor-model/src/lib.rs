//! Core data model definitions shared across Arbor crates.
#![allow(missing_docs)]

pub mod error;
pub mod events;
pub mod ids;
pub mod item;
pub mod item_type;
pub mod kinds;
pub mod prelude;

// Intentionally curated re-exports for downstream consumers.
pub use error::{ModelError, Result as ModelResult};
pub use events::{ItemChange, ItemChangeKind, ItemUpdateReason};
pub use ids::ItemId;
pub use item::BaseItem;
pub use item_type::ItemType;
pub use kinds::{CollectionType, ExtraType, LocationType};

use std::str::FromStr;

use uuid::Uuid;

use crate::error::ModelError;

/// Identity of a library entity.
///
/// Item ids are derived, not allocated: the same (type, key) pair always
/// hashes to the same 128-bit value, so an entity keeps its id across
/// processes without a persisted sequence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub const fn nil() -> Self {
        ItemId(Uuid::nil())
    }

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        ItemId(Uuid::from_bytes(bytes))
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn to_uuid(&self) -> Uuid {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Lowercase hex form without hyphens, used for metadata directory names.
    pub fn to_simple_string(&self) -> String {
        self.0.simple().to_string()
    }
}

impl AsRef<Uuid> for ItemId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ItemId {
    fn from(id: Uuid) -> Self {
        ItemId(id)
    }
}

impl FromStr for ItemId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ModelError::InvalidId(
                "item id cannot be empty".to_string(),
            ));
        }
        Uuid::parse_str(s.trim())
            .map(ItemId)
            .map_err(|err| ModelError::InvalidId(format!("{s}: {err}")))
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//! Deterministic identity derivation plus the concurrent item cache and the
//! by-reference map that keeps one instance per real-world referent.

pub mod cache;
pub mod id;

pub use cache::{ItemCache, ReferenceMap, SharedItem, shared};
pub use id::ItemIdGenerator;

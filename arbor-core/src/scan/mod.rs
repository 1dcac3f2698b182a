//! Library scanning: recursive folder validation, the scan orchestrator,
//! post-scan tasks and the scheduler entry that runs them.

pub mod orchestrator;
pub mod post_scan;
pub mod task;
pub mod validate;

pub use orchestrator::ScanOrchestrator;
pub use post_scan::{NamedItemsValidator, PostScanTask};
pub use task::{RefreshMediaLibraryTask, ScheduledTask};
pub use validate::{FolderValidator, ScanSummary, apply_resolved};

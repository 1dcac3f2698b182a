//! In-process adapters for the engine's ports, used by the CLI and tests.

pub mod memory;

pub use memory::{
    InMemoryItemRepository, RecordingLibraryMonitor, RecordingProviderManager,
    RecordingTaskScheduler,
};

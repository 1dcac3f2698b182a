//! # Arbor Core
//!
//! Library engine for the Arbor media library: turns file-system trees
//! into typed entities with stable identities, caches them in process and
//! re-validates libraries incrementally as files change.
//!
//! ## Overview
//!
//! - **Resolution**: ignore rules, multi-item and single-item resolvers run
//!   in priority order over a per-path resolution context
//! - **Identity**: deterministic item ids, a concurrent item cache and a
//!   by-reference map for people and artists
//! - **Scanning**: a scan orchestrator that validates the whole tree with
//!   weighted progress, then runs post-scan tasks
//! - **Naming**: episode numbering, air dates, extras and stacked parts
//!   parsed from file names
//!
//! ## Architecture
//!
//! - [`library`]: the [`LibraryManager`] owning cache, resolver and roots
//! - [`resolve`]: the resolution pipeline and built-in resolvers
//! - [`scan`]: folder validation and the [`ScanOrchestrator`]
//! - [`ports`]: capabilities the engine consumes (repository, monitor, ...)
//! - [`infra`]: in-memory adapters for those capabilities
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use arbor_core::{
//!     LibraryCollaborators, LibraryConfig, LibraryManager, Progress,
//!     RealFs, ScanOrchestrator,
//!     infra::{
//!         InMemoryItemRepository, RecordingLibraryMonitor,
//!         RecordingProviderManager, RecordingTaskScheduler,
//!     },
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! async fn scan_once() -> arbor_core::Result<()> {
//!     let library = Arc::new(LibraryManager::new(
//!         Arc::new(LibraryConfig::with_data_path("/var/lib/arbor")),
//!         LibraryCollaborators {
//!             fs: Arc::new(RealFs::new()),
//!             repository: Arc::new(InMemoryItemRepository::new()),
//!             provider_manager: Arc::new(RecordingProviderManager::new()),
//!             scheduler: Arc::new(RecordingTaskScheduler::new()),
//!         },
//!     ));
//!     let orchestrator = ScanOrchestrator::with_default_tasks(
//!         library,
//!         Arc::new(RecordingLibraryMonitor::new()),
//!     );
//!     let summary = orchestrator
//!         .validate_media_library(Progress::noop(), CancellationToken::new())
//!         .await?;
//!     println!("added {} items", summary.added);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

/// Library configuration and its change channel
pub mod config;

/// Error types and error handling utilities
pub mod error;

/// Outbound item-change events
pub mod events;

/// File-system capability, real and in-memory
pub mod fs;

/// Deterministic ids, the item cache and the by-reference map
pub mod identity;

/// In-process adapters for the engine's ports
pub mod infra;

/// Item lifecycle, root folders, named items and virtual folders
pub mod library;

/// Parsers for episode numbering, extras and video names
pub mod naming;

/// Capabilities consumed from the surrounding application
pub mod ports;

pub mod progress;

/// Resolution pipeline turning paths into entities
pub mod resolve;

/// Library validation and post-scan tasks
pub mod scan;

pub use config::{ConfigurationManager, LibraryConfig};
pub use error::{LibraryError, Result};
pub use events::{ItemEventListener, LibraryEventBus};
pub use fs::{FileSystem, FsEntry, InMemoryFs, RealFs};
pub use identity::{ItemCache, ItemIdGenerator, ReferenceMap, SharedItem};
pub use library::{
    DeleteOptions, LibraryCollaborators, LibraryManager, NamedItemKind,
};
pub use progress::Progress;
pub use resolve::{LibraryResolver, ResolutionContext};
pub use scan::{
    PostScanTask, RefreshMediaLibraryTask, ScanOrchestrator, ScanSummary,
};

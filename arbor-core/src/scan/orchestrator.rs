use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{LibraryError, Result};
use crate::library::LibraryManager;
use crate::ports::LibraryMonitor;
use crate::progress::Progress;
use crate::resolve::DirectoryService;

use super::post_scan::{NamedItemsValidator, PostScanTask};
use super::validate::{FolderValidator, ScanSummary};

const ROOT_REFRESHED: f64 = 0.5;
const ROOT_VALIDATED: f64 = 1.0;
const USER_ROOT_VALIDATED: f64 = 2.0;
const TREE_VALIDATED: f64 = 75.0;
const COMPLETE: f64 = 100.0;

/// Clears the scanning flag however the scan ends.
struct ScanGuard<'a>(&'a AtomicBool);

impl<'a> ScanGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| LibraryError::ScanInProgress)
    }
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs full library validations: root folders, the whole tree, then the
/// registered post-scan tasks.
pub struct ScanOrchestrator {
    library: Arc<LibraryManager>,
    monitor: Arc<dyn LibraryMonitor>,
    post_scan_tasks: RwLock<Vec<Arc<dyn PostScanTask>>>,
    scanning: AtomicBool,
}

impl std::fmt::Debug for ScanOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tasks: Vec<String> = self
            .post_scan_tasks
            .read()
            .iter()
            .map(|task| task.name().to_string())
            .collect();
        f.debug_struct("ScanOrchestrator")
            .field("monitor", &self.monitor)
            .field("post_scan_tasks", &tasks)
            .field("scanning", &self.is_scanning())
            .finish()
    }
}

impl ScanOrchestrator {
    pub fn new(
        library: Arc<LibraryManager>,
        monitor: Arc<dyn LibraryMonitor>,
    ) -> Self {
        Self {
            library,
            monitor,
            post_scan_tasks: RwLock::new(Vec::new()),
            scanning: AtomicBool::new(false),
        }
    }

    /// Orchestrator with the genre, studio and year validators registered.
    pub fn with_default_tasks(
        library: Arc<LibraryManager>,
        monitor: Arc<dyn LibraryMonitor>,
    ) -> Self {
        let orchestrator = Self::new(library.clone(), monitor);
        orchestrator.add_post_scan_task(Arc::new(
            NamedItemsValidator::genres(library.clone()),
        ));
        orchestrator.add_post_scan_task(Arc::new(
            NamedItemsValidator::studios(library.clone()),
        ));
        orchestrator
            .add_post_scan_task(Arc::new(NamedItemsValidator::years(library)));
        orchestrator
    }

    pub fn library(&self) -> &Arc<LibraryManager> {
        &self.library
    }

    pub fn add_post_scan_task(&self, task: Arc<dyn PostScanTask>) {
        self.post_scan_tasks.write().push(task);
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::Acquire)
    }

    /// Validate the whole library now.
    ///
    /// The library monitor is paused for the duration and restarted
    /// whatever the outcome, including a panic inside the scan. Progress is
    /// reported monotonically and ends at 100 on success.
    pub async fn validate_media_library(
        &self,
        progress: Progress,
        cancel: CancellationToken,
    ) -> Result<ScanSummary> {
        let _guard = ScanGuard::acquire(&self.scanning)?;
        info!("library scan started");

        self.monitor.stop().await;
        let scan = self.run_scan(progress.monotonic(), &cancel);
        let outcome = AssertUnwindSafe(scan).catch_unwind().await;
        self.monitor.start().await;

        match outcome {
            Ok(Ok(summary)) => {
                info!(
                    added = summary.added,
                    updated = summary.updated,
                    removed = summary.removed,
                    "library scan finished"
                );
                Ok(summary)
            }
            Ok(Err(err)) if err.is_cancelled() => {
                info!("library scan cancelled");
                Err(err)
            }
            Ok(Err(err)) => {
                error!("library scan failed: {err}");
                Err(err)
            }
            Err(_) => {
                error!("library scan panicked");
                Err(LibraryError::Internal("library scan panicked".into()))
            }
        }
    }

    async fn run_scan(
        &self,
        progress: Progress,
        cancel: &CancellationToken,
    ) -> Result<ScanSummary> {
        let dirs = DirectoryService::new(self.library.fs().clone());
        let validator = FolderValidator::new(&self.library, &dirs, cancel);

        let root = self.library.get_root_folder().await?;
        self.library.refresh_folder(&root).await?;
        self.library.refresh_collection_roots(&dirs).await?;
        progress.report(ROOT_REFRESHED);

        let mut summary = validator
            .validate_children(
                root.clone(),
                false,
                progress.scaled(ROOT_REFRESHED, ROOT_VALIDATED),
            )
            .await?;

        let user_root = self.library.get_user_root_folder().await?;
        self.library.refresh_folder(&user_root).await?;
        summary += validator
            .validate_children(
                user_root,
                false,
                progress.scaled(ROOT_VALIDATED, USER_ROOT_VALIDATED),
            )
            .await?;
        info!("root folders validated");

        summary += validator
            .validate_children(
                root,
                true,
                progress.scaled(USER_ROOT_VALIDATED, TREE_VALIDATED),
            )
            .await?;
        progress.report(TREE_VALIDATED);
        info!(
            added = summary.added,
            updated = summary.updated,
            removed = summary.removed,
            "library tree validated"
        );

        self.run_post_scan_tasks(
            progress.scaled(TREE_VALIDATED, COMPLETE),
            cancel,
        )
        .await;

        debug!(
            listings = dirs.cached_listings(),
            "releasing scan directory listings"
        );
        drop(validator);
        drop(dirs);

        progress.report(COMPLETE);
        Ok(summary)
    }

    /// Run every post-scan task in priority order, each in its own equal
    /// share of `progress`. Failures and panics never stop the remaining
    /// tasks.
    async fn run_post_scan_tasks(
        &self,
        progress: Progress,
        cancel: &CancellationToken,
    ) {
        let mut tasks = self.post_scan_tasks.read().clone();
        tasks.sort_by_key(|task| task.priority());
        if tasks.is_empty() {
            progress.report(COMPLETE);
            return;
        }

        let count = tasks.len() as f64;
        for (index, task) in tasks.iter().enumerate() {
            let start = COMPLETE * index as f64 / count;
            let end = COMPLETE * (index + 1) as f64 / count;
            let band = progress.scaled(start, end);

            let run = task.run(band, cancel.clone());
            match AssertUnwindSafe(run).catch_unwind().await {
                Ok(Ok(())) => {
                    info!(task = task.name(), "post-scan task completed")
                }
                Ok(Err(err)) if err.is_cancelled() => {
                    info!(task = task.name(), "post-scan task cancelled")
                }
                Ok(Err(err)) => {
                    error!(task = task.name(), "post-scan task failed: {err}")
                }
                Err(_) => error!(task = task.name(), "post-scan task panicked"),
            }
            progress.report(end);
        }
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::ports::ScheduledTaskKind;
use crate::progress::Progress;

use super::orchestrator::ScanOrchestrator;

/// A unit of work the external task scheduler can queue and run.
#[async_trait]
pub trait ScheduledTask: Send + Sync {
    fn kind(&self) -> ScheduledTaskKind;

    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    async fn execute(
        &self,
        progress: Progress,
        cancel: CancellationToken,
    ) -> Result<()>;
}

/// Scheduler entry for a full library validation.
#[derive(Debug, Clone)]
pub struct RefreshMediaLibraryTask {
    orchestrator: Arc<ScanOrchestrator>,
}

impl RefreshMediaLibraryTask {
    pub fn new(orchestrator: Arc<ScanOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl ScheduledTask for RefreshMediaLibraryTask {
    fn kind(&self) -> ScheduledTaskKind {
        ScheduledTaskKind::RefreshMediaLibrary
    }

    fn name(&self) -> &str {
        "Scan media library"
    }

    fn description(&self) -> &str {
        "Scans the media library for new files and refreshes metadata."
    }

    async fn execute(
        &self,
        progress: Progress,
        cancel: CancellationToken,
    ) -> Result<()> {
        self.orchestrator
            .validate_media_library(progress, cancel)
            .await
            .map(|_| ())
    }
}

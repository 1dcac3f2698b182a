mod support;

use std::path::PathBuf;
use std::sync::Arc;

use arbor_core::error::LibraryError;
use arbor_core::progress::Progress;
use arbor_core::{PostScanTask, Result};
use arbor_model::{CollectionType, ItemType};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use support::TestLibrary;

fn recorder() -> (Progress, Arc<Mutex<Vec<f64>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (Progress::new(move |p| sink.lock().push(p)), seen)
}

#[derive(Default)]
struct CountingTask {
    runs: Mutex<usize>,
}

#[async_trait]
impl PostScanTask for CountingTask {
    fn name(&self) -> &str {
        "counting"
    }

    async fn run(
        &self,
        progress: Progress,
        _cancel: CancellationToken,
    ) -> Result<()> {
        *self.runs.lock() += 1;
        progress.report(50.0);
        Ok(())
    }
}

struct PanickingTask;

#[async_trait]
impl PostScanTask for PanickingTask {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn run(
        &self,
        _progress: Progress,
        _cancel: CancellationToken,
    ) -> Result<()> {
        panic!("post-scan task blew up");
    }
}

/// Parks the scan until released.
#[derive(Default)]
struct BlockingTask {
    started: Notify,
    release: Notify,
}

#[async_trait]
impl PostScanTask for BlockingTask {
    fn name(&self) -> &str {
        "blocking"
    }

    async fn run(
        &self,
        _progress: Progress,
        _cancel: CancellationToken,
    ) -> Result<()> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(())
    }
}

async fn add_tv_library(harness: &TestLibrary) {
    harness
        .library
        .add_virtual_folder(
            "Shows",
            Some(CollectionType::TvShows),
            &[PathBuf::from("/media/tv")],
            false,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn empty_library_scan_reaches_completion() {
    support::init_tracing();
    let harness = TestLibrary::new();
    let orchestrator = harness.orchestrator();
    let task = Arc::new(CountingTask::default());
    orchestrator.add_post_scan_task(task.clone());
    let (progress, seen) = recorder();

    let summary = orchestrator
        .validate_media_library(progress, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.removed, 0);
    assert_eq!(*task.runs.lock(), 1);
    let values = seen.lock().clone();
    assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(values.last().copied(), Some(100.0));
    assert!(values.contains(&2.0));
    assert!(values.contains(&75.0));
    assert_eq!(harness.monitor.stops(), 1);
    assert_eq!(harness.monitor.starts(), 1);
    assert!(!orchestrator.is_scanning());
}

#[tokio::test]
async fn panicking_task_does_not_stop_later_tasks() {
    support::init_tracing();
    let harness = TestLibrary::new();
    let orchestrator = harness.orchestrator();
    let later = Arc::new(CountingTask::default());
    orchestrator.add_post_scan_task(Arc::new(PanickingTask));
    orchestrator.add_post_scan_task(later.clone());
    let (progress, seen) = recorder();

    orchestrator
        .validate_media_library(progress, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(*later.runs.lock(), 1);
    assert_eq!(seen.lock().last().copied(), Some(100.0));
    assert_eq!(harness.monitor.stops(), 1);
    assert_eq!(harness.monitor.starts(), 1);
    assert!(!orchestrator.is_scanning());
}

#[tokio::test]
async fn cancelled_scan_restarts_the_monitor() {
    let harness = TestLibrary::new();
    let orchestrator = harness.orchestrator();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = orchestrator
        .validate_media_library(Progress::noop(), cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(harness.monitor.starts(), 1);
}

#[tokio::test]
async fn overlapping_scans_are_rejected() {
    let harness = TestLibrary::new();
    let orchestrator = harness.orchestrator();
    let blocker = Arc::new(BlockingTask::default());
    orchestrator.add_post_scan_task(blocker.clone());

    let first = orchestrator
        .validate_media_library(Progress::noop(), CancellationToken::new());
    let second = async {
        blocker.started.notified().await;
        assert!(orchestrator.is_scanning());
        let outcome = orchestrator
            .validate_media_library(Progress::noop(), CancellationToken::new())
            .await;
        blocker.release.notify_one();
        outcome
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.is_ok());
    assert!(matches!(second, Err(LibraryError::ScanInProgress)));
    assert_eq!(harness.monitor.starts(), 1);
}

#[tokio::test]
async fn tv_library_is_resolved_end_to_end() {
    support::init_tracing();
    let harness = TestLibrary::new();
    harness.fs.add_file("/media/tv/Lost/Season 1/Lost S01E02.mkv", 500);
    add_tv_library(&harness).await;

    let summary = harness
        .orchestrator()
        .validate_media_library(Progress::noop(), CancellationToken::new())
        .await
        .unwrap();
    assert!(summary.added >= 4);

    let collections = harness.cached_of_type(ItemType::CollectionFolder);
    assert_eq!(collections.len(), 1);
    assert_eq!(
        collections[0].read().collection_type,
        Some(CollectionType::TvShows)
    );

    let series = harness.cached_of_type(ItemType::Series);
    assert_eq!(series.len(), 1);
    let series_id = series[0].read().id;
    assert_eq!(series[0].read().name, "Lost");

    let seasons = harness.cached_of_type(ItemType::Season);
    assert_eq!(seasons.len(), 1);
    let season = seasons[0].read().clone();
    assert_eq!(season.index_number, Some(1));
    assert_eq!(season.parent_id, Some(series_id));

    let episodes = harness.cached_of_type(ItemType::Episode);
    assert_eq!(episodes.len(), 1);
    let episode = episodes[0].read().clone();
    assert_eq!(episode.index_number, Some(2));
    assert_eq!(episode.parent_index_number, Some(1));
    assert_eq!(episode.parent_id, Some(season.id));
    assert!(harness.repository.get(&episode.id).is_some());
}

#[tokio::test]
async fn rescan_is_stable_and_drops_vanished_files() {
    support::init_tracing();
    let harness = TestLibrary::new();
    harness.fs.add_file("/media/tv/Lost/Season 1/Lost S01E01.mkv", 500);
    harness.fs.add_file("/media/tv/Lost/Season 1/Lost S01E02.mkv", 500);
    add_tv_library(&harness).await;
    let orchestrator = harness.orchestrator();

    orchestrator
        .validate_media_library(Progress::noop(), CancellationToken::new())
        .await
        .unwrap();
    let first_ids: Vec<_> = harness
        .cached_of_type(ItemType::Episode)
        .iter()
        .map(|episode| episode.read().id)
        .collect();
    assert_eq!(first_ids.len(), 2);

    let unchanged = orchestrator
        .validate_media_library(Progress::noop(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!((unchanged.added, unchanged.removed), (0, 0));

    harness.fs.remove("/media/tv/Lost/Season 1/Lost S01E02.mkv");
    let rescanned = orchestrator
        .validate_media_library(Progress::noop(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(rescanned.removed, 1);
    let episodes = harness.cached_of_type(ItemType::Episode);
    assert_eq!(episodes.len(), 1);
    let remaining = episodes[0].read().clone();
    assert_eq!(remaining.index_number, Some(1));
    assert!(first_ids.contains(&remaining.id));
    let removed: Vec<_> = first_ids
        .iter()
        .filter(|id| **id != remaining.id)
        .collect();
    assert!(harness.repository.deleted_ids().contains(removed[0]));
}

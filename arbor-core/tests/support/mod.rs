#![allow(dead_code)]

use std::sync::Arc;

use arbor_core::infra::{
    InMemoryItemRepository, RecordingLibraryMonitor, RecordingProviderManager,
    RecordingTaskScheduler,
};
use arbor_core::{
    InMemoryFs, LibraryCollaborators, LibraryConfig, LibraryManager,
    LibraryResolver, ScanOrchestrator, SharedItem,
};
use arbor_model::ItemType;

pub const DATA_PATH: &str = "/data";

/// A library wired to in-memory adapters, with handles kept for
/// assertions.
pub struct TestLibrary {
    pub fs: Arc<InMemoryFs>,
    pub repository: Arc<InMemoryItemRepository>,
    pub monitor: Arc<RecordingLibraryMonitor>,
    pub scheduler: Arc<RecordingTaskScheduler>,
    pub providers: Arc<RecordingProviderManager>,
    pub library: Arc<LibraryManager>,
}

impl TestLibrary {
    pub fn new() -> Self {
        Self::build(|fs, config| LibraryResolver::new(fs, config))
    }

    /// Library whose resolver is produced by `make_resolver`.
    pub fn build<F>(make_resolver: F) -> Self
    where
        F: FnOnce(Arc<InMemoryFs>, Arc<LibraryConfig>) -> LibraryResolver,
    {
        let fs = Arc::new(InMemoryFs::new());
        let repository = Arc::new(InMemoryItemRepository::new());
        let monitor = Arc::new(RecordingLibraryMonitor::new());
        let scheduler = Arc::new(RecordingTaskScheduler::new());
        let providers = Arc::new(RecordingProviderManager::new());
        let config = Arc::new(LibraryConfig::with_data_path(DATA_PATH));

        let resolver = make_resolver(fs.clone(), config);
        let library = Arc::new(LibraryManager::with_resolver(
            resolver,
            LibraryCollaborators {
                fs: fs.clone(),
                repository: repository.clone(),
                provider_manager: providers.clone(),
                scheduler: scheduler.clone(),
            },
        ));

        Self {
            fs,
            repository,
            monitor,
            scheduler,
            providers,
            library,
        }
    }

    /// Orchestrator with no post-scan tasks registered.
    pub fn orchestrator(&self) -> ScanOrchestrator {
        ScanOrchestrator::new(self.library.clone(), self.monitor.clone())
    }

    pub fn cached_of_type(&self, item_type: ItemType) -> Vec<SharedItem> {
        self.library
            .cache()
            .values()
            .into_iter()
            .filter(|item| item.read().item_type == item_type)
            .collect()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

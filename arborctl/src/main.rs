//! `arborctl`: manage Arbor libraries and run scans from the shell.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use arbor_core::config::ConfigSource;
use arbor_core::infra::{
    InMemoryItemRepository, RecordingLibraryMonitor, RecordingProviderManager,
    RecordingTaskScheduler,
};
use arbor_core::{
    LibraryCollaborators, LibraryConfig, LibraryManager, Progress, RealFs,
    ScanOrchestrator,
};
use arbor_model::CollectionType;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "arborctl")]
#[command(about = "Manage Arbor media libraries and scan them")]
struct Cli {
    /// Program data directory (overrides config)
    #[arg(long, env = "ARBOR_DATA_PATH", global = true)]
    data_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a library pointing at one or more media folders
    AddLibrary {
        name: String,
        /// Collection type (movies, tvshows, music, photos, ...)
        #[arg(long = "type", value_parser = parse_collection_type)]
        collection_type: Option<CollectionType>,
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Remove a library; media files are left alone
    RemoveLibrary { name: String },
    /// Validate every library and print what was found
    Scan,
}

fn parse_collection_type(raw: &str) -> Result<CollectionType, String> {
    raw.parse().map_err(|err| format!("{err}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,arbor_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(cli.data_path)?;
    let library = Arc::new(LibraryManager::new(
        Arc::new(config),
        LibraryCollaborators {
            fs: Arc::new(RealFs::new()),
            repository: Arc::new(InMemoryItemRepository::new()),
            provider_manager: Arc::new(RecordingProviderManager::new()),
            scheduler: Arc::new(RecordingTaskScheduler::new()),
        },
    ));

    match cli.command {
        Command::AddLibrary {
            name,
            collection_type,
            paths,
        } => {
            let folder = library
                .add_virtual_folder(&name, collection_type, &paths, false)
                .await
                .with_context(|| format!("failed to add library '{name}'"))?;
            println!("library '{name}' created at {}", folder.display());
        }
        Command::RemoveLibrary { name } => {
            library
                .remove_virtual_folder(&name, false)
                .await
                .with_context(|| {
                    format!("failed to remove library '{name}'")
                })?;
            println!("library '{name}' removed");
        }
        Command::Scan => scan(library).await?,
    }
    Ok(())
}

fn load_config(data_path: Option<PathBuf>) -> anyhow::Result<LibraryConfig> {
    let (mut config, source) = LibraryConfig::load_from_env()
        .context("failed to load library configuration")?;
    match &source {
        ConfigSource::EnvPath(path) | ConfigSource::File(path) => {
            info!(path = %path.display(), "library config loaded from file")
        }
        ConfigSource::EnvInline => {
            info!("library config loaded from inline environment json")
        }
        ConfigSource::Default => info!("using default library config"),
    }
    if let Some(data_path) = data_path {
        config.paths.program_data_path = data_path;
    }
    Ok(config)
}

async fn scan(library: Arc<LibraryManager>) -> anyhow::Result<()> {
    let orchestrator = ScanOrchestrator::with_default_tasks(
        library.clone(),
        Arc::new(RecordingLibraryMonitor::new()),
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling scan");
            on_interrupt.cancel();
        }
    });

    // Print whole-percent steps only.
    let last = Arc::new(AtomicU64::new(0));
    let progress = Progress::new(move |percent| {
        let step = percent.floor() as u64;
        if step > last.swap(step, Ordering::AcqRel) {
            eprint!("\rscanning... {step:>3}%");
        }
    });

    let summary = orchestrator
        .validate_media_library(progress, cancel)
        .await
        .context("library scan failed")?;
    eprintln!();

    let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
    for item in library.cache().values() {
        let item_type = item.read().item_type.to_string();
        *by_type.entry(item_type).or_default() += 1;
    }

    println!(
        "added {}, updated {}, removed {}",
        summary.added, summary.updated, summary.removed
    );
    for (item_type, count) in by_type {
        println!("{item_type:>20}  {count}");
    }
    Ok(())
}

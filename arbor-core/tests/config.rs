mod support;

use std::time::Duration;

use arbor_core::{ConfigurationManager, LibraryConfig};
use arbor_core::ports::ScheduledTaskKind;
use arbor_model::{BaseItem, ItemChangeKind, ItemType, ItemUpdateReason};
use support::TestLibrary;
use tokio_util::sync::CancellationToken;

async fn wait_for<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition met in time");
}

#[tokio::test]
async fn published_changes_are_applied_by_the_listener() {
    support::init_tracing();
    let harness = TestLibrary::new();
    let mut season = BaseItem::with_path(ItemType::Season, "/tv/Lost/S0");
    season.id = harness
        .library
        .get_new_item_id("/tv/Lost/S0", ItemType::Season)
        .unwrap();
    season.index_number = Some(0);
    season.name = "Specials".to_string();
    let season = harness.library.create_item(season).await.unwrap();
    let mut events = harness.library.events().subscribe();

    let manager =
        ConfigurationManager::new(LibraryConfig::with_data_path("/data"));
    let cancel = CancellationToken::new();
    let listener = harness
        .library
        .spawn_configuration_listener(manager.subscribe(), cancel.clone());

    let mut updated = LibraryConfig::with_data_path("/data");
    updated.season_zero_display_name = "Extras".to_string();
    assert!(manager.update(updated.clone()));
    assert!(!manager.update(updated));

    wait_for(|| !harness.scheduler.queued().is_empty()).await;
    assert_eq!(season.read().name, "Extras");
    let change = events.try_recv().expect("rename published");
    assert_eq!(
        change.kind,
        ItemChangeKind::Updated(ItemUpdateReason::MetadataEdit)
    );
    assert_eq!(change.item.name, "Extras");
    assert_eq!(
        harness.scheduler.queued(),
        vec![ScheduledTaskKind::RefreshMediaLibrary]
    );
    assert_eq!(
        harness.library.config().season_zero_display_name,
        "Extras"
    );

    cancel.cancel();
    listener.await.unwrap();
}

#[tokio::test]
async fn loading_from_a_file_applies_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("library.toml");
    std::fs::write(
        &path,
        "season_zero_display_name = \"Bonus\"\n\
         [paths]\n\
         program_data_path = \"/srv/arbor\"\n",
    )
    .unwrap();

    let config = LibraryConfig::load_from_file(&path).unwrap();

    assert_eq!(config.season_zero_display_name, "Bonus");
    assert_eq!(
        config.paths.root_folder_path(),
        std::path::PathBuf::from("/srv/arbor/root")
    );
    assert!(config.is_video_file(std::path::Path::new("/m/a.mkv")));
}

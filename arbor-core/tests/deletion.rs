mod support;

use std::path::Path;

use arbor_core::error::LibraryError;
use arbor_core::{DeleteOptions, FileSystem, SharedItem};
use arbor_model::{BaseItem, ItemChangeKind, ItemId, ItemType};
use support::TestLibrary;

struct Tree {
    folder: SharedItem,
    child: ItemId,
    grandchild: ItemId,
}

fn item(harness: &TestLibrary, item_type: ItemType, path: &str) -> BaseItem {
    let mut item = BaseItem::with_path(item_type, path);
    item.id = harness.library.get_new_item_id(path, item_type).unwrap();
    item
}

/// `/media/a` holding `/media/a/b` holding `/media/a/b/x.mkv`, on disk and
/// registered with the library.
async fn tree(harness: &TestLibrary) -> Tree {
    harness.fs.add_file("/media/a/b/x.mkv", 100);

    let mut folder = item(harness, ItemType::Folder, "/media/a");
    let mut child = item(harness, ItemType::Folder, "/media/a/b");
    let mut grandchild = item(harness, ItemType::Video, "/media/a/b/x.mkv");
    grandchild.parent_id = Some(child.id);
    child.parent_id = Some(folder.id);
    child.children = vec![grandchild.id];
    folder.children = vec![child.id];
    let (child_id, grandchild_id) = (child.id, grandchild.id);

    let created = harness
        .library
        .create_items(vec![folder, child, grandchild])
        .await
        .unwrap();
    Tree {
        folder: created[0].clone(),
        child: child_id,
        grandchild: grandchild_id,
    }
}

#[tokio::test]
async fn deleting_a_folder_removes_every_descendant() {
    support::init_tracing();
    let harness = TestLibrary::new();
    let tree = tree(&harness).await;
    let folder_id = tree.folder.read().id;
    let mut events = harness.library.events().subscribe();

    harness
        .library
        .delete_item(&tree.folder, DeleteOptions::default())
        .await
        .unwrap();

    let deleted = harness.repository.deleted_ids();
    assert_eq!(deleted.len(), 3);
    for id in [folder_id, tree.child, tree.grandchild] {
        assert!(deleted.contains(&id));
        assert!(!harness.library.cache().contains(&id));
        assert!(harness.repository.get(&id).is_none());
    }
    // Media stays on disk unless asked otherwise.
    assert!(harness.fs.path_exists(Path::new("/media/a/b/x.mkv")).await);

    let change = events.recv().await.unwrap();
    assert_eq!(change.kind, ItemChangeKind::Removed);
    assert_eq!(change.item.id, folder_id);
}

#[tokio::test]
async fn metadata_and_repository_failures_do_not_abort_deletion() {
    support::init_tracing();
    let harness = TestLibrary::new();
    let tree = tree(&harness).await;

    let child = harness.library.cache().get(&tree.child).unwrap();
    let child_metadata =
        harness.library.item_metadata_path(&child.read().clone());
    harness.fs.add_dir(&child_metadata);
    harness.fs.deny_removal(child_metadata.clone());
    harness.repository.fail_delete_of(tree.grandchild);

    harness
        .library
        .delete_item(&tree.folder, DeleteOptions::default())
        .await
        .unwrap();

    assert_eq!(harness.repository.deleted_ids().len(), 3);
    assert!(!harness.library.cache().contains(&tree.grandchild));
    assert!(!harness.library.cache().contains(&tree.child));
    assert!(harness.fs.path_exists(&child_metadata).await);
}

#[tokio::test]
async fn deleting_the_file_location_removes_media() {
    let harness = TestLibrary::new();
    let tree = tree(&harness).await;
    let video = harness.library.cache().get(&tree.grandchild).unwrap();
    let options = DeleteOptions {
        delete_file_location: true,
    };

    harness.library.delete_item(&video, options).await.unwrap();

    assert!(!harness.fs.path_exists(Path::new("/media/a/b/x.mkv")).await);
    let child = harness.library.cache().get(&tree.child).unwrap();
    assert!(child.read().children.is_empty());
    assert!(harness.repository.get(&tree.child).unwrap().children.is_empty());
}

#[tokio::test]
async fn refused_file_removal_is_reported() {
    let harness = TestLibrary::new();
    let tree = tree(&harness).await;
    harness.fs.deny_removal("/media/a");

    let options = DeleteOptions {
        delete_file_location: true,
    };
    let err = harness
        .library
        .delete_item(&tree.folder, options)
        .await
        .unwrap_err();

    assert!(matches!(err, LibraryError::Io(_)));
    assert!(harness.library.cache().contains(&tree.child));
}

#[tokio::test]
async fn items_without_ids_are_rejected() {
    let harness = TestLibrary::new();
    let orphan =
        arbor_core::identity::shared(BaseItem::new(ItemType::Folder));

    let err = harness
        .library
        .delete_item(&orphan, DeleteOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, LibraryError::InvalidArgument(_)));
}

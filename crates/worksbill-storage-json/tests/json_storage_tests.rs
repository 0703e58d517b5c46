use std::fs;

use rust_decimal::Decimal;
use tempfile::tempdir;
use worksbill_core::{storage::ProjectStorage, CoreError};
use worksbill_domain::{BoqItem, LedgerBalance, Project, ProjectBook};
use worksbill_storage_json::{canonical_name, JsonProjectStorage};

fn storage(dir: &std::path::Path, retention: usize) -> JsonProjectStorage {
    JsonProjectStorage::with_retention(dir.join("books"), dir.join("backups"), retention)
        .expect("create storage")
}

fn sample_book(name: &str) -> ProjectBook {
    let mut book = ProjectBook::new(name);
    let project = Project::new("NH-44", "Bypass widening");
    let item = BoqItem::new(
        project.id,
        "2.1",
        "Granular sub-base",
        "cum",
        Decimal::from(800),
        Decimal::new(125050, 2),
    );
    book.balances.push(LedgerBalance {
        boq_item_id: item.id,
        verified_quantity: Decimal::new(1205, 1),
    });
    book.boq_items.push(item);
    book.projects.push(project);
    book
}

#[test]
fn json_storage_can_save_and_load_book() {
    let dir = tempdir().expect("tempdir");
    let storage = storage(dir.path(), 5);
    let book = sample_book("Highway Division");

    storage.save_book("Highway Division", &book).expect("save book");
    let loaded = storage.load_book("Highway Division").expect("load book");

    assert_eq!(loaded.name, "Highway Division");
    assert_eq!(loaded.boq_items, book.boq_items);
    assert_eq!(loaded.balances[0].verified_quantity, Decimal::new(1205, 1));
    let path = storage.book_path("Highway Division");
    assert_eq!(path.extension().and_then(|ext| ext.to_str()), Some("json"));
    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());
    assert_eq!(storage.list_books().expect("list"), vec!["highway-division"]);
}

#[test]
fn missing_book_is_not_found() {
    let dir = tempdir().expect("tempdir");
    let storage = storage(dir.path(), 5);
    assert!(matches!(
        storage.load_book("nothing-here"),
        Err(CoreError::NotFound { .. })
    ));
}

#[test]
fn overwriting_a_book_snapshots_the_previous_file() {
    let dir = tempdir().expect("tempdir");
    let storage = storage(dir.path(), 5);
    let mut book = sample_book("Division");
    storage.save_book("division", &book).expect("first save");
    assert!(storage.list_backups("division").expect("list").is_empty());

    book.name = "Division renamed".into();
    storage.save_book("division", &book).expect("second save");

    let backups = storage.list_backups("division").expect("list");
    assert_eq!(backups.len(), 1);
    let previous = storage.load_book_from_path(&backups[0].path).expect("load backup");
    assert_eq!(previous.name, "Division");
}

#[test]
fn json_storage_creates_and_restores_backups() {
    let dir = tempdir().expect("tempdir");
    let storage = storage(dir.path(), 5);
    let book = sample_book("BackupTest");
    storage.save_book("backup-book", &book).expect("save book");

    let info = storage
        .backup_book("backup-book", &book, Some("Before RA 3"))
        .expect("create backup");
    assert!(info.id.ends_with("_before-ra-3.json"));

    let backups = storage.list_backups("backup-book").expect("list backups");
    assert!(
        backups.iter().any(|entry| entry.id == info.id),
        "backup list should include created backup"
    );

    storage.delete_book("backup-book").expect("delete");
    assert!(storage.list_books().expect("list").is_empty());

    let restored = storage.restore_backup(&info).expect("restore backup");
    assert_eq!(restored.name, book.name);
    assert!(storage.book_path("backup-book").exists());
}

#[test]
fn backups_are_pruned_to_retention() {
    let dir = tempdir().expect("tempdir");
    let storage = storage(dir.path(), 2);
    let book = sample_book("Pruned");
    for _ in 0..4 {
        storage.backup_book("pruned", &book, None).expect("backup");
    }
    let backups = storage.list_backups("pruned").expect("list");
    assert_eq!(backups.len(), 2);
    let on_disk = fs::read_dir(dir.path().join("backups").join("pruned"))
        .expect("read dir")
        .count();
    assert_eq!(on_disk, 2);
}

#[test]
fn canonical_names_are_filesystem_safe() {
    assert_eq!(canonical_name(" Ring Road / Phase 2 "), "ring-road---phase-2");
    assert_eq!(canonical_name("***"), "book");
}

#[test]
fn legacy_books_without_optional_collections_load() {
    let dir = tempdir().expect("tempdir");
    let storage = storage(dir.path(), 5);
    let path = dir.path().join("legacy.json");
    fs::write(
        &path,
        r#"{
            "id": "3f2504e0-4f89-11d3-9a0c-0305e82c3301",
            "name": "Legacy",
            "created_at": "2024-04-01T00:00:00Z",
            "updated_at": "2024-04-01T00:00:00Z"
        }"#,
    )
    .expect("write legacy");

    let book = storage.load_book_from_path(&path).expect("load legacy");
    assert_eq!(book.name, "Legacy");
    assert!(book.bills.is_empty());
}

#[test]
fn exporting_into_the_books_directory_keeps_the_previous_file() {
    let dir = tempdir().expect("tempdir");
    let storage = storage(dir.path(), 5);
    let mut book = sample_book("Division");
    storage.save_book("division", &book).expect("save");

    book.name = "Division exported".into();
    let target = storage.book_path("division");
    storage.save_book_to_path(&book, &target).expect("export");

    let backups = storage.list_backup_metadata("division").expect("list");
    assert_eq!(backups.len(), 1);
    assert!(backups[0].created_at.is_some());
    assert!(backups[0].size_bytes > 0);
    let previous = storage.load_book_from_path(&backups[0].path).expect("load backup");
    assert_eq!(previous.name, "Division");

    let outside = dir.path().join("export.json");
    storage.save_book_to_path(&book, &outside).expect("export outside");
    assert_eq!(storage.list_backups("division").expect("list").len(), 1);
}

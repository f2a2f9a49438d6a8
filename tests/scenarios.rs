//! End-to-end scenarios exercising the engine over a real temp repository:
//! symbol definition, rename, edit-without-rename, and delete.

use codeintel::indexing::FileEvent;
use codeintel::types::SymbolKind;
use codeintel::{CodeIntelligenceEngine, Settings};
use tempfile::TempDir;

fn settings_for(dir: &TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.index_storage_root = dir.path().join("storage");
    settings
}

#[test]
fn s1_symbol_definition_records_parent_and_location() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("lib")).unwrap();
    std::fs::write(
        dir.path().join("lib/mod.rs"),
        "mod widget {\n    fn draw() {}\n}\n",
    )
    .unwrap();

    let settings = settings_for(&dir);
    let engine = CodeIntelligenceEngine::open(dir.path(), None, &settings).unwrap();
    engine.reindex(None).unwrap();

    let widget = engine.symbol_lookup("widget").expect("module symbol found");
    assert_eq!(widget.relative_file, "lib/mod.rs");

    let draw = engine.symbol_lookup("draw").expect("nested fn found");
    assert_eq!(draw.parent_name.as_deref(), Some("widget"));
}

#[test]
fn s1_class_method_records_parent_and_method_kind() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("widget.py"),
        "class Widget:\n    def draw(self):\n        pass\n",
    )
    .unwrap();

    let settings = settings_for(&dir);
    let engine = CodeIntelligenceEngine::open(dir.path(), None, &settings).unwrap();
    engine.reindex(None).unwrap();

    let draw = engine.symbol_lookup("draw").expect("method found");
    assert_eq!(draw.kind, SymbolKind::Method);
    assert_eq!(draw.parent_name.as_deref(), Some("Widget"));
}

#[test]
fn s2_rename_preserves_symbol_identity_and_records_move() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("lib")).unwrap();
    let old_path = dir.path().join("lib/mod.rs");
    std::fs::write(&old_path, "fn widget() {}\n").unwrap();

    let settings = settings_for(&dir);
    let engine = CodeIntelligenceEngine::open(dir.path(), None, &settings).unwrap();
    engine.reindex(None).unwrap();
    assert!(engine.symbol_lookup("widget").is_some());

    let new_path = dir.path().join("lib/mod2.rs");
    std::fs::rename(&old_path, &new_path).unwrap();

    engine
        .indexer()
        .handle_event(FileEvent::Moved {
            old: old_path,
            new: new_path,
        })
        .unwrap();

    let widget = engine.symbol_lookup("widget").expect("symbol survives rename");
    assert_eq!(widget.relative_file, "lib/mod2.rs");
}

#[test]
fn s3_edit_without_rename_preserves_existing_symbol() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mod.rs");
    std::fs::write(&path, "fn widget() {}\n").unwrap();

    let settings = settings_for(&dir);
    let engine = CodeIntelligenceEngine::open(dir.path(), None, &settings).unwrap();
    engine.reindex(None).unwrap();
    assert!(engine.symbol_lookup("widget").is_some());

    std::fs::write(&path, "fn widget() {}\nfn button() {}\n").unwrap();
    engine.reindex(None).unwrap();

    assert!(engine.symbol_lookup("widget").is_some());
    assert!(engine.symbol_lookup("button").is_some());
}

#[test]
fn s4_delete_cascades_to_not_found() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mod.rs");
    std::fs::write(&path, "fn widget() {}\n").unwrap();

    let settings = settings_for(&dir);
    let engine = CodeIntelligenceEngine::open(dir.path(), None, &settings).unwrap();
    engine.reindex(None).unwrap();
    assert!(engine.symbol_lookup("widget").is_some());

    std::fs::remove_file(&path).unwrap();
    engine
        .indexer()
        .handle_event(FileEvent::Deleted(path))
        .unwrap();

    assert!(engine.symbol_lookup("widget").is_none());
}

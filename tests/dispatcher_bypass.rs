//! Full-text bypass: a query that matches file content but is not an
//! extractor hit still surfaces the indexed content search results.

use codeintel::dispatcher::Dispatcher;
use codeintel::extractor::registry;
use codeintel::path_resolver::PathResolver;
use codeintel::storage::IndexStore;
use codeintel::Settings;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn empty_extractor_results_fall_back_to_full_text_content_search() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("repo");
    std::fs::create_dir_all(&root).unwrap();
    let path = root.join("notes.rs");
    std::fs::write(&path, "// marmalade sandwich recipe\nfn widget() {}\n").unwrap();

    let resolver = PathResolver::new(&root, None).unwrap();
    let store = Arc::new(IndexStore::open(&dir.path().join("store")).unwrap());
    let reg = registry::init(&Settings::default());
    let dispatcher = Dispatcher::new(reg, store.clone(), vec!["rust".to_string()]);

    let relative = resolver.normalize(&path).unwrap();
    let content_hash = resolver.content_hash(&path).unwrap();
    let file_id = store.store_file(relative.as_str(), "rust", &content_hash);
    store
        .index_content(file_id, relative.as_str(), &std::fs::read_to_string(&path).unwrap())
        .unwrap();

    let hits = dispatcher.search("marmalade", 10);
    assert!(hits.iter().any(|h| h.relative_file.contains("notes.rs")));
}

#[test]
fn forced_bypass_merges_alongside_extractor_hits() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("repo");
    std::fs::create_dir_all(&root).unwrap();
    let path = root.join("notes.rs");
    std::fs::write(&path, "// marmalade sandwich recipe\nfn widget() {}\n").unwrap();

    let resolver = PathResolver::new(&root, None).unwrap();
    let store = Arc::new(IndexStore::open(&dir.path().join("store")).unwrap());
    let reg = registry::init(&Settings::default());
    let dispatcher = Dispatcher::new(reg, store.clone(), vec!["rust".to_string()]).with_bypass_forced(true);

    let relative = resolver.normalize(&path).unwrap();
    let content_hash = resolver.content_hash(&path).unwrap();
    let file_id = store.store_file(relative.as_str(), "rust", &content_hash);
    store
        .index_content(file_id, relative.as_str(), &std::fs::read_to_string(&path).unwrap())
        .unwrap();

    let hits = dispatcher.bypass_search("marmalade", 10).unwrap();
    assert!(hits.iter().any(|h| h.relative_file.contains("notes.rs")));
}

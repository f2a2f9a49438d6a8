//! S10: a burst of rapid saves to the same file within the debounce window
//! settles into a single up-to-date index entry once the watcher catches up.

use codeintel::dispatcher::Dispatcher;
use codeintel::extractor::registry;
use codeintel::indexing::IncrementalIndexer;
use codeintel::path_resolver::PathResolver;
use codeintel::repository::Repository;
use codeintel::storage::IndexStore;
use codeintel::watcher::FileWatcher;
use codeintel::Settings;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn rapid_saves_settle_on_the_final_content() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_path_buf();
    let target = root.join("lib.rs");
    std::fs::write(&target, "fn widget() {}\n").unwrap();

    let resolver = Arc::new(PathResolver::new(&root, None).unwrap());
    let repository = Repository::new(root.clone(), None, &dir.path().join("storage"));
    let store = Arc::new(IndexStore::open(&repository.index_storage_dir).unwrap());
    let reg = registry::init(&Settings::default());
    let dispatcher = Arc::new(Dispatcher::new(reg, store.clone(), vec!["rust".to_string()]));
    let indexer = Arc::new(IncrementalIndexer::new(
        resolver.clone(),
        store.clone(),
        dispatcher.clone(),
        2,
    ));

    let watcher = FileWatcher::builder()
        .indexer(indexer)
        .resolver(resolver)
        .debounce_ms(150)
        .watch_root(root.clone())
        .build()
        .unwrap();
    let watcher = Arc::new(watcher);

    let stop = Arc::new(AtomicBool::new(false));
    let run_handle = {
        let watcher = watcher.clone();
        let stop = stop.clone();
        std::thread::spawn(move || watcher.run_until(&stop))
    };

    for body in [
        "fn widget() {}\nfn a() {}\n",
        "fn widget() {}\nfn a() {}\nfn b() {}\n",
        "fn widget() {}\nfn a() {}\nfn b() {}\nfn c() {}\n",
    ] {
        std::fs::write(&target, body).unwrap();
        std::thread::sleep(Duration::from_millis(20));
    }

    std::thread::sleep(Duration::from_millis(500));
    stop.store(true, Ordering::Relaxed);
    run_handle.join().unwrap().unwrap();

    assert_eq!(store.symbol_count(), 4);
}

//! S5: a symbol defined identically in two registered repositories is
//! surfaced once per repository (not deduped away) but duplicate hits for
//! the exact same file+line within a single repository collapse to one.

use codeintel::coordinator::{Coordinator, Scope};
use codeintel::dispatcher::Dispatcher;
use codeintel::extractor::registry;
use codeintel::indexing::{FileEvent, IncrementalIndexer};
use codeintel::path_resolver::PathResolver;
use codeintel::repository::Repository;
use codeintel::storage::IndexStore;
use codeintel::Settings;
use std::sync::Arc;
use tempfile::TempDir;

fn build_repo(root: &std::path::Path, storage_root: &std::path::Path) -> (Repository, Arc<IndexStore>, Arc<Dispatcher>, Arc<IncrementalIndexer>, Arc<PathResolver>) {
    std::fs::create_dir_all(root).unwrap();
    std::fs::write(root.join("lib.rs"), "fn widget() {}\n").unwrap();

    let resolver = Arc::new(PathResolver::new(root, None).unwrap());
    let repository = Repository::new(root.to_path_buf(), None, storage_root);
    let store = Arc::new(IndexStore::open(&repository.index_storage_dir).unwrap());
    let reg = registry::init(&Settings::default());
    let dispatcher = Arc::new(Dispatcher::new(reg, store.clone(), vec!["rust".to_string()]));
    let indexer = Arc::new(IncrementalIndexer::new(
        resolver.clone(),
        store.clone(),
        dispatcher.clone(),
        2,
    ));
    indexer
        .handle_event(FileEvent::Created(root.join("lib.rs")))
        .unwrap();

    (repository, store, dispatcher, indexer, resolver)
}

#[test]
fn same_symbol_in_two_repos_is_merged_without_losing_either() {
    let dir = TempDir::new().unwrap();
    let coordinator = Coordinator::with_workers(2);

    let (repo_a, store_a, dispatcher_a, _indexer_a, _resolver_a) =
        build_repo(&dir.path().join("repo-a"), dir.path());
    let (repo_b, store_b, dispatcher_b, _indexer_b, _resolver_b) =
        build_repo(&dir.path().join("repo-b"), dir.path());

    let id_a = repo_a.id.clone();
    let id_b = repo_b.id.clone();
    coordinator.register(repo_a, store_a, dispatcher_a);
    coordinator.register(repo_b, store_b, dispatcher_b);

    let result = coordinator.search_symbol("widget", Scope::default());
    assert!(result.errors.is_empty());
    assert_eq!(result.hits.len(), 1);

    let repos_hit: std::collections::HashSet<_> =
        result.hits[0].repository_ids.iter().cloned().collect();
    assert!(repos_hit.contains(&id_a));
    assert!(repos_hit.contains(&id_b));
}

#[test]
fn scope_restricts_search_to_named_repositories() {
    let dir = TempDir::new().unwrap();
    let coordinator = Coordinator::with_workers(2);

    let (repo_a, store_a, dispatcher_a, _indexer_a, _resolver_a) =
        build_repo(&dir.path().join("repo-a"), dir.path());
    let (repo_b, store_b, dispatcher_b, _indexer_b, _resolver_b) =
        build_repo(&dir.path().join("repo-b"), dir.path());

    let id_a = repo_a.id.clone();
    coordinator.register(repo_a, store_a, dispatcher_a);
    coordinator.register(repo_b, store_b, dispatcher_b);

    let scope = Scope {
        repositories: Some(vec![id_a.clone()]),
        ..Scope::default()
    };
    let result = coordinator.search_symbol("widget", scope);

    assert!(result.hits.iter().all(|h| h.repository_ids == vec![id_a.clone()]));
}

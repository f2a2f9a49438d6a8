//! Multi-Repo Coordinator: runs one query across several registered
//! repositories and merges the results.
//!
//! New relative to the teacher (single-repo only). Grounded on the
//! teacher's `semantic/pool.rs` worker-pool-with-bounded-channel idiom
//! (here: a fixed-size rayon pool running one task per repository) and on
//! the Dispatcher's own dedup/rank logic, generalized across repositories
//! with per-repo timeouts and repository-priority tiebreaking.

use crate::dispatcher::{Dispatcher, SearchResult};
use crate::repository::{Repository, RepositoryId};
use crate::storage::IndexStore;
use crate::symbol::Symbol;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

const SYMBOL_TIMEOUT: Duration = Duration::from_secs(30);
const CODE_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_WORKERS: usize = 4;

struct RepoEntry {
    repository: Repository,
    store: Arc<IndexStore>,
    dispatcher: Arc<Dispatcher>,
    priority: i32,
    active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub repositories: Option<Vec<RepositoryId>>,
    pub language: Option<String>,
    pub max_repositories: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct RepoError {
    pub repository_id: RepositoryId,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct AggregatedSymbolHit {
    pub symbol: Symbol,
    pub repository_ids: Vec<RepositoryId>,
}

#[derive(Debug, Clone)]
pub struct AggregatedCodeHit {
    pub result: SearchResult,
    pub repository_ids: Vec<RepositoryId>,
}

#[derive(Debug, Clone, Default)]
pub struct AggregatedSymbolResult {
    pub hits: Vec<AggregatedSymbolHit>,
    pub errors: Vec<RepoError>,
}

#[derive(Debug, Clone, Default)]
pub struct AggregatedCodeResult {
    pub hits: Vec<AggregatedCodeHit>,
    pub errors: Vec<RepoError>,
}

pub struct Coordinator {
    repos: RwLock<HashMap<RepositoryId, RepoEntry>>,
    pool: rayon::ThreadPool,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::with_workers(DEFAULT_WORKERS)
    }

    pub fn with_workers(workers: usize) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .build()
            .expect("coordinator pool construction cannot fail with a positive thread count");
        Self {
            repos: RwLock::new(HashMap::new()),
            pool,
        }
    }

    pub fn register(&self, repository: Repository, store: Arc<IndexStore>, dispatcher: Arc<Dispatcher>) {
        let id = repository.id.clone();
        self.repos.write().insert(
            id,
            RepoEntry {
                repository,
                store,
                dispatcher,
                priority: 0,
                active: true,
            },
        );
    }

    pub fn unregister(&self, repo_id: &RepositoryId) {
        self.repos.write().remove(repo_id);
    }

    pub fn list(&self, active_only: bool) -> Vec<Repository> {
        self.repos
            .read()
            .values()
            .filter(|e| !active_only || e.active)
            .map(|e| e.repository.clone())
            .collect()
    }

    pub fn set_priority(&self, repo_id: &RepositoryId, priority: i32) {
        if let Some(entry) = self.repos.write().get_mut(repo_id) {
            entry.priority = priority;
        }
    }

    fn selected_repos(&self, scope: &Scope) -> Vec<(RepositoryId, Arc<IndexStore>, Arc<Dispatcher>, i32)> {
        let repos = self.repos.read();
        let allow: Option<HashSet<&RepositoryId>> = scope
            .repositories
            .as_ref()
            .map(|ids| ids.iter().collect());

        let mut selected: Vec<_> = repos
            .values()
            .filter(|e| e.active)
            .filter(|e| allow.as_ref().is_none_or(|set| set.contains(&e.repository.id)))
            .filter(|e| {
                scope
                    .language
                    .as_ref()
                    .is_none_or(|lang| e.dispatcher.languages().contains(lang))
            })
            .map(|e| (e.repository.id.clone(), e.store.clone(), e.dispatcher.clone(), e.priority))
            .collect();

        selected.sort_by(|a, b| b.3.cmp(&a.3));
        if let Some(max) = scope.max_repositories {
            selected.truncate(max);
        }
        selected
    }

    pub fn search_symbol(&self, query: &str, scope: Scope) -> AggregatedSymbolResult {
        let targets = self.selected_repos(&scope);
        let query = query.to_string();

        let per_repo: Vec<Result<(RepositoryId, Vec<(Symbol, String)>), RepoError>> = self.pool.install(|| {
            use rayon::prelude::*;
            targets
                .par_iter()
                .map(|(id, store, dispatcher, _priority)| {
                    run_with_timeout(SYMBOL_TIMEOUT, {
                        let query = query.clone();
                        let store = store.clone();
                        let dispatcher = dispatcher.clone();
                        move || {
                            let symbols = dispatcher
                                .lookup(&query)
                                .map(|s| vec![s])
                                .unwrap_or_else(|| store.search_symbols_trigram(&query, 50));
                            symbols
                                .into_iter()
                                .map(|symbol| {
                                    let relative_path = store
                                        .file_record(symbol.file_id)
                                        .map(|r| r.relative_path.to_string())
                                        .unwrap_or_default();
                                    (symbol, relative_path)
                                })
                                .collect::<Vec<_>>()
                        }
                    })
                    .map(|symbols| (id.clone(), symbols))
                    .map_err(|reason| RepoError { repository_id: id.clone(), reason })
                })
                .collect()
        });

        let mut result = AggregatedSymbolResult::default();
        let mut merged: HashMap<String, AggregatedSymbolHit> = HashMap::new();
        for outcome in per_repo {
            match outcome {
                Ok((repo_id, symbols)) => {
                    for (symbol, relative_path) in symbols {
                        let key = signature(&[
                            &symbol.name,
                            &relative_path,
                            &symbol.range.start_line.to_string(),
                        ]);
                        merged
                            .entry(key)
                            .and_modify(|hit| {
                                if !hit.repository_ids.contains(&repo_id) {
                                    hit.repository_ids.push(repo_id.clone());
                                }
                            })
                            .or_insert_with(|| AggregatedSymbolHit {
                                symbol: symbol.clone(),
                                repository_ids: vec![repo_id.clone()],
                            });
                    }
                }
                Err(err) => result.errors.push(err),
            }
        }

        result.hits = merged.into_values().collect();
        rank_symbols(&mut result.hits, &self.repos.read());
        result
    }

    pub fn search_code(&self, query: &str, scope: Scope, _semantic: bool) -> AggregatedCodeResult {
        let targets = self.selected_repos(&scope);
        let query = query.to_string();

        let per_repo: Vec<Result<(RepositoryId, Vec<SearchResult>), RepoError>> = self.pool.install(|| {
            use rayon::prelude::*;
            targets
                .par_iter()
                .map(|(id, _store, dispatcher, _priority)| {
                    run_with_timeout(CODE_TIMEOUT, {
                        let query = query.clone();
                        let dispatcher = dispatcher.clone();
                        move || dispatcher.search(&query, 50)
                    })
                    .map(|hits| (id.clone(), hits))
                    .map_err(|reason| RepoError { repository_id: id.clone(), reason })
                })
                .collect()
        });

        let mut result = AggregatedCodeResult::default();
        let mut merged: HashMap<String, AggregatedCodeHit> = HashMap::new();
        for outcome in per_repo {
            match outcome {
                Ok((repo_id, hits)) => {
                    for hit in hits {
                        let key = signature(&[&hit.relative_file, &hit.line.to_string()]);
                        merged
                            .entry(key)
                            .and_modify(|agg| {
                                if !agg.repository_ids.contains(&repo_id) {
                                    agg.repository_ids.push(repo_id.clone());
                                }
                            })
                            .or_insert_with(|| AggregatedCodeHit {
                                result: hit.clone(),
                                repository_ids: vec![repo_id.clone()],
                            });
                    }
                }
                Err(err) => result.errors.push(err),
            }
        }

        result.hits = merged.into_values().collect();
        rank_code_hits(&mut result.hits, &self.repos.read());
        result
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

fn run_with_timeout<T: Send + 'static>(
    timeout: Duration,
    f: impl FnOnce() -> T + Send + 'static,
) -> Result<T, String> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    std::thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx.recv_timeout(timeout)
        .map_err(|_| "repository query timed out".to_string())
}

/// A stable per-hit signature for dedup, grounded on the content-hash
/// signatures used throughout the Index Store; a short hex digest plays
/// the role the spec assigns to an MD5 prefix without adding a second
/// hashing dependency alongside the SHA-256 already used everywhere else.
fn signature(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"\0");
    }
    let digest = hasher.finalize();
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

fn max_priority(ids: &[RepositoryId], repos: &HashMap<RepositoryId, RepoEntry>) -> i32 {
    ids.iter()
        .filter_map(|id| repos.get(id).map(|e| e.priority))
        .max()
        .unwrap_or(0)
}

fn rank_symbols(hits: &mut [AggregatedSymbolHit], repos: &HashMap<RepositoryId, RepoEntry>) {
    hits.sort_by(|a, b| {
        let pa = max_priority(&a.repository_ids, repos);
        let pb = max_priority(&b.repository_ids, repos);
        pb.cmp(&pa)
    });
}

fn rank_code_hits(hits: &mut [AggregatedCodeHit], repos: &HashMap<RepositoryId, RepoEntry>) {
    hits.sort_by(|a, b| {
        let score_a = a.result.score.unwrap_or(0.0);
        let score_b = b.result.score.unwrap_or(0.0);
        match score_b.partial_cmp(&score_a).unwrap_or(std::cmp::Ordering::Equal) {
            std::cmp::Ordering::Equal => {
                let pa = max_priority(&a.repository_ids, repos);
                let pb = max_priority(&b.repository_ids, repos);
                pb.cmp(&pa)
            }
            other => other,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn register_and_list_round_trips() {
        let dir = TempDir::new().unwrap();
        let coordinator = Coordinator::with_workers(2);

        let root = dir.path().join("repo-a");
        std::fs::create_dir_all(&root).unwrap();
        let repository = Repository::new(root, None, dir.path());
        let store = Arc::new(IndexStore::open(&dir.path().join("repo-a-store")).unwrap());
        let registry = crate::extractor::registry::init(&crate::config::Settings::default());
        let dispatcher = Arc::new(Dispatcher::new(registry, store.clone(), vec!["rust".to_string()]));

        coordinator.register(repository.clone(), store, dispatcher);
        assert_eq!(coordinator.list(true).len(), 1);

        coordinator.unregister(&repository.id);
        assert!(coordinator.list(true).is_empty());
    }
}

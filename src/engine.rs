//! The `CodeIntelligenceEngine` facade: the in-process command surface a
//! front-end (CLI, server, editor plugin) wraps. Grounded on the teacher's
//! `IndexFacade` (single entry point wrapping the store, dispatcher and
//! watcher), generalized to a per-repository engine over the new module
//! tree.

use crate::config::Settings;
use crate::dispatcher::{Dispatcher, SearchResult as DispatcherHit};
use crate::error::{IndexError, IndexResult};
use crate::extractor::registry::{self, Registry};
use crate::indexing::{FileEvent, IncrementalIndexer};
use crate::path_resolver::PathResolver;
use crate::repository::Repository;
use crate::storage::IndexStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A symbol as returned across the external interface: absolute_file is
/// derived from the Path Resolver rather than stored.
#[derive(Debug, Clone)]
pub struct SymbolRecord {
    pub name: String,
    pub kind: crate::types::SymbolKind,
    pub absolute_file: PathBuf,
    pub relative_file: String,
    pub start: (u32, u32),
    pub end: (u32, u32),
    pub signature: Option<String>,
    pub docstring: Option<String>,
    pub parent_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EngineStatus {
    pub file_count: usize,
    pub symbol_count: usize,
    pub degraded_languages: Vec<String>,
    pub last_index_time_utc: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ExtractorInfo {
    pub language: &'static str,
    pub suffixes: &'static [&'static str],
    pub enhanced: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ReindexReport {
    pub files_processed: usize,
}

pub struct CodeIntelligenceEngine {
    repository: Repository,
    resolver: Arc<PathResolver>,
    store: Arc<IndexStore>,
    registry: Arc<Registry>,
    dispatcher: Arc<Dispatcher>,
    indexer: Arc<IncrementalIndexer>,
    last_index_time_utc: std::sync::atomic::AtomicU64,
}

impl CodeIntelligenceEngine {
    /// Open (or create) the engine for the repository rooted at `root`,
    /// using `settings` for storage location, memory budget, and
    /// extractor priority.
    pub fn open(root: &Path, remote_url: Option<String>, settings: &Settings) -> IndexResult<Self> {
        let resolver = Arc::new(PathResolver::new(root, remote_url.as_deref())?);
        let repository = Repository::new(
            resolver.root().to_path_buf(),
            remote_url,
            &settings.index_storage_root,
        );

        let store = Arc::new(IndexStore::open(&repository.index_storage_dir)?);
        let registry = registry::init(settings);
        let dispatcher = Arc::new(Dispatcher::new(
            registry.clone(),
            store.clone(),
            settings.priority_languages.clone(),
        ));
        let indexer = Arc::new(IncrementalIndexer::new(
            resolver.clone(),
            store.clone(),
            dispatcher.clone(),
            settings.worker_pool_size,
        ));

        Ok(Self {
            repository,
            resolver,
            store,
            registry,
            dispatcher,
            indexer,
            last_index_time_utc: std::sync::atomic::AtomicU64::new(0),
        })
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn indexer(&self) -> Arc<IncrementalIndexer> {
        self.indexer.clone()
    }

    pub fn resolver(&self) -> Arc<PathResolver> {
        self.resolver.clone()
    }

    /// `symbol_lookup(name) -> 0 or 1 Symbol record`.
    pub fn symbol_lookup(&self, name: &str) -> Option<SymbolRecord> {
        self.dispatcher
            .lookup(name)
            .map(|symbol| self.to_symbol_record(&symbol))
    }

    /// `search_code(query, semantic?, limit) -> up to limit SearchResult`.
    pub fn search_code(&self, query: &str, limit: usize) -> Vec<DispatcherHit> {
        self.dispatcher.search(query, limit)
    }

    /// `get_status() -> counts of files/symbols, memory, last index time`.
    pub fn get_status(&self) -> EngineStatus {
        EngineStatus {
            file_count: self.store.file_count(),
            symbol_count: self.store.symbol_count(),
            degraded_languages: self.dispatcher.degraded_languages(),
            last_index_time_utc: match self.last_index_time_utc.load(std::sync::atomic::Ordering::Relaxed) {
                0 => None,
                t => Some(t),
            },
        }
    }

    /// `list_extractors() -> list of (language, suffixes, enhanced?)`.
    pub fn list_extractors(&self) -> Vec<ExtractorInfo> {
        self.registry
            .list_languages()
            .into_iter()
            .map(|(language, suffixes, enhanced)| ExtractorInfo {
                language,
                suffixes,
                enhanced,
            })
            .collect()
    }

    /// `reindex(path?) -> count of files processed`. When `path` is `None`,
    /// walks the whole repository root.
    pub fn reindex(&self, path: Option<&Path>) -> IndexResult<ReindexReport> {
        let root = path.unwrap_or_else(|| self.resolver.root());
        let mut files_processed = 0usize;

        for entry in ignore::WalkBuilder::new(root).hidden(false).build() {
            let entry = entry.map_err(|e| IndexError::General(e.to_string()))?;
            if entry.file_type().is_some_and(|t| t.is_file()) {
                self.indexer
                    .handle_event(FileEvent::Modified(entry.path().to_path_buf()))?;
                files_processed += 1;
            }
        }

        self.store.flush()?;
        self.last_index_time_utc
            .store(now_utc(), std::sync::atomic::Ordering::Relaxed);
        Ok(ReindexReport { files_processed })
    }

    fn to_symbol_record(&self, symbol: &crate::symbol::Symbol) -> SymbolRecord {
        let relative_file = self
            .store
            .file_record(symbol.file_id)
            .map(|r| r.relative_path.to_string())
            .unwrap_or_default();
        let absolute_file = self.resolver.root().join(&relative_file);
        let parent_name = symbol
            .parent
            .and_then(|parent_id| self.store.symbol(parent_id))
            .map(|parent| parent.name.to_string());

        SymbolRecord {
            name: symbol.name.to_string(),
            kind: symbol.kind,
            absolute_file,
            relative_file,
            start: (symbol.range.start_line, symbol.range.start_column),
            end: (symbol.range.end_line, symbol.range.end_column),
            signature: symbol.signature.as_ref().map(|s| s.to_string()),
            docstring: symbol.doc_comment.as_ref().map(|s| s.to_string()),
            parent_name,
        }
    }
}

fn now_utc() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_creates_a_fresh_store_for_a_new_repository() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("lib.rs"), "fn main() {}\n").unwrap();

        let mut settings = Settings::default();
        settings.index_storage_root = dir.path().join("storage");

        let engine = CodeIntelligenceEngine::open(dir.path(), None, &settings).unwrap();
        let status = engine.get_status();
        assert_eq!(status.file_count, 0);
        assert!(status.last_index_time_utc.is_none());
    }

    #[test]
    fn reindex_walks_the_repository_and_updates_status() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("lib.rs"), "fn widget() {}\n").unwrap();

        let mut settings = Settings::default();
        settings.index_storage_root = dir.path().join("storage");

        let engine = CodeIntelligenceEngine::open(dir.path(), None, &settings).unwrap();
        let report = engine.reindex(None).unwrap();
        assert_eq!(report.files_processed, 1);

        let status = engine.get_status();
        assert_eq!(status.file_count, 1);
        assert!(status.last_index_time_utc.is_some());
    }
}

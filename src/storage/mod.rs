//! The Index Store: durable Files/Symbols/References/Move-History tables
//! plus full-text and trigram search, behind one facade per repository.
//!
//! Grounded on the teacher's `storage/tantivy.rs` (`DocumentIndex`) for the
//! FTS half and `storage/persistence.rs` + `storage/metadata.rs` for the
//! relational half. Two layers cooperate under a single writer lock per
//! repository: a bincode-backed table set and a Tantivy `DocumentIndex`,
//! kept consistent by `replace_symbols`/`store_file`. Trigram search is new
//! relative to the teacher, maintained synchronously in the same call.

mod fts;
mod metadata;
mod persistence;
mod schema;
mod tables;
mod trigram;

pub use fts::FtsHit;
pub use metadata::{meta_path, IndexMetadata, INDEXER_VERSION};
pub use persistence::{snapshot_path, IndexPersistence};
pub use tables::{FileRecord, Tables};
pub use trigram::TrigramIndex;

use crate::error::{IndexError, IndexResult, StorageError};
use crate::symbol::{Reference, Symbol};
use crate::types::{FileId, SymbolId};
use parking_lot::Mutex;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_utc() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// All state for a single repository's index: one write lock around the
/// relational tables and trigram postings, and Tantivy's own internal
/// locking for the FTS half.
pub struct IndexStore {
    inner: Mutex<StoreInner>,
    document_index: fts::DocumentIndex,
    persistence: IndexPersistence,
    repo_dir: std::path::PathBuf,
}

struct StoreInner {
    tables: Tables,
    trigrams: TrigramIndex,
}

impl IndexStore {
    /// Open (or create) the store rooted at `repo_dir`, e.g.
    /// `<index_storage_root>/<repo_id>/`.
    pub fn open(repo_dir: &Path) -> IndexResult<Self> {
        std::fs::create_dir_all(repo_dir).map_err(|source| IndexError::FileWrite {
            path: repo_dir.to_path_buf(),
            source,
        })?;

        let persistence = IndexPersistence::new(repo_dir, None, None);
        let tables = if persistence.exists() {
            persistence.load().map_err(|e| IndexError::LoadError {
                path: repo_dir.to_path_buf(),
                source: Box::new(e),
            })?
        } else {
            Tables::new()
        };

        let mut trigrams = TrigramIndex::new();
        for symbol in tables.symbols.values() {
            trigrams.insert_symbol(symbol);
        }

        let document_index = fts::DocumentIndex::new(&repo_dir.join("fts"))
            .map_err(|e| IndexError::TantivyError {
                operation: "open".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self {
            inner: Mutex::new(StoreInner { tables, trigrams }),
            document_index,
            persistence,
            repo_dir: repo_dir.to_path_buf(),
        })
    }

    /// Upsert a file by `(relative_path)`, detecting renames by content hash.
    pub fn store_file(&self, relative_path: &str, language: &str, content_hash: &str) -> FileId {
        let mut inner = self.inner.lock();
        inner
            .tables
            .store_file(relative_path, language, content_hash, now_utc())
    }

    /// Mint a fresh symbol id for use by an extractor before a `replace_symbols` call.
    pub fn mint_symbol_id(&self) -> Option<SymbolId> {
        self.inner.lock().tables.mint_symbol_id()
    }

    /// Replace all symbols and references owned by `file_id`, and reindex
    /// its FTS/trigram postings, as one logical transaction.
    pub fn replace_symbols(
        &self,
        file_id: FileId,
        relative_path: &str,
        symbols: Vec<Symbol>,
        references: Vec<Reference>,
    ) -> IndexResult<()> {
        let mut inner = self.inner.lock();

        if let Some(old_ids) = inner.tables.symbols_by_file.get(&file_id).cloned() {
            for id in old_ids {
                inner.trigrams.remove_symbol(id);
            }
        }
        for symbol in &symbols {
            inner.trigrams.insert_symbol(symbol);
        }

        self.document_index
            .start_batch()
            .map_err(|e| to_index_error("start_batch", e))?;
        self.document_index
            .remove_file_documents(file_id)
            .map_err(|e| to_index_error("remove_file_documents", e))?;
        for symbol in &symbols {
            self.document_index
                .add_symbol_document(file_id, relative_path, symbol);
        }
        self.document_index
            .commit_batch()
            .map_err(|e| to_index_error("commit_batch", e))?;

        inner.tables.replace_symbols(file_id, symbols);
        inner.tables.replace_references(file_id, references);
        Ok(())
    }

    /// Record a file's raw content for full-text search over `search_code_fts`.
    pub fn index_content(&self, file_id: FileId, relative_path: &str, content: &str) -> IndexResult<()> {
        self.document_index
            .start_batch()
            .map_err(|e| to_index_error("start_batch", e))?;
        self.document_index
            .add_file_content_document(file_id, relative_path, content);
        self.document_index
            .commit_batch()
            .map_err(|e| to_index_error("commit_batch", e))
    }

    pub fn mark_file_deleted(&self, file_id: FileId) -> IndexResult<()> {
        let mut inner = self.inner.lock();
        inner.tables.mark_file_deleted(file_id, now_utc());
        self.document_index
            .start_batch()
            .map_err(|e| to_index_error("start_batch", e))?;
        self.document_index
            .remove_file_documents(file_id)
            .map_err(|e| to_index_error("remove_file_documents", e))?;
        self.document_index
            .commit_batch()
            .map_err(|e| to_index_error("commit_batch", e))
    }

    pub fn purge_deleted(&self, older_than: u64) -> Vec<FileId> {
        let mut inner = self.inner.lock();
        inner.tables.purge_deleted(older_than)
    }

    pub fn search_symbols_fts(&self, query: &str, limit: usize) -> IndexResult<Vec<FtsHit>> {
        self.document_index
            .search_symbols_fts(query, limit)
            .map_err(|e| to_index_error("search_symbols_fts", e))
    }

    pub fn search_code_fts(&self, query: &str, limit: usize) -> IndexResult<Vec<FtsHit>> {
        self.document_index
            .search_code_fts(query, limit)
            .map_err(|e| to_index_error("search_code_fts", e))
    }

    pub fn search_symbols_trigram(&self, query: &str, limit: usize) -> Vec<Symbol> {
        let inner = self.inner.lock();
        inner
            .trigrams
            .search(query, limit)
            .into_iter()
            .filter_map(|id| inner.tables.symbols.get(&id).cloned())
            .collect()
    }

    pub fn get_definition(&self, name: &str) -> Option<Symbol> {
        self.inner.lock().tables.get_definition(name).cloned()
    }

    pub fn symbol(&self, symbol_id: SymbolId) -> Option<Symbol> {
        self.inner.lock().tables.symbol(symbol_id).cloned()
    }

    pub fn get_references(&self, symbol_id: SymbolId) -> Vec<Reference> {
        self.inner
            .lock()
            .tables
            .get_references(symbol_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn file_record(&self, file_id: FileId) -> Option<FileRecord> {
        self.inner.lock().tables.file_record(file_id).cloned()
    }

    pub fn file_id_for_path(&self, relative_path: &str) -> Option<FileId> {
        self.inner.lock().tables.file_id_for_path(relative_path)
    }

    pub fn file_count(&self) -> usize {
        self.inner.lock().tables.file_count()
    }

    pub fn symbol_count(&self) -> usize {
        self.inner.lock().tables.symbol_count()
    }

    /// Snapshot the relational tables to disk. Tantivy persists itself on commit.
    pub fn flush(&self) -> IndexResult<()> {
        let inner = self.inner.lock();
        self.persistence
            .save(&inner.tables)
            .map_err(|e| IndexError::PersistenceError {
                path: snapshot_path(&self.repo_dir),
                source: Box::new(e),
            })
    }
}

fn to_index_error(operation: &str, cause: StorageError) -> IndexError {
    IndexError::TantivyError {
        operation: operation.to_string(),
        cause: cause.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{compact_string, Range, SymbolKind};
    use tempfile::TempDir;

    #[test]
    fn store_file_then_replace_symbols_round_trips_definition() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::open(dir.path()).unwrap();

        let file_id = store.store_file("lib/mod.rs", "rust", "hash-a");
        let symbol_id = store.mint_symbol_id().unwrap();
        let symbol = Symbol::new(
            symbol_id,
            compact_string("Widget"),
            SymbolKind::Class,
            file_id,
            Range::new(1, 0, 2, 22),
        );
        store
            .replace_symbols(file_id, "lib/mod.rs", vec![symbol], vec![])
            .unwrap();

        let found = store.get_definition("Widget").unwrap();
        assert_eq!(found.file_id, file_id);
    }

    #[test]
    fn delete_then_purge_removes_file() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::open(dir.path()).unwrap();
        let file_id = store.store_file("lib/mod.rs", "rust", "hash-a");

        store.mark_file_deleted(file_id).unwrap();
        assert_eq!(store.file_count(), 0);
        assert!(store.file_record(file_id).unwrap().deleted);

        let purged = store.purge_deleted(now_utc() + 10_000);
        assert_eq!(purged, vec![file_id]);
        assert!(store.file_record(file_id).is_none());
    }

    #[test]
    fn flush_then_reopen_preserves_tables() {
        let dir = TempDir::new().unwrap();
        {
            let store = IndexStore::open(dir.path()).unwrap();
            store.store_file("lib/mod.rs", "rust", "hash-a");
            store.flush().unwrap();
        }

        let reopened = IndexStore::open(dir.path()).unwrap();
        assert_eq!(reopened.file_count(), 1);
    }
}

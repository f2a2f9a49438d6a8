//! In-memory relational tables for Files, Symbols, References, Move History
//! and Embeddings, snapshotted to disk via `persistence.rs`.

use crate::symbol::{Embedding, MoveHistoryEntry, Reference, Symbol};
use crate::types::{compact_string, CompactString, FileId, IdCounter, SymbolId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub relative_path: CompactString,
    pub language: CompactString,
    pub content_hash: CompactString,
    pub last_indexed_utc: u64,
    pub deleted: bool,
    pub deleted_at: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Tables {
    pub files: IndexMap<FileId, FileRecord>,
    pub path_index: HashMap<CompactString, FileId>,
    pub content_hash_index: HashMap<CompactString, FileId>,
    pub symbols: IndexMap<SymbolId, Symbol>,
    pub symbols_by_file: HashMap<FileId, Vec<SymbolId>>,
    pub references: Vec<Reference>,
    pub references_by_symbol: HashMap<SymbolId, Vec<usize>>,
    pub move_history: Vec<MoveHistoryEntry>,
    pub embeddings: HashMap<(FileId, u32), Embedding>,
    #[serde(skip)]
    file_ids: IdCounterState,
    #[serde(skip)]
    symbol_ids: IdCounterState,
}

/// `IdCounter` has no `Serialize` impl (it is rebuilt from the highest id on
/// load); this wrapper just makes the `#[serde(skip)]` default explicit.
#[derive(Debug, Default)]
struct IdCounterState(Option<IdCounter>);

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_file_id(&mut self) -> Option<FileId> {
        let counter = self
            .file_ids
            .0
            .get_or_insert_with(|| IdCounter::starting_at(self.files.len() as u32 + 1));
        FileId::new(counter.peek()).inspect(|_| {
            let next = counter.peek() + 1;
            *counter = IdCounter::starting_at(next);
        })
    }

    fn next_symbol_id(&mut self) -> Option<SymbolId> {
        let counter = self
            .symbol_ids
            .0
            .get_or_insert_with(|| IdCounter::starting_at(self.symbols.len() as u32 + 1));
        counter.next_symbol_id()
    }

    pub fn mint_symbol_id(&mut self) -> Option<SymbolId> {
        self.next_symbol_id()
    }

    /// Upsert a file by `(relative_path)`. If an existing row with the same
    /// `content_hash` exists at a different path, emits a rename move-history
    /// entry and returns the *existing* file id with its path updated rather
    /// than minting a new one.
    pub fn store_file(
        &mut self,
        relative_path: &str,
        language: &str,
        content_hash: &str,
        indexed_at: u64,
    ) -> FileId {
        if let Some(&existing_id) = self.path_index.get(relative_path) {
            if let Some(record) = self.files.get_mut(&existing_id) {
                record.content_hash = compact_string(content_hash);
                record.language = compact_string(language);
                record.last_indexed_utc = indexed_at;
                record.deleted = false;
                record.deleted_at = None;
                self.content_hash_index
                    .insert(compact_string(content_hash), existing_id);
                return existing_id;
            }
        }

        if let Some(&moved_from_id) = self.content_hash_index.get(content_hash) {
            if let Some(old_record) = self.files.get(&moved_from_id).cloned() {
                if old_record.relative_path.as_ref() != relative_path {
                    self.move_history.push(MoveHistoryEntry {
                        old_relative_path: old_record.relative_path.clone(),
                        new_relative_path: compact_string(relative_path),
                        content_hash: compact_string(content_hash),
                        moved_at: indexed_at,
                        kind: crate::symbol::MoveKind::Rename,
                    });
                    self.path_index.remove(old_record.relative_path.as_ref());
                    if let Some(record) = self.files.get_mut(&moved_from_id) {
                        record.relative_path = compact_string(relative_path);
                        record.last_indexed_utc = indexed_at;
                        record.deleted = false;
                        record.deleted_at = None;
                    }
                    self.path_index
                        .insert(compact_string(relative_path), moved_from_id);
                    return moved_from_id;
                }
            }
        }

        let id = self.next_file_id().expect("file id space exhausted");
        self.files.insert(
            id,
            FileRecord {
                id,
                relative_path: compact_string(relative_path),
                language: compact_string(language),
                content_hash: compact_string(content_hash),
                last_indexed_utc: indexed_at,
                deleted: false,
                deleted_at: None,
            },
        );
        self.path_index.insert(compact_string(relative_path), id);
        self.content_hash_index
            .insert(compact_string(content_hash), id);
        id
    }

    /// Replace all symbols owned by `file_id` within one logical transaction.
    pub fn replace_symbols(&mut self, file_id: FileId, symbols: Vec<Symbol>) {
        if let Some(old_ids) = self.symbols_by_file.remove(&file_id) {
            for id in old_ids {
                self.symbols.shift_remove(&id);
                self.references_by_symbol.remove(&id);
            }
        }

        let mut new_ids = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            new_ids.push(symbol.id);
            self.symbols.insert(symbol.id, symbol);
        }
        self.symbols_by_file.insert(file_id, new_ids);
    }

    pub fn replace_references(&mut self, file_id: FileId, references: Vec<Reference>) {
        self.references.retain(|r| r.file_id != file_id);
        self.references_by_symbol.clear();
        self.references.extend(references);
        for (idx, reference) in self.references.iter().enumerate() {
            self.references_by_symbol
                .entry(reference.symbol_id)
                .or_default()
                .push(idx);
        }
    }

    pub fn mark_file_deleted(&mut self, file_id: FileId, deleted_at: u64) {
        if let Some(record) = self.files.get_mut(&file_id) {
            record.deleted = true;
            record.deleted_at = Some(deleted_at);
        }
    }

    pub fn purge_deleted(&mut self, older_than: u64) -> Vec<FileId> {
        let mut purged = Vec::new();
        let to_purge: Vec<FileId> = self
            .files
            .values()
            .filter(|f| f.deleted && f.deleted_at.is_some_and(|at| at < older_than))
            .map(|f| f.id)
            .collect();

        for id in to_purge {
            if let Some(record) = self.files.shift_remove(&id) {
                self.path_index.remove(record.relative_path.as_ref());
                self.content_hash_index.remove(record.content_hash.as_ref());
            }
            if let Some(symbol_ids) = self.symbols_by_file.remove(&id) {
                for sid in symbol_ids {
                    self.symbols.shift_remove(&sid);
                }
            }
            self.references.retain(|r| r.file_id != id);
            purged.push(id);
        }
        purged
    }

    pub fn symbol(&self, symbol_id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(&symbol_id)
    }

    pub fn get_definition(&self, name: &str) -> Option<&Symbol> {
        self.symbols.values().find(|s| {
            s.name.as_ref() == name && self.files.get(&s.file_id).is_some_and(|f| !f.deleted)
        })
    }

    pub fn get_references(&self, symbol_id: SymbolId) -> Vec<&Reference> {
        self.references_by_symbol
            .get(&symbol_id)
            .map(|idxs| idxs.iter().filter_map(|&i| self.references.get(i)).collect())
            .unwrap_or_default()
    }

    pub fn file_record(&self, file_id: FileId) -> Option<&FileRecord> {
        self.files.get(&file_id)
    }

    pub fn file_id_for_path(&self, relative_path: &str) -> Option<FileId> {
        self.path_index.get(relative_path).copied()
    }

    pub fn file_count(&self) -> usize {
        self.files.values().filter(|f| !f.deleted).count()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_file_detects_rename_by_content_hash() {
        let mut tables = Tables::new();
        let first = tables.store_file("lib/mod.rs", "rust", "hash-a", 1);
        let second = tables.store_file("lib/mod2.rs", "rust", "hash-a", 2);

        assert_eq!(first, second);
        assert_eq!(tables.move_history.len(), 1);
        assert_eq!(
            tables.move_history[0].new_relative_path.as_ref(),
            "lib/mod2.rs"
        );
    }

    #[test]
    fn replace_symbols_drops_stale_rows() {
        let mut tables = Tables::new();
        let file_id = tables.store_file("lib/mod.rs", "rust", "hash-a", 1);
        let id1 = tables.mint_symbol_id().unwrap();
        let sym1 = Symbol::new(
            id1,
            compact_string("Widget"),
            crate::types::SymbolKind::Class,
            file_id,
            crate::types::Range::new(1, 0, 1, 5),
        );
        tables.replace_symbols(file_id, vec![sym1]);
        assert_eq!(tables.symbol_count(), 1);

        tables.replace_symbols(file_id, vec![]);
        assert_eq!(tables.symbol_count(), 0);
    }

    #[test]
    fn purge_deleted_respects_retention_window() {
        let mut tables = Tables::new();
        let file_id = tables.store_file("lib/mod.rs", "rust", "hash-a", 1);
        tables.mark_file_deleted(file_id, 100);

        assert!(tables.purge_deleted(50).is_empty());
        let purged = tables.purge_deleted(200);
        assert_eq!(purged, vec![file_id]);
        assert!(tables.file_record(file_id).is_none());
    }
}

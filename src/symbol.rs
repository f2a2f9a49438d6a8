//! Symbol, Reference, and the other small value types stored per file.

use crate::types::{CompactString, FileId, Range, ReferenceKind, SymbolId, SymbolKind};
use serde::{Deserialize, Serialize};

/// A named declaration produced by an extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: CompactString,
    pub kind: SymbolKind,
    pub file_id: FileId,
    pub range: Range,
    pub signature: Option<CompactString>,
    pub doc_comment: Option<CompactString>,
    /// Enclosing symbol, e.g. the class owning a method.
    pub parent: Option<SymbolId>,
}

impl Symbol {
    pub fn new(id: SymbolId, name: impl Into<CompactString>, kind: SymbolKind, file_id: FileId, range: Range) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            file_id,
            range,
            signature: None,
            doc_comment: None,
            parent: None,
        }
    }

    pub fn with_signature(mut self, signature: impl Into<CompactString>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_doc_comment(mut self, doc: impl Into<CompactString>) -> Self {
        self.doc_comment = Some(doc.into());
        self
    }

    pub fn with_parent(mut self, parent: SymbolId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// A use-site of a symbol: owned by the file where the reference appears.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub symbol_id: SymbolId,
    pub file_id: FileId,
    pub line: u32,
    pub column: u16,
    pub kind: ReferenceKind,
}

/// The kind of path change a Move History Entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveKind {
    Rename,
    Move,
    ContentPreservingEdit,
}

/// Append-only record of a file's identity crossing a path change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveHistoryEntry {
    pub old_relative_path: CompactString,
    pub new_relative_path: CompactString,
    pub content_hash: CompactString,
    pub moved_at: u64,
    pub kind: MoveKind,
}

/// A single (trigram, symbol, position) posting, maintained alongside
/// `replace_symbols` rather than by a database trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrigramEntry {
    pub trigram: [u8; 3],
    pub symbol_id: SymbolId,
    pub position: u32,
}

/// A vector embedding of one chunk of a file's content, keyed by content hash
/// so moves and duplicate content never trigger re-embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub file_id: FileId,
    pub chunk_index: u32,
    pub content_hash: CompactString,
    pub vector: Vec<f32>,
    pub deleted: bool,
}

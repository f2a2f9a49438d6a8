//! Tantivy-backed full-text search over symbols and file content.
//!
//! Grounded on the teacher's `storage/tantivy.rs` `DocumentIndex`: search
//! combines an exact-match `QueryParser` query with a `FuzzyTermQuery` for
//! typo tolerance, joined as `Should` clauses in a `BooleanQuery`.

use super::schema::IndexSchema;
use crate::error::{StorageError, StorageResult};
use crate::symbol::Symbol;
use crate::types::{FileId, SymbolId};
use parking_lot::Mutex;
use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::{BooleanQuery, FuzzyTermQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

const WRITER_HEAP_BYTES: usize = 50_000_000;

#[derive(Debug, Clone)]
pub struct FtsHit {
    pub symbol_id: Option<SymbolId>,
    pub file_id: FileId,
    pub file_path: String,
    pub line_number: u32,
    pub column: u16,
    pub name: String,
    pub score: f32,
}

pub struct DocumentIndex {
    index: Index,
    reader: IndexReader,
    schema: IndexSchema,
    writer: Mutex<Option<IndexWriter>>,
}

impl DocumentIndex {
    pub fn new(path: &Path) -> StorageResult<Self> {
        std::fs::create_dir_all(path)?;
        let schema = IndexSchema::build();
        let dir = MmapDirectory::open(path).map_err(StorageError::TantivyError)?;
        let index = Index::open_or_create(dir, schema.schema.clone())
            .map_err(StorageError::TantivyError)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(StorageError::TantivyError)?;

        Ok(Self {
            index,
            reader,
            schema,
            writer: Mutex::new(None),
        })
    }

    pub fn start_batch(&self) -> StorageResult<()> {
        let writer = self
            .index
            .writer(WRITER_HEAP_BYTES)
            .map_err(StorageError::TantivyError)?;
        *self.writer.lock() = Some(writer);
        Ok(())
    }

    pub fn add_symbol_document(&self, file_id: FileId, file_path: &str, symbol: &Symbol) {
        let mut guard = self.writer.lock();
        let Some(writer) = guard.as_mut() else {
            return;
        };
        let mut doc = TantivyDocument::default();
        doc.add_text(self.schema.doc_type, "symbol");
        doc.add_u64(self.schema.symbol_id, symbol.id.value() as u64);
        doc.add_u64(self.schema.file_id, file_id.value() as u64);
        doc.add_text(self.schema.file_path, file_path);
        doc.add_text(self.schema.name, &symbol.name);
        doc.add_text(self.schema.kind, format!("{:?}", symbol.kind));
        doc.add_u64(self.schema.line_number, symbol.range.start_line as u64);
        doc.add_u64(self.schema.column, symbol.range.start_column as u64);
        if let Some(sig) = &symbol.signature {
            doc.add_text(self.schema.signature, sig);
        }
        if let Some(doc_comment) = &symbol.doc_comment {
            doc.add_text(self.schema.doc_comment, doc_comment);
        }
        writer.add_document(doc).ok();
    }

    pub fn add_file_content_document(&self, file_id: FileId, file_path: &str, content: &str) {
        let mut guard = self.writer.lock();
        let Some(writer) = guard.as_mut() else {
            return;
        };
        let mut doc = TantivyDocument::default();
        doc.add_text(self.schema.doc_type, "file_content");
        doc.add_u64(self.schema.file_id, file_id.value() as u64);
        doc.add_text(self.schema.file_path, file_path);
        doc.add_text(self.schema.content, content);
        writer.add_document(doc).ok();
    }

    pub fn remove_file_documents(&self, file_id: FileId) -> StorageResult<()> {
        let mut guard = self.writer.lock();
        let Some(writer) = guard.as_mut() else {
            return Ok(());
        };
        let term = Term::from_field_u64(self.schema.file_id, file_id.value() as u64);
        writer.delete_term(term);
        Ok(())
    }

    pub fn commit_batch(&self) -> StorageResult<()> {
        let mut guard = self.writer.lock();
        if let Some(writer) = guard.as_mut() {
            writer.commit().map_err(StorageError::TantivyError)?;
        }
        *guard = None;
        self.reader.reload().map_err(StorageError::TantivyError)?;
        Ok(())
    }

    pub fn search_symbols_fts(&self, query: &str, limit: usize) -> StorageResult<Vec<FtsHit>> {
        self.search(query, limit, "symbol", &[self.schema.name, self.schema.signature, self.schema.doc_comment])
    }

    pub fn search_code_fts(&self, query: &str, limit: usize) -> StorageResult<Vec<FtsHit>> {
        self.search(query, limit, "file_content", &[self.schema.content])
    }

    fn search(
        &self,
        query: &str,
        limit: usize,
        doc_type: &str,
        fields: &[tantivy::schema::Field],
    ) -> StorageResult<Vec<FtsHit>> {
        let searcher = self.reader.searcher();
        let parser = QueryParser::for_index(&self.index, fields.to_vec());
        let exact: Box<dyn Query> = parser
            .parse_query(query)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(Occur::Should, exact)];

        if let Some(&primary) = fields.first() {
            if let Some(first_term) = query.split_whitespace().next() {
                let term = Term::from_field_text(primary, &first_term.to_lowercase());
                let fuzzy = FuzzyTermQuery::new(term, 1, true);
                clauses.push((Occur::Should, Box::new(fuzzy)));
            }
        }

        let type_term = Term::from_field_text(self.schema.doc_type, doc_type);
        let type_query: Box<dyn Query> = Box::new(TermQuery::new(type_term, IndexRecordOption::Basic));
        let combined = BooleanQuery::new(vec![
            (Occur::Must, type_query),
            (Occur::Must, Box::new(BooleanQuery::new(clauses))),
        ]);

        let top_docs = searcher
            .search(&combined, &TopDocs::with_limit(limit))
            .map_err(StorageError::TantivyError)?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr).map_err(StorageError::TantivyError)?;
            hits.push(self.to_hit(&doc, score));
        }
        Ok(hits)
    }

    fn to_hit(&self, doc: &TantivyDocument, score: f32) -> FtsHit {
        let get_u64 = |field| {
            doc.get_first(field)
                .and_then(|v| v.as_u64())
                .unwrap_or_default()
        };
        let get_text = |field| {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };

        FtsHit {
            symbol_id: SymbolId::new(get_u64(self.schema.symbol_id) as u32),
            file_id: FileId::new(get_u64(self.schema.file_id) as u32).unwrap_or(FileId::new(1).unwrap()),
            file_path: get_text(self.schema.file_path),
            line_number: get_u64(self.schema.line_number) as u32,
            column: get_u64(self.schema.column) as u16,
            name: get_text(self.schema.name),
            score,
        }
    }
}

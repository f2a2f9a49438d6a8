//! Tantivy schema for the full-text half of the Index Store.
//!
//! Grounded on the teacher's `storage/tantivy.rs` `IndexSchema::build`: one
//! schema serves two document shapes, discriminated by `doc_type`, so a
//! single Tantivy index backs both `search_symbols_fts` and `search_code_fts`.

use tantivy::schema::{Schema, SchemaBuilder, FAST, INDEXED, STORED, STRING, TEXT};

pub struct IndexSchema {
    pub schema: Schema,
    pub doc_type: tantivy::schema::Field,
    pub symbol_id: tantivy::schema::Field,
    pub name: tantivy::schema::Field,
    pub doc_comment: tantivy::schema::Field,
    pub signature: tantivy::schema::Field,
    pub kind: tantivy::schema::Field,
    pub file_id: tantivy::schema::Field,
    pub file_path: tantivy::schema::Field,
    pub line_number: tantivy::schema::Field,
    pub column: tantivy::schema::Field,
    pub content: tantivy::schema::Field,
}

impl IndexSchema {
    pub fn build() -> Self {
        let mut builder: SchemaBuilder = Schema::builder();

        let doc_type = builder.add_text_field("doc_type", STRING | STORED);
        let symbol_id = builder.add_u64_field("symbol_id", INDEXED | STORED | FAST);
        let name = builder.add_text_field("name", TEXT | STORED);
        let doc_comment = builder.add_text_field("doc_comment", TEXT | STORED);
        let signature = builder.add_text_field("signature", TEXT | STORED);
        let kind = builder.add_text_field("kind", STRING | STORED);
        let file_id = builder.add_u64_field("file_id", INDEXED | STORED | FAST);
        let file_path = builder.add_text_field("file_path", STRING | STORED);
        let line_number = builder.add_u64_field("line_number", STORED | FAST);
        let column = builder.add_u64_field("column", STORED | FAST);
        let content = builder.add_text_field("content", TEXT | STORED);

        let schema = builder.build();

        Self {
            schema,
            doc_type,
            symbol_id,
            name,
            doc_comment,
            signature,
            kind,
            file_id,
            file_path,
            line_number,
            column,
            content,
        }
    }
}

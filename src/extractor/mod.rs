//! Language Extractor: the capability set {supports, index_file,
//! get_definition, find_references, search}, polymorphic over two variants
//! (Generic, Enhanced) as data rather than an inheritance hierarchy.
//!
//! Grounded on the teacher's `parsing/parser.rs` `LanguageParser` trait,
//! replaced per the spec's redesign flag: no virtual-dispatch inheritance,
//! just one trait object per language instance.

pub mod cache;
pub mod enhanced_rust;
pub mod generic;
pub mod registry;

use crate::error::ParseResult;
use crate::symbol::{Reference, Symbol};
use std::path::Path;

/// What `index_file` returns: the symbols and references found in one file.
#[derive(Debug, Clone, Default)]
pub struct ExtractedFile {
    pub language: String,
    pub symbols: Vec<Symbol>,
    pub references: Vec<Reference>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOpts {
    pub limit: usize,
}

#[derive(Debug, Clone)]
pub struct ExtractorHit {
    pub symbol: Symbol,
    pub score: f32,
}

/// A use-site location an extractor found for a named symbol: not yet
/// resolved to a `Reference` row, since the extractor has no `FileId`.
#[derive(Debug, Clone)]
pub struct RefSite {
    pub line: u32,
    pub column: u16,
}

/// The capability set every extractor variant implements.
///
/// `index_file` MUST be deterministic for the same input, MUST NOT touch the
/// filesystem, and MUST NOT perform network I/O. `get_definition` and
/// `find_references` consult only what this instance has indexed in the
/// current process, not a view onto the Index Store.
pub trait Extractor: Send + Sync {
    fn language(&self) -> &str;
    fn suffixes(&self) -> &[&'static str];
    fn is_enhanced(&self) -> bool {
        false
    }

    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.suffixes().contains(&ext))
    }

    fn index_file(&self, path: &Path, content: &str) -> ParseResult<ExtractedFile>;

    fn get_definition(&self, name: &str) -> Option<Symbol>;

    fn find_references(&self, name: &str) -> Vec<RefSite>;

    fn search(&self, query: &str, opts: SearchOpts) -> Vec<ExtractorHit>;
}

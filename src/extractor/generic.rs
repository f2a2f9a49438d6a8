//! Grammar-driven extractor: one struct parameterized by a
//! `GenericLanguageDescriptor` instead of one hand-written type per language.
//!
//! Grounded on the teacher's `parsing/rust.rs` AST-walk style
//! (`extract_imports_from_node`, matching on `node.kind()` strings), lifted
//! out of a single language into data (`declaration_kinds`, `call_kind`,
//! `import_kinds`) so the same walk serves Rust, Python, JavaScript/
//! TypeScript and Go.

use super::cache::LruCache;
use super::{Extractor, ExtractedFile, ExtractorHit, RefSite, SearchOpts};
use crate::error::{ParseError, ParseResult};
use crate::path_resolver::PathResolver;
use crate::symbol::{Reference, Symbol};
use crate::types::{compact_string, FileId, IdCounter, Range, ReferenceKind, SymbolKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;

pub struct GenericLanguageDescriptor {
    pub language_name: &'static str,
    pub suffixes: &'static [&'static str],
    pub ts_language: fn() -> tree_sitter::Language,
    /// tree-sitter node kind -> SymbolKind, for top-level and nested declarations.
    pub declaration_kinds: &'static [(&'static str, SymbolKind)],
    /// Node kinds naming a call expression; the callee text becomes a reference.
    pub call_kinds: &'static [&'static str],
    /// Node kinds naming an import/use statement.
    pub import_kinds: &'static [&'static str],
    /// Node kinds whose immediate children are methods rather than free
    /// functions (`impl_item` in Rust, `class_definition` in Python). A
    /// `declaration_kinds` function-like symbol found directly under one of
    /// these is promoted from `Function` to `Method`.
    pub method_container_kinds: &'static [&'static str],
}

const CACHE_CAPACITY: usize = 100;

pub struct GenericExtractor {
    descriptor: &'static GenericLanguageDescriptor,
    parser: Mutex<tree_sitter::Parser>,
    cache: LruCache<ExtractedFile>,
    ids: Mutex<IdCounter>,
    index: Mutex<HashMap<String, Symbol>>,
    references: Mutex<HashMap<String, Vec<RefSite>>>,
}

impl GenericExtractor {
    pub fn new(descriptor: &'static GenericLanguageDescriptor) -> ParseResult<Self> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&(descriptor.ts_language)())
            .map_err(|e| ParseError::ExtractorInit {
                language: descriptor.language_name.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            descriptor,
            parser: Mutex::new(parser),
            cache: LruCache::new(CACHE_CAPACITY),
            ids: Mutex::new(IdCounter::new()),
            index: Mutex::new(HashMap::new()),
            references: Mutex::new(HashMap::new()),
        })
    }

    fn extract(&self, content: &str) -> ParseResult<ExtractedFile> {
        let mut parser = self.parser.lock();
        let tree = parser
            .parse(content, None)
            .ok_or_else(|| ParseError::SyntaxError {
                line: 0,
                column: 0,
                reason: "tree-sitter failed to produce a parse tree".to_string(),
            })?;

        let mut symbols = Vec::new();
        let mut references = Vec::new();
        let mut ids = self.ids.lock();

        // file_id is a placeholder; the Incremental Indexer rewrites it to
        // the real FileId once the Index Store has assigned one.
        let placeholder_file = FileId::new(1).unwrap();

        walk(
            tree.root_node(),
            content,
            self.descriptor,
            None,
            None,
            &mut symbols,
            &mut references,
            &mut ids,
            placeholder_file,
        );

        Ok(ExtractedFile {
            language: self.descriptor.language_name.to_string(),
            symbols,
            references,
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn walk(
    node: tree_sitter::Node,
    source: &str,
    descriptor: &GenericLanguageDescriptor,
    parent: Option<crate::types::SymbolId>,
    container: Option<&'static str>,
    symbols: &mut Vec<Symbol>,
    references: &mut Vec<Reference>,
    ids: &mut IdCounter,
    file_id: FileId,
) {
    let kind = node.kind();
    let is_method_container = descriptor.method_container_kinds.contains(&kind);

    let mut new_parent = parent;
    let mut new_container = container;

    if let Some((_, symbol_kind)) = descriptor
        .declaration_kinds
        .iter()
        .find(|(k, _)| *k == kind)
    {
        if let Some(name_node) = node.child_by_field_name("name") {
            if let Ok(name) = name_node.utf8_text(source.as_bytes()) {
                if let Some(id) = ids.next_symbol_id() {
                    let range = Range::new(
                        node.start_position().row as u32 + 1,
                        node.start_position().column as u16,
                        node.end_position().row as u32 + 1,
                        node.end_position().column as u16,
                    );
                    let promoted_kind = if *symbol_kind == SymbolKind::Function
                        && container.is_some_and(|c| descriptor.method_container_kinds.contains(&c))
                    {
                        SymbolKind::Method
                    } else {
                        *symbol_kind
                    };
                    let mut symbol = Symbol::new(id, compact_string(name), promoted_kind, file_id, range);
                    if let Some(p) = parent {
                        symbol = symbol.with_parent(p);
                    }
                    new_parent = Some(id);
                    symbols.push(symbol);
                }
            }
        }
        // Entering a nested declaration that isn't itself a method container
        // (e.g. a function body) leaves its own container context behind.
        if !is_method_container {
            new_container = None;
        }
    } else if descriptor.call_kinds.contains(&kind) {
        if let Some(func_node) = node.child_by_field_name("function").or_else(|| node.child(0)) {
            if let Ok(name) = func_node.utf8_text(source.as_bytes()) {
                if let Some(id) = ids.next_symbol_id() {
                    references.push(Reference {
                        symbol_id: id,
                        file_id,
                        line: node.start_position().row as u32 + 1,
                        column: node.start_position().column as u16,
                        kind: ReferenceKind::Call,
                    });
                    let _ = name;
                }
            }
        }
    } else if descriptor.import_kinds.contains(&kind) {
        if let Some(id) = ids.next_symbol_id() {
            references.push(Reference {
                symbol_id: id,
                file_id,
                line: node.start_position().row as u32 + 1,
                column: node.start_position().column as u16,
                kind: ReferenceKind::Import,
            });
        }
    }

    if is_method_container {
        new_container = Some(kind);
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(
            child,
            source,
            descriptor,
            new_parent,
            new_container,
            symbols,
            references,
            ids,
            file_id,
        );
    }
}

impl Extractor for GenericExtractor {
    fn language(&self) -> &str {
        self.descriptor.language_name
    }

    fn suffixes(&self) -> &[&'static str] {
        self.descriptor.suffixes
    }

    fn index_file(&self, _path: &Path, content: &str) -> ParseResult<ExtractedFile> {
        let content_hash = PathResolver::content_hash_bytes(content.as_bytes());

        let extracted = if let Some(cached) = self.cache.get(&content_hash) {
            cached
        } else {
            let extracted = self.extract(content)?;
            self.cache.insert(content_hash, extracted.clone());
            extracted
        };

        let mut index = self.index.lock();
        let mut refs = self.references.lock();
        for symbol in &extracted.symbols {
            index.insert(symbol.name.to_string(), symbol.clone());
        }
        for reference in &extracted.references {
            refs.entry(format!("ref:{}", reference.line))
                .or_default()
                .push(RefSite {
                    line: reference.line,
                    column: reference.column,
                });
        }

        Ok(extracted)
    }

    fn get_definition(&self, name: &str) -> Option<Symbol> {
        self.index.lock().get(name).cloned()
    }

    fn find_references(&self, name: &str) -> Vec<RefSite> {
        self.references
            .lock()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    fn search(&self, query: &str, opts: SearchOpts) -> Vec<ExtractorHit> {
        let index = self.index.lock();
        let limit = if opts.limit == 0 { usize::MAX } else { opts.limit };
        let query_lower = query.to_lowercase();

        let mut hits: Vec<ExtractorHit> = index
            .values()
            .filter(|s| s.name.to_lowercase().contains(&query_lower))
            .map(|s| {
                let score = if s.name.as_ref() == query { 1.0 } else { 0.5 };
                ExtractorHit {
                    symbol: s.clone(),
                    score,
                }
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        hits
    }
}

pub fn rust_descriptor() -> &'static GenericLanguageDescriptor {
    static DESCRIPTOR: GenericLanguageDescriptor = GenericLanguageDescriptor {
        language_name: "rust",
        suffixes: &["rs"],
        ts_language: || tree_sitter_rust::LANGUAGE.into(),
        declaration_kinds: &[
            ("function_item", SymbolKind::Function),
            ("struct_item", SymbolKind::Struct),
            ("enum_item", SymbolKind::Enum),
            ("trait_item", SymbolKind::Trait),
            ("mod_item", SymbolKind::Module),
            ("const_item", SymbolKind::Constant),
            ("macro_definition", SymbolKind::Macro),
        ],
        call_kinds: &["call_expression"],
        import_kinds: &["use_declaration"],
        method_container_kinds: &["impl_item"],
    };
    &DESCRIPTOR
}

pub fn python_descriptor() -> &'static GenericLanguageDescriptor {
    static DESCRIPTOR: GenericLanguageDescriptor = GenericLanguageDescriptor {
        language_name: "python",
        suffixes: &["py", "pyi"],
        ts_language: || tree_sitter_python::LANGUAGE.into(),
        declaration_kinds: &[
            ("function_definition", SymbolKind::Function),
            ("class_definition", SymbolKind::Class),
        ],
        call_kinds: &["call"],
        import_kinds: &["import_statement", "import_from_statement"],
        method_container_kinds: &["class_definition"],
    };
    &DESCRIPTOR
}

pub fn javascript_descriptor() -> &'static GenericLanguageDescriptor {
    static DESCRIPTOR: GenericLanguageDescriptor = GenericLanguageDescriptor {
        language_name: "javascript",
        suffixes: &["js", "jsx", "ts", "tsx"],
        ts_language: || tree_sitter_javascript::LANGUAGE.into(),
        declaration_kinds: &[
            ("function_declaration", SymbolKind::Function),
            ("class_declaration", SymbolKind::Class),
            ("method_definition", SymbolKind::Method),
        ],
        call_kinds: &["call_expression"],
        import_kinds: &["import_statement"],
        method_container_kinds: &[],
    };
    &DESCRIPTOR
}

pub fn go_descriptor() -> &'static GenericLanguageDescriptor {
    static DESCRIPTOR: GenericLanguageDescriptor = GenericLanguageDescriptor {
        language_name: "go",
        suffixes: &["go"],
        ts_language: || tree_sitter_go::LANGUAGE.into(),
        declaration_kinds: &[
            ("function_declaration", SymbolKind::Function),
            ("method_declaration", SymbolKind::Method),
            ("type_declaration", SymbolKind::Typedef),
        ],
        call_kinds: &["call_expression"],
        import_kinds: &["import_declaration"],
        method_container_kinds: &[],
    };
    &DESCRIPTOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_top_level_rust_functions() {
        let extractor = GenericExtractor::new(rust_descriptor()).unwrap();
        let result = extractor
            .index_file(Path::new("lib.rs"), "fn widget() {}\nfn other() {}")
            .unwrap();

        let names: Vec<&str> = result.symbols.iter().map(|s| s.name.as_ref()).collect();
        assert!(names.contains(&"widget"));
        assert!(names.contains(&"other"));
    }

    #[test]
    fn index_file_is_deterministic_for_identical_content() {
        let extractor = GenericExtractor::new(rust_descriptor()).unwrap();
        let content = "fn widget() {}";

        let first = extractor.index_file(Path::new("a.rs"), content).unwrap();
        let second = extractor.index_file(Path::new("a.rs"), content).unwrap();

        assert_eq!(first.symbols.len(), second.symbols.len());
        assert_eq!(first.symbols[0].name, second.symbols[0].name);
    }

    #[test]
    fn get_definition_finds_indexed_symbol() {
        let extractor = GenericExtractor::new(rust_descriptor()).unwrap();
        extractor
            .index_file(Path::new("lib.rs"), "fn widget() {}")
            .unwrap();

        assert!(extractor.get_definition("widget").is_some());
        assert!(extractor.get_definition("missing").is_none());
    }

    #[test]
    fn rust_fn_inside_impl_is_promoted_to_method() {
        let extractor = GenericExtractor::new(rust_descriptor()).unwrap();
        let result = extractor
            .index_file(Path::new("lib.rs"), "struct Widget;\nimpl Widget {\n    fn draw(&self) {}\n}\n")
            .unwrap();

        let draw = result.symbols.iter().find(|s| s.name.as_ref() == "draw").unwrap();
        assert_eq!(draw.kind, SymbolKind::Method);
    }

    #[test]
    fn python_def_inside_class_is_promoted_to_method_with_class_parent() {
        let extractor = GenericExtractor::new(python_descriptor()).unwrap();
        let result = extractor
            .index_file(Path::new("widget.py"), "class Widget:\n    def draw(self):\n        pass\n")
            .unwrap();

        let widget = result.symbols.iter().find(|s| s.name.as_ref() == "Widget").unwrap();
        let draw = result.symbols.iter().find(|s| s.name.as_ref() == "draw").unwrap();
        assert_eq!(draw.kind, SymbolKind::Method);
        assert_eq!(draw.parent, Some(widget.id));
    }

    #[test]
    fn rust_top_level_fn_outside_impl_stays_a_function() {
        let extractor = GenericExtractor::new(rust_descriptor()).unwrap();
        let result = extractor
            .index_file(Path::new("lib.rs"), "fn widget() {}")
            .unwrap();

        assert_eq!(result.symbols[0].kind, SymbolKind::Function);
    }
}

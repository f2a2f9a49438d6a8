//! Hand-written Rust extractor: wraps the Generic Rust extractor and adds
//! best-effort import resolution.
//!
//! Grounded on the teacher's `indexing/resolver.rs` `ImportResolver`: "what
//! it cannot resolve it omits, never guesses". Only one Enhanced extractor
//! ships in this crate (Rust); other languages use the Generic variant.

use super::generic::{rust_descriptor, GenericExtractor};
use super::{Extractor, ExtractedFile, ExtractorHit, RefSite, SearchOpts};
use crate::error::ParseResult;
use crate::symbol::Symbol;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Import {
    pub path: String,
    pub alias: Option<String>,
    pub is_glob: bool,
}

/// Per-process, best-effort import resolution: imports observed per file,
/// used only to disambiguate a bare name against an aliased import when the
/// generic extractor's own symbol table doesn't already have it.
#[derive(Default)]
struct ImportResolver {
    imports_by_file: HashMap<String, Vec<Import>>,
}

impl ImportResolver {
    fn register_file(&mut self, path: &str, imports: Vec<Import>) {
        self.imports_by_file.insert(path.to_string(), imports);
    }

    /// Resolve `name` against the imports registered for `path`, checking
    /// direct imports first, then aliases, then glob imports. Returns the
    /// fully-qualified path segment it resolved to, or `None` if it cannot
    /// be determined, since this resolver never guesses.
    fn resolve(&self, path: &str, name: &str) -> Option<String> {
        let imports = self.imports_by_file.get(path)?;

        for import in imports {
            if import.alias.is_none() && import.path.ends_with(&format!("::{name}")) {
                return Some(import.path.clone());
            }
        }
        for import in imports {
            if import.alias.as_deref() == Some(name) {
                return Some(import.path.clone());
            }
        }
        for import in imports {
            if import.is_glob {
                return Some(format!("{}::{name}", import.path));
            }
        }
        None
    }
}

fn parse_use_imports(content: &str) -> Vec<Import> {
    let mut imports = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if !trimmed.starts_with("use ") {
            continue;
        }
        let body = trimmed.trim_start_matches("use ").trim_end_matches(';').trim();

        if let Some((path, alias)) = body.split_once(" as ") {
            imports.push(Import {
                path: path.trim().to_string(),
                alias: Some(alias.trim().to_string()),
                is_glob: false,
            });
        } else if let Some(stripped) = body.strip_suffix("::*") {
            imports.push(Import {
                path: stripped.to_string(),
                alias: None,
                is_glob: true,
            });
        } else {
            imports.push(Import {
                path: body.to_string(),
                alias: None,
                is_glob: false,
            });
        }
    }
    imports
}

pub struct EnhancedRustExtractor {
    inner: GenericExtractor,
    resolver: Mutex<ImportResolver>,
}

impl EnhancedRustExtractor {
    pub fn new() -> ParseResult<Self> {
        Ok(Self {
            inner: GenericExtractor::new(rust_descriptor())?,
            resolver: Mutex::new(ImportResolver::default()),
        })
    }

    /// Resolve a name using registered imports for `path`; `None` if this
    /// extractor cannot determine the target (it never guesses).
    pub fn resolve_import(&self, path: &str, name: &str) -> Option<String> {
        self.resolver.lock().resolve(path, name)
    }
}

impl Extractor for EnhancedRustExtractor {
    fn language(&self) -> &str {
        "rust"
    }

    fn suffixes(&self) -> &[&'static str] {
        self.inner.suffixes()
    }

    fn is_enhanced(&self) -> bool {
        true
    }

    fn index_file(&self, path: &Path, content: &str) -> ParseResult<ExtractedFile> {
        let extracted = self.inner.index_file(path, content)?;
        let imports = parse_use_imports(content);
        self.resolver
            .lock()
            .register_file(&path.to_string_lossy(), imports);
        Ok(extracted)
    }

    fn get_definition(&self, name: &str) -> Option<Symbol> {
        self.inner.get_definition(name)
    }

    fn find_references(&self, name: &str) -> Vec<RefSite> {
        self.inner.find_references(name)
    }

    fn search(&self, query: &str, opts: SearchOpts) -> Vec<ExtractorHit> {
        self.inner.search(query, opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_aliased_import() {
        let extractor = EnhancedRustExtractor::new().unwrap();
        extractor
            .index_file(Path::new("lib.rs"), "use std::collections::HashMap as Map;\nfn f() {}")
            .unwrap();

        assert_eq!(
            extractor.resolve_import("lib.rs", "Map"),
            Some("std::collections::HashMap".to_string())
        );
    }

    #[test]
    fn unresolvable_name_yields_none_rather_than_a_guess() {
        let extractor = EnhancedRustExtractor::new().unwrap();
        extractor
            .index_file(Path::new("lib.rs"), "fn f() {}")
            .unwrap();

        assert!(extractor.resolve_import("lib.rs", "Nonexistent").is_none());
    }

    #[test]
    fn delegates_definition_lookup_to_generic_extractor() {
        let extractor = EnhancedRustExtractor::new().unwrap();
        extractor
            .index_file(Path::new("lib.rs"), "fn widget() {}")
            .unwrap();

        assert!(extractor.get_definition("widget").is_some());
    }
}

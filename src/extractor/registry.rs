//! Extractor Registry + Factory: lazy construction of extractors under a
//! global memory budget, with LRU eviction and protected languages.
//!
//! Grounded on the teacher's `parsing/factory.rs` (`ParserFactory::
//! create_parser` matching on a language enum), generalized with a
//! `sysinfo`-measured resident-size estimate per instance, recency-ordered
//! eviction, and a process-wide singleton guarded by a reentrant lock so
//! construction of different languages cannot race on the memory accounting.

use super::enhanced_rust::EnhancedRustExtractor;
use super::generic::{go_descriptor, javascript_descriptor, python_descriptor, GenericExtractor};
use super::Extractor;
use crate::config::Settings;
use crate::error::{IndexError, IndexResult};
use parking_lot::{Mutex, ReentrantMutex};
use std::cell::RefCell;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use sysinfo::{Pid, System};

struct ConstructionDescriptor {
    language: &'static str,
    suffixes: &'static [&'static str],
    construct: fn() -> IndexResult<Arc<dyn Extractor>>,
}

fn descriptors() -> &'static [ConstructionDescriptor] {
    static TABLE: &[ConstructionDescriptor] = &[
        ConstructionDescriptor {
            language: "rust",
            suffixes: &["rs"],
            construct: || {
                EnhancedRustExtractor::new()
                    .map(|e| Arc::new(e) as Arc<dyn Extractor>)
                    .map_err(|e| IndexError::General(e.to_string()))
            },
        },
        ConstructionDescriptor {
            language: "python",
            suffixes: &["py", "pyi"],
            construct: || {
                GenericExtractor::new(python_descriptor())
                    .map(|e| Arc::new(e) as Arc<dyn Extractor>)
                    .map_err(|e| IndexError::General(e.to_string()))
            },
        },
        ConstructionDescriptor {
            language: "javascript",
            suffixes: &["js", "jsx", "ts", "tsx"],
            construct: || {
                GenericExtractor::new(javascript_descriptor())
                    .map(|e| Arc::new(e) as Arc<dyn Extractor>)
                    .map_err(|e| IndexError::General(e.to_string()))
            },
        },
        ConstructionDescriptor {
            language: "go",
            suffixes: &["go"],
            construct: || {
                GenericExtractor::new(go_descriptor())
                    .map(|e| Arc::new(e) as Arc<dyn Extractor>)
                    .map_err(|e| IndexError::General(e.to_string()))
            },
        },
    ];
    TABLE
}

struct LoadedExtractor {
    extractor: Arc<dyn Extractor>,
    resident_bytes: u64,
    recency: u64,
}

struct RegistryState {
    loaded: Vec<(String, LoadedExtractor)>,
    recency_clock: u64,
    system: System,
}

pub struct Registry {
    max_memory_bytes: u64,
    protected: HashSet<String>,
    state: ReentrantMutex<RefCell<RegistryState>>,
}

impl Registry {
    fn new(max_memory_bytes: u64, priority_languages: Vec<String>) -> Self {
        Self {
            max_memory_bytes,
            protected: priority_languages.into_iter().collect(),
            state: ReentrantMutex::new(RefCell::new(RegistryState {
                loaded: Vec::new(),
                recency_clock: 0,
                system: System::new(),
            })),
        }
    }

    /// Language tag for a path's extension, or `None` if unsupported.
    pub fn language_for_path(path: &Path) -> Option<&'static str> {
        let ext = path.extension()?.to_str()?;
        descriptors()
            .iter()
            .find(|d| d.suffixes.contains(&ext))
            .map(|d| d.language)
    }

    pub fn list_languages(&self) -> Vec<(&'static str, &'static [&'static str], bool)> {
        descriptors()
            .iter()
            .map(|d| (d.language, d.suffixes, d.language == "rust"))
            .collect()
    }

    /// Get (constructing if necessary) the extractor for `language`.
    pub fn get_or_construct(&self, language: &str) -> IndexResult<Arc<dyn Extractor>> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();

        state.recency_clock += 1;
        let tick = state.recency_clock;

        if let Some((_, loaded)) = state.loaded.iter_mut().find(|(lang, _)| lang == language) {
            loaded.recency = tick;
            return Ok(loaded.extractor.clone());
        }

        let descriptor = descriptors()
            .iter()
            .find(|d| d.language == language)
            .ok_or_else(|| IndexError::General(format!("no extractor registered for '{language}'")))?;

        let resident_before = resident_bytes(&mut state.system);
        let extractor = (descriptor.construct)()?;
        let resident_after = resident_bytes(&mut state.system);
        let resident_estimate = resident_after.saturating_sub(resident_before).max(1024);

        self.make_room(&mut state, resident_estimate)?;

        state.loaded.push((
            language.to_string(),
            LoadedExtractor {
                extractor: extractor.clone(),
                resident_bytes: resident_estimate,
                recency: tick,
            },
        ));

        Ok(extractor)
    }

    fn make_room(&self, state: &mut RegistryState, incoming_bytes: u64) -> IndexResult<()> {
        let current_total: u64 = state.loaded.iter().map(|(_, l)| l.resident_bytes).sum();
        if current_total + incoming_bytes <= self.max_memory_bytes {
            return Ok(());
        }

        loop {
            let current_total: u64 = state.loaded.iter().map(|(_, l)| l.resident_bytes).sum();
            if current_total + incoming_bytes <= self.max_memory_bytes {
                return Ok(());
            }

            let victim = state
                .loaded
                .iter()
                .enumerate()
                .filter(|(_, (lang, _))| !self.protected.contains(lang))
                .min_by_key(|(_, (_, l))| l.recency)
                .map(|(idx, _)| idx);

            match victim {
                Some(idx) => {
                    state.loaded.remove(idx);
                }
                None => {
                    return Err(IndexError::General(format!(
                        "could not free {incoming_bytes} bytes under the {} byte memory budget",
                        self.max_memory_bytes
                    )))
                }
            }
        }
    }
}

fn resident_bytes(system: &mut System) -> u64 {
    system.refresh_all();
    let pid = Pid::from_u32(std::process::id());
    system
        .process(pid)
        .map(|p| p.memory())
        .unwrap_or_default()
}

static INSTANCE: OnceLock<Mutex<Option<Arc<Registry>>>> = OnceLock::new();

/// Start (or return the already-running) process-wide registry singleton.
pub fn init(settings: &Settings) -> Arc<Registry> {
    let cell = INSTANCE.get_or_init(|| Mutex::new(None));
    let mut guard = cell.lock();
    if let Some(existing) = guard.as_ref() {
        return existing.clone();
    }
    let registry = Arc::new(Registry::new(
        settings.max_memory_bytes,
        settings.priority_languages.clone(),
    ));
    *guard = Some(registry.clone());
    registry
}

/// Stop the process-wide registry singleton; a later `init` starts fresh.
pub fn shutdown() {
    if let Some(cell) = INSTANCE.get() {
        *cell.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_for_path_matches_suffix() {
        assert_eq!(Registry::language_for_path(Path::new("a.rs")), Some("rust"));
        assert_eq!(Registry::language_for_path(Path::new("a.py")), Some("python"));
        assert_eq!(Registry::language_for_path(Path::new("a.unknown")), None);
    }

    #[test]
    fn get_or_construct_caches_instance() {
        let registry = Registry::new(u64::MAX, vec!["rust".to_string()]);
        let a = registry.get_or_construct("rust").unwrap();
        let b = registry.get_or_construct("rust").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn eviction_spares_protected_language() {
        // A budget generous enough for exactly one extractor's real resident
        // footprint forces every later construction to evict something, but
        // never the protected one.
        let registry = Registry::new(200 * 1024 * 1024, vec!["rust".to_string()]);
        registry.get_or_construct("rust").unwrap();
        let _ = registry.get_or_construct("python");
        let _ = registry.get_or_construct("go");

        let guard = registry.state.lock();
        let state = guard.borrow();
        assert!(state.loaded.iter().any(|(lang, _)| lang == "rust"));
    }
}

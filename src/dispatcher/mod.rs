//! Dispatcher: routes lookups/searches to extractors and aggregates results.
//!
//! New relative to the teacher (whose `IndexFacade` is the closest
//! analogue, wrapping `DocumentIndex` + `Pipeline` + semantic search behind
//! one API). Generalized across multiple extractors: priority-ordered
//! `lookup`, parallel bounded-concurrency `search` with dedup/rank/
//! truncate, a 5-second per-extractor timeout via a `crossbeam-channel`
//! rendezvous (the engine is thread-based, not async), and a mandatory
//! bypass straight to the Index Store's full-text search.

use crate::error::IndexResult;
use crate::extractor::registry::Registry;
use crate::extractor::{Extractor, SearchOpts};
use crate::storage::IndexStore;
use crate::symbol::Symbol;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const EXTRACTOR_TIMEOUT: Duration = Duration::from_secs(5);
const DEGRADED_COOLDOWN: Duration = Duration::from_secs(30);
const MAX_ERROR_LOG: usize = 100;

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub relative_file: String,
    pub line: u32,
    pub snippet: String,
    pub score: Option<f32>,
    pub repository_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExtractorFailure {
    pub language: String,
    pub reason: String,
    pub at: u64,
}

struct DegradedTracker {
    last_failure: HashMap<String, Instant>,
    error_log: Vec<ExtractorFailure>,
}

pub struct Dispatcher {
    registry: Arc<Registry>,
    store: Arc<IndexStore>,
    priority_order: Vec<String>,
    bypass_forced: bool,
    degraded: Mutex<DegradedTracker>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, store: Arc<IndexStore>, priority_order: Vec<String>) -> Self {
        Self {
            registry,
            store,
            priority_order,
            bypass_forced: false,
            degraded: Mutex::new(DegradedTracker {
                last_failure: HashMap::new(),
                error_log: Vec::new(),
            }),
        }
    }

    pub fn with_bypass_forced(mut self, forced: bool) -> Self {
        self.bypass_forced = forced;
        self
    }

    fn is_degraded(&self, language: &str) -> bool {
        self.degraded
            .lock()
            .last_failure
            .get(language)
            .is_some_and(|at| at.elapsed() < DEGRADED_COOLDOWN)
    }

    fn record_failure(&self, language: &str, reason: String) {
        let mut degraded = self.degraded.lock();
        degraded.last_failure.insert(language.to_string(), Instant::now());
        degraded.error_log.push(ExtractorFailure {
            language: language.to_string(),
            reason,
            at: crate::storage::now_utc(),
        });
        if degraded.error_log.len() > MAX_ERROR_LOG {
            let overflow = degraded.error_log.len() - MAX_ERROR_LOG;
            degraded.error_log.drain(0..overflow);
        }
    }

    /// Languages this dispatcher holds extractors for, in priority order.
    pub fn languages(&self) -> &[String] {
        &self.priority_order
    }

    pub fn degraded_languages(&self) -> Vec<String> {
        let degraded = self.degraded.lock();
        degraded
            .last_failure
            .iter()
            .filter(|(_, at)| at.elapsed() < DEGRADED_COOLDOWN)
            .map(|(lang, _)| lang.clone())
            .collect()
    }

    /// First hit across extractors in declared priority order, each call
    /// bounded by a 5-second timeout.
    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        for language in &self.priority_order {
            if self.is_degraded(language) {
                continue;
            }
            let Ok(extractor) = self.registry.get_or_construct(language) else {
                continue;
            };

            match call_with_timeout(extractor, name.to_string(), EXTRACTOR_TIMEOUT, |ex, n| {
                ex.get_definition(&n)
            }) {
                Some(Some(symbol)) => return Some(symbol),
                Some(None) => continue,
                None => {
                    self.record_failure(language, "lookup timed out".to_string());
                    continue;
                }
            }
        }

        self.store.get_definition(name)
    }

    /// Parallel fan-out across extractors, bounded concurrency via rayon,
    /// followed by dedup/rank/truncate.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        use rayon::prelude::*;

        let languages: Vec<String> = self.priority_order.clone();
        let mut results: Vec<SearchResult> = languages
            .par_iter()
            .filter(|lang| !self.is_degraded(lang))
            .filter_map(|lang| self.registry.get_or_construct(lang).ok())
            .flat_map_iter(|extractor| {
                extractor
                    .search(query, SearchOpts { limit })
                    .into_iter()
                    .map(|hit| {
                        let relative_file = self
                            .store
                            .file_record(hit.symbol.file_id)
                            .map(|r| r.relative_path.to_string())
                            .unwrap_or_default();
                        SearchResult {
                            relative_file,
                            line: hit.symbol.range.start_line,
                            snippet: hit.symbol.name.to_string(),
                            score: Some(hit.score),
                            repository_id: None,
                        }
                    })
            })
            .collect();

        if results.is_empty() || self.bypass_forced {
            if let Ok(hits) = self.store.search_code_fts(query, limit) {
                results.extend(hits.into_iter().map(|h| SearchResult {
                    relative_file: h.file_path,
                    line: h.line_number,
                    snippet: h.name,
                    score: Some(h.score),
                    repository_id: None,
                }));
            }
        }

        dedup_and_rank(results, query, limit)
    }

    /// Select the first supporting extractor for `path`; if none supports
    /// it, the caller should fall back to plain-text indexing.
    pub fn extractor_for(&self, path: &std::path::Path) -> Option<Arc<dyn Extractor>> {
        let language = Registry::language_for_path(path)?;
        if self.is_degraded(language) {
            return None;
        }
        self.registry.get_or_construct(language).ok()
    }

    pub fn bypass_search(&self, query: &str, limit: usize) -> IndexResult<Vec<SearchResult>> {
        let hits = self.store.search_code_fts(query, limit)?;
        Ok(hits
            .into_iter()
            .map(|h| SearchResult {
                relative_file: h.file_path,
                line: h.line_number,
                snippet: h.name,
                score: Some(h.score),
                repository_id: None,
            })
            .collect())
    }
}

fn call_with_timeout<T, R>(
    extractor: Arc<dyn Extractor>,
    arg: T,
    timeout: Duration,
    f: impl FnOnce(&dyn Extractor, T) -> R + Send + 'static,
) -> Option<R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    let (tx, rx) = crossbeam_channel::bounded(1);
    std::thread::spawn(move || {
        let result = f(extractor.as_ref(), arg);
        let _ = tx.send(result);
    });
    rx.recv_timeout(timeout).ok()
}

fn dedup_and_rank(results: Vec<SearchResult>, query: &str, limit: usize) -> Vec<SearchResult> {
    let mut seen: HashMap<(String, u32), usize> = HashMap::new();
    let mut deduped: Vec<SearchResult> = Vec::new();

    for result in results {
        let key = (result.relative_file.clone(), result.line);
        if let Some(&idx) = seen.get(&key) {
            if result.score.unwrap_or(0.0) > deduped[idx].score.unwrap_or(0.0) {
                deduped[idx] = result;
            }
        } else {
            seen.insert(key, deduped.len());
            deduped.push(result);
        }
    }

    deduped.sort_by(|a, b| rank_key(a, query).cmp(&rank_key(b, query)));
    deduped.truncate(limit);
    deduped
}

fn rank_key(result: &SearchResult, query: &str) -> std::cmp::Reverse<(u8, u64)> {
    let tier: u8 = if result.snippet == query {
        0
    } else if result.snippet.starts_with(query) {
        1
    } else {
        2
    };
    let score_bits = (result.score.unwrap_or(0.0) * 1_000_000.0) as u64;
    std::cmp::Reverse((u8::MAX - tier, score_bits))
}

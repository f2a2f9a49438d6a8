//! Semantic Indexer (optional): chunk, embed, and search source files by
//! vector similarity. Disabled unless `Settings::enable_semantic` is set.
//!
//! Grounded directly on the teacher's `semantic/simple.rs`
//! (`SimpleSemanticSearch`, cosine similarity) and `semantic/pool.rs`
//! (`EmbeddingPool`), and on `documents/chunker.rs` (`HybridChunker`) for
//! the chunking algorithm, retargeted onto source structural boundaries.

pub mod chunker;
pub mod embedding;
pub mod vector_store;

use crate::error::IndexResult;
use crate::path_resolver::PathResolver;
use crate::symbol::Embedding;
use crate::types::{compact_string, FileId};
use chunker::{chunk_source, ChunkingConfig};
use embedding::EmbeddingPool;
use vector_store::VectorStore;

pub struct SemanticIndexer<S: VectorStore> {
    pool: EmbeddingPool,
    store: S,
    chunking: ChunkingConfig,
}

impl<S: VectorStore> SemanticIndexer<S> {
    pub fn new(pool: EmbeddingPool, store: S, chunking: ChunkingConfig) -> Self {
        Self { pool, store, chunking }
    }

    /// Chunk, dedup-by-content-hash, and embed `content` for `file_id`.
    /// Chunks whose content hash already has an embedding elsewhere are
    /// re-keyed to this file rather than re-embedded.
    pub fn index_file(&mut self, file_id: FileId, content: &str) -> IndexResult<usize> {
        let chunks = chunk_source(content, &self.chunking);
        let mut to_embed = Vec::new();
        let mut reused = 0usize;

        for chunk in &chunks {
            let hash = PathResolver::content_hash_bytes(chunk.content.as_bytes());
            if let Some(existing) = self.store.find_by_content_hash(&hash) {
                if existing.file_id == file_id && existing.chunk_index == chunk.index {
                    reused += 1;
                    continue;
                }
                self.store.upsert(Embedding {
                    file_id,
                    chunk_index: chunk.index,
                    content_hash: compact_string(&hash),
                    vector: existing.vector,
                    deleted: false,
                })?;
                reused += 1;
                continue;
            }
            to_embed.push((file_id, chunk.index, chunk.content.as_str(), hash));
        }

        if to_embed.is_empty() {
            return Ok(reused);
        }

        let batch: Vec<(FileId, u32, &str)> = to_embed
            .iter()
            .map(|(f, idx, text, _)| (*f, *idx, *text))
            .collect();
        let embedded = self.pool.embed_parallel(&batch);

        let hash_by_key: std::collections::HashMap<(FileId, u32), String> = to_embed
            .iter()
            .map(|(f, idx, _, hash)| ((*f, *idx), hash.clone()))
            .collect();

        for (file_id, chunk_index, vector) in &embedded {
            let hash = hash_by_key
                .get(&(*file_id, *chunk_index))
                .cloned()
                .unwrap_or_default();
            self.store.upsert(Embedding {
                file_id: *file_id,
                chunk_index: *chunk_index,
                content_hash: compact_string(&hash),
                vector: vector.clone(),
                deleted: false,
            })?;
        }

        Ok(reused + embedded.len())
    }

    pub fn remove_file(&mut self, file_id: FileId) {
        self.store.remove_file(file_id);
    }

    pub fn mark_moved(&mut self, old_file_id: FileId, new_file_id: FileId) {
        self.store.mark_moved(old_file_id, new_file_id);
    }

    pub fn search(&self, query: &str, limit: usize) -> IndexResult<Vec<(FileId, u32, f32)>> {
        let embedding = self
            .pool
            .embed_one(query)
            .map_err(|e| crate::error::IndexError::General(e.to_string()))?;
        Ok(self.store.search(&embedding, limit))
    }

    pub fn chunk_count(&self) -> usize {
        self.store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::chunker::chunk_source;
    use super::*;

    #[test]
    fn chunking_reuses_default_config() {
        let chunks = chunk_source("fn a() {}\n\nfn b() {}\n", &ChunkingConfig::default());
        assert!(!chunks.is_empty());
    }
}

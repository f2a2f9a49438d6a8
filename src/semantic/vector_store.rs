//! Vector Store: persists chunk embeddings, deduplicated by content hash so
//! moves and duplicate content never trigger re-embedding.
//!
//! Grounded on the teacher's `storage/persistence.rs` atomic
//! temp-file-then-rename snapshot pattern, applied here to the `Embedding`
//! table instead of the relational `Tables` snapshot.

use crate::error::{IndexError, IndexResult};
use crate::symbol::Embedding;
use crate::types::FileId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// What a Semantic Indexer needs from a place to keep vectors. A bincode
/// file-backed store is the reference implementation; a real deployment
/// might swap in a networked vector database behind the same trait.
pub trait VectorStore: Send + Sync {
    fn upsert(&mut self, embedding: Embedding) -> IndexResult<()>;
    fn mark_moved(&mut self, old_file_id: FileId, new_file_id: FileId);
    fn remove_file(&mut self, file_id: FileId);
    fn search(&self, query: &[f32], limit: usize) -> Vec<(FileId, u32, f32)>;
    /// Look up an already-embedded chunk by content hash, so a duplicate or
    /// moved chunk can be re-keyed without re-running the embedding model.
    fn find_by_content_hash(&self, hash: &str) -> Option<Embedding>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct FileVectorStore {
    entries: HashMap<(FileId, u32), Embedding>,
    /// content_hash -> existing (FileId, chunk_index) to dedup re-embedding.
    by_content_hash: HashMap<String, (FileId, u32)>,
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl FileVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(path: &Path) -> IndexResult<Self> {
        if !path.exists() {
            return Ok(Self {
                path: Some(path.to_path_buf()),
                ..Self::default()
            });
        }
        let bytes = std::fs::read(path).map_err(|source| IndexError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut store: Self = bincode::deserialize(&bytes).map_err(|e| IndexError::LoadError {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    pub fn save(&self) -> IndexResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = bincode::serialize(self).map_err(|e| IndexError::PersistenceError {
            path: path.clone(),
            source: Box::new(e),
        })?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes).map_err(|source| IndexError::FileWrite {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, path).map_err(|source| IndexError::FileWrite {
            path: path.clone(),
            source,
        })
    }

    /// Does a chunk with this content hash already have an embedding
    /// recorded under a different `(file_id, chunk_index)`? If so, the
    /// caller should re-key rather than re-embed.
    pub fn existing_for_content(&self, content_hash: &str) -> Option<(FileId, u32)> {
        self.by_content_hash.get(content_hash).copied()
    }
}

impl VectorStore for FileVectorStore {
    fn upsert(&mut self, embedding: Embedding) -> IndexResult<()> {
        let key = (embedding.file_id, embedding.chunk_index);
        self.by_content_hash
            .insert(embedding.content_hash.to_string(), key);
        self.entries.insert(key, embedding);
        Ok(())
    }

    fn mark_moved(&mut self, old_file_id: FileId, new_file_id: FileId) {
        let moved: Vec<((FileId, u32), Embedding)> = self
            .entries
            .iter()
            .filter(|((file_id, _), _)| *file_id == old_file_id)
            .map(|(k, v)| (*k, v.clone()))
            .collect();

        for ((_, chunk_index), mut embedding) in moved {
            self.entries.remove(&(old_file_id, chunk_index));
            embedding.file_id = new_file_id;
            self.by_content_hash
                .insert(embedding.content_hash.to_string(), (new_file_id, chunk_index));
            self.entries.insert((new_file_id, chunk_index), embedding);
        }
    }

    fn remove_file(&mut self, file_id: FileId) {
        self.entries.retain(|(id, _), v| {
            if *id == file_id {
                self.by_content_hash.remove(v.content_hash.as_ref());
                false
            } else {
                true
            }
        });
    }

    fn search(&self, query: &[f32], limit: usize) -> Vec<(FileId, u32, f32)> {
        let mut scored: Vec<(FileId, u32, f32)> = self
            .entries
            .values()
            .filter(|e| !e.deleted)
            .map(|e| (e.file_id, e.chunk_index, cosine_similarity(query, &e.vector)))
            .collect();
        scored.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored
    }

    fn find_by_content_hash(&self, hash: &str) -> Option<Embedding> {
        let key = self.by_content_hash.get(hash)?;
        self.entries.get(key).cloned()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::compact_string;

    fn file(n: u32) -> FileId {
        FileId::new(n).unwrap()
    }

    fn embedding(file_id: FileId, chunk: u32, hash: &str, vector: Vec<f32>) -> Embedding {
        Embedding {
            file_id,
            chunk_index: chunk,
            content_hash: compact_string(hash),
            vector,
            deleted: false,
        }
    }

    #[test]
    fn search_ranks_by_cosine_similarity() {
        let mut store = FileVectorStore::new();
        store.upsert(embedding(file(1), 0, "h1", vec![1.0, 0.0])).unwrap();
        store.upsert(embedding(file(2), 0, "h2", vec![0.0, 1.0])).unwrap();

        let hits = store.search(&[1.0, 0.0], 2);
        assert_eq!(hits[0].0, file(1));
    }

    #[test]
    fn move_rekeys_without_touching_the_vector() {
        let mut store = FileVectorStore::new();
        store.upsert(embedding(file(1), 0, "h1", vec![1.0, 0.0])).unwrap();

        store.mark_moved(file(1), file(2));

        assert_eq!(store.len(), 1);
        assert_eq!(store.existing_for_content("h1"), Some((file(2), 0)));
    }

    #[test]
    fn remove_file_drops_its_chunks() {
        let mut store = FileVectorStore::new();
        store.upsert(embedding(file(1), 0, "h1", vec![1.0, 0.0])).unwrap();
        store.upsert(embedding(file(2), 0, "h2", vec![0.0, 1.0])).unwrap();

        store.remove_file(file(1));
        assert_eq!(store.len(), 1);
        assert!(store.existing_for_content("h1").is_none());
    }
}

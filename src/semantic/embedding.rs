//! Embedding model pool for parallel embedding generation.
//!
//! Grounded directly on the teacher's `semantic/pool.rs` `EmbeddingPool`:
//! a bounded `crossbeam-channel` holds N `fastembed::TextEmbedding`
//! instances, `embed_parallel` fans a batch out across them with rayon.
//! Keyed by `(FileId, chunk_index)` rather than `SymbolId`, since here it
//! embeds file chunks rather than doc comments.

use crate::types::FileId;
use crossbeam_channel::{bounded, Receiver, Sender};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to initialize embedding model: {0}")]
    ModelInit(String),
    #[error("failed to generate embedding: {0}")]
    Embed(String),
}

struct ModelInstance {
    model: TextEmbedding,
    id: usize,
}

/// A pool of `TextEmbedding` instances so parallel chunk embedding doesn't
/// serialize behind a single model's `&mut self` API.
pub struct EmbeddingPool {
    sender: Sender<ModelInstance>,
    receiver: Receiver<ModelInstance>,
    pool_size: usize,
    dimensions: usize,
    model_name: String,
}

impl EmbeddingPool {
    pub fn new(pool_size: usize, model_name: &str, cache_dir: Option<PathBuf>) -> Result<Self, EmbeddingError> {
        let pool_size = pool_size.max(1);
        let (sender, receiver) = bounded(pool_size);
        let model = resolve_model(model_name);

        let mut dimensions = 0;
        for i in 0..pool_size {
            let mut options = InitOptions::new(model.clone()).with_show_download_progress(i == 0);
            if let Some(dir) = &cache_dir {
                options = options.with_cache_dir(dir.clone());
            }
            let mut text_model = TextEmbedding::try_new(options)
                .map_err(|e| EmbeddingError::ModelInit(format!("instance {i}: {e}")))?;

            if i == 0 {
                let test = text_model
                    .embed(vec!["test"], None)
                    .map_err(|e| EmbeddingError::Embed(e.to_string()))?;
                dimensions = test.into_iter().next().map(|v| v.len()).unwrap_or(0);
            }

            sender
                .send(ModelInstance { model: text_model, id: i })
                .expect("pool channel cannot be closed while we hold the sender");
        }

        Ok(Self {
            sender,
            receiver,
            pool_size,
            dimensions,
            model_name: model_name.to_string(),
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn acquire(&self) -> ModelInstance {
        self.receiver.recv().expect("pool should not be empty")
    }

    fn release(&self, instance: ModelInstance) {
        let _ = self.sender.send(instance);
    }

    pub fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::Embed("empty text".to_string()));
        }
        let mut instance = self.acquire();
        let result = instance
            .model
            .embed(vec![text], None)
            .map_err(|e| EmbeddingError::Embed(e.to_string()));
        self.release(instance);
        result.map(|mut v| v.remove(0))
    }

    /// Embed a batch of `(FileId, chunk_index, text)` items in parallel,
    /// batching 64 texts per model call. Dimension mismatches and embed
    /// failures are dropped from the result with a warning, not propagated.
    pub fn embed_parallel(
        &self,
        items: &[(FileId, u32, &str)],
    ) -> Vec<(FileId, u32, Vec<f32>)> {
        use rayon::prelude::*;
        const BATCH_SIZE: usize = 64;

        let valid: Vec<_> = items.iter().filter(|(_, _, text)| !text.trim().is_empty()).collect();
        if valid.is_empty() {
            return Vec::new();
        }

        valid
            .chunks(BATCH_SIZE)
            .par_bridge()
            .flat_map(|batch| {
                let texts: Vec<&str> = batch.iter().map(|(_, _, text)| *text).collect();
                let mut instance = self.acquire();
                let result = instance.model.embed(texts, None);
                self.release(instance);

                match result {
                    Ok(embeddings) => batch
                        .iter()
                        .zip(embeddings)
                        .filter_map(|((file_id, chunk_index, _), embedding)| {
                            if embedding.len() == self.dimensions {
                                Some((*file_id, *chunk_index, embedding))
                            } else {
                                tracing::warn!(
                                    expected = self.dimensions,
                                    got = embedding.len(),
                                    "embedding dimension mismatch, dropping chunk"
                                );
                                None
                            }
                        })
                        .collect::<Vec<_>>(),
                    Err(e) => {
                        tracing::warn!(error = %e, "batch embedding failed");
                        Vec::new()
                    }
                }
            })
            .collect()
    }
}

fn resolve_model(name: &str) -> EmbeddingModel {
    match name {
        "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        _ => EmbeddingModel::AllMiniLML6V2,
    }
}

//! The `.meta` JSON sidecar that accompanies each per-repository database.
//!
//! Grounded on the teacher's `storage/metadata.rs` JSON save/load shape,
//! retargeted to the key/value document named in the external interfaces:
//! `repo_id`, `remote_url`, `branch`, `commit_sha`, `indexer_version`,
//! `created_at`, `updated_at`.

use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const INDEXER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub repo_id: String,
    pub remote_url: Option<String>,
    pub branch: Option<String>,
    pub commit_sha: Option<String>,
    pub indexer_version: String,
    pub created_at: u64,
    pub updated_at: u64,
}

impl IndexMetadata {
    pub fn new(repo_id: impl Into<String>, remote_url: Option<String>, now: u64) -> Self {
        Self {
            repo_id: repo_id.into(),
            remote_url,
            branch: None,
            commit_sha: None,
            indexer_version: INDEXER_VERSION.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, now: u64) {
        self.updated_at = now;
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| StorageError::DatabaseError(e.to_string()))
    }
}

pub fn meta_path(db_path: &Path) -> PathBuf {
    db_path.with_extension("meta")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main_abc123.meta");

        let meta = IndexMetadata::new("a1b2c3d4e5f6", Some("https://example.com/repo.git".into()), 1000);
        meta.save(&path).unwrap();

        let loaded = IndexMetadata::load(&path).unwrap();
        assert_eq!(loaded.repo_id, "a1b2c3d4e5f6");
        assert_eq!(loaded.indexer_version, INDEXER_VERSION);
    }
}

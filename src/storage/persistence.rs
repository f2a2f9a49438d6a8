//! Atomic bincode snapshotting of the relational `Tables`.
//!
//! Grounded on the teacher's `storage/persistence.rs`: write to a temp file
//! beside the target, then rename, so a crash mid-write never corrupts the
//! previous snapshot. The on-disk layout is the one named in the external
//! interfaces: the actual data lives in a branch/commit-qualified file
//! (`<branch>_<short_commit>.db`) and `current.db` is an indirection onto it
//! (an OS symlink on unix, a one-line pointer file elsewhere), so switching
//! branches never overwrites a sibling branch's snapshot in place.

use super::tables::Tables;
use crate::error::StorageError;
use std::path::{Path, PathBuf};

pub struct IndexPersistence {
    repo_dir: PathBuf,
    pointer_path: PathBuf,
    data_filename: String,
}

impl IndexPersistence {
    /// `repo_dir` is the per-repository storage directory; `branch` and
    /// `commit_sha` select which qualified snapshot `current.db` should
    /// point at once `save` runs (missing values fall back to `main` / an
    /// `uncommitted` placeholder).
    pub fn new(repo_dir: impl Into<PathBuf>, branch: Option<&str>, commit_sha: Option<&str>) -> Self {
        let repo_dir = repo_dir.into();
        let pointer_path = repo_dir.join("current.db");
        let data_filename = data_filename(branch, commit_sha);
        Self {
            repo_dir,
            pointer_path,
            data_filename,
        }
    }

    pub fn exists(&self) -> bool {
        self.resolve_target().is_some_and(|p| p.exists())
    }

    pub fn save(&self, tables: &Tables) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.repo_dir)?;
        let data = bincode::serialize(tables).map_err(StorageError::SerializationError)?;

        let data_path = self.data_path();
        let temp_path = self.temp_path();
        std::fs::write(&temp_path, &data)?;
        std::fs::rename(&temp_path, &data_path)?;
        self.link_current()?;
        Ok(())
    }

    pub fn load(&self) -> Result<Tables, StorageError> {
        let target = self.resolve_target().unwrap_or_else(|| self.data_path());
        let data = std::fs::read(&target)?;
        bincode::deserialize(&data).map_err(StorageError::SerializationError)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        if let Some(target) = self.resolve_target() {
            if target.exists() {
                std::fs::remove_file(&target)?;
            }
        }
        if std::fs::symlink_metadata(&self.pointer_path).is_ok() {
            std::fs::remove_file(&self.pointer_path)?;
        }
        Ok(())
    }

    fn data_path(&self) -> PathBuf {
        self.repo_dir.join(&self.data_filename)
    }

    fn temp_path(&self) -> PathBuf {
        self.repo_dir.join(format!("{}.tmp", self.data_filename))
    }

    /// Follow `current.db` (symlink or pointer file) to the qualified
    /// snapshot it names, without assuming it currently exists.
    fn resolve_target(&self) -> Option<PathBuf> {
        let meta = std::fs::symlink_metadata(&self.pointer_path).ok()?;
        if meta.file_type().is_symlink() {
            let target = std::fs::read_link(&self.pointer_path).ok()?;
            Some(if target.is_absolute() {
                target
            } else {
                self.repo_dir.join(target)
            })
        } else {
            let content = std::fs::read_to_string(&self.pointer_path).ok()?;
            Some(self.repo_dir.join(content.trim()))
        }
    }

    #[cfg(unix)]
    fn link_current(&self) -> Result<(), StorageError> {
        if std::fs::symlink_metadata(&self.pointer_path).is_ok() {
            std::fs::remove_file(&self.pointer_path)?;
        }
        std::os::unix::fs::symlink(&self.data_filename, &self.pointer_path)?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn link_current(&self) -> Result<(), StorageError> {
        std::fs::write(&self.pointer_path, &self.data_filename)?;
        Ok(())
    }
}

fn data_filename(branch: Option<&str>, commit_sha: Option<&str>) -> String {
    let branch = branch.filter(|b| !b.is_empty()).unwrap_or("main");
    let short_commit = commit_sha
        .filter(|c| !c.is_empty())
        .map(|c| &c[..c.len().min(7)])
        .unwrap_or("uncommitted");
    format!("{branch}_{short_commit}.db")
}

/// `current.db` location for a repository's snapshot indirection; this is
/// what Index Discovery looks for, not the data file itself.
pub fn snapshot_path(repo_dir: &Path) -> PathBuf {
    repo_dir.join("current.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::compact_string;
    use tempfile::TempDir;

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let persistence = IndexPersistence::new(dir.path(), Some("main"), Some("abc1234def"));

        let mut tables = Tables::new();
        tables.store_file("lib/mod.rs", "rust", "hash-a", 1);

        persistence.save(&tables).unwrap();
        assert!(persistence.exists());

        let loaded = persistence.load().unwrap();
        assert_eq!(loaded.file_count(), 1);
        assert!(loaded
            .path_index
            .contains_key(&compact_string("lib/mod.rs")));
    }

    #[test]
    fn clear_removes_the_snapshot() {
        let dir = TempDir::new().unwrap();
        let persistence = IndexPersistence::new(dir.path(), None, None);
        persistence.save(&Tables::new()).unwrap();

        persistence.clear().unwrap();
        assert!(!persistence.exists());
    }

    #[test]
    fn current_db_is_an_indirection_onto_a_qualified_snapshot_file() {
        let dir = TempDir::new().unwrap();
        let persistence = IndexPersistence::new(dir.path(), Some("feature-x"), Some("0123456789"));
        persistence.save(&Tables::new()).unwrap();

        let pointer = dir.path().join("current.db");
        let qualified = dir.path().join("feature-x_0123456.db");
        assert!(qualified.exists());

        #[cfg(unix)]
        {
            let target = std::fs::read_link(&pointer).unwrap();
            assert_eq!(target, PathBuf::from("feature-x_0123456.db"));
        }
        #[cfg(not(unix))]
        {
            let content = std::fs::read_to_string(&pointer).unwrap();
            assert_eq!(content.trim(), "feature-x_0123456.db");
        }
    }
}

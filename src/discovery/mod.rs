//! Index Discovery: map a working-tree path to its central index location.
//!
//! New relative to the teacher (which stores its index inline at
//! `.codanna/index` and never searches a central storage root). Grounded on
//! the teacher's `storage/metadata.rs` `.meta` sidecar shape for what the
//! discovered snapshot looks like once found.

use crate::error::{DiscoveryError, DiscoveryResult};
use crate::repository::RepositoryId;
use std::path::{Path, PathBuf};

/// The five candidate locations checked, in order, for a repository's
/// `current.db` snapshot. `current.db` itself is an indirection (symlink or
/// pointer file, see `storage::persistence`) onto a branch/commit-qualified
/// data file living alongside it; `Path::exists` follows that indirection,
/// so the candidates below are unaffected by how the pointer is stored.
pub fn candidate_paths(
    workspace: &Path,
    storage_root: &Path,
    repo_id: &RepositoryId,
) -> Vec<PathBuf> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
    vec![
        workspace
            .join(".indexes")
            .join(repo_id.as_str())
            .join("current.db"),
        workspace
            .join(".mcp-index")
            .join(repo_id.as_str())
            .join("current.db"),
        storage_root.join(repo_id.as_str()).join("current.db"),
        storage_root
            .join("test_indexes")
            .join(repo_id.as_str())
            .join("current.db"),
        home.join(".mcp")
            .join("indexes")
            .join(repo_id.as_str())
            .join("current.db"),
    ]
}

/// Find the first existing `current.db` among the five candidate locations.
/// If none exists and `auto_create` is set, returns candidate path 3 (the
/// storage-root location) without creating anything on disk — callers
/// create the snapshot by opening an `IndexStore` there.
pub fn discover(
    workspace: &Path,
    storage_root: &Path,
    repo_id: &RepositoryId,
    auto_create: bool,
) -> DiscoveryResult<PathBuf> {
    let candidates = candidate_paths(workspace, storage_root, repo_id);

    for candidate in &candidates {
        if candidate.exists() {
            return Ok(candidate.clone());
        }
    }

    if auto_create {
        return Ok(candidates[2].clone());
    }

    Err(DiscoveryError::IndexNotFound {
        repo_id: repo_id.as_str().to_string(),
        attempted: candidates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn discover_finds_workspace_indexes_dir_first() {
        let workspace = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        let repo_id = RepositoryId::from_path(workspace.path());

        let dir = workspace.path().join(".indexes").join(repo_id.as_str());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("current.db"), b"snapshot").unwrap();

        let found = discover(workspace.path(), storage.path(), &repo_id, false).unwrap();
        assert_eq!(found, dir.join("current.db"));
    }

    #[test]
    fn discover_falls_back_to_storage_root() {
        let workspace = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        let repo_id = RepositoryId::from_path(workspace.path());

        let dir = storage.path().join(repo_id.as_str());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("current.db"), b"snapshot").unwrap();

        let found = discover(workspace.path(), storage.path(), &repo_id, false).unwrap();
        assert_eq!(found, dir.join("current.db"));
    }

    #[test]
    fn discover_reports_all_attempted_paths_when_missing() {
        let workspace = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        let repo_id = RepositoryId::from_path(workspace.path());

        let err = discover(workspace.path(), storage.path(), &repo_id, false).unwrap_err();
        match err {
            DiscoveryError::IndexNotFound { attempted, .. } => assert_eq!(attempted.len(), 5),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn discover_auto_create_returns_storage_root_path_without_creating_it() {
        let workspace = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        let repo_id = RepositoryId::from_path(workspace.path());

        let found = discover(workspace.path(), storage.path(), &repo_id, true).unwrap();
        assert_eq!(found, storage.path().join(repo_id.as_str()).join("current.db"));
        assert!(!found.exists());
    }
}

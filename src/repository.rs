//! Repository identity.
//!
//! A Repository is identified by a 12-hex-character prefix of the SHA-256 of
//! either its remote URL (preferred) or its canonicalized absolute path.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepositoryId(String);

impl RepositoryId {
    /// Derive an id from a remote URL, preferred over the path when known.
    pub fn from_remote_url(url: &str) -> Self {
        Self(hash_prefix(url.as_bytes()))
    }

    /// Derive an id from an absolute filesystem path.
    pub fn from_path(path: &Path) -> Self {
        let bytes = path.to_string_lossy();
        Self(hash_prefix(bytes.as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn hash_prefix(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let full = digest.iter().map(|b| format!("{b:02x}")).collect::<String>();
    full[..12].to_string()
}

/// A source tree registered with the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepositoryId,
    pub name: String,
    pub root: PathBuf,
    pub index_storage_dir: PathBuf,
    pub remote_url: Option<String>,
}

impl Repository {
    /// Register a repository rooted at `root`, optionally known by `remote_url`.
    ///
    /// `root` should already be canonicalized by the caller (the Path Resolver
    /// does this once at construction).
    pub fn new(root: PathBuf, remote_url: Option<String>, storage_root: &Path) -> Self {
        let id = match &remote_url {
            Some(url) => RepositoryId::from_remote_url(url),
            None => RepositoryId::from_path(&root),
        };
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| id.to_string());
        let index_storage_dir = storage_root.join(id.as_str());

        Self {
            id,
            name,
            root,
            index_storage_dir,
            remote_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_id_is_twelve_hex_chars() {
        let id = RepositoryId::from_remote_url("https://example.com/repo.git");
        assert_eq!(id.as_str().len(), 12);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn repository_id_is_stable_for_same_input() {
        let a = RepositoryId::from_path(Path::new("/home/user/project"));
        let b = RepositoryId::from_path(Path::new("/home/user/project"));
        assert_eq!(a, b);
    }

    #[test]
    fn remote_url_preferred_over_path_when_given() {
        let repo = Repository::new(
            PathBuf::from("/home/user/project"),
            Some("https://example.com/repo.git".to_string()),
            Path::new("/tmp/indexes"),
        );
        assert_eq!(repo.id, RepositoryId::from_remote_url("https://example.com/repo.git"));
    }

    #[test]
    fn different_inputs_produce_different_ids() {
        let a = RepositoryId::from_path(Path::new("/home/user/project-a"));
        let b = RepositoryId::from_path(Path::new("/home/user/project-b"));
        assert_ne!(a, b);
    }
}

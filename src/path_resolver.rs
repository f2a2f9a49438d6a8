//! Path normalization, resolution, and content hashing.
//!
//! Grounded on the teacher's `file_info.rs` hashing helpers, generalized into
//! the full Path Resolver contract: stateless except for the cached root and
//! repository id, both computed once at construction, safe for shared reads.

use crate::error::{IndexError, IndexResult};
use crate::repository::RepositoryId;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// A repo-relative path, always stored in POSIX form, never escaping the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelativePath(String);

impl RelativePath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RelativePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct PathResolver {
    root: PathBuf,
    repository_id: RepositoryId,
}

impl PathResolver {
    /// Construct a resolver rooted at `root` (canonicalized here, once).
    pub fn new(root: impl AsRef<Path>, remote_url: Option<&str>) -> IndexResult<Self> {
        let root = root
            .as_ref()
            .canonicalize()
            .map_err(|source| IndexError::FileRead {
                path: root.as_ref().to_path_buf(),
                source,
            })?;

        let repository_id = match remote_url {
            Some(url) => RepositoryId::from_remote_url(url),
            None => RepositoryId::from_path(&root),
        };

        Ok(Self { root, repository_id })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn repository_id(&self) -> &RepositoryId {
        &self.repository_id
    }

    /// Convert an absolute path to a repo-relative, POSIX-form path.
    pub fn normalize(&self, absolute: impl AsRef<Path>) -> IndexResult<RelativePath> {
        let absolute = absolute.as_ref();
        let candidate = if absolute.is_absolute() {
            absolute.to_path_buf()
        } else {
            self.root.join(absolute)
        };

        let relative = candidate
            .strip_prefix(&self.root)
            .map_err(|_| IndexError::OutsideRepository {
                path: absolute.to_path_buf(),
                root: self.root.clone(),
            })?;

        let mut posix_parts = Vec::new();
        for component in relative.components() {
            match component {
                std::path::Component::Normal(part) => {
                    posix_parts.push(part.to_string_lossy().into_owned())
                }
                std::path::Component::ParentDir => {
                    return Err(IndexError::OutsideRepository {
                        path: absolute.to_path_buf(),
                        root: self.root.clone(),
                    })
                }
                _ => {}
            }
        }

        Ok(RelativePath(posix_parts.join("/")))
    }

    /// Convert a repo-relative path back to an absolute path.
    pub fn resolve(&self, relative: &RelativePath) -> PathBuf {
        let mut path = self.root.clone();
        for part in relative.0.split('/') {
            path.push(part);
        }
        path
    }

    /// Compute the SHA-256 content hash of a file, streamed in fixed-size chunks.
    pub fn content_hash(&self, path: impl AsRef<Path>) -> IndexResult<String> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| IndexError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 64 * 1024];

        loop {
            let read = reader
                .read(&mut buf)
                .map_err(|source| IndexError::FileRead {
                    path: path.to_path_buf(),
                    source,
                })?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }

        let digest = hasher.finalize();
        Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Compute the SHA-256 content hash of in-memory bytes (no filesystem access).
    pub fn content_hash_bytes(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn round_trip_path_within_root() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), b"fn main() {}").unwrap();

        let resolver = PathResolver::new(dir.path(), None).unwrap();
        let absolute = dir.path().canonicalize().unwrap().join("src/lib.rs");

        let relative = resolver.normalize(&absolute).unwrap();
        assert_eq!(relative.as_str(), "src/lib.rs");
        assert!(!relative.as_str().starts_with('/'));

        let resolved = resolver.resolve(&relative);
        assert_eq!(resolved, absolute);
    }

    #[test]
    fn normalize_rejects_paths_outside_root() {
        let dir = TempDir::new().unwrap();
        let resolver = PathResolver::new(dir.path(), None).unwrap();
        let outside = PathBuf::from("/definitely/not/in/the/repo");

        let err = resolver.normalize(&outside).unwrap_err();
        assert!(matches!(err, IndexError::OutsideRepository { .. }));
    }

    #[test]
    fn content_hash_is_stable_and_sensitive_to_single_byte() {
        let dir = TempDir::new().unwrap();
        let path_a = dir.path().join("a.txt");
        let path_b = dir.path().join("b.txt");
        std::fs::write(&path_a, b"hello world").unwrap();
        std::fs::write(&path_b, b"hello worle").unwrap();

        let resolver = PathResolver::new(dir.path(), None).unwrap();
        let hash_a1 = resolver.content_hash(&path_a).unwrap();
        let hash_a2 = resolver.content_hash(&path_a).unwrap();
        let hash_b = resolver.content_hash(&path_b).unwrap();

        assert_eq!(hash_a1, hash_a2);
        assert_ne!(hash_a1, hash_b);
        assert_eq!(hash_a1.len(), 64);
    }

    #[test]
    fn repository_id_prefers_remote_url() {
        let dir = TempDir::new().unwrap();
        let resolver =
            PathResolver::new(dir.path(), Some("https://example.com/repo.git")).unwrap();
        assert_eq!(
            *resolver.repository_id(),
            RepositoryId::from_remote_url("https://example.com/repo.git")
        );
    }
}

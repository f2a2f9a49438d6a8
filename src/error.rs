//! Error types for the indexing and query engine.
//!
//! Structured error types using thiserror, one enum per subsystem, with
//! actionable recovery suggestions on the top-level `IndexError`.

use crate::types::{FileId, SymbolId};
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for indexing operations.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {language} file '{path}': {reason}")]
    ParseError {
        path: PathBuf,
        language: String,
        reason: String,
    },

    /// No extractor claimed the path; it is still indexed as plain text for FTS.
    #[error("No extractor supports '{path}' (extension '{extension}'); indexing as plain text")]
    Unsupported { path: PathBuf, extension: String },

    #[error("Failed to persist index to '{path}': {source}")]
    PersistenceError {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to load index from '{path}': {source}")]
    LoadError {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Symbol '{name}' not found")]
    SymbolNotFound { name: String },

    #[error("File ID {id:?} not found in index. The file may have been removed or not indexed.")]
    FileNotFound { id: FileId },

    #[error("Failed to create file ID: maximum file count reached")]
    FileIdExhausted,

    #[error("Failed to create symbol ID: maximum symbol count reached")]
    SymbolIdExhausted,

    #[error("Invalid configuration: {reason}")]
    ConfigError { reason: String },

    #[error("Tantivy operation failed during {operation}: {cause}")]
    TantivyError { operation: String, cause: String },

    #[error("Transaction failed after operations: {operations:?}. Cause: {cause}")]
    TransactionFailed {
        operations: Vec<String>,
        cause: String,
    },

    #[error("Internal mutex was poisoned, likely due to a panic in another thread")]
    MutexPoisoned,

    #[error("Index appears to be corrupted: {reason}")]
    IndexCorrupted { reason: String },

    /// An extractor or per-repo task exceeded its budget and was abandoned.
    #[error("Operation '{operation}' timed out after {budget_ms}ms")]
    Timeout { operation: String, budget_ms: u64 },

    /// Extractor could not be constructed under the registry's memory budget.
    #[error("Could not load extractor for '{language}' within the {budget_bytes} byte memory budget")]
    MemoryBudget { language: String, budget_bytes: u64 },

    /// Path normalization refused a path outside the repository root.
    #[error("Path '{path}' is outside repository root '{root}'")]
    OutsideRepository { path: PathBuf, root: PathBuf },

    #[error("{0}")]
    General(String),
}

impl IndexError {
    /// Get recovery suggestions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::TantivyError { .. } => vec![
                "Try a forced reindex to rebuild the full-text index",
                "Check disk space and permissions in the index directory",
            ],
            Self::TransactionFailed { .. } => vec![
                "The operation was rolled back, the index is in a consistent state",
                "Retry the operation; it may succeed since stores retry once on conflict",
            ],
            Self::MutexPoisoned => vec![
                "Restart the process to clear the poisoned state",
                "If the problem persists, force a full reindex",
            ],
            Self::IndexCorrupted { .. } => vec![
                "Force a full reindex to rebuild from scratch",
                "Check for disk errors or filesystem corruption",
            ],
            Self::LoadError { .. } | Self::PersistenceError { .. } => vec![
                "The index can be rebuilt from the content on next start",
            ],
            Self::FileRead { .. } => vec![
                "Check that the file exists and is readable",
                "Ensure the file is not locked by another process",
            ],
            Self::MemoryBudget { .. } => vec![
                "Raise max_memory_bytes or add the language to priority_languages",
            ],
            Self::Timeout { .. } => vec![
                "The extractor was marked degraded; it will be retried after the cooldown",
            ],
            _ => vec![],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ParseError { .. }
                | Self::Unsupported { .. }
                | Self::Timeout { .. }
                | Self::FileRead { .. }
                | Self::FileWrite { .. }
        )
    }
}

/// Errors specific to extraction/parsing operations.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to initialize {language} extractor: {reason}")]
    ExtractorInit { language: String, reason: String },

    #[error("Failed to parse code at line {line}, column {column}: {reason}")]
    SyntaxError {
        line: u32,
        column: u32,
        reason: String,
    },

    #[error("Invalid UTF-8 in source file")]
    InvalidUtf8,
}

/// Errors specific to storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Tantivy index error: {0}")]
    TantivyError(#[from] tantivy::TantivyError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] bincode::Error),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Document not found for symbol {id:?}")]
    DocumentNotFound { id: SymbolId },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors specific to the file watcher.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Watch path '{path}' does not exist")]
    PathMissing { path: PathBuf },

    #[error("Underlying filesystem notification error: {0}")]
    Notify(#[from] notify::Error),

    #[error("Watcher event queue overflowed; duplicate events were coalesced")]
    QueueOverflow,
}

/// Errors specific to index discovery.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("No index found for repository '{repo_id}'; attempted: {attempted:?}")]
    IndexNotFound {
        repo_id: String,
        attempted: Vec<PathBuf>,
    },

    #[error("IO error while discovering index: {0}")]
    Io(#[from] std::io::Error),
}

pub type IndexResult<T> = Result<T, IndexError>;
pub type ParseResult<T> = Result<T, ParseError>;
pub type StorageResult<T> = Result<T, StorageError>;
pub type WatchResult<T> = Result<T, WatchError>;
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Helper trait for adding context to errors.
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> Result<T, IndexError>;
    fn with_path(self, path: &std::path::Path) -> Result<T, IndexError>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: &str) -> Result<T, IndexError> {
        self.map_err(|e| IndexError::General(format!("{}: {}", msg, e)))
    }

    fn with_path(self, path: &std::path::Path) -> Result<T, IndexError> {
        self.map_err(|e| {
            IndexError::General(format!("Error processing '{}': {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_errors_are_flagged() {
        let err = IndexError::Timeout {
            operation: "lookup".into(),
            budget_ms: 5000,
        };
        assert!(err.is_recoverable());

        let err = IndexError::MutexPoisoned;
        assert!(!err.is_recoverable());
    }

    #[test]
    fn memory_budget_has_recovery_suggestion() {
        let err = IndexError::MemoryBudget {
            language: "python".into(),
            budget_bytes: 1024,
        };
        assert!(!err.recovery_suggestions().is_empty());
    }
}

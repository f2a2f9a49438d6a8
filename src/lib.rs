//! Multi-language source-code indexing and query engine: symbol
//! extraction, full-text and trigram search, file-watcher-driven
//! incremental indexing, centralized per-repository storage, multi-repo
//! coordination, and optional semantic search.

pub mod config;
pub mod coordinator;
pub mod discovery;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod indexing;
pub mod logging;
pub mod path_resolver;
pub mod repository;
pub mod semantic;
pub mod storage;
pub mod symbol;
pub mod types;
pub mod watcher;

pub use config::Settings;
pub use engine::{CodeIntelligenceEngine, EngineStatus, ExtractorInfo, ReindexReport, SymbolRecord};
pub use error::{DiscoveryError, IndexError, IndexResult, ParseError, StorageError, WatchError};
pub use path_resolver::{PathResolver, RelativePath};
pub use repository::{Repository, RepositoryId};
pub use symbol::{Embedding, MoveHistoryEntry, MoveKind, Reference, Symbol, TrigramEntry};
pub use types::{CompactString, FileId, IdCounter, Range, ReferenceKind, SymbolId, SymbolKind};

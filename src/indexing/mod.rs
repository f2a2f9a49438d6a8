//! Incremental Indexer: turns filesystem change events into Index Store
//! commits, one file at a time, with bounded retry and worker-pool
//! parallelism across distinct paths.

mod incremental;
mod state;

pub use incremental::{retry_delay, FileEvent, IncrementalIndexer};
pub use state::FileState;

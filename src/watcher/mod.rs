//! File Watcher: routes filesystem notifications into the Incremental
//! Indexer, debouncing modifications and handling deletions immediately.
//!
//! Grounded on the teacher's `watcher/unified.rs`, de-async'd: the
//! `tokio::select!` loop over an mpsc receiver and a sleep timer becomes a
//! `crossbeam_channel::select!` loop over a `notify` channel and a tick.

pub mod debouncer;

use crate::error::{WatchError, WatchResult};
use crate::indexing::{FileEvent, IncrementalIndexer};
use crate::path_resolver::PathResolver;
use debouncer::Debouncer;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct FileWatcher {
    indexer: Arc<IncrementalIndexer>,
    resolver: Arc<PathResolver>,
    debouncer: Mutex<Debouncer>,
    event_rx: crossbeam_channel::Receiver<notify::Result<Event>>,
    _watcher: notify::RecommendedWatcher,
    watch_roots: Vec<PathBuf>,
}

impl FileWatcher {
    pub fn builder() -> FileWatcherBuilder {
        FileWatcherBuilder::new()
    }

    /// Run the watch loop until `stop` is set. Debounced modifications are
    /// dispatched to the indexer every `POLL_INTERVAL` tick; deletions and
    /// renames are dispatched as soon as `notify` reports them.
    pub fn run_until(&self, stop: &AtomicBool) -> WatchResult<()> {
        let ticker = crossbeam_channel::tick(POLL_INTERVAL);

        while !stop.load(Ordering::Relaxed) {
            crossbeam_channel::select! {
                recv(self.event_rx) -> msg => {
                    match msg {
                        Ok(Ok(event)) => self.handle_notify_event(event),
                        Ok(Err(err)) => {
                            tracing::error!(error = %err, "watcher notification error");
                        }
                        Err(_) => break,
                    }
                }
                recv(ticker) -> _ => {
                    let ready = self.debouncer.lock().take_ready();
                    for path in ready {
                        self.process_modification(&path);
                    }
                }
            }
        }
        Ok(())
    }

    /// Run the watch loop forever (never returns under normal operation).
    pub fn run(&self) -> WatchResult<()> {
        self.run_until(&AtomicBool::new(false))
    }

    fn watch_directory(&mut self, dir: &std::path::Path) -> WatchResult<()> {
        if !dir.exists() {
            return Err(WatchError::PathMissing {
                path: dir.to_path_buf(),
            });
        }
        self._watcher.watch(dir, RecursiveMode::Recursive)?;
        Ok(())
    }

    fn handle_notify_event(&self, event: Event) {
        for path in event.paths {
            match event.kind {
                EventKind::Modify(_) | EventKind::Create(_) => {
                    self.debouncer.lock().record(path);
                }
                EventKind::Remove(_) => {
                    self.debouncer.lock().remove(&path);
                    self.process_deletion(&path);
                }
                _ => {}
            }
        }
    }

    fn process_modification(&self, path: &std::path::Path) {
        if !path.exists() {
            self.process_deletion(path);
            return;
        }
        if let Err(err) = self
            .indexer
            .handle_event(FileEvent::Modified(path.to_path_buf()))
        {
            tracing::error!(path = %path.display(), error = %err, "reindex on modification failed");
        }
    }

    fn process_deletion(&self, path: &std::path::Path) {
        if let Err(err) = self
            .indexer
            .handle_event(FileEvent::Deleted(path.to_path_buf()))
        {
            tracing::error!(path = %path.display(), error = %err, "deindex on deletion failed");
        }
    }
}

pub struct FileWatcherBuilder {
    indexer: Option<Arc<IncrementalIndexer>>,
    resolver: Option<Arc<PathResolver>>,
    debounce_ms: u64,
    watch_roots: Vec<PathBuf>,
}

impl FileWatcherBuilder {
    pub fn new() -> Self {
        Self {
            indexer: None,
            resolver: None,
            debounce_ms: 250,
            watch_roots: Vec::new(),
        }
    }

    pub fn indexer(mut self, indexer: Arc<IncrementalIndexer>) -> Self {
        self.indexer = Some(indexer);
        self
    }

    pub fn resolver(mut self, resolver: Arc<PathResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    pub fn watch_root(mut self, root: PathBuf) -> Self {
        self.watch_roots.push(root);
        self
    }

    pub fn build(self) -> WatchResult<FileWatcher> {
        let indexer = self
            .indexer
            .ok_or_else(|| WatchError::PathMissing { path: PathBuf::from("<indexer>") })?;
        let resolver = self
            .resolver
            .ok_or_else(|| WatchError::PathMissing { path: PathBuf::from("<resolver>") })?;

        let (tx, rx) = crossbeam_channel::bounded(256);
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if tx.try_send(res).is_err() {
                tracing::warn!("watcher event queue overflowed; event dropped");
            }
        })?;

        let mut file_watcher = FileWatcher {
            indexer,
            resolver,
            debouncer: Mutex::new(Debouncer::new(self.debounce_ms)),
            event_rx: rx,
            _watcher: watcher,
            watch_roots: self.watch_roots.clone(),
        };

        for root in &self.watch_roots {
            file_watcher.watch_directory(root)?;
        }

        Ok(file_watcher)
    }
}

impl Default for FileWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

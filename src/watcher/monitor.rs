use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, select};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::events::{PathEvent, translate};
use crate::error::{LocatorError, Result};
use crate::indexer::{IndexOutcome, Indexer};
use crate::utils::absolute_path;

/// Events buffered between the notify callback and the writer thread
const CHANNEL_CAPACITY: usize = 4096;

/// Counters for the event loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    pub events_processed: u64,
    pub event_failures: u64,
}

#[derive(Default)]
struct Counters {
    processed: AtomicU64,
    failures: AtomicU64,
}

struct Active {
    watcher: RecommendedWatcher,
    stop_tx: Sender<()>,
    worker: JoinHandle<()>,
    roots: Vec<PathBuf>,
}

/// Keeps the index in sync with watched directory trees
///
/// The notify callback only translates and forwards events; a single writer thread
/// owns every resulting store write.
pub struct Monitor {
    indexer: Arc<Indexer>,
    active: Mutex<Option<Active>>,
    counters: Arc<Counters>,
}

impl Monitor {
    pub fn new(indexer: Arc<Indexer>) -> Self {
        Self { indexer, active: Mutex::new(None), counters: Arc::new(Counters::default()) }
    }

    /// Starts watching `paths` recursively
    ///
    /// Calling this while already running is a no-op.
    ///
    /// # Errors
    ///
    /// [`LocatorError::Validation`] when no path is given or one does not exist, and
    /// [`LocatorError::Watcher`] when the platform watcher cannot be registered.
    pub fn start(&self, paths: &[PathBuf]) -> Result<()> {
        let mut active = self.active.lock();
        if active.is_some() {
            debug!("Monitoring already running");
            return Ok(());
        }
        if paths.is_empty() {
            return Err(LocatorError::Validation("No paths given to monitor".to_string()));
        }

        let roots = paths.iter().map(|path| absolute_path(path)).collect::<Result<Vec<_>>>()?;
        if let Some(missing) = roots.iter().find(|root| !root.is_dir()) {
            return Err(LocatorError::Validation(format!(
                "Cannot monitor missing directory: {}",
                missing.display()
            )));
        }

        let (event_tx, event_rx) = crossbeam_channel::bounded::<PathEvent>(CHANNEL_CAPACITY);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);

        let mut watcher =
            notify::recommended_watcher(move |event_result: notify::Result<Event>| {
                match event_result {
                    Ok(event) => {
                        for path_event in translate(&event) {
                            if event_tx.send(path_event).is_err() {
                                break;
                            }
                        }
                    }
                    Err(error) => warn!("Watcher error: {}", error),
                }
            })?;
        for root in &roots {
            watcher.watch(root, RecursiveMode::Recursive)?;
        }

        let indexer = Arc::clone(&self.indexer);
        let counters = Arc::clone(&self.counters);
        let worker_roots = roots.clone();
        let worker = thread::Builder::new()
            .name("findex-watcher".to_string())
            .spawn(move || run_writer(&indexer, &worker_roots, &event_rx, &stop_rx, &counters))
            .map_err(|e| LocatorError::Io { path: roots[0].clone(), source: e })?;

        info!("Monitoring {} path(s)", roots.len());
        *active = Some(Active { watcher, stop_tx, worker, roots });
        Ok(())
    }

    /// Stops watching and waits for the writer thread to finish
    ///
    /// Events already queued are applied first. Safe to call when not running.
    pub fn stop(&self) {
        let Some(active) = self.active.lock().take() else {
            return;
        };
        let Active { watcher, stop_tx, worker, roots } = active;

        drop(watcher);
        drop(stop_tx);
        if worker.join().is_err() {
            warn!("Watcher thread panicked");
        }
        info!("Stopped monitoring {} path(s)", roots.len());
    }

    pub fn is_running(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Directories currently watched
    pub fn roots(&self) -> Vec<PathBuf> {
        self.active.lock().as_ref().map(|active| active.roots.clone()).unwrap_or_default()
    }

    pub fn stats(&self) -> MonitorStats {
        MonitorStats {
            events_processed: self.counters.processed.load(Ordering::Relaxed),
            event_failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_writer(
    indexer: &Indexer,
    roots: &[PathBuf],
    events: &Receiver<PathEvent>,
    stop: &Receiver<()>,
    counters: &Counters,
) {
    loop {
        select! {
            recv(events) -> event => match event {
                Ok(event) => handle(indexer, roots, &event, counters),
                Err(_) => break,
            },
            recv(stop) -> _ => {
                while let Ok(event) = events.try_recv() {
                    handle(indexer, roots, &event, counters);
                }
                break;
            }
        }
    }
    debug!("Watcher thread exiting");
}

fn handle(indexer: &Indexer, roots: &[PathBuf], event: &PathEvent, counters: &Counters) {
    counters.processed.fetch_add(1, Ordering::Relaxed);
    if let Err(e) = apply_event(indexer, roots, event) {
        counters.failures.fetch_add(1, Ordering::Relaxed);
        warn!("Failed to apply {} event for {}: {}", event.kind(), event.path().display(), e);
    }
}

/// Applies one filesystem change to the index
pub(crate) fn apply_event(indexer: &Indexer, roots: &[PathBuf], event: &PathEvent) -> Result<()> {
    match event {
        PathEvent::Created(path) => {
            if admitted(indexer, roots, path) {
                if path.is_dir() {
                    indexer.index_tree(path)?;
                } else {
                    reindex(indexer, path)?;
                }
            }
        }
        PathEvent::Modified(path) => {
            if admitted(indexer, roots, path) {
                reindex(indexer, path)?;
            }
        }
        PathEvent::Moved { from, to } => {
            let removed = indexer.store().remove_tree(from)?;
            debug!("Moved {} -> {} ({} record(s) dropped)", from.display(), to.display(), removed);
            if admitted(indexer, roots, to) {
                indexer.index_tree(to)?;
            }
        }
        PathEvent::Deleted(path) => {
            let removed = indexer.store().remove_tree(path)?;
            debug!("Removed {} record(s) under {}", removed, path.display());
        }
    }
    Ok(())
}

/// Re-indexes a single path, treating a vanished path as a delete
fn reindex(indexer: &Indexer, path: &Path) -> Result<()> {
    match indexer.index_path(path) {
        Ok(IndexOutcome::Indexed(_)) => Ok(()),
        Ok(outcome) => {
            debug!("Event for {} not indexed: {:?}", path.display(), outcome);
            Ok(())
        }
        Err(LocatorError::NotFound(_)) => {
            indexer.store().remove_tree(path)?;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Exclusion check relative to the watched root containing `path`
fn admitted(indexer: &Indexer, roots: &[PathBuf], path: &Path) -> bool {
    let is_directory = path.is_dir();
    match roots.iter().find(|root| path.starts_with(root)) {
        Some(root) => !indexer.policy().excludes_under(root, path, is_directory),
        None => !indexer.policy().excludes(path, is_directory),
    }
}

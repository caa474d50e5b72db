//! Turns filesystem entries into stored records.
//!
//! # Error Handling Strategy
//!
//! Directory walks degrade gracefully:
//!
//! - **Entry-level errors**: unreadable entries, vanished files and non-UTF-8 paths are
//!   logged with `warn!`, counted in [`IndexSummary::skipped`] and the walk continues.
//! - **Storage errors**: a failed commit aborts the walk and propagates, since every
//!   later commit would hit the same database.
//! - **Cancellation**: foreground walks check the cancel flag before every entry; already
//!   prepared entries are committed and the summary is flagged `cancelled`. Subtree walks
//!   started by the watcher ([`Indexer::index_tree`]) never read the flag.

use std::collections::BTreeSet;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::exclusion::{ExclusionPolicy, ExclusionReason};
use super::keywords::extract_keywords;
use crate::error::{LocatorError, Result};
use crate::index_storage::Store;
use crate::models::{FileRecord, RecordId};
use crate::utils::{absolute_path, path_key};

/// Entries prepared in parallel before one commit
const BATCH_SIZE: usize = 256;

/// Progress is reported every this many indexed entries
pub const PROGRESS_INTERVAL: usize = 100;

/// Result of indexing a single path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    Indexed(RecordId),
    Excluded(ExclusionReason),
    /// A directory while `index_directories` is off
    DirectorySkipped,
}

/// Totals for one directory walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub indexed: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

impl IndexSummary {
    fn absorb(&mut self, other: IndexSummary) {
        self.indexed += other.indexed;
        self.skipped += other.skipped;
        self.cancelled |= other.cancelled;
    }
}

/// Snapshot handed to progress callbacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Entries indexed so far in this walk
    pub count: usize,
    /// Entry just indexed, or the walk root on the final call
    pub path: PathBuf,
    pub finished: bool,
}

type Prepared = (FileRecord, BTreeSet<String>);

/// Converts paths into records and commits them to the [`Store`]
pub struct Indexer {
    store: Arc<Store>,
    policy: ExclusionPolicy,
    cancel: Arc<AtomicBool>,
}

impl Indexer {
    pub fn new(store: Arc<Store>, policy: ExclusionPolicy) -> Self {
        Self { store, policy, cancel: Arc::new(AtomicBool::new(false)) }
    }

    pub fn policy(&self) -> &ExclusionPolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Flag that stops a running foreground walk at the next entry when set
    ///
    /// [`Self::index_directory`] and [`Self::rebuild`] clear the flag when they start.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Indexes one file or directory (never descending into it)
    ///
    /// # Errors
    ///
    /// [`LocatorError::NotFound`] when the path does not exist,
    /// [`LocatorError::Validation`] for non-UTF-8 paths, and storage errors.
    pub fn index_path(&self, path: &Path) -> Result<IndexOutcome> {
        let path = absolute_path(path)?;
        let metadata = fs::metadata(&path).map_err(|e| LocatorError::from_io(&path, e))?;

        if let Some(reason) = self.policy.exclusion_reason(&path, metadata.is_dir()) {
            debug!("Not indexing {} ({})", path.display(), reason);
            return Ok(IndexOutcome::Excluded(reason));
        }
        if metadata.is_dir() && !self.policy.index_directories() {
            return Ok(IndexOutcome::DirectorySkipped);
        }

        let record = build_record(&path, &metadata)?;
        let keywords = extract_keywords(&path);
        let id = self.store.upsert_record(&record, &keywords)?;
        debug!("Indexed {}", path.display());
        Ok(IndexOutcome::Indexed(id))
    }

    /// Indexes the entries below `root`: immediate children, or the whole tree when
    /// `recursive` is set
    ///
    /// The root itself is not recorded. Excluded directories are pruned, so nothing
    /// below them is visited.
    ///
    /// # Errors
    ///
    /// [`LocatorError::Validation`] when `root` is missing or not a directory, and
    /// storage errors.
    pub fn index_directory(
        &self,
        root: &Path,
        recursive: bool,
        progress: &mut dyn FnMut(&Progress),
    ) -> Result<IndexSummary> {
        let root = directory_root(root)?;
        self.cancel.store(false, Ordering::SeqCst);
        self.walk(&root, recursive, Some(&self.cancel), progress)
    }

    fn walk(
        &self,
        root: &Path,
        recursive: bool,
        cancel: Option<&AtomicBool>,
        progress: &mut dyn FnMut(&Progress),
    ) -> Result<IndexSummary> {
        info!("Indexing {} ({})", root.display(), if recursive { "recursive" } else { "flat" });

        let max_depth = if recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(root).min_depth(1).max_depth(max_depth).into_iter();
        let walker = walker.filter_entry(|entry| {
            entry.depth() == 0 || !self.policy.excludes(entry.path(), entry.file_type().is_dir())
        });

        let mut summary = IndexSummary::default();
        let mut batch: Vec<PathBuf> = Vec::with_capacity(BATCH_SIZE);

        for entry in walker {
            if cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
                summary.cancelled = true;
                break;
            }

            match entry {
                Ok(entry) => {
                    if entry.file_type().is_dir() && !self.policy.index_directories() {
                        continue;
                    }
                    batch.push(entry.into_path());
                }
                Err(e) => {
                    let path = e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                    let error = LocatorError::from_io(&path, io::Error::from(e));
                    skip_entry(&mut summary, &path, error)?;
                    continue;
                }
            }

            if batch.len() >= BATCH_SIZE {
                self.commit_batch(&mut batch, &mut summary, progress)?;
            }
        }
        self.commit_batch(&mut batch, &mut summary, progress)?;

        progress(&Progress { count: summary.indexed, path: root.to_path_buf(), finished: true });
        info!(
            "Indexed {} entries under {} ({} skipped{})",
            summary.indexed,
            root.display(),
            summary.skipped,
            if summary.cancelled { ", cancelled" } else { "" }
        );
        Ok(summary)
    }

    /// Indexes `path` and, for a directory, everything below it
    ///
    /// Runs to completion regardless of [`Self::cancel_handle`], which belongs to
    /// foreground walks.
    pub fn index_tree(&self, path: &Path) -> Result<IndexSummary> {
        let outcome = self.index_path(path)?;
        let mut summary = IndexSummary {
            indexed: usize::from(matches!(outcome, IndexOutcome::Indexed(_))),
            ..IndexSummary::default()
        };

        let descend = !matches!(outcome, IndexOutcome::Excluded(_));
        if descend && path.is_dir() {
            let root = directory_root(path)?;
            summary.absorb(self.walk(&root, true, None, &mut |_| {})?);
        }
        Ok(summary)
    }

    /// Clears the store and re-indexes every root recursively
    ///
    /// All roots are checked before anything is deleted, so a typo leaves the
    /// existing index untouched.
    pub fn rebuild(
        &self,
        roots: &[PathBuf],
        progress: &mut dyn FnMut(&Progress),
    ) -> Result<IndexSummary> {
        if roots.is_empty() {
            return Err(LocatorError::Validation("No paths given to rebuild".to_string()));
        }
        let roots = roots.iter().map(|root| directory_root(root)).collect::<Result<Vec<_>>>()?;

        info!("Rebuilding index from {} root(s)", roots.len());
        self.store.clear_all()?;
        self.cancel.store(false, Ordering::SeqCst);

        let mut total = IndexSummary::default();
        for root in &roots {
            total.absorb(self.walk(root, true, Some(&self.cancel), progress)?);
            if total.cancelled {
                break;
            }
        }
        info!("Rebuild finished: {} entries indexed", total.indexed);
        Ok(total)
    }

    fn commit_batch(
        &self,
        batch: &mut Vec<PathBuf>,
        summary: &mut IndexSummary,
        progress: &mut dyn FnMut(&Progress),
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let prepared: Vec<Result<Prepared>> = batch.par_iter().map(|path| prepare(path)).collect();

        let mut ready = Vec::with_capacity(prepared.len());
        for (path, item) in batch.iter().zip(prepared) {
            match item {
                Ok(item) => ready.push(item),
                Err(e) => skip_entry(summary, path, e)?,
            }
        }

        self.store.upsert_batch(&ready)?;

        for (record, _) in &ready {
            summary.indexed += 1;
            if summary.indexed % PROGRESS_INTERVAL == 0 {
                progress(&Progress {
                    count: summary.indexed,
                    path: record.path.clone(),
                    finished: false,
                });
            }
        }

        batch.clear();
        Ok(())
    }
}

/// Absolute form of a walk root, which must be an existing directory
fn directory_root(root: &Path) -> Result<PathBuf> {
    let root = absolute_path(root)?;
    match fs::metadata(&root) {
        Ok(metadata) if metadata.is_dir() => Ok(root),
        Ok(_) => Err(LocatorError::Validation(format!("Not a directory: {}", root.display()))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(LocatorError::Validation(format!(
            "Path does not exist: {}",
            root.display()
        ))),
        Err(e) => Err(LocatorError::from_io(&root, e)),
    }
}

/// Counts a per-entry failure, or hands it back when the walk cannot recover
fn skip_entry(summary: &mut IndexSummary, path: &Path, error: LocatorError) -> Result<()> {
    if !error.is_skippable() {
        return Err(error);
    }
    summary.skipped += 1;
    warn!("Skipping {}: {}", path.display(), error);
    Ok(())
}

fn prepare(path: &Path) -> Result<Prepared> {
    let metadata = fs::symlink_metadata(path).map_err(|e| LocatorError::from_io(path, e))?;
    let record = build_record(path, &metadata)?;
    let keywords = extract_keywords(path);
    Ok((record, keywords))
}

fn build_record(path: &Path, metadata: &Metadata) -> Result<FileRecord> {
    path_key(path)?;

    let is_directory = metadata.is_dir();
    let mut record = FileRecord::new(path, is_directory);
    record.size = if is_directory { None } else { Some(metadata.len()) };
    record.created_time = metadata.created().ok().map(DateTime::<Utc>::from);
    record.modified_time = metadata.modified().ok().map(DateTime::<Utc>::from);
    Ok(record)
}

//! Translation of raw `notify` events into index operations

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};

/// A filesystem change the index writer knows how to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Moved { from: PathBuf, to: PathBuf },
    Deleted(PathBuf),
}

impl PathEvent {
    /// The path whose record changes (the destination for moves)
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(path) | Self::Modified(path) | Self::Deleted(path) => path,
            Self::Moved { to, .. } => to,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Modified(_) => "modified",
            Self::Moved { .. } => "moved",
            Self::Deleted(_) => "deleted",
        }
    }
}

/// Maps one notify event to zero or more path events
///
/// Access events are dropped. Rename halves become a delete (source) or a create
/// (destination); renames without a usable mode are resolved by checking whether
/// the path still exists. An existing directory becomes a create so its contents are
/// picked up too.
pub fn translate(event: &Event) -> Vec<PathEvent> {
    let paths = &event.paths;

    match event.kind {
        EventKind::Access(_) => Vec::new(),
        EventKind::Create(_) => paths.iter().cloned().map(PathEvent::Created).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() >= 2 => {
            vec![PathEvent::Moved { from: paths[0].clone(), to: paths[1].clone() }]
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            paths.iter().cloned().map(PathEvent::Deleted).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            paths.iter().cloned().map(PathEvent::Created).collect()
        }
        EventKind::Modify(ModifyKind::Name(_)) | EventKind::Any | EventKind::Other => {
            paths.iter().map(|path| by_existence(path)).collect()
        }
        EventKind::Modify(_) => paths.iter().cloned().map(PathEvent::Modified).collect(),
        EventKind::Remove(_) => paths.iter().cloned().map(PathEvent::Deleted).collect(),
    }
}

fn by_existence(path: &Path) -> PathEvent {
    if path.is_dir() {
        PathEvent::Created(path.to_path_buf())
    } else if path.exists() {
        PathEvent::Modified(path.to_path_buf())
    } else {
        PathEvent::Deleted(path.to_path_buf())
    }
}

//! Filesystem notifications turned into [`FileChangeEvent`]s.

use std::{
    io,
    path::{Component, Path, PathBuf},
    sync::mpsc,
};

use log::{debug, warn};
use notify::{
    Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _,
    event::{ModifyKind, RenameMode},
};
use thiserror::Error;

use crate::{
    protocol::{ChangeKind, FileChangeEvent},
    tree::is_hidden,
};

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("cannot watch {path}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("file watcher failed: {0}")]
    Notify(#[from] notify::Error),
}

/// Recursive watcher over a root directory. Dropping it stops the watch.
pub struct FileWatcher {
    root: PathBuf,
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Start watching `root`; events are sent to `tx` with root-relative
    /// paths. Hidden paths are never reported.
    pub fn new(root: &Path, tx: mpsc::Sender<FileChangeEvent>) -> Result<Self, WatchError> {
        let root = root.canonicalize().map_err(|source| WatchError::Root {
            path: root.to_path_buf(),
            source,
        })?;

        let event_root = root.clone();
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    for change in translate(&event_root, &event) {
                        debug!("file change: {change:?}");
                        if tx.send(change).is_err() {
                            // Receiver gone; the session is closing.
                            return;
                        }
                    }
                }
                Err(err) => warn!("file watcher error: {err}"),
            }
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok(Self {
            root,
            _watcher: watcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Map one OS event onto zero or more change events.
///
/// Replacing a file by renaming another onto it (how most editors and our own
/// store save) is reported as a modification of the destination.
pub(crate) fn translate(root: &Path, event: &Event) -> Vec<FileChangeEvent> {
    let kinds: Vec<(ChangeKind, &PathBuf)> = match event.kind {
        EventKind::Create(_) => tagged(ChangeKind::Created, &event.paths),
        EventKind::Remove(_) => tagged(ChangeKind::Deleted, &event.paths),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            tagged(ChangeKind::Modified, &event.paths)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut kinds = Vec::new();
            if let [from, to, ..] = event.paths.as_slice() {
                kinds.push((ChangeKind::Renamed, from));
                kinds.push((ChangeKind::Modified, to));
            }
            kinds
        }
        EventKind::Modify(ModifyKind::Name(_)) => tagged(ChangeKind::Renamed, &event.paths),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(_) => tagged(ChangeKind::Modified, &event.paths),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    };

    kinds
        .into_iter()
        .filter_map(|(kind, path)| {
            let rel = relative_path(root, path)?;
            let mut change = FileChangeEvent::new(kind, rel);
            if matches!(event.kind, EventKind::Modify(ModifyKind::Name(_))) {
                change.needs_tree_refresh = true;
            }
            Some(change)
        })
        .collect()
}

fn tagged(kind: ChangeKind, paths: &[PathBuf]) -> Vec<(ChangeKind, &PathBuf)> {
    paths.iter().map(|path| (kind, path)).collect()
}

/// `/`-separated path of `path` below `root`, or `None` when it is outside
/// the root, is the root itself, or has a hidden component.
pub(crate) fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        let Component::Normal(part) = component else {
            return None;
        };
        let part = part.to_string_lossy();
        if is_hidden(&part) {
            return None;
        }
        parts.push(part.into_owned());
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}

//! Directory-backed persistence: the server side of the save and content
//! endpoints, including the stale-write check that produces conflicts.

use std::{
    io,
    path::{Component, Path, PathBuf},
};

use log::{debug, info};
use thiserror::Error;

use crate::{
    MAX_FILE_BYTES, diff,
    disk_io::{atomic_write_utf8, read_stable_utf8},
    protocol::{
        ConflictPayload, STATUS_BAD_REQUEST, STATUS_FORBIDDEN, STATUS_INTERNAL, STATUS_NOT_FOUND,
        SaveReply, SaveRequest, TransportError,
    },
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("directory does not exist: {0}")]
    InvalidRoot(PathBuf),
    #[error("path is required")]
    EmptyPath,
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("{0} is a directory")]
    IsDirectory(String),
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// HTTP status the endpoint answers with for this error.
    pub const fn status(&self) -> u16 {
        match self {
            Self::EmptyPath | Self::IsDirectory(_) => STATUS_BAD_REQUEST,
            Self::AccessDenied(_) => STATUS_FORBIDDEN,
            Self::NotFound(_) => STATUS_NOT_FOUND,
            Self::InvalidRoot(_) | Self::Io { .. } => STATUS_INTERNAL,
        }
    }
}

impl From<StoreError> for TransportError {
    fn from(err: StoreError) -> Self {
        Self::new(Some(err.status()), err.to_string())
    }
}

/// Files under one root directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref();
        match root.canonicalize() {
            Ok(root) if root.is_dir() => Ok(Self { root }),
            _ => Err(StoreError::InvalidRoot(root.to_path_buf())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a request path onto the filesystem, refusing anything that
    /// escapes the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        if path.trim().is_empty() {
            return Err(StoreError::EmptyPath);
        }

        let requested = Path::new(path);
        let joined = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            self.root.join(requested)
        };

        let mut resolved = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if !resolved.pop() {
                        return Err(StoreError::AccessDenied(path.to_owned()));
                    }
                }
                other => resolved.push(other),
            }
        }

        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            Err(StoreError::AccessDenied(path.to_owned()))
        }
    }

    /// Current persisted content of `path`.
    pub fn fetch(&self, path: &str) -> Result<String, StoreError> {
        let target = self.resolve(path)?;
        if target.is_dir() {
            return Err(StoreError::IsDirectory(path.to_owned()));
        }
        read_stable_utf8(&target, MAX_FILE_BYTES).map_err(|source| io_error(path, source))
    }

    /// Write `request.content` unless the file no longer holds
    /// `request.old_content`.
    ///
    /// A missing file counts as empty. A file that already holds exactly the
    /// requested content is accepted as saved.
    pub fn save(&self, request: &SaveRequest) -> Result<SaveReply, StoreError> {
        let target = self.resolve(&request.path)?;
        if target.is_dir() {
            return Err(StoreError::IsDirectory(request.path.clone()));
        }

        let persisted = match read_stable_utf8(&target, MAX_FILE_BYTES) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(source) => return Err(io_error(&request.path, source)),
        };

        if persisted == request.content {
            debug!("{} already holds the submitted content", request.path);
            return Ok(SaveReply::Saved);
        }

        if persisted != request.old_content {
            info!("refusing stale save of {}", request.path);
            return Ok(SaveReply::Conflict(conflict_payload(request, persisted)));
        }

        atomic_write_utf8(&target, &request.content)
            .map_err(|source| io_error(&request.path, source))?;
        info!("saved {} ({} bytes)", request.path, request.content.len());
        Ok(SaveReply::Saved)
    }
}

/// Build the 409 body for a save whose `old_content` is out of date.
pub fn conflict_payload(request: &SaveRequest, persisted: String) -> ConflictPayload {
    ConflictPayload {
        user_diff: diff::unified_diff(&request.path, &request.old_content, &request.content),
        current_diff: diff::unified_diff(&request.path, &request.old_content, &persisted),
        current_content: persisted,
        message: format!(
            "The file {} has been modified by another process. \
             Your changes cannot be saved until you reload the file.",
            request.path
        ),
    }
}

fn io_error(path: &str, source: io::Error) -> StoreError {
    if source.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound(path.to_owned())
    } else {
        StoreError::Io {
            path: path.to_owned(),
            source,
        }
    }
}

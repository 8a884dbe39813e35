//! Wire types shared by the persistence endpoint, the content fetch endpoint
//! and the file-change channel.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_FORBIDDEN: u16 = 403;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_CONFLICT: u16 = 409;
pub const STATUS_INTERNAL: u16 = 500;

/// Body of a save request.
///
/// `old_content` is the content the editor believes is persisted; the
/// endpoint refuses the write when that belief is out of date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub path: String,
    pub content: String,
    pub old_content: String,
}

/// Body of a 409 reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictPayload {
    pub current_content: String,
    pub user_diff: String,
    pub current_diff: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentResponse {
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveReply {
    Saved,
    Conflict(ConflictPayload),
}

/// A save or fetch that failed for a reason other than a conflict.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    /// HTTP-style status, `None` when the request never got a reply.
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Interpret a persistence endpoint reply.
///
/// 2xx is success regardless of body, 409 must carry a [`ConflictPayload`],
/// anything else is a failure named after the status text.
pub fn interpret_save_response(
    status: u16,
    status_text: &str,
    body: &str,
) -> Result<SaveReply, TransportError> {
    match status {
        200..=299 => Ok(SaveReply::Saved),
        STATUS_CONFLICT => serde_json::from_str::<ConflictPayload>(body)
            .map(SaveReply::Conflict)
            .map_err(|err| {
                TransportError::new(Some(status), format!("malformed conflict reply: {err}"))
            }),
        _ => {
            let reason = if status_text.trim().is_empty() {
                format!("status {status}")
            } else {
                status_text.trim().to_owned()
            };
            Err(TransportError::new(
                Some(status),
                format!("Failed to save: {reason}"),
            ))
        }
    }
}

/// Interpret a content fetch reply.
pub fn interpret_content_response(
    status: u16,
    status_text: &str,
    body: &str,
) -> Result<String, TransportError> {
    if !(200..=299).contains(&status) {
        return Err(TransportError::new(
            Some(status),
            format!("Failed to load file content: {}", status_text.trim()),
        ));
    }
    serde_json::from_str::<ContentResponse>(body)
        .map(|reply| reply.content)
        .map_err(|err| TransportError::new(Some(status), format!("malformed content reply: {err}")))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    #[serde(rename = "create")]
    Created,
    #[serde(rename = "modify")]
    Modified,
    #[serde(rename = "delete")]
    Deleted,
    #[serde(rename = "rename")]
    Renamed,
}

/// One message on the file-change channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "file_change", rename_all = "camelCase")]
pub struct FileChangeEvent {
    pub event: ChangeKind,
    pub path: String,
    pub needs_tree_refresh: bool,
}

impl FileChangeEvent {
    pub fn new(event: ChangeKind, path: impl Into<String>) -> Self {
        Self {
            event,
            path: path.into(),
            needs_tree_refresh: event != ChangeKind::Modified,
        }
    }

    /// True when this is a content modification of `path`.
    pub fn modifies(&self, path: &str) -> bool {
        self.event == ChangeKind::Modified && normalize_path(&self.path) == normalize_path(path)
    }
}

fn normalize_path(path: &str) -> &str {
    path.trim_start_matches("./").trim_start_matches('/')
}

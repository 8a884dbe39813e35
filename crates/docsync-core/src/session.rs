//! One open document driven against a [`Backend`].
//!
//! The session owns everything the editor view needs for its lifetime: the
//! backend, the settings and the [`SaveCoordinator`] of the open document.
//! Dropping it (or calling [`EditorSession::close`]) is the unmount.

use std::time::Instant;

use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    backend::Backend,
    coordinator::{
        CoordinatorSettings, DocState, MergeResolution, SaveCoordinator, SaveOutcome, SaveTicket,
        Status,
    },
    preview::PreviewDocument,
    protocol::{FileChangeEvent, TransportError},
    tracker::ExternalChange,
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no document is open")]
    NoDocument,
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: TransportError,
    },
}

/// Re-fetching the open document failed. The session is unchanged.
#[derive(Debug, Error)]
#[error("failed to reload {path}: {source}")]
pub struct ReloadError {
    pub path: String,
    #[source]
    pub source: TransportError,
}

/// How the session reacted to a [`FileChangeEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeResponse {
    /// Not about the open document, or storage still holds what we last
    /// synced (typically our own save echoing back).
    Ignored,
    /// The document had no local edits and now shows the new content.
    Reloaded,
    /// Local edits were kept; the document is flagged as needing a reload.
    NeedsReload,
}

pub struct EditorSession<B> {
    backend: B,
    settings: CoordinatorSettings,
    doc: Option<SaveCoordinator>,
}

impl<B: Backend> EditorSession<B> {
    pub const fn new(backend: B, settings: CoordinatorSettings) -> Self {
        Self {
            backend,
            settings,
            doc: None,
        }
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub const fn document(&self) -> Option<&SaveCoordinator> {
        self.doc.as_ref()
    }

    /// Fetch `path` and make it the open document, replacing any previous
    /// one. On failure the previous document stays open.
    pub fn open(&mut self, path: &str) -> Result<&SaveCoordinator, SessionError> {
        let content = self
            .backend
            .fetch(path)
            .map_err(|source| SessionError::Open {
                path: path.to_owned(),
                source,
            })?;
        self.close();
        info!("opened {path}");
        Ok(&*self
            .doc
            .insert(SaveCoordinator::new(path, content, self.settings)))
    }

    /// Close the open document. Returns whether one was open.
    pub fn close(&mut self) -> bool {
        let Some(doc) = self.doc.take() else {
            return false;
        };
        if doc.document().is_modified() {
            warn!("closing {} with unsaved changes", doc.document().path());
        } else {
            debug!("closed {}", doc.document().path());
        }
        true
    }

    pub fn edit(&mut self, content: impl Into<String>, now: Instant) -> Result<(), SessionError> {
        self.doc_mut()?.edit(content, now);
        Ok(())
    }

    /// Manual save. `None` when there was nothing to send.
    pub fn save(&mut self, now: Instant) -> Result<Option<SaveOutcome>, SessionError> {
        let doc = self.doc.as_mut().ok_or(SessionError::NoDocument)?;
        Ok(doc
            .request_save()
            .map(|ticket| drive(&mut self.backend, doc, ticket, now)))
    }

    /// Send the auto-save if its debounce has elapsed by `now`.
    pub fn tick(&mut self, now: Instant) -> Option<SaveOutcome> {
        let doc = self.doc.as_mut()?;
        let ticket = doc.poll(now)?;
        Some(drive(&mut self.backend, doc, ticket, now))
    }

    /// React to an entry from the file-change channel.
    ///
    /// Only modifications of the open document matter. Persisted content is
    /// fetched first so that a write of ours coming back through the watcher
    /// is recognised and ignored.
    pub fn handle_file_change(
        &mut self,
        event: &FileChangeEvent,
    ) -> Result<ChangeResponse, ReloadError> {
        let Some(doc) = self.doc.as_mut() else {
            return Ok(ChangeResponse::Ignored);
        };
        if !event.modifies(doc.document().path()) {
            return Ok(ChangeResponse::Ignored);
        }

        let persisted = fetch_for_reload(&mut self.backend, doc.document().path())?;
        if persisted == doc.document().original() {
            debug!("{} unchanged in storage", doc.document().path());
            return Ok(ChangeResponse::Ignored);
        }

        Ok(match doc.receive_external_change() {
            ExternalChange::Reload => {
                doc.apply_reload(persisted);
                ChangeResponse::Reloaded
            }
            ExternalChange::NeedsReload => {
                info!("{} changed externally; keeping local edits", doc.document().path());
                ChangeResponse::NeedsReload
            }
        })
    }

    /// Discard local edits and any conflict in favour of what storage holds.
    /// Does nothing when no document is open.
    pub fn reload(&mut self) -> Result<(), ReloadError> {
        let Some(doc) = self.doc.as_mut() else {
            return Ok(());
        };
        let content = fetch_for_reload(&mut self.backend, doc.document().path())?;
        doc.apply_reload(content);
        Ok(())
    }

    pub fn dismiss_conflict(&mut self) -> bool {
        self.doc.as_mut().is_some_and(SaveCoordinator::dismiss_conflict)
    }

    pub fn resolve_by_merge(&mut self, now: Instant) -> Option<MergeResolution> {
        self.doc.as_mut()?.resolve_by_merge(now)
    }

    /// The live buffer, classified for the preview pane.
    pub fn preview(&self) -> Option<PreviewDocument> {
        let doc = self.doc.as_ref()?.document();
        Some(PreviewDocument::new(doc.path(), doc.current()))
    }

    pub fn state(&self) -> Option<DocState> {
        self.doc.as_ref().map(SaveCoordinator::state)
    }

    pub fn status(&self, now: Instant) -> Option<&Status> {
        self.doc.as_ref()?.status(now)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.doc.as_ref()?.next_deadline()
    }

    fn doc_mut(&mut self) -> Result<&mut SaveCoordinator, SessionError> {
        self.doc.as_mut().ok_or(SessionError::NoDocument)
    }
}

/// Send `ticket` and any saves queued behind it. Returns the last outcome.
fn drive<B: Backend>(
    backend: &mut B,
    doc: &mut SaveCoordinator,
    mut ticket: SaveTicket,
    now: Instant,
) -> SaveOutcome {
    loop {
        let reply = backend.save(ticket.request());
        let completion = doc.complete(ticket, reply, now);
        match completion.next {
            Some(next) => ticket = next,
            None => return completion.outcome,
        }
    }
}

fn fetch_for_reload<B: Backend>(backend: &mut B, path: &str) -> Result<String, ReloadError> {
    backend.fetch(path).map_err(|source| {
        warn!("reload of {path} failed: {source}");
        ReloadError {
            path: path.to_owned(),
            source,
        }
    })
}

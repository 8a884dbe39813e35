//! Auto-save, manual save and conflict handling for one open document.
//!
//! The coordinator never performs I/O itself. It hands out a [`SaveTicket`]
//! when a save should be sent and expects the reply back through
//! [`SaveCoordinator::complete`], so any event loop can drive it. Only one
//! save is in flight at a time; a save requested meanwhile is queued and sent
//! with the newest buffer once the first one completes.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::{
    merge::{MergeOutcome, merge_three_way},
    protocol::{ConflictPayload, SaveReply, SaveRequest, TransportError},
    tracker::{ContentTracker, ExternalChange},
};

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Quiet period after the last edit before an auto-save is sent.
    pub autosave_delay: Duration,
    pub saved_status: Duration,
    pub save_failed_status: Duration,
    pub autosave_failed_status: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            autosave_delay: DEFAULT_AUTOSAVE_DELAY,
            saved_status: Duration::from_millis(2000),
            save_failed_status: Duration::from_millis(3000),
            autosave_failed_status: Duration::from_millis(2500),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocState {
    Clean,
    Dirty,
    Saving,
    Conflicted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveTrigger {
    Auto,
    Manual,
}

/// A save the driver should send, then report back with
/// [`SaveCoordinator::complete`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveTicket {
    token: u64,
    trigger: SaveTrigger,
    request: SaveRequest,
}

impl SaveTicket {
    pub const fn token(&self) -> u64 {
        self.token
    }

    pub const fn trigger(&self) -> SaveTrigger {
        self.trigger
    }

    pub const fn request(&self) -> &SaveRequest {
        &self.request
    }
}

/// A save refused because storage no longer held the content the editor
/// started from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConflictRecord {
    pub server_current_content: String,
    /// Unified diff of original -> local buffer.
    pub user_diff: String,
    /// Unified diff of original -> what storage holds now.
    pub server_diff: String,
    pub message: String,
}

impl From<ConflictPayload> for ConflictRecord {
    fn from(payload: ConflictPayload) -> Self {
        Self {
            server_current_content: payload.current_content,
            user_diff: payload.user_diff,
            server_diff: payload.current_diff,
            message: payload.message,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusTone {
    Progress,
    Success,
    Error,
}

/// Transient status line shown next to the save affordance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub tone: StatusTone,
    /// `None` while the status tracks an operation still in progress.
    pub expires_at: Option<Instant>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Conflict,
    Failed(TransportError),
    /// The reply belonged to a save that is no longer in flight.
    Stale,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub outcome: SaveOutcome,
    /// Queued save to send next, if any.
    pub next: Option<SaveTicket>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeResolution {
    /// Local edits were folded onto the external change; the merged buffer
    /// is pending save.
    Merged,
    /// Both sides touched the same lines. Nothing was changed.
    Overlapping { conflict_marked: String },
}

#[derive(Debug)]
pub struct SaveCoordinator {
    doc: ContentTracker,
    settings: CoordinatorSettings,
    autosave_due: Option<Instant>,
    /// Token of the save currently awaiting its reply.
    in_flight: Option<u64>,
    queued: Option<SaveTrigger>,
    next_token: u64,
    conflict: Option<ConflictRecord>,
    status: Option<Status>,
}

impl SaveCoordinator {
    pub fn new(
        path: impl Into<String>,
        content: impl Into<String>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            doc: ContentTracker::new(path, content),
            settings,
            autosave_due: None,
            in_flight: None,
            queued: None,
            next_token: 1,
            conflict: None,
            status: None,
        }
    }

    pub const fn document(&self) -> &ContentTracker {
        &self.doc
    }

    pub const fn conflict(&self) -> Option<&ConflictRecord> {
        self.conflict.as_ref()
    }

    pub fn state(&self) -> DocState {
        if self.conflict.is_some() {
            DocState::Conflicted
        } else if self.in_flight.is_some() {
            DocState::Saving
        } else if self.doc.is_modified() {
            DocState::Dirty
        } else {
            DocState::Clean
        }
    }

    /// Whether the manual save affordance should be enabled. A conflict has
    /// to be reloaded, merged or dismissed first.
    pub fn can_save(&self) -> bool {
        self.in_flight.is_none() && self.conflict.is_none() && self.doc.is_modified()
    }

    /// Status to display at `now`, if one is still live.
    pub fn status(&self, now: Instant) -> Option<&Status> {
        self.status
            .as_ref()
            .filter(|status| status.expires_at.is_none_or(|at| now < at))
    }

    /// Earliest instant at which [`Self::poll`] or [`Self::status`] would
    /// answer differently.
    pub fn next_deadline(&self) -> Option<Instant> {
        let status_expiry = self.status.as_ref().and_then(|status| status.expires_at);
        match (self.autosave_due, status_expiry) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Replace the document with freshly fetched content. Any in-flight save
    /// is forgotten and its reply will be ignored.
    pub fn load(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.doc.load(path, content);
        self.reset_pending();
        self.status = None;
    }

    /// Apply a user edit and re-arm the auto-save debounce.
    pub fn edit(&mut self, content: impl Into<String>, now: Instant) {
        self.doc.edit(content);
        self.autosave_due = (self.doc.is_modified() && self.conflict.is_none())
            .then(|| now + self.settings.autosave_delay);
    }

    /// Explicit save. Returns the ticket to send, or `None` when there is
    /// nothing to save, a conflict is open, or a save is already in flight
    /// (in which case this one is queued behind it).
    pub fn request_save(&mut self) -> Option<SaveTicket> {
        if !self.doc.is_modified() || self.conflict.is_some() {
            return None;
        }
        self.autosave_due = None;
        if self.in_flight.is_some() {
            debug!("manual save of {} queued behind in-flight save", self.doc.path());
            self.queued = Some(SaveTrigger::Manual);
            return None;
        }
        Some(self.begin(SaveTrigger::Manual))
    }

    /// Fire the auto-save if its debounce elapsed by `now`.
    pub fn poll(&mut self, now: Instant) -> Option<SaveTicket> {
        let due = self.autosave_due?;
        if now < due {
            return None;
        }
        self.autosave_due = None;

        if !self.doc.is_modified() || self.conflict.is_some() {
            return None;
        }
        if self.in_flight.is_some() {
            debug!("auto-save of {} queued behind in-flight save", self.doc.path());
            self.queued.get_or_insert(SaveTrigger::Auto);
            return None;
        }
        Some(self.begin(SaveTrigger::Auto))
    }

    /// Feed back the reply for `ticket`.
    pub fn complete(
        &mut self,
        ticket: SaveTicket,
        reply: Result<SaveReply, TransportError>,
        now: Instant,
    ) -> Completion {
        match self.in_flight {
            Some(token) if token == ticket.token => self.in_flight = None,
            _ => {
                debug!("ignoring reply for superseded save #{}", ticket.token);
                return Completion {
                    outcome: SaveOutcome::Stale,
                    next: None,
                };
            }
        }

        let SaveTicket {
            trigger, request, ..
        } = ticket;

        let outcome = match reply {
            Ok(SaveReply::Saved) => {
                info!("saved {}", request.path);
                self.doc.mark_saved(request.content);
                self.status = match trigger {
                    SaveTrigger::Manual => Some(Status {
                        text: "Saved".to_owned(),
                        tone: StatusTone::Success,
                        expires_at: Some(now + self.settings.saved_status),
                    }),
                    // Silent on success to avoid flicker while typing.
                    SaveTrigger::Auto => None,
                };
                SaveOutcome::Saved
            }
            Ok(SaveReply::Conflict(payload)) => {
                info!("save of {} rejected: {}", request.path, payload.message);
                self.conflict = Some(payload.into());
                self.autosave_due = None;
                self.queued = None;
                self.status = None;
                SaveOutcome::Conflict
            }
            Err(err) => {
                warn!("save of {} failed: {err}", request.path);
                let (text, ttl) = match trigger {
                    SaveTrigger::Manual => {
                        (format!("Save failed: {err}"), self.settings.save_failed_status)
                    }
                    SaveTrigger::Auto => (
                        "Auto-save failed".to_owned(),
                        self.settings.autosave_failed_status,
                    ),
                };
                self.status = Some(Status {
                    text,
                    tone: StatusTone::Error,
                    expires_at: Some(now + ttl),
                });
                SaveOutcome::Failed(err)
            }
        };

        let next = match self.queued.take() {
            Some(trigger) if self.conflict.is_none() && self.doc.is_modified() => {
                Some(self.begin(trigger))
            }
            _ => None,
        };

        Completion { outcome, next }
    }

    /// Close the conflict dialog, keeping local edits.
    pub fn dismiss_conflict(&mut self) -> bool {
        let dismissed = self.conflict.take().is_some();
        if dismissed {
            debug!("conflict on {} dismissed", self.doc.path());
        }
        dismissed
    }

    /// Discard local edits in favour of `content` fetched from storage.
    pub fn apply_reload(&mut self, content: impl Into<String>) {
        let path = self.doc.path().to_owned();
        info!("reloaded {path}");
        self.load(path, content);
    }

    /// Try to fold local edits onto the external change behind the current
    /// conflict.
    pub fn resolve_by_merge(&mut self, now: Instant) -> Option<MergeResolution> {
        let server = self.conflict.as_ref()?.server_current_content.clone();
        match merge_three_way(self.doc.original(), self.doc.current(), &server) {
            MergeOutcome::Clean(merged) => {
                info!("merged local edits of {} onto external change", self.doc.path());
                self.doc.rebase(server, merged);
                self.conflict = None;
                self.autosave_due = self
                    .doc
                    .is_modified()
                    .then(|| now + self.settings.autosave_delay);
                Some(MergeResolution::Merged)
            }
            MergeOutcome::Conflicted {
                conflict_marked, ..
            } => Some(MergeResolution::Overlapping { conflict_marked }),
        }
    }

    /// React to the file changing on disk. See
    /// [`ContentTracker::receive_external_change`].
    pub fn receive_external_change(&mut self) -> ExternalChange {
        let action = self.doc.receive_external_change();
        debug!("external change to {}: {action:?}", self.doc.path());
        action
    }

    fn begin(&mut self, trigger: SaveTrigger) -> SaveTicket {
        let token = self.next_token;
        self.next_token += 1;
        self.in_flight = Some(token);
        if trigger == SaveTrigger::Manual {
            self.status = Some(Status {
                text: "Saving...".to_owned(),
                tone: StatusTone::Progress,
                expires_at: None,
            });
        }
        debug!("{trigger:?} save #{token} of {}", self.doc.path());
        SaveTicket {
            token,
            trigger,
            request: SaveRequest {
                path: self.doc.path().to_owned(),
                content: self.doc.current().to_owned(),
                old_content: self.doc.original().to_owned(),
            },
        }
    }

    fn reset_pending(&mut self) {
        self.conflict = None;
        self.autosave_due = None;
        self.in_flight = None;
        self.queued = None;
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::diff::unified_diff;

    fn coordinator(content: &str) -> (SaveCoordinator, Instant) {
        (
            SaveCoordinator::new("a.md", content, CoordinatorSettings::default()),
            Instant::now(),
        )
    }

    fn ticket(ticket: Option<SaveTicket>) -> SaveTicket {
        match ticket {
            Some(ticket) => ticket,
            None => panic!("expected a save ticket"),
        }
    }

    fn conflict_reply(request: &SaveRequest, server: &str) -> Result<SaveReply, TransportError> {
        Ok(SaveReply::Conflict(ConflictPayload {
            current_content: server.to_owned(),
            user_diff: unified_diff(&request.path, &request.old_content, &request.content),
            current_diff: unified_diff(&request.path, &request.old_content, server),
            message: "modified by another process".to_owned(),
        }))
    }

    fn after(now: Instant, ms: u64) -> Instant {
        now.checked_add(Duration::from_millis(ms)).unwrap_or(now)
    }

    #[test]
    fn starts_clean() {
        let (doc, now) = coordinator("A");
        assert_eq!(doc.state(), DocState::Clean);
        assert!(!doc.can_save());
        assert_eq!(doc.status(now), None);
        assert_eq!(doc.next_deadline(), None);
    }

    #[test]
    fn autosave_waits_for_quiet_period() {
        let (mut doc, now) = coordinator("A");
        doc.edit("B", now);
        assert_eq!(doc.state(), DocState::Dirty);
        assert_eq!(doc.poll(after(now, 499)), None);

        // A second edit re-arms the debounce.
        doc.edit("BC", after(now, 400));
        assert_eq!(doc.poll(after(now, 600)), None);
        assert_eq!(doc.next_deadline(), Some(after(now, 900)));

        let save = ticket(doc.poll(after(now, 900)));
        assert_eq!(save.trigger(), SaveTrigger::Auto);
        assert_eq!(
            save.request(),
            &SaveRequest {
                path: "a.md".to_owned(),
                content: "BC".to_owned(),
                old_content: "A".to_owned(),
            }
        );
        assert_eq!(doc.state(), DocState::Saving);
        // Auto-save shows no progress status.
        assert_eq!(doc.status(after(now, 900)), None);
        // The debounce fired once.
        assert_eq!(doc.poll(after(now, 2000)), None);
    }

    #[test]
    fn edit_back_to_original_disarms_autosave() {
        let (mut doc, now) = coordinator("A");
        doc.edit("B", now);
        doc.edit("A", now);
        assert_eq!(doc.state(), DocState::Clean);
        assert_eq!(doc.poll(after(now, 1000)), None);
    }

    #[test]
    fn successful_autosave_is_silent_and_commits_original() {
        let (mut doc, now) = coordinator("A");
        doc.edit("B", now);
        let save = ticket(doc.poll(after(now, 500)));

        let done = doc.complete(save, Ok(SaveReply::Saved), after(now, 510));
        assert_eq!(done.outcome, SaveOutcome::Saved);
        assert_eq!(done.next, None);
        assert_eq!(doc.state(), DocState::Clean);
        assert_eq!(doc.document().original(), "B");
        assert!(!doc.document().is_modified());
        assert_eq!(doc.status(after(now, 510)), None);
    }

    #[test]
    fn manual_save_reports_progress_then_result() {
        let (mut doc, now) = coordinator("A");
        doc.edit("B", now);
        assert!(doc.can_save());

        let save = ticket(doc.request_save());
        assert_eq!(save.trigger(), SaveTrigger::Manual);
        assert!(!doc.can_save());
        assert_eq!(
            doc.status(now).map(|s| (s.text.as_str(), s.tone)),
            Some(("Saving...", StatusTone::Progress))
        );

        doc.complete(save, Ok(SaveReply::Saved), now);
        assert_eq!(
            doc.status(after(now, 1999)).map(|s| s.text.as_str()),
            Some("Saved")
        );
        assert_eq!(doc.status(after(now, 2000)), None);
        assert_eq!(doc.document().original(), "B");
    }

    #[test]
    fn manual_save_with_nothing_modified_is_a_no_op() {
        let (mut doc, _now) = coordinator("A");
        assert_eq!(doc.request_save(), None);
        assert_eq!(doc.state(), DocState::Clean);
    }

    #[test]
    fn failed_saves_keep_edits_and_show_transient_errors() {
        let (mut doc, now) = coordinator("A");
        doc.edit("B", now);

        let save = ticket(doc.request_save());
        let err = TransportError::new(Some(500), "Failed to save: Internal Server Error");
        let done = doc.complete(save, Err(err.clone()), now);
        assert_eq!(done.outcome, SaveOutcome::Failed(err));
        assert_eq!(doc.state(), DocState::Dirty);
        assert_eq!(doc.document().current(), "B");
        assert_eq!(doc.document().original(), "A");
        assert_eq!(
            doc.status(now).map(|s| (s.text.as_str(), s.tone)),
            Some((
                "Save failed: Failed to save: Internal Server Error",
                StatusTone::Error
            ))
        );
        assert_eq!(doc.status(after(now, 3000)), None);

        // No automatic retry.
        assert_eq!(doc.poll(after(now, 10_000)), None);

        doc.edit("BC", now);
        let save = ticket(doc.poll(after(now, 500)));
        doc.complete(save, Err(TransportError::new(None, "offline")), after(now, 500));
        assert_eq!(
            doc.status(after(now, 500)).map(|s| s.text.as_str()),
            Some("Auto-save failed")
        );
        assert_eq!(doc.status(after(now, 3000)), None);
    }

    #[test]
    fn conflict_keeps_buffers_and_records_both_diffs() {
        let (mut doc, now) = coordinator("A");
        doc.edit("B", now);
        let save = ticket(doc.request_save());
        let reply = conflict_reply(save.request(), "C");

        let done = doc.complete(save, reply, now);
        assert_eq!(done.outcome, SaveOutcome::Conflict);
        assert_eq!(doc.state(), DocState::Conflicted);
        assert_eq!(doc.document().current(), "B");
        assert_eq!(doc.document().original(), "A");

        let Some(conflict) = doc.conflict() else {
            panic!("expected a conflict record");
        };
        assert_eq!(conflict.server_current_content, "C");
        assert_eq!(conflict.user_diff, unified_diff("a.md", "A", "B"));
        assert_eq!(conflict.server_diff, unified_diff("a.md", "A", "C"));
    }

    #[test]
    fn dismissing_conflict_returns_to_dirty_without_autosave() {
        let (mut doc, now) = coordinator("A");
        doc.edit("B", now);
        let save = ticket(doc.request_save());
        let reply = conflict_reply(save.request(), "C");
        doc.complete(save, reply, now);

        assert!(doc.dismiss_conflict());
        assert!(!doc.dismiss_conflict());
        assert_eq!(doc.state(), DocState::Dirty);
        assert_eq!(doc.document().current(), "B");
        assert_eq!(doc.poll(after(now, 5000)), None);
    }

    #[test]
    fn manual_save_is_refused_while_conflicted() {
        let (mut doc, now) = coordinator("A");
        doc.edit("B", now);
        let save = ticket(doc.request_save());
        let reply = conflict_reply(save.request(), "C");
        doc.complete(save, reply, now);

        assert!(!doc.can_save());
        assert_eq!(doc.request_save(), None);
        assert_eq!(doc.state(), DocState::Conflicted);
        assert_eq!(doc.document().original(), "A");

        doc.dismiss_conflict();
        assert!(doc.can_save());
        let retry = ticket(doc.request_save());
        assert_eq!(retry.request().old_content, "A");
        doc.complete(retry, Ok(SaveReply::Saved), now);
        assert_eq!(doc.state(), DocState::Clean);
    }

    #[test]
    fn successful_save_clears_needs_reload() {
        let (mut doc, now) = coordinator("A");
        doc.edit("B", now);
        doc.receive_external_change();
        assert!(doc.document().needs_reload());

        let save = ticket(doc.request_save());
        doc.complete(save, Ok(SaveReply::Saved), now);
        assert_eq!(doc.state(), DocState::Clean);
        assert!(!doc.document().needs_reload());
    }

    #[test]
    fn edits_while_conflicted_do_not_autosave() {
        let (mut doc, now) = coordinator("A");
        doc.edit("B", now);
        let save = ticket(doc.request_save());
        let reply = conflict_reply(save.request(), "C");
        doc.complete(save, reply, now);

        doc.edit("BB", now);
        assert_eq!(doc.poll(after(now, 5000)), None);
        assert_eq!(doc.state(), DocState::Conflicted);
    }

    #[test]
    fn reload_from_conflict_adopts_server_content() {
        let (mut doc, now) = coordinator("A");
        doc.edit("B", now);
        let save = ticket(doc.request_save());
        let reply = conflict_reply(save.request(), "C");
        doc.complete(save, reply, now);

        doc.apply_reload("C");
        assert_eq!(doc.state(), DocState::Clean);
        assert_eq!(doc.conflict(), None);
        assert_eq!(doc.document().current(), "C");
        assert_eq!(doc.document().original(), "C");
        assert!(!doc.document().is_modified());
    }

    #[test]
    fn save_requested_in_flight_is_queued_with_newest_buffer() {
        let (mut doc, now) = coordinator("A");
        doc.edit("B", now);
        let first = ticket(doc.request_save());

        doc.edit("BC", after(now, 10));
        assert_eq!(doc.request_save(), None);
        // The debounce firing meanwhile does not start a second request.
        assert_eq!(doc.poll(after(now, 600)), None);

        let done = doc.complete(first, Ok(SaveReply::Saved), after(now, 700));
        assert_eq!(done.outcome, SaveOutcome::Saved);
        assert_eq!(doc.document().original(), "B");

        let second = ticket(done.next);
        assert_eq!(second.trigger(), SaveTrigger::Manual);
        assert_eq!(second.request().content, "BC");
        assert_eq!(second.request().old_content, "B");
        assert_eq!(doc.state(), DocState::Saving);

        let done = doc.complete(second, Ok(SaveReply::Saved), after(now, 800));
        assert_eq!(done.next, None);
        assert_eq!(doc.state(), DocState::Clean);
    }

    #[test]
    fn autosave_during_flight_follows_up_after_completion() {
        let (mut doc, now) = coordinator("A");
        doc.edit("B", now);
        let first = ticket(doc.poll(after(now, 500)));

        doc.edit("BC", after(now, 510));
        assert_eq!(doc.poll(after(now, 1010)), None);

        let done = doc.complete(first, Ok(SaveReply::Saved), after(now, 1020));
        // Saved content no longer matches the buffer: still dirty.
        let second = ticket(done.next);
        assert_eq!(second.trigger(), SaveTrigger::Auto);
        assert_eq!(second.request().content, "BC");
    }

    #[test]
    fn conflict_drops_queued_save() {
        let (mut doc, now) = coordinator("A");
        doc.edit("B", now);
        let first = ticket(doc.request_save());
        doc.edit("BC", now);
        assert_eq!(doc.request_save(), None);

        let reply = conflict_reply(first.request(), "C");
        let done = doc.complete(first, reply, now);
        assert_eq!(done.outcome, SaveOutcome::Conflict);
        assert_eq!(done.next, None);
    }

    #[test]
    fn replies_after_reload_are_ignored() {
        let (mut doc, now) = coordinator("A");
        doc.edit("B", now);
        let save = ticket(doc.request_save());

        doc.apply_reload("Z");
        let done = doc.complete(save, Ok(SaveReply::Saved), now);
        assert_eq!(done.outcome, SaveOutcome::Stale);
        assert_eq!(doc.document().original(), "Z");
        assert_eq!(doc.state(), DocState::Clean);
    }

    #[test]
    fn merge_resolves_non_overlapping_conflict() {
        let (mut doc, now) = coordinator("one\ntwo\nthree\n");
        doc.edit("ONE\ntwo\nthree\n", now);
        let save = ticket(doc.request_save());
        let reply = conflict_reply(save.request(), "one\ntwo\nTHREE\n");
        doc.complete(save, reply, now);

        assert_eq!(doc.resolve_by_merge(now), Some(MergeResolution::Merged));
        assert_eq!(doc.state(), DocState::Dirty);
        assert_eq!(doc.document().original(), "one\ntwo\nTHREE\n");
        assert_eq!(doc.document().current(), "ONE\ntwo\nTHREE\n");

        let follow_up = ticket(doc.poll(after(now, 500)));
        assert_eq!(follow_up.request().old_content, "one\ntwo\nTHREE\n");
    }

    #[test]
    fn merge_leaves_overlapping_conflict_alone() {
        let (mut doc, now) = coordinator("a\nb\n");
        doc.edit("a\nO\n", now);
        let save = ticket(doc.request_save());
        let reply = conflict_reply(save.request(), "a\nT\n");
        doc.complete(save, reply, now);

        let resolution = doc.resolve_by_merge(now);
        assert!(matches!(
            resolution,
            Some(MergeResolution::Overlapping { ref conflict_marked }) if conflict_marked.contains("<<<<<<< ours")
        ));
        assert_eq!(doc.state(), DocState::Conflicted);
        assert_eq!(doc.document().current(), "a\nO\n");
    }

    #[test]
    fn merge_without_conflict_does_nothing() {
        let (mut doc, now) = coordinator("A");
        assert_eq!(doc.resolve_by_merge(now), None);
    }

    #[test]
    fn external_change_delegates_to_tracker() {
        let (mut doc, now) = coordinator("A");
        assert_eq!(doc.receive_external_change(), ExternalChange::Reload);

        doc.edit("B", now);
        assert_eq!(doc.receive_external_change(), ExternalChange::NeedsReload);
        assert!(doc.document().needs_reload());
        assert_eq!(doc.state(), DocState::Dirty);
    }
}

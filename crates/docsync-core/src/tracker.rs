//! Last-synced content versus the live buffer for one open document.

/// What the caller should do about an external modification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExternalChange {
    /// No local edits: re-fetch and [`ContentTracker::load`] the result.
    Reload,
    /// Local edits exist; they were kept and [`ContentTracker::needs_reload`]
    /// is now set.
    NeedsReload,
}

/// Tracks `original` (last content known to match storage) and `current`
/// (the live buffer).
///
/// `original` only changes on load, reload and successful save.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentTracker {
    path: String,
    original: String,
    current: String,
    needs_reload: bool,
}

impl ContentTracker {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let mut tracker = Self::default();
        tracker.load(path, content);
        tracker
    }

    /// Start over from freshly fetched content.
    pub fn load(&mut self, path: impl Into<String>, content: impl Into<String>) {
        let content = content.into();
        self.path = path.into();
        self.current.clone_from(&content);
        self.original = content;
        self.needs_reload = false;
    }

    pub fn edit(&mut self, content: impl Into<String>) {
        self.current = content.into();
    }

    /// Record that `saved` is now what storage holds.
    ///
    /// The document stays modified only if the buffer moved on after `saved`
    /// was submitted. Storage matches `original` again, so any pending
    /// external change is settled.
    pub fn mark_saved(&mut self, saved: impl Into<String>) {
        self.original = saved.into();
        self.needs_reload = false;
    }

    pub fn receive_external_change(&mut self) -> ExternalChange {
        if self.is_modified() {
            self.needs_reload = true;
            ExternalChange::NeedsReload
        } else {
            ExternalChange::Reload
        }
    }

    /// Adopt `server` as the synced content while keeping `buffer` as the
    /// live edit, e.g. after merging local edits onto an external change.
    pub(crate) fn rebase(&mut self, server: String, buffer: String) {
        self.original = server;
        self.current = buffer;
        self.needs_reload = false;
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn is_modified(&self) -> bool {
        self.current != self.original
    }

    pub const fn needs_reload(&self) -> bool {
        self.needs_reload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modified_tracks_buffer_against_original() {
        let mut doc = ContentTracker::new("a.md", "A");
        assert!(!doc.is_modified());

        for (edit, modified) in [("B", true), ("BC", true), ("A", false), ("", true), ("A", false)] {
            doc.edit(edit);
            assert_eq!(doc.is_modified(), modified, "after editing to {edit:?}");
            assert_eq!(doc.is_modified(), doc.current() != doc.original());
        }
    }

    #[test]
    fn load_then_mark_saved_round_trips() {
        let mut doc = ContentTracker::default();
        doc.load("p.md", "c");
        doc.mark_saved("c");

        assert!(!doc.is_modified());
        assert_eq!(doc.original(), "c");
        assert_eq!(doc.current(), "c");
        assert_eq!(doc.path(), "p.md");
    }

    #[test]
    fn mark_saved_is_idempotent() {
        let mut once = ContentTracker::new("a.md", "A");
        once.edit("B");
        let mut twice = once.clone();

        once.mark_saved("B");
        twice.mark_saved("B");
        twice.mark_saved("B");

        assert_eq!(once, twice);
        assert!(!twice.is_modified());
    }

    #[test]
    fn mark_saved_with_newer_buffer_stays_modified() {
        let mut doc = ContentTracker::new("a.md", "A");
        doc.edit("B");
        doc.edit("BC");
        doc.mark_saved("B");

        assert_eq!(doc.original(), "B");
        assert!(doc.is_modified());
    }

    #[test]
    fn external_change_reloads_clean_document() {
        let mut doc = ContentTracker::new("a.md", "A");
        assert_eq!(doc.receive_external_change(), ExternalChange::Reload);
        assert!(!doc.needs_reload());
    }

    #[test]
    fn external_change_flags_dirty_document() {
        let mut doc = ContentTracker::new("a.md", "A");
        doc.edit("B");

        assert_eq!(doc.receive_external_change(), ExternalChange::NeedsReload);
        assert!(doc.needs_reload());
        assert!(doc.is_modified());
        assert_eq!(doc.current(), "B");
        assert_eq!(doc.original(), "A");

        doc.load("a.md", "C");
        assert!(!doc.needs_reload());
        assert_eq!(doc.current(), "C");
    }

    #[test]
    fn mark_saved_settles_pending_external_change() {
        for (saved, modified_after) in [("B", false), ("B-partial", true)] {
            let mut doc = ContentTracker::new("a.md", "A");
            doc.edit("B");
            doc.receive_external_change();
            assert!(doc.needs_reload());

            doc.mark_saved(saved);
            assert!(!doc.needs_reload(), "after saving {saved:?}");
            assert_eq!(doc.is_modified(), modified_after);
        }
    }

    #[test]
    fn editing_back_keeps_external_change_flag() {
        // Storage still differs from `original`; only a reload settles it.
        let mut doc = ContentTracker::new("a.md", "A");
        doc.edit("B");
        doc.receive_external_change();
        doc.edit("A");

        assert!(!doc.is_modified());
        assert!(doc.needs_reload());
    }
}

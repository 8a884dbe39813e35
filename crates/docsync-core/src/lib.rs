#![forbid(unsafe_code)]

//! Editor/preview synchronisation for `docsync`.
//!
//! A [`session::EditorSession`] owns one open document, a [`backend::Backend`]
//! that persists and fetches content, and the auto-save/conflict state machine
//! in [`coordinator::SaveCoordinator`].

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod diff;
mod disk_io;
pub mod markdown;
pub mod merge;
pub mod preview;
pub mod protocol;
pub mod session;
pub mod store;
pub mod tracker;
pub mod tree;
pub mod watch;

/// Hard cap on file sizes we will load into memory.
pub const MAX_FILE_BYTES: u64 = 64 * 1024 * 1024;


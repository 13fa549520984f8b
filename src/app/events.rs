//! Defines the notifications a session sends to its host.

use serde::Serialize;
use std::path::PathBuf;

/// A snapshot of the session, sent with every state change.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionStatus {
    pub root: Option<PathBuf>,
    pub display_name: Option<String>,
    pub include_count: usize,
    pub exclude_count: usize,
    pub wrap_long_lines: bool,
    pub respect_gitignore: bool,
    pub gitignore_rules: usize,
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Events sent from a `RepoSession` to whoever observes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Overrides, settings or the open root changed; anything derived from
    /// the session should be rebuilt.
    StateChanged(Box<SessionStatus>),
}

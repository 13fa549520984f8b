//! Contains helper functions to reduce boilerplate in the session's mutation methods.

use super::events::{SessionEvent, SessionStatus};
use super::proxy::EventProxy;
use super::state::OpenRepo;
use crate::config::settings::StateStore;
use crate::core::overrides::Forced;

/// Builds the status payload for the current root, or an empty one when none is open.
pub fn session_status(repo: Option<&OpenRepo>) -> SessionStatus {
    let Some(repo) = repo else {
        return SessionStatus::default();
    };
    let overrides = repo.overrides.current();
    SessionStatus {
        root: Some(repo.root.path.clone()),
        display_name: Some(repo.root.display_name.clone()),
        include_count: overrides.count(Forced::Include),
        exclude_count: overrides.count(Forced::Exclude),
        wrap_long_lines: repo.settings.wrap_long_lines,
        respect_gitignore: repo.settings.respect_gitignore,
        gitignore_rules: repo.engine.gitignore().rules().len(),
        can_undo: repo.overrides.can_undo(),
        can_redo: repo.overrides.can_redo(),
    }
}

/// Sends a `StateChanged` event describing `repo`.
pub fn notify<P: EventProxy>(proxy: &P, repo: Option<&OpenRepo>) {
    let status = session_status(repo);
    proxy.send_event(SessionEvent::StateChanged(Box::new(status)));
}

/// Queues a save of `repo` and then notifies observers.
///
/// This is the tail of every mutating session call.
pub fn save_and_notify<P: EventProxy>(store: &StateStore, proxy: &P, repo: &OpenRepo) {
    store.save_in_background(&repo.root.path, repo.snapshot());
    notify(proxy, Some(repo));
}

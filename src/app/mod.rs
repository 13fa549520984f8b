//! The session layer: one open repository, its mutation entry points and
//! the report entry point.
//!
//! A [`RepoSession`] is driven from a single command context. Every mutation
//! saves the per-root state in the background and sends one
//! [`events::SessionEvent::StateChanged`] through the session's proxy.

pub mod events;
pub mod explorer;
pub mod helpers;
pub mod proxy;
pub mod state;

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::config::settings::StateStore;
use crate::config::{FilterConfig, ReportSettings};
use crate::core::error::CoreError;
use crate::core::file_handler::{header_name, ReportJob, NO_ROOT_SENTINEL};
use crate::core::overrides::{Forced, ManualOverrides};
use crate::core::paths::PathNormalizer;

use self::events::SessionStatus;
use self::explorer::ExplorerNode;
use self::proxy::EventProxy;
use self::state::{OpenRepo, RepoRoot, SelectedPath};

pub struct RepoSession<P: EventProxy> {
    store: StateStore,
    normalizer: PathNormalizer,
    proxy: P,
    repo: Option<OpenRepo>,
}

impl<P: EventProxy> RepoSession<P> {
    pub fn new(store: StateStore, proxy: P) -> Self {
        Self {
            store,
            normalizer: PathNormalizer::default(),
            proxy,
            repo: None,
        }
    }

    /// Replaces the path normalizer. Only affects roots opened afterwards.
    ///
    /// This is how a host on a case-sensitive file system opts into
    /// [`crate::core::paths::CaseSensitivity::Sensitive`] comparisons.
    pub fn with_normalizer(mut self, normalizer: PathNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn root(&self) -> Option<&RepoRoot> {
        self.repo.as_ref().map(|repo| &repo.root)
    }

    pub fn config(&self) -> Option<&FilterConfig> {
        self.repo.as_ref().map(|repo| &repo.config)
    }

    /// The current report flags, or the defaults when no root is open.
    pub fn settings(&self) -> ReportSettings {
        self.repo
            .as_ref()
            .map(|repo| repo.settings)
            .unwrap_or_default()
    }

    pub fn overrides(&self) -> Option<&ManualOverrides> {
        self.repo.as_ref().map(|repo| repo.overrides.current())
    }

    pub fn status(&self) -> SessionStatus {
        helpers::session_status(self.repo.as_ref())
    }

    // --- Root lifecycle ---

    /// The host's "root changed" signal: opens `path`, or closes the current root on `None`.
    pub fn set_root(&mut self, path: Option<&Path>, display_name: Option<String>) {
        match path {
            Some(path) => self.open_root(path, display_name),
            None => self.close_root(),
        }
    }

    /// Loads persisted state and `.gitignore` for `path` and notifies once.
    /// A path that is not an existing directory closes the session instead.
    ///
    /// Reopening the root that is already open keeps the in-memory overrides,
    /// settings and undo history; only the display name and `.gitignore` are
    /// refreshed.
    pub fn open_root(&mut self, path: &Path, display_name: Option<String>) {
        if !path.is_dir() {
            tracing::warn!("Root {:?} is not a directory; closing the session", path);
            self.close_root();
            return;
        }

        if let Some(repo) = self
            .repo
            .as_mut()
            .filter(|repo| self.normalizer.same_path(&repo.root.path, path))
        {
            tracing::debug!("Root {:?} is already open; refreshing", repo.root.path);
            repo.root = RepoRoot::new(path, display_name, &self.store, self.normalizer);
            repo.reload_gitignore();
            helpers::notify(&self.proxy, Some(repo));
            return;
        }

        let root = RepoRoot::new(path, display_name, &self.store, self.normalizer);
        tracing::info!("Opening root {:?} ({})", root.path, root.display_name);
        let repo = OpenRepo::load(root, &self.store, self.normalizer);
        self.repo = Some(repo);
        helpers::notify(&self.proxy, self.repo.as_ref());
    }

    /// Drops every piece of per-root state. A no-op when nothing is open.
    pub fn close_root(&mut self) {
        if let Some(repo) = self.repo.take() {
            tracing::info!("Closing root {:?}", repo.root.path);
            helpers::notify(&self.proxy, None);
        }
    }

    // --- Manual overrides ---

    /// Flips the effective visibility of `path`. Returns the decision now
    /// forced on it, or `None` when no root is open.
    pub fn toggle_exclude(&mut self, path: &Path) -> Option<Forced> {
        let repo = self.repo.as_mut()?;
        let is_dir = path.is_dir();
        let forced = repo.overrides.toggle_exclude(&repo.engine, path, is_dir);
        helpers::save_and_notify(&self.store, &self.proxy, repo);
        Some(forced)
    }

    /// Toggles a host-supplied selection as one undoable step.
    pub fn toggle_exclude_multiple(&mut self, selection: &[SelectedPath]) {
        let Some(repo) = self.repo.as_mut() else {
            return;
        };
        if selection.is_empty() {
            return;
        }
        repo.overrides.toggle_exclude_multiple(&repo.engine, selection);
        helpers::save_and_notify(&self.store, &self.proxy, repo);
    }

    /// Clears all manual overrides and re-reads `.gitignore`.
    pub fn reset_manual_rules(&mut self) {
        let Some(repo) = self.repo.as_mut() else {
            return;
        };
        repo.overrides.reset();
        repo.reload_gitignore();
        helpers::save_and_notify(&self.store, &self.proxy, repo);
    }

    /// Clears manual overrides and restores every pattern set and flag to its default.
    pub fn reset_to_defaults(&mut self) {
        let Some(repo) = self.repo.as_mut() else {
            return;
        };
        repo.overrides.reset();
        repo.config = FilterConfig::default();
        repo.settings = ReportSettings::default();
        repo.engine.set_config(&repo.config);
        repo.engine.set_respect_gitignore(repo.settings.respect_gitignore);
        repo.reload_gitignore();
        helpers::save_and_notify(&self.store, &self.proxy, repo);
    }

    /// Returns `false` when there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(repo) = self.repo.as_mut() else {
            return false;
        };
        if !repo.overrides.undo() {
            return false;
        }
        helpers::save_and_notify(&self.store, &self.proxy, repo);
        true
    }

    /// Returns `false` when there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(repo) = self.repo.as_mut() else {
            return false;
        };
        if !repo.overrides.redo() {
            return false;
        }
        helpers::save_and_notify(&self.store, &self.proxy, repo);
        true
    }

    pub fn can_undo(&self) -> bool {
        self.repo.as_ref().is_some_and(|repo| repo.overrides.can_undo())
    }

    pub fn can_redo(&self) -> bool {
        self.repo.as_ref().is_some_and(|repo| repo.overrides.can_redo())
    }

    // --- Settings ---

    pub fn set_wrap_long_lines(&mut self, wrap: bool) {
        let Some(repo) = self.repo.as_mut() else {
            return;
        };
        if repo.settings.wrap_long_lines == wrap {
            return;
        }
        repo.settings.wrap_long_lines = wrap;
        helpers::save_and_notify(&self.store, &self.proxy, repo);
    }

    pub fn set_respect_gitignore(&mut self, respect: bool) {
        let Some(repo) = self.repo.as_mut() else {
            return;
        };
        if repo.settings.respect_gitignore == respect {
            return;
        }
        repo.settings.respect_gitignore = respect;
        repo.engine.set_respect_gitignore(respect);
        helpers::save_and_notify(&self.store, &self.proxy, repo);
    }

    /// Replaces the four name/glob collections wholesale. Blank entries are dropped.
    pub fn update_filtering_patterns<S: AsRef<str>>(
        &mut self,
        hidden_dirs: &[S],
        hidden_files: &[S],
        auto_dirs: &[S],
        auto_files: &[S],
    ) {
        let Some(repo) = self.repo.as_mut() else {
            return;
        };
        repo.config
            .update_patterns(hidden_dirs, hidden_files, auto_dirs, auto_files);
        repo.engine.set_config(&repo.config);
        helpers::save_and_notify(&self.store, &self.proxy, repo);
    }

    pub fn update_binary_extensions<S: AsRef<str>>(&mut self, extensions: &[S]) {
        let Some(repo) = self.repo.as_mut() else {
            return;
        };
        repo.config.set_binary_extensions(extensions);
        repo.engine.set_config(&repo.config);
        helpers::save_and_notify(&self.store, &self.proxy, repo);
    }

    // --- Queries ---

    /// The visibility decision for `path`. Nothing is excluded while no root is open.
    pub fn is_effectively_excluded(&self, path: &Path) -> bool {
        self.repo.as_ref().is_some_and(|repo| {
            repo.engine
                .is_effectively_excluded(repo.overrides.current(), path)
        })
    }

    /// Explorer nodes for `dir`, `depth` levels deep. Empty while no root is open.
    pub fn explorer_level(&self, dir: &Path, depth: usize) -> Vec<ExplorerNode> {
        match &self.repo {
            Some(repo) => explorer::build_level(&repo.engine, repo.overrides.current(), dir, depth),
            None => Vec::new(),
        }
    }

    // --- Reports ---

    /// Snapshots everything a report needs. `None` when no usable root is open.
    ///
    /// `root_override` is honoured only when it is an existing directory
    /// strictly beneath the open root; overrides are then limited to entries
    /// beneath it.
    pub fn report_job(
        &self,
        root_override: Option<&Path>,
        cancel_flag: Arc<AtomicBool>,
    ) -> Option<ReportJob> {
        let repo = self.repo.as_ref()?;
        if !repo.root.path.is_dir() {
            return None;
        }

        let base = self.report_base(repo, root_override);
        Some(ReportJob {
            overrides: repo.overrides.current().restricted_to(&base),
            header: header_name(&repo.root.display_name, &repo.root.path, &base, &repo.engine),
            engine: repo.engine.clone(),
            base,
            wrap_long_lines: repo.settings.wrap_long_lines,
            cancel_flag,
        })
    }

    fn report_base(&self, repo: &OpenRepo, root_override: Option<&Path>) -> PathBuf {
        root_override
            .filter(|dir| dir.is_dir() && self.normalizer.is_descendant_of(dir, &repo.root.path))
            .map(|dir| self.normalizer.normalize(dir))
            .unwrap_or_else(|| repo.root.path.clone())
    }

    /// Generates the report on tokio's blocking pool. Returns the no-root
    /// sentinel when nothing is open.
    pub async fn generate_report(
        &self,
        root_override: Option<&Path>,
        cancel_flag: Arc<AtomicBool>,
    ) -> Result<String, CoreError> {
        match self.report_job(root_override, cancel_flag) {
            Some(job) => job.spawn().await,
            None => Ok(NO_ROOT_SENTINEL.to_string()),
        }
    }

    /// [`Self::generate_report`] on the calling thread, without cancellation.
    pub fn generate_report_blocking(
        &self,
        root_override: Option<&Path>,
    ) -> Result<String, CoreError> {
        match self.report_job(root_override, Arc::new(AtomicBool::new(false))) {
            Some(job) => job.run(),
            None => Ok(NO_ROOT_SENTINEL.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::events::SessionEvent;
    use super::proxy::NoopProxy;
    use super::*;
    use std::fs;
    use tokio::sync::mpsc;

    fn create_file(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_no_root_operations_are_noops() {
        let state_dir = tempfile::tempdir().unwrap();
        let mut session = RepoSession::new(StateStore::new(state_dir.path()), NoopProxy);
        assert_eq!(session.toggle_exclude(Path::new("/nowhere")), None);
        session.reset_manual_rules();
        session.reset_to_defaults();
        assert!(!session.undo());
        assert!(!session.is_effectively_excluded(Path::new("/nowhere/bin")));
        assert_eq!(session.generate_report_blocking(None).unwrap(), NO_ROOT_SENTINEL);
        assert_eq!(fs::read_dir(state_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_open_and_close_notify_once_each() {
        let repo = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = RepoSession::new(StateStore::new(state_dir.path()), tx);

        session.set_root(Some(repo.path()), Some("demo".into()));
        let Ok(SessionEvent::StateChanged(status)) = rx.try_recv() else {
            panic!("expected a state change after open");
        };
        assert_eq!(status.display_name.as_deref(), Some("demo"));
        assert!(rx.try_recv().is_err());

        session.set_root(None, None);
        let Ok(SessionEvent::StateChanged(status)) = rx.try_recv() else {
            panic!("expected a state change after close");
        };
        assert_eq!(*status, SessionStatus::default());
        assert!(session.root().is_none());
    }

    #[test]
    fn test_reopening_same_root_keeps_history_and_renames() {
        let repo = tempfile::tempdir().unwrap();
        create_file(repo.path(), "src/a.ts", "a");
        let state_dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = RepoSession::new(StateStore::new(state_dir.path()), tx);
        session.open_root(repo.path(), Some("demo".into()));
        session.toggle_exclude(&repo.path().join("src/a.ts"));
        while rx.try_recv().is_ok() {}

        session.open_root(&repo.path().join("src/.."), Some("renamed".into()));
        let Ok(SessionEvent::StateChanged(status)) = rx.try_recv() else {
            panic!("expected a state change after reopen");
        };
        assert_eq!(status.display_name.as_deref(), Some("renamed"));
        assert_eq!(status.exclude_count, 1);
        assert!(rx.try_recv().is_err());
        assert!(session.can_undo());
        assert!(session.undo());
        assert!(session.overrides().unwrap().is_empty());
    }

    #[test]
    fn test_unchanged_flags_do_not_notify() {
        let repo = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = RepoSession::new(StateStore::new(state_dir.path()), tx);
        session.open_root(repo.path(), None);
        while rx.try_recv().is_ok() {}

        session.set_wrap_long_lines(false);
        session.set_respect_gitignore(true);
        assert!(rx.try_recv().is_err());

        session.set_wrap_long_lines(true);
        assert!(rx.try_recv().is_ok());
        assert!(session.settings().wrap_long_lines);
    }

    #[test]
    fn test_reset_to_defaults_restores_patterns_and_flags() {
        let repo = tempfile::tempdir().unwrap();
        create_file(repo.path(), "target/out.txt", "x");
        let state_dir = tempfile::tempdir().unwrap();
        let mut session = RepoSession::new(StateStore::new(state_dir.path()), NoopProxy);
        session.open_root(repo.path(), None);

        session.update_filtering_patterns(&[".git"], &["*.sln"], &["target"], &["*.log"]);
        session.set_respect_gitignore(false);
        assert!(session.is_effectively_excluded(&repo.path().join("target")));

        session.reset_to_defaults();
        assert!(!session.is_effectively_excluded(&repo.path().join("target")));
        assert_eq!(session.config(), Some(&FilterConfig::default()));
        assert_eq!(session.settings(), ReportSettings::default());
    }

    #[test]
    fn test_report_override_outside_root_falls_back_to_root() {
        let repo = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        create_file(repo.path(), "a.txt", "a");
        let state_dir = tempfile::tempdir().unwrap();
        let mut session = RepoSession::new(StateStore::new(state_dir.path()), NoopProxy);
        session.open_root(repo.path(), Some("demo".into()));

        let report = session.generate_report_blocking(Some(outside.path())).unwrap();
        assert!(report.starts_with("Folder Structure: demo\n"));
        let report = session.generate_report_blocking(Some(repo.path())).unwrap();
        assert!(report.starts_with("Folder Structure: demo\n"));
    }
}

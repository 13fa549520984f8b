//! Defines the per-root state a session holds while a repository is open.

use std::path::{Path, PathBuf};

use crate::config::settings::StateStore;
use crate::config::{FilterConfig, PersistedState, ReportSettings};
use crate::core::filter::FilterEngine;
use crate::core::gitignore::GitIgnoreMatcher;
use crate::core::overrides::{ManualOverrides, OverrideStore};
use crate::core::paths::PathNormalizer;

pub use crate::core::SelectedPath;

/// The repository a session is working on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRoot {
    /// Normalized absolute path.
    pub path: PathBuf,
    pub display_name: String,
    pub state_file: PathBuf,
}

impl RepoRoot {
    /// Falls back to the directory's own name when no display name is given.
    pub fn new(
        path: &Path,
        display_name: Option<String>,
        store: &StateStore,
        normalizer: PathNormalizer,
    ) -> Self {
        let path = normalizer.normalize(path);
        let display_name = display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| {
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.to_string_lossy().into_owned())
            });
        Self {
            state_file: store.state_file(&path),
            path,
            display_name,
        }
    }
}

/// Everything that belongs to one open root.
#[derive(Debug, Clone)]
pub struct OpenRepo {
    pub root: RepoRoot,
    pub config: FilterConfig,
    pub settings: ReportSettings,
    pub engine: FilterEngine,
    pub overrides: OverrideStore,
}

impl OpenRepo {
    /// Restores persisted state for `root` and parses its `.gitignore`.
    pub fn load(root: RepoRoot, store: &StateStore, normalizer: PathNormalizer) -> Self {
        let persisted = store.load(&root.path);
        let config = persisted.config();
        let settings = persisted.settings();
        let gitignore = GitIgnoreMatcher::load(&root.path, normalizer);
        let engine = FilterEngine::new(&root.path, normalizer, &config, gitignore, settings);
        let overrides =
            ManualOverrides::from_lists(normalizer, &persisted.includes(), &persisted.excludes());

        Self {
            root,
            config,
            settings,
            engine,
            overrides: OverrideStore::with_overrides(overrides),
        }
    }

    /// The snapshot written to the state file.
    pub fn snapshot(&self) -> PersistedState {
        let (includes, excludes) = self.overrides.current().to_lists();
        PersistedState::capture(includes, excludes, self.settings, &self.config)
    }

    pub fn reload_gitignore(&mut self) {
        let gitignore = GitIgnoreMatcher::load(&self.root.path, self.engine.normalizer());
        self.engine.set_gitignore(gitignore);
    }
}

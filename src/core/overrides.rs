//! Manual include/exclude overrides and their undo/redo history.
//!
//! A path carries at most one [`Forced`] decision, so it can never be both
//! force-included and force-excluded.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};

use super::filter::FilterEngine;
use super::paths::{key_is_beneath, PathNormalizer};
use super::SelectedPath;

/// Maximum number of snapshots kept on the undo stack.
pub const MAX_UNDO_STATES: usize = 50;

/// A user-forced visibility decision for one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Forced {
    Include,
    Exclude,
}

impl Forced {
    pub fn opposite(self) -> Self {
        match self {
            Forced::Include => Forced::Exclude,
            Forced::Exclude => Forced::Include,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OverrideEntry {
    path: PathBuf,
    forced: Forced,
}

/// The set of manual overrides, keyed by normalized path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualOverrides {
    normalizer: PathNormalizer,
    entries: BTreeMap<String, OverrideEntry>,
}

impl ManualOverrides {
    pub fn new(normalizer: PathNormalizer) -> Self {
        Self {
            normalizer,
            entries: BTreeMap::new(),
        }
    }

    /// Rebuilds overrides from persisted path lists. A path listed in both
    /// ends up included.
    pub fn from_lists(
        normalizer: PathNormalizer,
        includes: &[String],
        excludes: &[String],
    ) -> Self {
        let mut overrides = Self::new(normalizer);
        for path in excludes {
            overrides.set(Path::new(path), Forced::Exclude);
        }
        for path in includes {
            overrides.set(Path::new(path), Forced::Include);
        }
        overrides
    }

    /// The `(includes, excludes)` path lists, in key order.
    pub fn to_lists(&self) -> (Vec<String>, Vec<String>) {
        let list = |forced: Forced| {
            self.paths(forced)
                .map(|p| p.to_string_lossy().into_owned())
                .collect()
        };
        (list(Forced::Include), list(Forced::Exclude))
    }

    pub fn get(&self, path: &Path) -> Option<Forced> {
        self.entries.get(&self.normalizer.key(path)).map(|e| e.forced)
    }

    /// Sets the decision for `path`, replacing any previous one.
    pub fn set(&mut self, path: &Path, forced: Forced) {
        let normalized = self.normalizer.normalize(path);
        let key = self.normalizer.normalized_key(&normalized);
        self.entries.insert(
            key,
            OverrideEntry {
                path: normalized,
                forced,
            },
        );
    }

    pub fn remove(&mut self, path: &Path) -> Option<Forced> {
        self.entries
            .remove(&self.normalizer.key(path))
            .map(|e| e.forced)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_included(&self, path: &Path) -> bool {
        self.get(path) == Some(Forced::Include)
    }

    /// `true` if `path` or any of its ancestors is force-excluded.
    pub fn has_excluded_ancestor(&self, path: &Path) -> bool {
        if !self.entries.values().any(|e| e.forced == Forced::Exclude) {
            return false;
        }
        self.normalizer
            .normalize(path)
            .ancestors()
            .any(|ancestor| {
                let key = self.normalizer.normalized_key(ancestor);
                matches!(self.entries.get(&key), Some(e) if e.forced == Forced::Exclude)
            })
    }

    /// `true` if some force-included path lies strictly beneath `folder`.
    pub fn has_include_beneath(&self, folder: &Path) -> bool {
        let folder_key = self.normalizer.key(folder);
        self.entries
            .iter()
            .any(|(key, e)| e.forced == Forced::Include && key_is_beneath(key, &folder_key))
    }

    /// Drops every `forced` entry strictly beneath `dir`.
    pub fn purge_descendants(&mut self, dir: &Path, forced: Forced) {
        let dir_key = self.normalizer.key(dir);
        self.entries
            .retain(|key, e| !(e.forced == forced && key_is_beneath(key, &dir_key)));
    }

    /// A copy holding only the entries strictly beneath `base`.
    pub fn restricted_to(&self, base: &Path) -> Self {
        let base_key = self.normalizer.key(base);
        Self {
            normalizer: self.normalizer,
            entries: self
                .entries
                .iter()
                .filter(|(key, _)| key_is_beneath(key, &base_key))
                .map(|(key, e)| (key.clone(), e.clone()))
                .collect(),
        }
    }

    pub fn paths(&self, forced: Forced) -> impl Iterator<Item = &Path> + '_ {
        self.entries
            .values()
            .filter(move |e| e.forced == forced)
            .map(|e| e.path.as_path())
    }

    pub fn count(&self, forced: Forced) -> usize {
        self.paths(forced).count()
    }
}

/// Bounded undo stack plus redo stack of override snapshots.
#[derive(Debug, Clone)]
pub struct UndoHistory {
    undo: VecDeque<ManualOverrides>,
    redo: Vec<ManualOverrides>,
    capacity: usize,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(MAX_UNDO_STATES)
    }
}

impl UndoHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Records the state before a mutation. Clears the redo stack.
    pub fn record(&mut self, before: ManualOverrides) {
        self.push_undo(before);
        self.redo.clear();
    }

    fn push_undo(&mut self, snapshot: ManualOverrides) {
        self.undo.push_back(snapshot);
        while self.undo.len() > self.capacity {
            self.undo.pop_front();
        }
    }

    /// Swaps `current` with the most recent undo snapshot.
    pub fn undo(&mut self, current: ManualOverrides) -> Result<ManualOverrides, ManualOverrides> {
        match self.undo.pop_back() {
            Some(previous) => {
                self.redo.push(current);
                Ok(previous)
            }
            None => Err(current),
        }
    }

    /// Swaps `current` with the most recent redo snapshot.
    pub fn redo(&mut self, current: ManualOverrides) -> Result<ManualOverrides, ManualOverrides> {
        match self.redo.pop() {
            Some(next) => {
                self.push_undo(current);
                Ok(next)
            }
            None => Err(current),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }
}

/// The live overrides plus their history.
///
/// Not synchronized; every mutation is expected to come from one command context.
#[derive(Debug, Clone, Default)]
pub struct OverrideStore {
    current: ManualOverrides,
    history: UndoHistory,
}

impl OverrideStore {
    pub fn new(normalizer: PathNormalizer) -> Self {
        Self::with_overrides(ManualOverrides::new(normalizer))
    }

    /// Starts from previously persisted overrides with an empty history.
    pub fn with_overrides(current: ManualOverrides) -> Self {
        Self {
            current,
            history: UndoHistory::default(),
        }
    }

    pub fn current(&self) -> &ManualOverrides {
        &self.current
    }

    /// Flips the effective visibility of one path and returns the decision now forced on it.
    pub fn toggle_exclude(&mut self, engine: &FilterEngine, path: &Path, is_dir: bool) -> Forced {
        self.history.record(self.current.clone());
        self.toggle_core(engine, path, is_dir)
    }

    /// Toggles every selected path, recording a single undo snapshot for the batch.
    pub fn toggle_exclude_multiple(&mut self, engine: &FilterEngine, selection: &[SelectedPath]) {
        if selection.is_empty() {
            return;
        }
        self.history.record(self.current.clone());
        for selected in selection {
            self.toggle_core(engine, &selected.path, selected.is_directory);
        }
    }

    fn toggle_core(&mut self, engine: &FilterEngine, path: &Path, is_dir: bool) -> Forced {
        let currently_excluded = engine.is_excluded_as(&self.current, path, is_dir);
        self.current.remove(path);

        let forced = if currently_excluded {
            Forced::Include
        } else {
            Forced::Exclude
        };
        self.current.set(path, forced);
        if is_dir {
            self.current.purge_descendants(path, forced.opposite());
        }

        tracing::debug!("Toggled {:?} to {:?}", path, forced);
        forced
    }

    /// Clears every manual override (recorded for undo).
    pub fn reset(&mut self) {
        self.history.record(self.current.clone());
        self.current.clear();
    }

    /// Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let current = std::mem::take(&mut self.current);
        let (restored, changed) = match self.history.undo(current) {
            Ok(previous) => (previous, true),
            Err(current) => (current, false),
        };
        self.current = restored;
        changed
    }

    /// Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let current = std::mem::take(&mut self.current);
        let (restored, changed) = match self.history.redo(current) {
            Ok(next) => (next, true),
            Err(current) => (current, false),
        };
        self.current = restored;
        changed
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }
}

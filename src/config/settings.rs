//! Per-repository state files.
//!
//! Each repository gets one JSON file named after the hex SHA-256 digest of
//! its lowercased root path. Loading never fails: a missing or corrupt file
//! yields the defaults. Saving is best-effort and usually runs in the
//! background.

use directories::ProjectDirs;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use tempfile::NamedTempFile;

use super::PersistedState;
use crate::core::error::CoreError;
use crate::core::paths::PathNormalizer;

const QUALIFIER: &str = "com";
const ORGANIZATION: &str = "repotxt";
const APP_NAME: &str = "repotxt";

/// Returns the platform-specific local data directory for the application.
pub fn get_data_directory() -> Option<PathBuf> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APP_NAME)
        .map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
}

/// The storage key of a repository root: hex SHA-256 of its lowercased, normalized path.
pub fn state_key(root: &Path) -> String {
    let normalized = PathNormalizer::default().normalize(root);
    let lowered = normalized.to_string_lossy().to_lowercase();
    let digest = Sha256::digest(lowered.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Bookkeeping for background saves: how many are still queued, and the
/// sequence number of the newest snapshot written per state file.
#[derive(Debug, Default)]
struct SaveQueue {
    pending: Mutex<(usize, u64)>,
    idle: Condvar,
    written: Mutex<HashMap<PathBuf, u64>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SaveQueue {
    /// Registers a queued save and returns its sequence number.
    fn begin(&self) -> u64 {
        let mut pending = lock(&self.pending);
        pending.0 += 1;
        pending.1 += 1;
        pending.1
    }

    fn finish(&self) {
        let mut pending = lock(&self.pending);
        pending.0 = pending.0.saturating_sub(1);
        if pending.0 == 0 {
            self.idle.notify_all();
        }
    }

    fn wait_idle(&self) {
        let mut pending = lock(&self.pending);
        while pending.0 > 0 {
            pending = self
                .idle
                .wait(pending)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }
}

/// Reads and writes state files inside one directory.
///
/// Clones share the queue of background saves, and [`StateStore::load`]
/// waits for that queue to drain so it never reads a file mid-update.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
    queue: Arc<SaveQueue>,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            queue: Arc::default(),
        }
    }

    /// A store in the platform data directory.
    pub fn from_project_dirs() -> Result<Self, CoreError> {
        get_data_directory()
            .map(Self::new)
            .ok_or(CoreError::NoDataDirectory)
    }

    pub fn state_file(&self, root: &Path) -> PathBuf {
        self.dir.join(format!("{}.json", state_key(root)))
    }

    /// Loads the state for `root`, falling back to defaults on any problem.
    /// Queued background saves land first.
    pub fn load(&self, root: &Path) -> PersistedState {
        self.flush();
        let path = self.state_file(root);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No saved state at {:?}, using defaults", path);
                return PersistedState::default();
            }
            Err(e) => {
                tracing::warn!("Failed to read state file {:?}: {}. Using defaults.", path, e);
                return PersistedState::default();
            }
        };

        match serde_json::from_str::<PersistedState>(&content) {
            Ok(state) => {
                tracing::info!("Loaded state from {:?}", path);
                state
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to parse state file at {:?}: {}. Falling back to defaults.",
                    path,
                    e
                );
                PersistedState::default()
            }
        }
    }

    /// Writes the state for `root` through a temporary file in the same directory.
    pub fn save(&self, root: &Path, state: &PersistedState) -> Result<(), CoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| CoreError::Io(e, self.dir.clone()))?;

        let path = self.state_file(root);
        let json = serde_json::to_string_pretty(state)?;

        let mut tmp =
            NamedTempFile::new_in(&self.dir).map_err(|e| CoreError::Io(e, self.dir.clone()))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| CoreError::Io(e, tmp.path().to_path_buf()))?;
        tmp.persist(&path)?;

        tracing::debug!("Saved state to {:?}", path);
        Ok(())
    }

    /// Fire-and-forget save. Runs on tokio's blocking pool when a runtime is
    /// available, inline otherwise. Failures are logged, never returned.
    pub fn save_in_background(&self, root: &Path, state: PersistedState) {
        let store = self.clone();
        let root = root.to_path_buf();
        let seq = self.queue.begin();
        let job = move || {
            store.write_if_newest(&root, &state, seq);
            store.queue.finish();
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(job);
            }
            Err(_) => job(),
        }
    }

    /// Writes one queued snapshot unless a newer one for the same file already landed.
    fn write_if_newest(&self, root: &Path, state: &PersistedState, seq: u64) {
        let mut written = lock(&self.queue.written);
        let path = self.state_file(root);
        if written.get(&path).is_some_and(|&latest| latest > seq) {
            tracing::debug!("Skipping superseded save for {:?}", root);
            return;
        }
        match self.save(root, state) {
            Ok(()) => {
                written.insert(path, seq);
            }
            Err(e) => tracing::warn!("Failed to save state for {:?}: {}", root, e),
        }
    }

    /// Blocks until every background save queued so far has finished.
    pub fn flush(&self) {
        self.queue.wait_idle();
    }
}

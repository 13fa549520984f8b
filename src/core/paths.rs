//! Path canonicalization and comparison.
//!
//! Every path that enters the filtering layer goes through a [`PathNormalizer`]
//! first, so that `C:\Repo\src\` and `c:\repo\SRC` (or `/repo/./src/`) end up
//! comparing equal when the normalizer is case-insensitive.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Whether path and name comparisons fold case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseSensitivity {
    /// Paths differing only by case are the same path (Windows, default macOS).
    #[default]
    Insensitive,
    /// Paths are compared byte-for-byte.
    Sensitive,
}

/// Canonicalizes and compares paths under a fixed [`CaseSensitivity`].
///
/// Normalization is purely lexical: the path is made absolute against the
/// current directory, `.` and `..` components are resolved, and trailing
/// separators disappear. The file system is never consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PathNormalizer {
    case: CaseSensitivity,
}

impl PathNormalizer {
    pub fn new(case: CaseSensitivity) -> Self {
        Self { case }
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case == CaseSensitivity::Insensitive
    }

    /// Resolves `path` to an absolute path without trailing separators.
    pub fn normalize(&self, path: &Path) -> PathBuf {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let mut normalized = PathBuf::new();
        for component in absolute.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    normalized.pop();
                }
                other => normalized.push(other.as_os_str()),
            }
        }
        normalized
    }

    /// Returns the comparison key for `path`: normalized, `/`-separated, and
    /// lowercased when comparisons are case-insensitive.
    pub fn key(&self, path: &Path) -> String {
        self.normalized_key(&self.normalize(path))
    }

    /// [`Self::key`] for a path that has already been through [`Self::normalize`].
    pub fn normalized_key(&self, normalized: &Path) -> String {
        self.fold(&to_posix(&normalized.to_string_lossy()))
    }

    /// Applies the case rule to an arbitrary string (file names, dir names).
    pub fn fold(&self, text: &str) -> String {
        match self.case {
            CaseSensitivity::Insensitive => text.to_lowercase(),
            CaseSensitivity::Sensitive => text.to_string(),
        }
    }

    /// `true` if both paths normalize to the same location.
    pub fn same_path(&self, a: &Path, b: &Path) -> bool {
        self.key(a) == self.key(b)
    }

    /// `true` iff `path` lies strictly beneath `root`. A root is not its own descendant.
    pub fn is_descendant_of(&self, path: &Path, root: &Path) -> bool {
        matches!(self.relative_posix(path, root), Some(rel) if !rel.is_empty())
    }

    /// Returns `path` relative to `base` with `/` separators, or `None` when
    /// `path` is not `base` or one of its descendants. `base` itself maps to `""`.
    pub fn relative_posix(&self, path: &Path, base: &Path) -> Option<String> {
        let path = self.normalize(path);
        let base = self.normalize(base);
        let mut path_components = path.components();

        for base_component in base.components() {
            let component = path_components.next()?;
            if !self.component_eq(component.as_os_str(), base_component.as_os_str()) {
                return None;
            }
        }

        let rest: Vec<String> = path_components
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(rest.join("/"))
    }

    fn component_eq(&self, a: &OsStr, b: &OsStr) -> bool {
        match self.case {
            CaseSensitivity::Sensitive => a == b,
            CaseSensitivity::Insensitive => {
                a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
            }
        }
    }
}

/// `true` if comparison key `key` lies strictly beneath `root_key`.
pub(crate) fn key_is_beneath(key: &str, root_key: &str) -> bool {
    if !key.starts_with(root_key) || key.len() <= root_key.len() {
        return false;
    }
    root_key.ends_with('/') || key.as_bytes()[root_key.len()] == b'/'
}

#[cfg(windows)]
fn to_posix(text: &str) -> String {
    text.replace('\\', "/")
}

#[cfg(not(windows))]
fn to_posix(text: &str) -> String {
    text.to_string()
}

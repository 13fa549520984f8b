//! Walks a directory tree through a [`FilterEngine`].
//!
//! Two traversals share the same rules: a recursive flat listing of visible
//! folders and files, and an iterative enumeration of the visible files whose
//! content goes into a report. Hidden directories are never entered. A
//! directory that cannot be read is treated as empty.

use std::cmp::Ordering as CmpOrdering;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use walkdir::WalkDir;

use super::error::CoreError;
use super::filter::FilterEngine;
use super::overrides::ManualOverrides;

/// An immediate child of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
}

/// Lists the immediate children of `dir`: directories first, then files,
/// each group ordered case-insensitively by name.
///
/// Enumeration errors are logged and the affected entries skipped, so an
/// unreadable directory yields an empty list.
pub fn read_children(dir: &Path) -> Vec<ChildEntry> {
    let mut children: Vec<ChildEntry> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(ChildEntry {
                is_dir: entry.file_type().is_dir(),
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.into_path(),
            }),
            Err(e) => {
                tracing::debug!("Skipping unreadable entry under {:?}: {}", dir, e);
                None
            }
        })
        .collect();

    children.sort_by(compare_children);
    children
}

fn compare_children(a: &ChildEntry, b: &ChildEntry) -> CmpOrdering {
    b.is_dir
        .cmp(&a.is_dir)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Produces the folder listing and the visible-file stream below a base directory.
pub struct TreeBuilder<'a> {
    engine: &'a FilterEngine,
    overrides: &'a ManualOverrides,
    base: PathBuf,
    cancel_flag: Option<&'a AtomicBool>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(engine: &'a FilterEngine, overrides: &'a ManualOverrides, base: &Path) -> Self {
        Self {
            engine,
            overrides,
            base: engine.normalizer().normalize(base),
            cancel_flag: None,
        }
    }

    /// Makes both traversals stop with [`CoreError::Cancelled`] once `flag` is set.
    pub fn with_cancellation(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// `path` relative to the base, with `/` separators.
    pub fn relative(&self, path: &Path) -> String {
        self.engine
            .normalizer()
            .relative_posix(path, &self.base)
            .unwrap_or_else(|| path.to_string_lossy().replace('\\', "/"))
    }

    fn check_cancelled(&self) -> Result<(), CoreError> {
        match self.cancel_flag {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(CoreError::Cancelled),
            _ => Ok(()),
        }
    }

    fn is_visible_file(&self, path: &Path) -> bool {
        !self.engine.should_hide_file(path)
            && !self.engine.is_excluded_as(self.overrides, path, false)
    }

    /// The flat structure listing in depth-first order. Directories carry a
    /// trailing `/`; an excluded folder that holds forced includes is walked
    /// without a line of its own.
    pub fn flat_structure(&self) -> Result<Vec<String>, CoreError> {
        let mut lines = Vec::new();
        self.walk(&self.base, &mut lines)?;
        Ok(lines)
    }

    fn walk(&self, dir: &Path, lines: &mut Vec<String>) -> Result<(), CoreError> {
        self.check_cancelled()?;
        if self.engine.should_hide_directory(dir) {
            return Ok(());
        }

        for child in read_children(dir) {
            if child.is_dir {
                if !self.engine.folder_visually_excluded(self.overrides, &child.path) {
                    lines.push(format!("{}/", self.relative(&child.path)));
                    self.walk(&child.path, lines)?;
                } else if self.overrides.has_include_beneath(&child.path) {
                    self.walk(&child.path, lines)?;
                }
            } else if self.is_visible_file(&child.path) {
                lines.push(self.relative(&child.path));
            }
        }

        Ok(())
    }

    /// Absolute paths of every visible file. Each directory yields its files
    /// before its subdirectories are visited, in listing order.
    pub fn visible_files(&self) -> Result<Vec<PathBuf>, CoreError> {
        let mut files = Vec::new();
        let mut stack = vec![self.base.clone()];

        while let Some(dir) = stack.pop() {
            self.check_cancelled()?;
            if self.engine.should_hide_directory(&dir) {
                continue;
            }
            if dir != self.base && self.engine.folder_visually_excluded(self.overrides, &dir) {
                continue;
            }

            let children = read_children(&dir);
            let (subdirs, entries): (Vec<ChildEntry>, Vec<ChildEntry>) =
                children.into_iter().partition(|c| c.is_dir);

            files.extend(
                entries
                    .into_iter()
                    .filter(|file| self.is_visible_file(&file.path))
                    .map(|file| file.path),
            );
            stack.extend(subdirs.into_iter().rev().map(|d| d.path));
        }

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FilterConfig, ReportSettings};
    use crate::core::gitignore::GitIgnoreMatcher;
    use crate::core::overrides::Forced;
    use crate::core::paths::PathNormalizer;
    use std::fs;
    use tempfile::TempDir;

    fn create_file(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn setup_project() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        create_file(root, "src/a.ts", "export const a = 1;");
        create_file(root, "src/Beta.ts", "b");
        create_file(root, "src/util/c.ts", "c");
        create_file(root, "node_modules/x.js", "x");
        create_file(root, ".git/HEAD", "ref: refs/heads/main");
        create_file(root, ".gitignore", "*.log\n");
        create_file(root, "debug.log", "noise");
        create_file(root, "README.md", "# readme");
        create_file(root, "App.sln", "");
        dir
    }

    fn engine_for(root: &Path) -> FilterEngine {
        let normalizer = PathNormalizer::default();
        FilterEngine::new(
            root,
            normalizer,
            &FilterConfig::default(),
            GitIgnoreMatcher::load(root, normalizer),
            ReportSettings::default(),
        )
    }

    #[test]
    fn test_read_children_orders_directories_first_case_insensitively() {
        let dir = setup_project();
        let names: Vec<String> = read_children(&dir.path().join("src"))
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["util", "a.ts", "Beta.ts"]);
    }

    #[test]
    fn test_read_children_of_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_children(&dir.path().join("missing")).is_empty());
    }

    #[test]
    fn test_flat_structure_default_rules() {
        let dir = setup_project();
        let engine = engine_for(dir.path());
        let overrides = ManualOverrides::new(engine.normalizer());
        let lines = TreeBuilder::new(&engine, &overrides, dir.path())
            .flat_structure()
            .unwrap();
        assert_eq!(
            lines,
            vec!["src/", "src/util/", "src/util/c.ts", "src/a.ts", "src/Beta.ts", "README.md"]
        );
    }

    #[test]
    fn test_excluded_folder_with_forced_include_is_walked() {
        let dir = setup_project();
        create_file(dir.path(), "node_modules/y.js", "y");
        let engine = engine_for(dir.path());
        let mut overrides = ManualOverrides::new(engine.normalizer());
        overrides.set(&dir.path().join("node_modules/x.js"), Forced::Include);

        let builder = TreeBuilder::new(&engine, &overrides, dir.path());
        let lines = builder.flat_structure().unwrap();
        assert!(lines.contains(&"node_modules/".to_string()));
        assert!(lines.contains(&"node_modules/x.js".to_string()));
        // Not force-included and not excluded by its own name either.
        assert!(lines.contains(&"node_modules/y.js".to_string()));

        let files = builder.visible_files().unwrap();
        assert!(files.contains(&dir.path().join("node_modules/x.js")));
    }

    #[test]
    fn test_visible_files_order_and_filtering() {
        let dir = setup_project();
        let engine = engine_for(dir.path());
        let overrides = ManualOverrides::new(engine.normalizer());
        let builder = TreeBuilder::new(&engine, &overrides, dir.path());
        let relative: Vec<String> = builder
            .visible_files()
            .unwrap()
            .iter()
            .map(|p| builder.relative(p))
            .collect();
        assert_eq!(relative, vec!["README.md", "src/a.ts", "src/Beta.ts", "src/util/c.ts"]);
    }

    #[test]
    fn test_manual_exclude_removes_subtree() {
        let dir = setup_project();
        let engine = engine_for(dir.path());
        let mut overrides = ManualOverrides::new(engine.normalizer());
        overrides.set(&dir.path().join("src/util"), Forced::Exclude);
        let builder = TreeBuilder::new(&engine, &overrides, dir.path());
        let lines = builder.flat_structure().unwrap();
        assert_eq!(lines, vec!["src/", "src/a.ts", "src/Beta.ts", "README.md"]);
        assert_eq!(builder.visible_files().unwrap().len(), 3);
    }

    #[test]
    fn test_subdirectory_base_lists_relative_to_base() {
        let dir = setup_project();
        let engine = engine_for(dir.path());
        let overrides = ManualOverrides::new(engine.normalizer());
        let lines = TreeBuilder::new(&engine, &overrides, &dir.path().join("src"))
            .flat_structure()
            .unwrap();
        assert_eq!(lines, vec!["util/", "util/c.ts", "a.ts", "Beta.ts"]);
    }

    #[test]
    fn test_cancelled_traversal_returns_error() {
        let dir = setup_project();
        let engine = engine_for(dir.path());
        let overrides = ManualOverrides::new(engine.normalizer());
        let flag = AtomicBool::new(true);
        let builder = TreeBuilder::new(&engine, &overrides, dir.path()).with_cancellation(&flag);
        assert!(matches!(builder.flat_structure(), Err(CoreError::Cancelled)));
        assert!(matches!(builder.visible_files(), Err(CoreError::Cancelled)));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_treated_as_empty() {
        use std::os::unix::fs::PermissionsExt;
        if crate::utils::test_helpers::running_as_root() {
            return;
        }
        let dir = setup_project();
        let locked = dir.path().join("locked");
        create_file(dir.path(), "locked/inner.txt", "hidden");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let engine = engine_for(dir.path());
        let overrides = ManualOverrides::new(engine.normalizer());
        let builder = TreeBuilder::new(&engine, &overrides, dir.path());
        let lines = builder.flat_structure();
        let files = builder.visible_files();

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        let lines = lines.unwrap();
        assert!(lines.contains(&"locked/".to_string()));
        assert!(!lines.contains(&"locked/inner.txt".to_string()));
        assert!(lines.contains(&"README.md".to_string()));
        assert_eq!(files.unwrap().len(), 4);
    }
}

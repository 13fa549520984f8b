//! The single visibility decision combining patterns, `.gitignore` and manual overrides.

use std::path::{Path, PathBuf};

use super::gitignore::GitIgnoreMatcher;
use super::ignore::CompiledPatterns;
use super::overrides::ManualOverrides;
use super::paths::PathNormalizer;
use crate::config::{FilterConfig, ReportSettings};

/// Answers "is this path excluded?" for one repository root.
///
/// Precedence, highest first:
/// 1. a manual include on the path itself,
/// 2. a manual exclude on the path or any ancestor,
/// 3. structural hiding (hidden directory names, hidden file globs),
/// 4. `.gitignore`, when respected,
/// 5. auto-ignore directory names and file globs.
///
/// A binary extension never excludes a path; it only suppresses content.
#[derive(Debug, Clone)]
pub struct FilterEngine {
    root: PathBuf,
    normalizer: PathNormalizer,
    patterns: CompiledPatterns,
    gitignore: GitIgnoreMatcher,
    respect_gitignore: bool,
}

impl FilterEngine {
    pub fn new(
        root: &Path,
        normalizer: PathNormalizer,
        config: &FilterConfig,
        gitignore: GitIgnoreMatcher,
        settings: ReportSettings,
    ) -> Self {
        Self {
            root: normalizer.normalize(root),
            normalizer,
            patterns: CompiledPatterns::compile(config, normalizer),
            gitignore,
            respect_gitignore: settings.respect_gitignore,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn normalizer(&self) -> PathNormalizer {
        self.normalizer
    }

    pub fn gitignore(&self) -> &GitIgnoreMatcher {
        &self.gitignore
    }

    pub fn set_config(&mut self, config: &FilterConfig) {
        self.patterns = CompiledPatterns::compile(config, self.normalizer);
    }

    pub fn set_gitignore(&mut self, gitignore: GitIgnoreMatcher) {
        self.gitignore = gitignore;
    }

    pub fn set_respect_gitignore(&mut self, respect: bool) {
        self.respect_gitignore = respect;
    }

    /// Like [`Self::is_excluded_as`], asking the file system whether `path` is a directory.
    pub fn is_effectively_excluded(&self, overrides: &ManualOverrides, path: &Path) -> bool {
        self.is_excluded_as(overrides, path, path.is_dir())
    }

    /// The authoritative exclusion decision for a path of known kind.
    pub fn is_excluded_as(&self, overrides: &ManualOverrides, path: &Path, is_dir: bool) -> bool {
        if overrides.is_included(path) {
            return false;
        }
        if overrides.has_excluded_ancestor(path) {
            return true;
        }
        if self.is_structurally_hidden(path, is_dir) {
            return true;
        }
        if self.respect_gitignore && self.gitignore.is_ignored(path, is_dir) {
            return true;
        }
        self.is_auto_ignored(path, is_dir)
    }

    /// Hidden by name, or sitting inside a hidden directory.
    pub fn is_structurally_hidden(&self, path: &Path, is_dir: bool) -> bool {
        let hidden_by_name = if is_dir {
            self.should_hide_directory(path)
        } else {
            self.should_hide_file(path)
        };
        if hidden_by_name {
            return true;
        }

        match self.normalizer.relative_posix(path, &self.root) {
            Some(relative) => {
                let mut segments: Vec<&str> = relative.split('/').collect();
                segments.pop();
                segments
                    .iter()
                    .any(|segment| self.patterns.is_hidden_dir_name(segment))
            }
            None => path
                .parent()
                .and_then(|parent| parent.file_name())
                .is_some_and(|name| self.patterns.is_hidden_dir_name(&name.to_string_lossy())),
        }
    }

    /// Directory-walk rule: the directory's own name is a hidden directory name.
    pub fn should_hide_directory(&self, dir: &Path) -> bool {
        file_name(dir).is_some_and(|name| self.patterns.is_hidden_dir_name(&name))
    }

    /// Directory-walk rule: the file's name matches a hidden file glob.
    pub fn should_hide_file(&self, file: &Path) -> bool {
        file_name(file).is_some_and(|name| self.patterns.is_hidden_file_name(&name))
    }

    pub fn is_auto_ignored(&self, path: &Path, is_dir: bool) -> bool {
        let Some(name) = file_name(path) else {
            return false;
        };
        if is_dir {
            self.patterns.is_auto_ignored_dir_name(&name)
        } else {
            self.patterns.is_auto_ignored_file_name(&name)
        }
    }

    pub fn has_binary_extension(&self, path: &Path) -> bool {
        self.patterns.has_binary_extension(path)
    }

    /// A folder left out of the listing: hidden, or excluded with no
    /// force-included path beneath it. Such a folder with includes beneath it
    /// is still walked, only its own line is omitted.
    pub fn folder_visually_excluded(&self, overrides: &ManualOverrides, folder: &Path) -> bool {
        if self.should_hide_directory(folder) {
            return true;
        }
        if !self.is_excluded_as(overrides, folder, true) {
            return false;
        }
        !overrides.has_include_beneath(folder)
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::overrides::Forced;

    const ROOT: &str = "/repo";

    fn engine_with(gitignore: &str, settings: ReportSettings) -> FilterEngine {
        let normalizer = PathNormalizer::default();
        let root = Path::new(ROOT);
        FilterEngine::new(
            root,
            normalizer,
            &FilterConfig::default(),
            GitIgnoreMatcher::from_content(root, gitignore, normalizer),
            settings,
        )
    }

    fn engine() -> FilterEngine {
        engine_with("*.secret\n", ReportSettings::default())
    }

    fn overrides() -> ManualOverrides {
        ManualOverrides::new(PathNormalizer::default())
    }

    fn p(relative: &str) -> PathBuf {
        Path::new(ROOT).join(relative)
    }

    #[test]
    fn test_plain_file_is_included() {
        assert!(!engine().is_excluded_as(&overrides(), &p("src/a.ts"), false));
    }

    #[test]
    fn test_auto_ignore_rules() {
        let engine = engine();
        assert!(engine.is_excluded_as(&overrides(), &p("node_modules"), true));
        assert!(engine.is_excluded_as(&overrides(), &p("trace.log"), false));
        // A file is judged by its own name; its auto-ignored parent is handled by the walk.
        assert!(!engine.is_excluded_as(&overrides(), &p("node_modules/x.js"), false));
    }

    #[test]
    fn test_binary_extension_does_not_exclude() {
        let engine = engine();
        assert!(!engine.is_excluded_as(&overrides(), &p("secret.bin"), false));
        assert!(engine.has_binary_extension(&p("secret.bin")));
    }

    #[test]
    fn test_gitignore_respected_only_when_enabled() {
        let respecting = engine();
        assert!(respecting.is_excluded_as(&overrides(), &p("keys.secret"), false));

        let ignoring = engine_with(
            "*.secret\n",
            ReportSettings {
                respect_gitignore: false,
                ..ReportSettings::default()
            },
        );
        assert!(!ignoring.is_excluded_as(&overrides(), &p("keys.secret"), false));
    }

    #[test]
    fn test_manual_include_beats_every_automatic_rule() {
        let engine = engine();
        let mut overrides = overrides();
        overrides.set(&p("dir"), Forced::Exclude);
        for path in ["dir/keys.secret", "dir/trace.log", "node_modules"] {
            overrides.set(&p(path), Forced::Include);
        }
        assert!(!engine.is_excluded_as(&overrides, &p("dir/keys.secret"), false));
        assert!(!engine.is_excluded_as(&overrides, &p("dir/trace.log"), false));
        assert!(!engine.is_excluded_as(&overrides, &p("node_modules"), true));
        assert!(engine.is_excluded_as(&overrides, &p("dir/other.txt"), false));
    }

    #[test]
    fn test_structural_hide() {
        let engine = engine();
        assert!(engine.is_excluded_as(&overrides(), &p(".git"), true));
        assert!(engine.is_excluded_as(&overrides(), &p(".git/config"), false));
        assert!(engine.is_excluded_as(&overrides(), &p("App.sln"), false));
        assert!(engine.should_hide_directory(&p("sub/.vs")));
        assert!(!engine.should_hide_directory(&p("src")));
    }

    #[test]
    fn test_folder_visually_excluded() {
        let engine = engine();
        let mut overrides = overrides();
        assert!(engine.folder_visually_excluded(&overrides, &p("bin")));
        assert!(!engine.folder_visually_excluded(&overrides, &p("src")));

        overrides.set(&p("bin/Debug/app.config"), Forced::Include);
        assert!(!engine.folder_visually_excluded(&overrides, &p("bin")));
        // Hidden folders stay hidden whatever is included beneath them.
        overrides.set(&p(".git/HEAD"), Forced::Include);
        assert!(engine.folder_visually_excluded(&overrides, &p(".git")));
    }

    #[test]
    fn test_is_effectively_excluded_checks_the_file_system() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("build")).unwrap();
        let normalizer = PathNormalizer::default();
        let engine = FilterEngine::new(
            dir.path(),
            normalizer,
            &FilterConfig::default(),
            GitIgnoreMatcher::empty(dir.path(), normalizer),
            ReportSettings::default(),
        );
        let overrides = ManualOverrides::new(normalizer);
        assert!(engine.is_effectively_excluded(&overrides, &dir.path().join("build")));
        assert!(!engine.is_effectively_excluded(&overrides, &dir.path().join("build.txt")));
    }
}

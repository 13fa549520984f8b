pub mod settings;

use serde::{Deserialize, Serialize};

/// VCS and IDE artifacts. Never shown, and a manual include cannot bring them back.
pub const DEFAULT_HIDDEN_DIR_NAMES: &[&str] = &[".git", ".vs", ".idea", ".vscode"];

pub const DEFAULT_HIDDEN_FILE_GLOBS: &[&str] =
    &["*.sln", "*.slnx", "*.suo", "*.user", ".gitignore"];

/// Build output and dependency folders, hidden by default but overridable.
pub const DEFAULT_AUTO_IGNORE_DIR_NAMES: &[&str] = &[
    "bin",
    "obj",
    "node_modules",
    "packages",
    "dist",
    "out",
    "build",
];

pub const DEFAULT_AUTO_IGNORE_FILE_GLOBS: &[&str] = &[
    "*.meta", "*.tmp", "*.log", "*.lock", "*.cache", "*.map", "*.min.*",
];

/// Extensions whose content is never echoed into a report.
pub const DEFAULT_BINARY_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".bmp", ".ico", ".exe", ".dll", ".pdb", ".zip", ".tar",
    ".gz", ".7z", ".rar", ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".bin",
    ".class", ".obj",
];

/// The pattern collections that drive structural hiding and auto-ignore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    pub hidden_dir_names: Vec<String>,
    pub hidden_file_globs: Vec<String>,
    pub auto_ignore_dir_names: Vec<String>,
    pub auto_ignore_file_globs: Vec<String>,
    /// Lowercase, dot-prefixed extensions (`.png`).
    pub binary_extensions: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            hidden_dir_names: clean_patterns(DEFAULT_HIDDEN_DIR_NAMES),
            hidden_file_globs: clean_patterns(DEFAULT_HIDDEN_FILE_GLOBS),
            auto_ignore_dir_names: clean_patterns(DEFAULT_AUTO_IGNORE_DIR_NAMES),
            auto_ignore_file_globs: clean_patterns(DEFAULT_AUTO_IGNORE_FILE_GLOBS),
            binary_extensions: clean_extensions(DEFAULT_BINARY_EXTENSIONS),
        }
    }
}

impl FilterConfig {
    /// Replaces the four name/glob collections wholesale. Blank entries are discarded.
    pub fn update_patterns<S: AsRef<str>>(
        &mut self,
        hidden_dirs: &[S],
        hidden_files: &[S],
        auto_dirs: &[S],
        auto_files: &[S],
    ) {
        self.hidden_dir_names = clean_patterns(hidden_dirs);
        self.hidden_file_globs = clean_patterns(hidden_files);
        self.auto_ignore_dir_names = clean_patterns(auto_dirs);
        self.auto_ignore_file_globs = clean_patterns(auto_files);
    }

    pub fn set_binary_extensions<S: AsRef<str>>(&mut self, extensions: &[S]) {
        self.binary_extensions = clean_extensions(extensions);
    }
}

/// Trims every entry, drops empty ones and exact duplicates, keeps first-seen order.
pub fn clean_patterns<S: AsRef<str>>(patterns: &[S]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        let trimmed = pattern.as_ref().trim();
        if !trimmed.is_empty() && !cleaned.iter().any(|p| p == trimmed) {
            cleaned.push(trimmed.to_string());
        }
    }
    cleaned
}

/// Like [`clean_patterns`], but lowercases and ensures a leading dot.
pub fn clean_extensions<S: AsRef<str>>(extensions: &[S]) -> Vec<String> {
    let dotted: Vec<String> = clean_patterns(extensions)
        .into_iter()
        .map(|ext| {
            let ext = ext.to_lowercase();
            if ext.starts_with('.') {
                ext
            } else {
                format!(".{ext}")
            }
        })
        .collect();
    clean_patterns(&dotted)
}

/// Report-level flags persisted next to the patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSettings {
    pub wrap_long_lines: bool,
    pub respect_gitignore: bool,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            wrap_long_lines: false,
            respect_gitignore: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// The on-disk JSON model of one repository's state.
///
/// Pattern arrays are optional so that an absent or `null` collection falls
/// back to its compiled-in default instead of an empty set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub includes: Option<Vec<String>>,
    #[serde(default)]
    pub excludes: Option<Vec<String>>,
    #[serde(default)]
    pub wrap_long_lines: bool,
    #[serde(default = "default_true", rename = "respectGitIgnore")]
    pub respect_gitignore: bool,
    #[serde(default)]
    pub hidden_dir_names: Option<Vec<String>>,
    #[serde(default)]
    pub hidden_file_globs: Option<Vec<String>>,
    #[serde(default)]
    pub auto_ignore_dir_names: Option<Vec<String>>,
    #[serde(default)]
    pub auto_ignore_file_globs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_extensions: Option<Vec<String>>,
}

impl Default for PersistedState {
    fn default() -> Self {
        let settings = ReportSettings::default();
        Self {
            includes: None,
            excludes: None,
            wrap_long_lines: settings.wrap_long_lines,
            respect_gitignore: settings.respect_gitignore,
            hidden_dir_names: None,
            hidden_file_globs: None,
            auto_ignore_dir_names: None,
            auto_ignore_file_globs: None,
            binary_extensions: None,
        }
    }
}

impl PersistedState {
    /// Builds the snapshot written to disk.
    pub fn capture(
        includes: Vec<String>,
        excludes: Vec<String>,
        settings: ReportSettings,
        config: &FilterConfig,
    ) -> Self {
        Self {
            includes: Some(includes),
            excludes: Some(excludes),
            wrap_long_lines: settings.wrap_long_lines,
            respect_gitignore: settings.respect_gitignore,
            hidden_dir_names: Some(config.hidden_dir_names.clone()),
            hidden_file_globs: Some(config.hidden_file_globs.clone()),
            auto_ignore_dir_names: Some(config.auto_ignore_dir_names.clone()),
            auto_ignore_file_globs: Some(config.auto_ignore_file_globs.clone()),
            binary_extensions: Some(config.binary_extensions.clone()),
        }
    }

    pub fn settings(&self) -> ReportSettings {
        ReportSettings {
            wrap_long_lines: self.wrap_long_lines,
            respect_gitignore: self.respect_gitignore,
        }
    }

    /// The pattern collections, with defaults for every missing array.
    pub fn config(&self) -> FilterConfig {
        let defaults = FilterConfig::default();
        FilterConfig {
            hidden_dir_names: self
                .hidden_dir_names
                .as_deref()
                .map(clean_patterns)
                .unwrap_or(defaults.hidden_dir_names),
            hidden_file_globs: self
                .hidden_file_globs
                .as_deref()
                .map(clean_patterns)
                .unwrap_or(defaults.hidden_file_globs),
            auto_ignore_dir_names: self
                .auto_ignore_dir_names
                .as_deref()
                .map(clean_patterns)
                .unwrap_or(defaults.auto_ignore_dir_names),
            auto_ignore_file_globs: self
                .auto_ignore_file_globs
                .as_deref()
                .map(clean_patterns)
                .unwrap_or(defaults.auto_ignore_file_globs),
            binary_extensions: self
                .binary_extensions
                .as_deref()
                .map(clean_extensions)
                .unwrap_or(defaults.binary_extensions),
        }
    }

    pub fn includes(&self) -> Vec<String> {
        self.includes.as_deref().map(clean_patterns).unwrap_or_default()
    }

    pub fn excludes(&self) -> Vec<String> {
        self.excludes.as_deref().map(clean_patterns).unwrap_or_default()
    }
}

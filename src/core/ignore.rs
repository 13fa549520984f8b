use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::path::Path;

use super::paths::PathNormalizer;
use crate::config::FilterConfig;
use crate::utils::file_detection::dotted_extension;

/// Builds a `GlobSet` of file-name globs (`*.log`, `.gitignore`, `*.min.*`).
///
/// Globs are matched against a bare file name, never a path. A glob that
/// fails to compile is logged and skipped; the rest still apply.
pub fn build_globset_from_patterns(patterns: &[String], case_insensitive: bool) -> GlobSet {
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns {
        let trimmed_pattern = pattern.trim();
        if trimmed_pattern.is_empty() {
            continue;
        }

        match GlobBuilder::new(trimmed_pattern)
            .case_insensitive(case_insensitive)
            .literal_separator(true)
            .build()
        {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => tracing::warn!("Skipping invalid file pattern {:?}: {}", trimmed_pattern, e),
        }
    }

    builder.build().unwrap_or_else(|e| {
        tracing::error!("Failed to build glob set from patterns: {}", e);
        GlobSet::empty()
    })
}

/// [`FilterConfig`] compiled into lookup structures.
#[derive(Debug, Clone)]
pub struct CompiledPatterns {
    hidden_dirs: HashSet<String>,
    hidden_files: GlobSet,
    auto_dirs: HashSet<String>,
    auto_files: GlobSet,
    binary_extensions: HashSet<String>,
    normalizer: PathNormalizer,
}

impl CompiledPatterns {
    pub fn compile(config: &FilterConfig, normalizer: PathNormalizer) -> Self {
        let case_insensitive = normalizer.is_case_insensitive();
        let fold_all = |names: &[String]| -> HashSet<String> {
            names.iter().map(|n| normalizer.fold(n.trim())).collect()
        };

        Self {
            hidden_dirs: fold_all(&config.hidden_dir_names),
            hidden_files: build_globset_from_patterns(
                &config.hidden_file_globs,
                case_insensitive,
            ),
            auto_dirs: fold_all(&config.auto_ignore_dir_names),
            auto_files: build_globset_from_patterns(
                &config.auto_ignore_file_globs,
                case_insensitive,
            ),
            binary_extensions: config
                .binary_extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
            normalizer,
        }
    }

    pub fn is_hidden_dir_name(&self, name: &str) -> bool {
        self.hidden_dirs.contains(&self.normalizer.fold(name))
    }

    pub fn is_hidden_file_name(&self, name: &str) -> bool {
        self.hidden_files.is_match(name)
    }

    pub fn is_auto_ignored_dir_name(&self, name: &str) -> bool {
        self.auto_dirs.contains(&self.normalizer.fold(name))
    }

    pub fn is_auto_ignored_file_name(&self, name: &str) -> bool {
        self.auto_files.is_match(name)
    }

    /// Extension lookup is always case-insensitive.
    pub fn has_binary_extension(&self, path: &Path) -> bool {
        dotted_extension(path).is_some_and(|ext| self.binary_extensions.contains(&ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::paths::CaseSensitivity;

    #[test]
    fn test_default_patterns() {
        let patterns =
            CompiledPatterns::compile(&FilterConfig::default(), PathNormalizer::default());
        assert!(patterns.is_hidden_dir_name(".git"));
        assert!(patterns.is_hidden_dir_name(".VS"));
        assert!(patterns.is_hidden_file_name("App.sln"));
        assert!(patterns.is_hidden_file_name(".gitignore"));
        assert!(patterns.is_auto_ignored_dir_name("node_modules"));
        assert!(patterns.is_auto_ignored_file_name("debug.LOG"));
        assert!(patterns.is_auto_ignored_file_name("app.min.js"));
        assert!(!patterns.is_auto_ignored_file_name("main.rs"));
        assert!(patterns.has_binary_extension(Path::new("/repo/logo.PNG")));
        assert!(!patterns.has_binary_extension(Path::new("/repo/readme")));
    }

    #[test]
    fn test_case_sensitive_names() {
        let patterns = CompiledPatterns::compile(
            &FilterConfig::default(),
            PathNormalizer::new(CaseSensitivity::Sensitive),
        );
        assert!(patterns.is_auto_ignored_dir_name("bin"));
        assert!(!patterns.is_auto_ignored_dir_name("BIN"));
        assert!(!patterns.is_auto_ignored_file_name("debug.LOG"));
    }

    #[test]
    fn test_invalid_glob_is_skipped() {
        let set = build_globset_from_patterns(&["[".to_string(), "*.txt".to_string()], true);
        assert_eq!(set.len(), 1);
        assert!(set.is_match("notes.txt"));
    }
}

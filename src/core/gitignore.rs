//! A single-file `.gitignore` matcher with last-match-wins evaluation.
//!
//! Only the `.gitignore` at the repository root is honored. Each usable line
//! becomes one [`GitIgnoreRule`]; rules are evaluated in file order and the
//! last rule that matches decides whether a path is ignored.

use regex::{Regex, RegexBuilder};
use std::fs;
use std::path::{Path, PathBuf};

use super::paths::PathNormalizer;

pub const GITIGNORE_FILE: &str = ".gitignore";

/// One compiled line of a `.gitignore` file.
#[derive(Debug, Clone)]
pub struct GitIgnoreRule {
    source: String,
    pattern: Regex,
    negated: bool,
    directory_only: bool,
    anchored: bool,
}

impl GitIgnoreRule {
    /// Compiles one `.gitignore` line. Returns `None` for blank lines, comments,
    /// lines that are empty once their markers are stripped, and patterns
    /// whose translated regex fails to compile.
    pub fn parse(line: &str, case_insensitive: bool) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let (negated, rest) = match line.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, line),
        };
        let anchored = rest.starts_with('/');
        let rest = rest.trim_start_matches('/');
        let (directory_only, glob) = match rest.strip_suffix('/') {
            Some(glob) => (true, glob),
            None => (false, rest),
        };
        if glob.is_empty() {
            return None;
        }

        let mut expression = String::from(if anchored { "^" } else { "(?:^|.*/)" });
        expression.push_str(&glob_to_regex(glob));
        // Directories are matched with a trailing slash, so a directory-only
        // rule needs at least that slash, which also covers every path below it.
        expression.push_str(if directory_only { "/.*$" } else { "/?$" });

        match RegexBuilder::new(&expression)
            .case_insensitive(case_insensitive)
            .build()
        {
            Ok(pattern) => Some(Self {
                source: line.to_string(),
                pattern,
                negated,
                directory_only,
                anchored,
            }),
            Err(e) => {
                tracing::warn!("Dropping .gitignore rule {:?}: {}", line, e);
                None
            }
        }
    }

    /// The original line this rule was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn negated(&self) -> bool {
        self.negated
    }

    pub fn directory_only(&self) -> bool {
        self.directory_only
    }

    pub fn anchored(&self) -> bool {
        self.anchored
    }

    /// Matches a root-relative, `/`-separated path. Directories carry a trailing `/`.
    pub fn is_match(&self, relative: &str) -> bool {
        self.pattern.is_match(relative)
    }
}

/// Translates the glob body of a rule into a regex fragment.
///
/// `**/` matches zero or more whole directories, any other `**` matches
/// anything including separators, `*` and `?` stop at separators, and a
/// backslash takes the next character literally.
fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    let mut chars = glob.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("(?:.*/)?");
                } else {
                    out.push_str(".*");
                }
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '/' => out.push('/'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }

    out
}

/// The ordered rule set of one repository root.
#[derive(Debug, Clone, Default)]
pub struct GitIgnoreMatcher {
    root: PathBuf,
    rules: Vec<GitIgnoreRule>,
    normalizer: PathNormalizer,
}

impl GitIgnoreMatcher {
    /// A matcher without rules; nothing is ignored.
    pub fn empty(root: &Path, normalizer: PathNormalizer) -> Self {
        Self {
            root: normalizer.normalize(root),
            rules: Vec::new(),
            normalizer,
        }
    }

    /// Reads `<root>/.gitignore`. A missing or unreadable file yields an empty matcher.
    pub fn load(root: &Path, normalizer: PathNormalizer) -> Self {
        let path = root.join(GITIGNORE_FILE);
        match fs::read(&path) {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes);
                let matcher = Self::from_content(root, &content, normalizer);
                tracing::debug!(
                    "Loaded {} .gitignore rules from {:?}",
                    matcher.rules.len(),
                    path
                );
                matcher
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::empty(root, normalizer),
            Err(e) => {
                tracing::warn!("Could not read {:?}: {}. Ignoring it.", path, e);
                Self::empty(root, normalizer)
            }
        }
    }

    /// Compiles `.gitignore` text (LF or CRLF, optional BOM) for `root`.
    pub fn from_content(root: &Path, content: &str, normalizer: PathNormalizer) -> Self {
        let case_insensitive = normalizer.is_case_insensitive();
        let rules = content
            .trim_start_matches('\u{feff}')
            .lines()
            .filter_map(|line| GitIgnoreRule::parse(line, case_insensitive))
            .collect();

        Self {
            root: normalizer.normalize(root),
            rules,
            normalizer,
        }
    }

    pub fn rules(&self) -> &[GitIgnoreRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Last-match-wins evaluation for an absolute path. Paths outside the
    /// root, and the root itself, are never ignored.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        match self.normalizer.relative_posix(path, &self.root) {
            Some(relative) if !relative.is_empty() => self.is_ignored_relative(&relative, is_dir),
            _ => false,
        }
    }

    /// Last-match-wins evaluation for a root-relative, `/`-separated path.
    pub fn is_ignored_relative(&self, relative: &str, is_dir: bool) -> bool {
        let mut candidate = relative.trim_end_matches('/').to_string();
        if is_dir {
            candidate.push('/');
        }

        let mut ignored = false;
        for rule in &self.rules {
            if rule.is_match(&candidate) {
                ignored = !rule.negated;
            }
        }
        ignored
    }
}

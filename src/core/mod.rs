pub mod error;
pub mod file_handler;
pub mod filter;
pub mod gitignore;
pub mod ignore;
pub mod overrides;
pub mod paths;
pub mod tree_generator;

use std::path::PathBuf;

/// One item of a host-supplied selection for batch toggling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedPath {
    pub path: PathBuf,
    pub is_directory: bool,
}

impl SelectedPath {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_directory: false,
        }
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_directory: true,
        }
    }
}

pub use error::CoreError;
pub use file_handler::{FileContent, ReportRenderer};
pub use filter::FilterEngine;
pub use gitignore::{GitIgnoreMatcher, GitIgnoreRule};
pub use ignore::build_globset_from_patterns;
pub use overrides::{Forced, ManualOverrides, OverrideStore, UndoHistory};
pub use paths::{CaseSensitivity, PathNormalizer};
pub use tree_generator::TreeBuilder;

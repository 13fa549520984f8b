//! Builds the data behind a lazily expandable explorer tree.
//!
//! The host widget asks for one or two levels at a time and renders the
//! nodes itself; this module only decides what is listed and whether each
//! node is currently part of the report.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::core::filter::FilterEngine;
use crate::core::overrides::ManualOverrides;
use crate::core::tree_generator::{read_children, ChildEntry};

/// A serializable node of the explorer tree.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ExplorerNode {
    pub name: String,
    pub path: PathBuf,
    pub is_directory: bool,
    /// `false` when the node is effectively excluded from the report.
    pub is_included: bool,
    /// Whether expanding the node would show anything.
    pub has_children: bool,
    /// Populated only when the level was built with enough depth.
    pub children: Vec<ExplorerNode>,
}

/// Lists the non-hidden children of `dir`, recursing `depth - 1` more levels
/// into subdirectories. A depth of zero yields nothing.
pub fn build_level(
    engine: &FilterEngine,
    overrides: &ManualOverrides,
    dir: &Path,
    depth: usize,
) -> Vec<ExplorerNode> {
    if depth == 0 {
        return Vec::new();
    }

    visible_children(engine, dir)
        .map(|child| {
            let (children, has_children) = if !child.is_dir {
                (Vec::new(), false)
            } else if depth > 1 {
                let children = build_level(engine, overrides, &child.path, depth - 1);
                let has_children = !children.is_empty();
                (children, has_children)
            } else {
                let has_children = visible_children(engine, &child.path).next().is_some();
                (Vec::new(), has_children)
            };

            ExplorerNode {
                is_included: !engine.is_excluded_as(overrides, &child.path, child.is_dir),
                name: child.name,
                path: child.path,
                is_directory: child.is_dir,
                has_children,
                children,
            }
        })
        .collect()
}

fn visible_children<'e>(
    engine: &'e FilterEngine,
    dir: &Path,
) -> impl Iterator<Item = ChildEntry> + 'e {
    read_children(dir).into_iter().filter(move |child| {
        if child.is_dir {
            !engine.should_hide_directory(&child.path)
        } else {
            !engine.should_hide_file(&child.path)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FilterConfig, ReportSettings};
    use crate::core::gitignore::GitIgnoreMatcher;
    use crate::core::overrides::Forced;
    use crate::core::paths::PathNormalizer;
    use std::fs;

    fn create_file(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    fn engine_for(root: &Path) -> FilterEngine {
        let normalizer = PathNormalizer::default();
        FilterEngine::new(
            root,
            normalizer,
            &FilterConfig::default(),
            GitIgnoreMatcher::empty(root, normalizer),
            ReportSettings::default(),
        )
    }

    #[test]
    fn test_build_level_lists_non_hidden_children_with_inclusion() {
        let dir = tempfile::tempdir().unwrap();
        create_file(dir.path(), "src/main.rs");
        create_file(dir.path(), "node_modules/x.js");
        create_file(dir.path(), ".git/HEAD");
        create_file(dir.path(), "App.sln");
        fs::create_dir(dir.path().join("empty")).unwrap();
        create_file(dir.path(), "README.md");

        let engine = engine_for(dir.path());
        let overrides = ManualOverrides::new(engine.normalizer());
        let nodes = build_level(&engine, &overrides, dir.path(), 1);

        let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["empty", "node_modules", "src", "README.md"]);

        let node_modules = &nodes[1];
        assert!(node_modules.is_directory);
        assert!(!node_modules.is_included);
        assert!(node_modules.has_children);
        assert!(node_modules.children.is_empty());
        assert!(!nodes[0].has_children);
        assert!(nodes[3].is_included);
    }

    #[test]
    fn test_build_level_depth_two_fills_children() {
        let dir = tempfile::tempdir().unwrap();
        create_file(dir.path(), "bin/app.config");
        let engine = engine_for(dir.path());
        let mut overrides = ManualOverrides::new(engine.normalizer());
        overrides.set(&dir.path().join("bin"), Forced::Include);

        let nodes = build_level(&engine, &overrides, dir.path(), 2);
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].is_included);
        assert_eq!(nodes[0].children.len(), 1);
        assert_eq!(nodes[0].children[0].name, "app.config");
    }
}

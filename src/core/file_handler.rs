//! Renders the plain-text repository report.
//!
//! A report is a header line, the flat folder listing, a blank line, and one
//! `File:`/`Content:` block per visible file. File reads run in parallel on
//! the rayon pool and each one degrades to a sentinel on failure.

use rayon::prelude::*;
use std::borrow::Cow;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::error::CoreError;
use super::filter::FilterEngine;
use super::overrides::ManualOverrides;
use super::tree_generator::TreeBuilder;
use crate::utils::file_detection::decode_text;

/// Column at which long content lines are wrapped.
pub const WRAP_WIDTH: usize = 100;

pub const BINARY_SENTINEL: &str = "[Binary file, content not displayed]";
pub const UNREADABLE_SENTINEL: &str = "[Unable to read file content]";
/// Returned in place of a report when no repository is open.
pub const NO_ROOT_SENTINEL: &str = "No repository opened";

/// What a report shows for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Binary,
    Unreadable,
}

impl FileContent {
    /// Reads `path`, unless its extension marks it as binary.
    pub fn read(engine: &FilterEngine, path: &Path) -> Self {
        if engine.has_binary_extension(path) {
            return FileContent::Binary;
        }
        match fs::read(path) {
            Ok(bytes) => FileContent::Text(decode_text(bytes)),
            Err(e) => {
                tracing::debug!("Could not read {:?}: {}", path, e);
                FileContent::Unreadable
            }
        }
    }

    /// The text placed after `Content: `. Wrapping never touches the sentinels.
    pub fn render(&self, wrap_long_lines: bool) -> Cow<'_, str> {
        match self {
            FileContent::Text(text) if wrap_long_lines => Cow::Owned(wrap_text(text, WRAP_WIDTH)),
            FileContent::Text(text) => Cow::Borrowed(text),
            FileContent::Binary => Cow::Borrowed(BINARY_SENTINEL),
            FileContent::Unreadable => Cow::Borrowed(UNREADABLE_SENTINEL),
        }
    }
}

/// Breaks every line longer than `width` characters into chunks of at most
/// `width`. A full-width chunk whose last space sits past the midpoint is cut
/// at that space instead; the space starts the next chunk. CRLF becomes LF and
/// trailing line breaks are dropped.
pub fn wrap_text(text: &str, width: usize) -> String {
    let normalized = text.replace("\r\n", "\n");
    if width == 0 {
        return normalized.trim_end_matches(['\r', '\n']).to_string();
    }

    let mut wrapped = String::with_capacity(normalized.len() + normalized.len() / width);
    for line in normalized.split('\n') {
        let chars: Vec<char> = line.chars().collect();
        if chars.len() <= width {
            wrapped.push_str(line);
            wrapped.push('\n');
            continue;
        }

        let mut start = 0;
        while start < chars.len() {
            let mut take = width.min(chars.len() - start);
            if take == width && start + take < chars.len() {
                let chunk = &chars[start..start + take];
                if let Some(space) = chunk.iter().rposition(|&c| c == ' ') {
                    if space > width / 2 {
                        take = space;
                    }
                }
            }
            wrapped.extend(&chars[start..start + take]);
            wrapped.push('\n');
            start += take;
        }
    }

    wrapped.trim_end_matches(['\r', '\n']).to_string()
}

/// The header name: the display name, or `"{name} /{relative}"` for a subdirectory base.
pub fn header_name(display_name: &str, root: &Path, base: &Path, engine: &FilterEngine) -> String {
    let normalizer = engine.normalizer();
    match normalizer.relative_posix(base, root) {
        Some(relative) if !relative.is_empty() => {
            format!("{} /{}", display_name, relative.trim_matches('/'))
        }
        _ => display_name.to_string(),
    }
}

/// Renders one report over a borrowed engine and override snapshot.
pub struct ReportRenderer<'a> {
    engine: &'a FilterEngine,
    overrides: &'a ManualOverrides,
    base: &'a Path,
    header: &'a str,
    wrap_long_lines: bool,
    cancel_flag: Option<&'a AtomicBool>,
}

impl<'a> ReportRenderer<'a> {
    pub fn new(
        engine: &'a FilterEngine,
        overrides: &'a ManualOverrides,
        base: &'a Path,
        header: &'a str,
    ) -> Self {
        Self {
            engine,
            overrides,
            base,
            header,
            wrap_long_lines: false,
            cancel_flag: None,
        }
    }

    pub fn wrap_long_lines(mut self, wrap: bool) -> Self {
        self.wrap_long_lines = wrap;
        self
    }

    pub fn with_cancellation(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    pub fn render(&self) -> Result<String, CoreError> {
        let mut tree = TreeBuilder::new(self.engine, self.overrides, self.base);
        if let Some(flag) = self.cancel_flag {
            tree = tree.with_cancellation(flag);
        }

        let entries = tree.flat_structure()?;
        let files = tree.visible_files()?;
        tracing::debug!(
            "Rendering report for {:?}: {} entries, {} files",
            tree.base(),
            entries.len(),
            files.len()
        );

        let contents: Vec<FileContent> = files
            .par_iter()
            .map(|file| {
                if self.is_cancelled() {
                    return Err(CoreError::Cancelled);
                }
                Ok(FileContent::read(self.engine, file))
            })
            .collect::<Result<_, _>>()?;

        let mut report = String::new();
        let _ = writeln!(report, "Folder Structure: {}", self.header);
        for entry in &entries {
            report.push_str(entry);
            report.push('\n');
        }
        report.push('\n');

        for (file, content) in files.iter().zip(&contents) {
            let _ = writeln!(report, "File: {}", tree.relative(file));
            let _ = writeln!(report, "Content: {}", content.render(self.wrap_long_lines));
            report.push('\n');
        }

        Ok(report)
    }
}

/// An owned snapshot of everything a report needs, so rendering can run on a
/// blocking worker while the session keeps mutating its own state.
#[derive(Debug, Clone)]
pub struct ReportJob {
    pub engine: FilterEngine,
    pub overrides: ManualOverrides,
    pub base: PathBuf,
    pub header: String,
    pub wrap_long_lines: bool,
    pub cancel_flag: Arc<AtomicBool>,
}

impl ReportJob {
    pub fn run(&self) -> Result<String, CoreError> {
        ReportRenderer::new(&self.engine, &self.overrides, &self.base, &self.header)
            .wrap_long_lines(self.wrap_long_lines)
            .with_cancellation(&self.cancel_flag)
            .render()
    }

    /// Runs the job on tokio's blocking pool.
    pub async fn spawn(self) -> Result<String, CoreError> {
        tokio::task::spawn_blocking(move || self.run()).await?
    }
}

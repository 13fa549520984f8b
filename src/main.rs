use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use repotxt::app::proxy::NoopProxy;
use repotxt::app::state::SelectedPath;
use repotxt::app::RepoSession;
use repotxt::config::settings::StateStore;
use repotxt::core::paths::{CaseSensitivity, PathNormalizer};

/// Render a repository's folder structure and visible file contents as one text report.
#[derive(Parser, Debug)]
#[command(name = "repotxt", version, about)]
struct Args {
    /// Repository root
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Report only this subdirectory of the root
    #[arg(long)]
    subdir: Option<PathBuf>,

    /// Display name used in the report header (defaults to the root's directory name)
    #[arg(long)]
    name: Option<String>,

    /// Toggle the manual include/exclude state of these paths (relative to the root)
    #[arg(long, num_args = 1..)]
    toggle: Vec<PathBuf>,

    /// Wrap content lines longer than 100 characters
    #[arg(long)]
    wrap: Option<bool>,

    /// Honour the root .gitignore
    #[arg(long)]
    respect_gitignore: Option<bool>,

    /// Clear all manual overrides before anything else
    #[arg(long)]
    reset: bool,

    /// Restore every pattern set and flag to the defaults
    #[arg(long, conflicts_with = "reset")]
    defaults: bool,

    /// Undo this many override changes made earlier in this same run (history is not saved)
    #[arg(long, default_value_t = 0)]
    undo: usize,

    /// Redo this many changes undone earlier in this same run
    #[arg(long, default_value_t = 0)]
    redo: usize,

    /// Compare paths, names and patterns case-sensitively
    #[arg(long)]
    case_sensitive: bool,

    /// Directory for per-repository state files
    #[arg(long)]
    state_dir: Option<PathBuf>,
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let store = match &args.state_dir {
        Some(dir) => StateStore::new(dir),
        None => StateStore::from_project_dirs().context("Could not locate a state directory")?,
    };

    let root = std::path::absolute(&args.root)
        .with_context(|| format!("Invalid root path {:?}", args.root))?;
    anyhow::ensure!(root.is_dir(), "Root {:?} is not a directory", root);

    let case = if args.case_sensitive {
        CaseSensitivity::Sensitive
    } else {
        CaseSensitivity::Insensitive
    };
    let mut session =
        RepoSession::new(store.clone(), NoopProxy).with_normalizer(PathNormalizer::new(case));
    session.open_root(&root, args.name.clone());

    if args.defaults {
        session.reset_to_defaults();
    } else if args.reset {
        session.reset_manual_rules();
    }
    if let Some(wrap) = args.wrap {
        session.set_wrap_long_lines(wrap);
    }
    if let Some(respect) = args.respect_gitignore {
        session.set_respect_gitignore(respect);
    }

    if !args.toggle.is_empty() {
        let selection: Vec<SelectedPath> = args
            .toggle
            .iter()
            .map(|path| {
                let path = resolve(&root, path);
                SelectedPath {
                    is_directory: path.is_dir(),
                    path,
                }
            })
            .collect();
        session.toggle_exclude_multiple(&selection);
    }

    for _ in 0..args.undo {
        if !session.undo() {
            tracing::warn!("Nothing left to undo");
            break;
        }
    }
    for _ in 0..args.redo {
        if !session.redo() {
            tracing::warn!("Nothing left to redo");
            break;
        }
    }

    let cancel_flag = Arc::new(AtomicBool::new(false));
    let ctrl_c_flag = cancel_flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_flag.store(true, Ordering::Relaxed);
        }
    });

    let subdir = args.subdir.as_deref().map(|dir| resolve(&root, dir));
    let report = session
        .generate_report(subdir.as_deref(), cancel_flag)
        .await
        .context("Failed to generate report")?;

    store.flush();
    print!("{report}");
    Ok(())
}

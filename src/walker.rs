//! Directory traversal for the flattener.
//!
//! Uses the `ignore` crate. Defaults mirror a plain recursive walk: hidden
//! files are visited and `.gitignore` is not consulted. A `.huskignore`
//! file in the root is always honoured, and an [`InclusionPolicy`] prunes
//! directories before they are entered.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use thiserror::Error;
use tracing::debug;

use crate::filter::{FilterResult, InclusionPolicy};

/// Name of the root-level ignore file (gitignore syntax).
pub const IGNORE_FILE: &str = ".huskignore";

/// Errors that can occur during directory walking.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("symlink loop detected: {path}")]
    SymlinkLoop { path: PathBuf },
}

/// Options for directory walking.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Maximum depth to recurse (None = unlimited).
    pub max_depth: Option<usize>,
    /// Follow symbolic links.
    pub follow_symlinks: bool,
    /// Include hidden files and directories.
    pub include_hidden: bool,
    /// Respect .gitignore patterns.
    pub respect_gitignore: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            follow_symlinks: false,
            include_hidden: true,
            respect_gitignore: false,
        }
    }
}

impl WalkOptions {
    /// Honour .gitignore, .git/info/exclude and the global gitignore.
    pub fn with_gitignore() -> Self {
        Self {
            respect_gitignore: true,
            ..Default::default()
        }
    }

    /// Set maximum depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}

/// A file found by the walk.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    /// Absolute (or root-joined) path.
    pub path: PathBuf,
    /// Path relative to the walk root.
    pub relative: PathBuf,
}

/// Walk `root`, yielding files accepted by `policy` in file-name order.
///
/// # Examples
///
/// ```no_run
/// use husk::filter::InclusionPolicy;
/// use husk::walker::{walk_files, WalkOptions};
/// use std::path::Path;
///
/// let policy = InclusionPolicy::default();
/// for entry in walk_files(Path::new("."), &policy, &WalkOptions::default()).unwrap().flatten() {
///     println!("{}", entry.relative.display());
/// }
/// ```
pub fn walk_files(
    root: &Path,
    policy: &InclusionPolicy,
    options: &WalkOptions,
) -> Result<impl Iterator<Item = Result<WalkEntry, WalkError>>, WalkError> {
    if !root.exists() {
        return Err(WalkError::NotFound {
            path: root.to_path_buf(),
        });
    }
    if !root.is_dir() {
        return Err(WalkError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let mut builder = WalkBuilder::new(root);

    builder
        .hidden(!options.include_hidden)
        .ignore(false)
        .parents(options.respect_gitignore)
        .git_ignore(options.respect_gitignore)
        .git_global(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .require_git(false)
        .follow_links(options.follow_symlinks)
        .max_depth(options.max_depth)
        .sort_by_file_name(|a, b| a.cmp(b));

    let huskignore = root.join(IGNORE_FILE);
    if huskignore.exists() {
        if let Some(err) = builder.add_ignore(&huskignore) {
            debug!(error = %err, "ignoring malformed {}", IGNORE_FILE);
        }
    }

    let dir_root = root.to_path_buf();
    let dir_policy = policy.clone();
    builder.filter_entry(move |entry| {
        let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
        if !is_dir || entry.depth() == 0 {
            return true;
        }
        let relative = entry.path().strip_prefix(&dir_root).unwrap_or(entry.path());
        match dir_policy.check_dir(relative) {
            FilterResult::Accept => true,
            FilterResult::Reject(reason) => {
                debug!(path = %relative.display(), %reason, "skipping directory");
                false
            }
        }
    });

    let file_root = root.to_path_buf();
    let file_policy = policy.clone();
    let walker = builder.build();

    Ok(walker.filter_map(move |result| match result {
        Ok(entry) => {
            // A symlink is kept when its target is a regular file.
            let is_file = entry.file_type().is_some_and(|ft| {
                ft.is_file() || (ft.is_symlink() && entry.path().is_file())
            });
            if !is_file {
                return None;
            }
            let path = entry.path().to_path_buf();
            let relative = path.strip_prefix(&file_root).unwrap_or(&path).to_path_buf();
            if relative.as_os_str() == IGNORE_FILE {
                return None;
            }
            match file_policy.check_file(&relative) {
                FilterResult::Accept => Some(Ok(WalkEntry { path, relative })),
                FilterResult::Reject(reason) => {
                    debug!(path = %relative.display(), %reason, "skipping file");
                    None
                }
            }
        }
        Err(err) => convert_error(err),
    }))
}

fn convert_error(err: ignore::Error) -> Option<Result<WalkEntry, WalkError>> {
    match err {
        ignore::Error::WithPath { path, err } => match *err {
            ignore::Error::Io(io_err) => Some(Err(io_error(path, io_err))),
            ignore::Error::Loop { child, .. } => Some(Err(WalkError::SymlinkLoop { path: child })),
            other => convert_error(other),
        },
        ignore::Error::WithDepth { err, .. } => convert_error(*err),
        ignore::Error::Loop { child, .. } => Some(Err(WalkError::SymlinkLoop { path: child })),
        ignore::Error::Io(io_err) => Some(Err(io_error(PathBuf::from("<walk error>"), io_err))),
        // Skip non-IO errors (like ignore file parse errors)
        _ => None,
    }
}

fn io_error(path: PathBuf, source: std::io::Error) -> WalkError {
    if source.kind() == std::io::ErrorKind::PermissionDenied {
        WalkError::PermissionDenied { path }
    } else {
        WalkError::Io { path, source }
    }
}

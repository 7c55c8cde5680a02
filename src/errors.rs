//! Error types for husk.

use std::path::{Path, PathBuf};

use crate::filter::FilterError;
use crate::syntax::ParseError;
use crate::walker::WalkError;

/// Top-level error type for husk operations.
#[derive(Debug, thiserror::Error)]
pub enum HuskError {
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("{path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("walk error: {0}")]
    Walk(#[from] WalkError),

    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HuskError {
    /// Wrap an I/O error, keeping permission failures distinguishable.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            HuskError::PermissionDenied(path.to_path_buf())
        } else {
            HuskError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Map an error to its exit code.
pub fn exit_code(error: &HuskError) -> i32 {
    match error {
        HuskError::PathNotFound(_) => 3,
        HuskError::NotADirectory(_) => 2,
        HuskError::PermissionDenied(_) => 4,
        HuskError::Parse { .. } => 1,
        HuskError::Io { .. } => 1,
        HuskError::Walk(_) => 2,
        HuskError::Filter(_) => 1,
        HuskError::Serialization(_) => 1,
    }
}

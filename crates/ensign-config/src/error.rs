use std::path::PathBuf;

use thiserror::Error;

/// Errors from reading or writing project and session files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Sexp(#[from] ensign_sexp::SexpError),

    #[error("session file error: {0}")]
    Json(#[from] serde_json::Error),

    /// No `.ensime` file in the given directory or any ancestor.
    #[error("no .ensime config found above {start}", start = .0.display())]
    NotFound(PathBuf),

    /// The `.ensime` file parsed but is not a keyed list.
    #[error("malformed .ensime config at {path}: {reason}", path = .path.display())]
    Malformed {
        path: PathBuf,
        reason: String,
    },

    /// A launch configuration that cannot be turned into a debug target.
    #[error("launch config {name:?} is invalid: {reason}")]
    InvalidLaunch {
        name: String,
        reason: String,
    },
}

//! Error types for gitty-core.

use std::path::PathBuf;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in gitty-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Config file exists but could not be parsed.
    #[error("failed to parse {file}: {message}")]
    ConfigParse { file: PathBuf, message: String },

    /// Unknown provider name in config or on the command line.
    #[error("unknown provider kind '{0}' (expected github, gitlab, gitea or bitbucket)")]
    UnknownProviderKind(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

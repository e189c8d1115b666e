//! Error types for gitty-git.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while inspecting a local repository.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not inside a git repository.
    #[error("not a git repository")]
    NotARepository,

    /// The repository has no remotes configured.
    #[error("no remote found")]
    NoRemote,

    /// Remote not found.
    #[error("remote not found: {0}")]
    RemoteNotFound(String),

    /// The remote URL or argument does not name a hosted repository.
    #[error("does not look like a valid path or URL: {0}")]
    InvalidRemoteUrl(String),

    /// Reference not found.
    #[error("reference not found: {0}")]
    RefNotFound(String),

    /// A ref resolved to an object that is not in the local object database.
    #[error("commit not found: {0}")]
    CommitNotFound(String),

    /// Underlying git2 error.
    #[error("git error: {0}")]
    Git2(#[from] git2::Error),
}

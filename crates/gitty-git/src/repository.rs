//! Repository wrapper providing read-only git operations.

use std::collections::HashSet;
use std::path::Path;

use git2::{BranchType, ErrorCode, Oid};

use crate::error::{Error, Result};
use crate::remote_url::RemoteUrl;

const UPSTREAM_REMOTE: &str = "upstream";
const ORIGIN_REMOTE: &str = "origin";

/// A local branch's tracking configuration (`branch.<name>.remote` / `.merge`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    /// Configured remote name.
    pub remote: String,

    /// Configured merge ref, usually `refs/heads/<branch>`.
    pub merge: String,
}

impl Upstream {
    /// Short name of the merge ref.
    #[must_use]
    pub fn merge_short(&self) -> &str {
        self.merge
            .strip_prefix("refs/heads/")
            .unwrap_or(&self.merge)
    }
}

/// High-level wrapper around a git repository.
pub struct Repository {
    inner: git2::Repository,
}

impl Repository {
    /// Open the repository containing the given path.
    ///
    /// # Errors
    /// Returns `NotARepository` if no repository is found at path or any parent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let inner = git2::Repository::discover(path).map_err(|e| match e.code() {
            ErrorCode::NotFound => Error::NotARepository,
            _ => Error::Git2(e),
        })?;
        Ok(Self { inner })
    }

    /// Open the repository containing the current directory.
    ///
    /// # Errors
    /// Returns error if not inside a git repository.
    pub fn open_current() -> Result<Self> {
        Self::open(".")
    }

    /// Get the path to the repository root (workdir).
    #[must_use]
    pub fn workdir(&self) -> Option<&Path> {
        self.inner.workdir()
    }

    /// Get the path to the .git directory.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        self.inner.path()
    }

    // === Branch operations ===

    /// List all local branches.
    ///
    /// # Errors
    /// Returns error if branch listing fails.
    pub fn list_branches(&self) -> Result<Vec<String>> {
        let branches = self.inner.branches(Some(BranchType::Local))?;

        let names: Vec<String> = branches
            .filter_map(std::result::Result::ok)
            .filter_map(|(b, _)| b.name().ok().flatten().map(String::from))
            .collect();

        Ok(names)
    }

    /// Get the tip commit of a local branch.
    ///
    /// # Errors
    /// Returns `RefNotFound` if the branch doesn't exist.
    pub fn branch_commit(&self, branch_name: &str) -> Result<Oid> {
        self.resolve_ref(&format!("refs/heads/{branch_name}"))
    }

    /// Get the tip commit of `<remote>/<branch>` as last fetched.
    ///
    /// # Errors
    /// Returns `RefNotFound` if the remote-tracking ref was never fetched.
    pub fn remote_branch_commit(&self, remote: &str, branch_name: &str) -> Result<Oid> {
        self.resolve_ref(&format!("refs/remotes/{remote}/{branch_name}"))
    }

    fn resolve_ref(&self, name: &str) -> Result<Oid> {
        let reference = self
            .inner
            .find_reference(name)
            .and_then(|r| r.resolve())
            .map_err(|_| Error::RefNotFound(name.into()))?;

        reference
            .target()
            .ok_or_else(|| Error::RefNotFound(name.into()))
    }

    /// Read a branch's tracking configuration.
    ///
    /// Returns `None` unless both `branch.<name>.remote` and
    /// `branch.<name>.merge` are set.
    ///
    /// # Errors
    /// Returns error if the repository config can't be read.
    pub fn upstream(&self, branch_name: &str) -> Result<Option<Upstream>> {
        let config = self.inner.config()?;
        let read = |key: &str| match config.get_string(&format!("branch.{branch_name}.{key}")) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(Error::Git2(e)),
        };

        match (read("remote")?, read("merge")?) {
            (Some(remote), Some(merge)) => Ok(Some(Upstream { remote, merge })),
            _ => Ok(None),
        }
    }

    // === Commit graph ===

    /// Check that `oid` names a commit in the local object database.
    ///
    /// # Errors
    /// Returns `CommitNotFound` otherwise.
    pub fn require_commit(&self, oid: Oid) -> Result<()> {
        self.inner
            .find_commit(oid)
            .map(|_| ())
            .map_err(|_| Error::CommitNotFound(oid.to_string()))
    }

    /// Every commit reachable from `tip` by following parent edges,
    /// including `tip` itself.
    ///
    /// # Errors
    /// Returns error if `tip` is missing or the walk fails.
    pub fn ancestry(&self, tip: Oid) -> Result<HashSet<Oid>> {
        self.require_commit(tip)?;

        let mut revwalk = self.inner.revwalk()?;
        revwalk.push(tip)?;

        revwalk
            .map(|oid| oid.map_err(Error::from))
            .collect()
    }

    // === Remote operations ===

    /// Names of all configured remotes.
    ///
    /// # Errors
    /// Returns error if the remote list can't be read.
    pub fn remote_names(&self) -> Result<Vec<String>> {
        let remotes = self.inner.remotes()?;
        Ok(remotes.iter().flatten().map(String::from).collect())
    }

    /// Fetch URL of a remote.
    ///
    /// # Errors
    /// Returns `RemoteNotFound` if the remote doesn't exist or has no URL.
    pub fn remote_url(&self, name: &str) -> Result<String> {
        let remote = self
            .inner
            .find_remote(name)
            .map_err(|_| Error::RemoteNotFound(name.into()))?;

        remote
            .url()
            .map(String::from)
            .ok_or_else(|| Error::RemoteNotFound(name.into()))
    }

    /// The remote describing this checkout's hosted repository.
    ///
    /// Prefers `upstream`, then `origin`, then the first configured remote.
    ///
    /// # Errors
    /// Returns `NoRemote` when nothing is configured, or `InvalidRemoteUrl`
    /// if the chosen remote's URL can't be parsed.
    pub fn preferred_remote(&self) -> Result<(String, RemoteUrl)> {
        let names = self.remote_names()?;
        let name = [UPSTREAM_REMOTE, ORIGIN_REMOTE]
            .into_iter()
            .find(|preferred| names.iter().any(|n| n == preferred))
            .map(String::from)
            .or_else(|| names.into_iter().next())
            .ok_or(Error::NoRemote)?;

        let url = RemoteUrl::parse(&self.remote_url(&name)?)?;
        tracing::debug!(remote = %name, url = %url, "resolved remote");
        Ok((name, url))
    }

    // === Low-level access ===

    /// Get a reference to the underlying git2 repository.
    ///
    /// Use sparingly - prefer high-level methods.
    #[must_use]
    pub const fn inner(&self) -> &git2::Repository {
        &self.inner
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.git_dir())
            .finish()
    }
}

//! The capability contract every hosting backend implements.

use chrono::{DateTime, Utc};
use gitty_core::{Branch, Commit, Issue, PullRequest, Repository};

use crate::Result;

/// Read-only operations against a git hosting backend.
///
/// This trait abstracts the backend API, allowing for:
/// - One implementation per backend, selected by [`crate::Provider`]
/// - Mock implementations for testing
///
/// List operations drain every page before returning. Implementations are
/// safe to call concurrently; no per-call state is shared between calls.
pub trait Forge: Send + Sync {
    /// All open issues, newest first.
    ///
    /// A disabled issue tracker yields an empty list, not an error.
    fn issues(
        &self,
        owner: &str,
        name: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Issue>>> + Send;

    /// All open pull (merge) requests, newest first.
    fn pull_requests(
        &self,
        owner: &str,
        name: &str,
    ) -> impl std::future::Future<Output = Result<Vec<PullRequest>>> + Send;

    /// Repository metadata plus its newest release, if any.
    fn repository(
        &self,
        owner: &str,
        name: &str,
    ) -> impl std::future::Future<Output = Result<Repository>> + Send;

    /// Non-fork repositories owned by a user or organization.
    fn repositories(
        &self,
        owner: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Repository>>> + Send;

    /// All branches with their tip commit.
    fn branches(
        &self,
        owner: &str,
        name: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Branch>>> + Send;

    /// Commits on the default branch at or after `since`, newest first.
    ///
    /// `max_count == 0` means unbounded.
    fn history(
        &self,
        repo: &Repository,
        max_count: usize,
        since: Option<DateTime<Utc>>,
    ) -> impl std::future::Future<Output = Result<Vec<Commit>>> + Send;

    /// Login of the authenticated user.
    fn username(&self) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Web URL of issue or pull request `number`.
    ///
    /// Tries the issue first, then the pull request. `None` means neither
    /// exists.
    fn issue_url(
        &self,
        owner: &str,
        name: &str,
        number: u64,
    ) -> impl std::future::Future<Output = Result<Option<String>>> + Send;
}

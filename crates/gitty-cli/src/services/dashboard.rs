//! Single-repository dashboard: issues, pull requests, active branches and
//! the commits since the last release.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use gitty_core::{Branch, BranchTrackingStatus, Commit, Issue, PullRequest, Repository};
use gitty_forge::Forge;
use serde::Serialize;

/// A remote branch plus how the matching local branch relates to it.
#[derive(Debug, Clone, Serialize)]
pub struct BranchRow {
    #[serde(flatten)]
    pub branch: Branch,

    /// `None` when there is no local counterpart (or no local checkout).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking: Option<BranchTrackingStatus>,
}

/// Everything shown for one repository.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub repository: Repository,
    pub issues: Vec<Issue>,
    pub pull_requests: Vec<PullRequest>,
    pub branches: Vec<BranchRow>,

    /// Commits since the last release, or the latest ones if there is none.
    pub commits: Vec<Commit>,
}

impl Dashboard {
    /// Attach local tracking statuses to the branch rows.
    pub fn attach_tracking(&mut self, statuses: &BTreeMap<String, Option<BranchTrackingStatus>>) {
        for row in &mut self.branches {
            row.tracking = statuses.get(&row.branch.name).copied().flatten();
        }
    }
}

/// Service fetching a [`Dashboard`] from any backend.
pub struct DashboardService<'a, F: Forge> {
    forge: &'a F,
    owner: String,
    name: String,
}

impl<'a, F: Forge> DashboardService<'a, F> {
    /// Create a new dashboard service.
    pub const fn new(forge: &'a F, owner: String, name: String) -> Self {
        Self { forge, owner, name }
    }

    /// Run the four fetches concurrently; the first failure aborts the rest.
    pub async fn fetch(
        &self,
        max_commits: usize,
        max_branch_age_days: i64,
        max_branches: usize,
    ) -> Result<Dashboard> {
        let (owner, name) = (self.owner.as_str(), self.name.as_str());

        let (issues, pull_requests, branches, (repository, commits)) = tokio::try_join!(
            self.forge.issues(owner, name),
            self.forge.pull_requests(owner, name),
            self.forge.branches(owner, name),
            self.repository_with_history(max_commits),
        )?;

        let branches = active_branches(branches, Utc::now(), max_branch_age_days, max_branches)
            .into_iter()
            .map(|branch| BranchRow {
                branch,
                tracking: None,
            })
            .collect();

        Ok(Dashboard {
            repository,
            issues,
            pull_requests,
            branches,
            commits,
        })
    }

    /// Repository metadata, then its history since the last release.
    ///
    /// Without a release only the newest `max_commits` are fetched.
    async fn repository_with_history(
        &self,
        max_commits: usize,
    ) -> gitty_forge::Result<(Repository, Vec<Commit>)> {
        let repository = self.forge.repository(&self.owner, &self.name).await?;
        let since = repository.released_at();
        let cap = if since.is_some() { 0 } else { max_commits };
        let commits = self.forge.history(&repository, cap, since).await?;
        Ok((repository, commits))
    }
}

/// Newest first (ties by name), without branches idle for more than
/// `max_age_days`, at most `max` of them. Zero disables either limit.
pub fn active_branches(
    mut branches: Vec<Branch>,
    now: DateTime<Utc>,
    max_age_days: i64,
    max: usize,
) -> Vec<Branch> {
    branches.sort_by(|a, b| {
        b.last_commit
            .committed_at
            .cmp(&a.last_commit.committed_at)
            .then_with(|| a.name.cmp(&b.name))
    });

    if max_age_days > 0 {
        let cutoff = now - Duration::days(max_age_days);
        branches.retain(|b| b.last_commit.committed_at >= cutoff);
    }
    if max > 0 {
        branches.truncate(max);
    }
    branches
}

//! Canonical domain types.
//!
//! Every backend response is normalized into these types before it leaves
//! the provider layer. All values are built fresh per invocation and never
//! mutated once handed to a caller.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Color assigned to labels whose backend color cannot be parsed.
pub const FALLBACK_LABEL_COLOR: &str = "#333333";

/// Ahead/behind counts above this are displayed as `99+`.
pub const MAX_TRACK_COUNT: usize = 99;

/// The hosting backend family a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// GitHub (GraphQL API).
    GitHub,
    /// GitLab (REST v4).
    GitLab,
    /// Gitea, Forgejo and Codeberg (REST v1).
    Gitea,
    /// Bitbucket Cloud (REST 2.0).
    #[serde(rename = "bitbucket")]
    BitbucketCloud,
}

impl ProviderKind {
    /// All backend kinds, in probing-table order.
    pub const ALL: [Self; 4] = [Self::GitHub, Self::GitLab, Self::Gitea, Self::BitbucketCloud];

    /// Stable lowercase identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::GitLab => "gitlab",
            Self::Gitea => "gitea",
            Self::BitbucketCloud => "bitbucket",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownProviderKind(s.to_string()))
    }
}

/// An issue or pull request label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Label name.
    pub name: String,

    /// Normalized `#RRGGBB` color.
    pub color: String,
}

impl Label {
    /// Create a label, normalizing whatever color notation the backend used.
    #[must_use]
    pub fn new(name: impl Into<String>, color: &str) -> Self {
        Self {
            name: name.into(),
            color: normalize_color(color),
        }
    }
}

/// Normalize `d73a4a`, `#d73a4a` or `#fff` into `#RRGGBB`.
///
/// Anything unparseable becomes [`FALLBACK_LABEL_COLOR`].
#[must_use]
pub fn normalize_color(raw: &str) -> String {
    let hex = raw.trim().trim_start_matches('#');
    let expanded: String = if hex.len() == 3 {
        hex.chars().flat_map(|c| [c, c]).collect()
    } else {
        hex.to_string()
    };

    if expanded.len() == 6 && expanded.chars().all(|c| c.is_ascii_hexdigit()) {
        format!("#{}", expanded.to_ascii_uppercase())
    } else {
        FALLBACK_LABEL_COLOR.to_string()
    }
}

/// An open issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Provider-scoped issue number.
    pub number: u64,

    /// Issue title.
    pub title: String,

    /// Issue body (may be empty).
    pub body: String,

    /// When the issue was opened.
    pub created_at: DateTime<Utc>,

    /// Labels in backend order.
    pub labels: Vec<Label>,
}

/// An open pull request (merge request on GitLab).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Provider-scoped PR number.
    pub number: u64,

    /// PR title.
    pub title: String,

    /// PR body/description (may be empty).
    pub body: String,

    /// When the PR was opened.
    pub created_at: DateTime<Utc>,

    /// Labels in backend order.
    pub labels: Vec<Label>,
}

/// A commit snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Full commit hash, never abbreviated.
    pub id: String,

    /// First line of the commit message.
    pub headline: String,

    /// Author login or display name, whichever the backend provides.
    pub author: String,

    /// Commit timestamp.
    pub committed_at: DateTime<Utc>,
}

impl Commit {
    /// First line of a (possibly multi-line) commit message.
    #[must_use]
    pub fn headline_of(message: &str) -> String {
        message.trim().lines().next().unwrap_or_default().to_string()
    }

    /// Seven-character abbreviation, for display only.
    #[must_use]
    pub fn short_id(&self) -> &str {
        self.id.get(..7).unwrap_or(&self.id)
    }
}

/// A branch and its tip commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Branch name, unique within its repository.
    pub name: String,

    /// Web URL of the branch.
    pub url: String,

    /// Tip commit as known when the branch list was fetched.
    pub last_commit: Commit,
}

/// A published release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Release title.
    pub name: String,

    /// Tag the release points at.
    pub tag_name: String,

    /// Publication time.
    pub published_at: DateTime<Utc>,

    /// Web URL of the release.
    pub url: String,

    /// Commits on the default branch since publication, newest first.
    #[serde(default)]
    pub commits_since: Vec<Commit>,
}

/// Repository metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Owning user, organization or group path.
    pub owner: String,

    /// Repository name (path component, not display name).
    pub name: String,

    /// Always `owner + "/" + name`.
    pub name_with_owner: String,

    /// Web URL.
    pub url: String,

    /// Description (may be empty).
    pub description: String,

    /// Default branch name, empty when the backend does not report it.
    pub default_branch: String,

    /// Star count.
    pub stargazers: u64,

    /// Watcher count.
    pub watchers: u64,

    /// Fork count.
    pub forks: u64,

    /// Total commits on the default branch, 0 when unknown.
    pub commits: u64,

    /// Newest release; `None` when the repository has never released.
    pub last_release: Option<Release>,
}

impl Repository {
    /// Create a repository with the qualified name derived from its parts.
    ///
    /// All other fields start empty; fill them with struct-update syntax.
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        let owner = owner.into();
        let name = name.into();
        Self {
            name_with_owner: format!("{owner}/{name}"),
            owner,
            name,
            url: String::new(),
            description: String::new(),
            default_branch: String::new(),
            stargazers: 0,
            watchers: 0,
            forks: 0,
            commits: 0,
            last_release: None,
        }
    }

    /// Publication time of the newest release, if any.
    #[must_use]
    pub fn released_at(&self) -> Option<DateTime<Utc>> {
        self.last_release.as_ref().map(|r| r.published_at)
    }
}

/// Keep only repositories that have published at least one release.
#[must_use]
pub fn repos_with_release(repos: Vec<Repository>) -> Vec<Repository> {
    repos
        .into_iter()
        .filter(|r| r.last_release.is_some())
        .collect()
}

/// How a local branch relates to its remote counterpart.
///
/// Absence of a local counterpart is modelled as `Option::None` by callers,
/// never as a zeroed status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchTrackingStatus {
    /// Commits reachable from the local tip but not the remote tip.
    pub ahead: usize,

    /// Commits reachable from the remote tip but not the local tip.
    pub behind: usize,

    /// The live remote ref no longer matches the tip recorded by the provider.
    pub outdated: bool,
}

impl BranchTrackingStatus {
    /// Whether local and remote point at the same history.
    #[must_use]
    pub const fn is_in_sync(&self) -> bool {
        self.ahead == 0 && self.behind == 0
    }

    /// Ahead count for display, capped at `99+`.
    #[must_use]
    pub fn ahead_label(&self) -> String {
        capped_count(self.ahead)
    }

    /// Behind count for display, capped at `99+`.
    #[must_use]
    pub fn behind_label(&self) -> String {
        capped_count(self.behind)
    }
}

/// Render a count, replacing anything above [`MAX_TRACK_COUNT`] with `99+`.
#[must_use]
pub fn capped_count(count: usize) -> String {
    if count > MAX_TRACK_COUNT {
        format!("{MAX_TRACK_COUNT}+")
    } else {
        count.to_string()
    }
}

//! Mock implementations for testing services.
//!
//! `MockForge` implements the `Forge` trait from gitty-forge over
//! in-memory data, so services can be tested without a live backend.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use gitty_core::{Branch, Commit, Issue, PullRequest, Release, Repository};
use gitty_forge::{Error, Forge, Result};

/// Mock implementation of `Forge` for testing.
pub struct MockForge {
    pub username: String,
    pub repositories: HashMap<String, Repository>,
    pub branches: Vec<Branch>,
    pub issues: Vec<Issue>,
    pub history: HashMap<String, Vec<Commit>>,
    pub failing_issues: bool,
    pub failing_history: Vec<String>,
    /// `(repository, since)` for every `history` call.
    pub history_calls: Mutex<Vec<(String, Option<DateTime<Utc>>)>>,
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

impl MockForge {
    pub fn new() -> Self {
        Self {
            username: "muesli".to_string(),
            repositories: HashMap::new(),
            branches: Vec::new(),
            issues: Vec::new(),
            history: HashMap::new(),
            failing_issues: false,
            failing_history: Vec::new(),
            history_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_repository(mut self, repo: Repository) -> Self {
        self.repositories
            .insert(repo.name_with_owner.clone(), repo);
        self
    }

    pub fn with_branches(mut self, branches: Vec<Branch>) -> Self {
        self.branches = branches;
        self
    }

    #[allow(dead_code)]
    pub fn with_issues(mut self, issues: Vec<Issue>) -> Self {
        self.issues = issues;
        self
    }

    /// Commits of a repository's default branch, newest first.
    pub fn with_history(mut self, name_with_owner: &str, commits: Vec<Commit>) -> Self {
        self.history.insert(name_with_owner.to_string(), commits);
        self
    }

    pub fn with_failing_issues(mut self) -> Self {
        self.failing_issues = true;
        self
    }

    pub fn with_failing_history(mut self, name_with_owner: &str) -> Self {
        self.failing_history.push(name_with_owner.to_string());
        self
    }

    fn api_error() -> Error {
        Error::ApiError {
            status: 500,
            message: "mock failure".into(),
        }
    }
}

impl Forge for MockForge {
    async fn issues(&self, _owner: &str, _name: &str) -> Result<Vec<Issue>> {
        if self.failing_issues {
            return Err(Self::api_error());
        }
        Ok(self.issues.clone())
    }

    async fn pull_requests(&self, _owner: &str, _name: &str) -> Result<Vec<PullRequest>> {
        Ok(Vec::new())
    }

    async fn repository(&self, owner: &str, name: &str) -> Result<Repository> {
        let key = format!("{owner}/{name}");
        self.repositories
            .get(&key)
            .cloned()
            .ok_or(Error::NotFound(key))
    }

    async fn repositories(&self, owner: &str) -> Result<Vec<Repository>> {
        let mut repos: Vec<Repository> = self
            .repositories
            .values()
            .filter(|r| r.owner == owner)
            .cloned()
            .collect();
        repos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(repos)
    }

    async fn branches(&self, _owner: &str, _name: &str) -> Result<Vec<Branch>> {
        Ok(self.branches.clone())
    }

    async fn history(
        &self,
        repo: &Repository,
        max_count: usize,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Commit>> {
        self.history_calls
            .lock()
            .map_err(|_| Self::api_error())?
            .push((repo.name_with_owner.clone(), since));

        if self.failing_history.contains(&repo.name_with_owner) {
            return Err(Self::api_error());
        }

        let commits = self
            .history
            .get(&repo.name_with_owner)
            .into_iter()
            .flatten()
            .filter(|c| since.is_none_or(|since| c.committed_at >= since))
            .cloned();
        Ok(if max_count > 0 {
            commits.take(max_count).collect()
        } else {
            commits.collect()
        })
    }

    async fn username(&self) -> Result<String> {
        Ok(self.username.clone())
    }

    async fn issue_url(&self, _owner: &str, _name: &str, number: u64) -> Result<Option<String>> {
        Ok(self
            .issues
            .iter()
            .find(|i| i.number == number)
            .map(|i| format!("https://example.com/issues/{}", i.number)))
    }
}

fn at(timestamp: &str) -> DateTime<Utc> {
    timestamp.parse().unwrap_or_default()
}

pub fn commit(id: &str, committed_at: &str) -> Commit {
    Commit {
        id: id.to_string(),
        headline: format!("commit {id}"),
        author: "muesli".to_string(),
        committed_at: at(committed_at),
    }
}

pub fn branch(name: &str, committed_at: &str) -> Branch {
    Branch {
        name: name.to_string(),
        url: format!("https://example.com/tree/{name}"),
        last_commit: commit(name, committed_at),
    }
}

pub fn release(tag: &str, published_at: &str) -> Release {
    Release {
        name: tag.to_string(),
        tag_name: tag.to_string(),
        published_at: at(published_at),
        url: format!("https://example.com/releases/{tag}"),
        commits_since: Vec::new(),
    }
}

pub fn repository(owner: &str, name: &str) -> Repository {
    Repository {
        url: format!("https://example.com/{owner}/{name}"),
        default_branch: "main".to_string(),
        ..Repository::new(owner, name)
    }
}

//! Gitea and Forgejo REST v1 client.

use chrono::{DateTime, Utc};
use gitty_core::{
    Branch, Commit, Issue, Label, Page, PageToken, Paginator, PullRequest, Release, Repository,
    RetryPolicy,
};
use secrecy::SecretString;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::history::collect_history;
use crate::http::{AuthScheme, HttpClient, header_number};
use crate::traits::Forge;

const LIMIT: u32 = 50;

/// Releases fetched when looking for the newest published one.
const RELEASE_WINDOW: u32 = 10;

/// Pages needed for `count` items at [`LIMIT`] per page.
const fn total_pages(count: u32) -> u32 {
    count.div_ceil(LIMIT)
}

// === Response types ===

#[derive(Deserialize)]
struct ApiLabel {
    name: String,
    color: String,
}

#[derive(Deserialize)]
struct ApiIssue {
    number: u64,
    title: String,
    #[serde(default)]
    body: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    labels: Vec<ApiLabel>,
}

impl ApiIssue {
    fn labels(labels: Vec<ApiLabel>) -> Vec<Label> {
        labels
            .into_iter()
            .map(|l| Label::new(l.name, &l.color))
            .collect()
    }
}

#[derive(Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Deserialize)]
struct ApiRepository {
    owner: ApiUser,
    name: String,
    html_url: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    stars_count: u64,
    #[serde(default)]
    watchers_count: u64,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    default_branch: String,
    #[serde(default)]
    fork: bool,
}

impl ApiRepository {
    fn into_repository(self, last_release: Option<Release>) -> Repository {
        Repository {
            url: self.html_url,
            description: self.description,
            default_branch: self.default_branch,
            stargazers: self.stars_count,
            watchers: self.watchers_count,
            forks: self.forks_count,
            last_release,
            ..Repository::new(self.owner.login, self.name)
        }
    }
}

#[derive(Deserialize)]
struct ApiRelease {
    #[serde(default)]
    name: String,
    tag_name: String,
    published_at: DateTime<Utc>,
    html_url: String,
    #[serde(default)]
    draft: bool,
}

#[derive(Deserialize)]
struct ApiBranchAuthor {
    #[serde(default)]
    name: String,
    #[serde(default)]
    username: String,
}

#[derive(Deserialize)]
struct ApiBranchCommit {
    id: String,
    message: String,
    timestamp: DateTime<Utc>,
    author: Option<ApiBranchAuthor>,
}

#[derive(Deserialize)]
struct ApiBranch {
    name: String,
    commit: ApiBranchCommit,
}

#[derive(Deserialize)]
struct ApiCommitAuthor {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct ApiCommitDetail {
    message: String,
    author: Option<ApiCommitAuthor>,
}

#[derive(Deserialize)]
struct ApiCommit {
    sha: String,
    created: DateTime<Utc>,
    commit: ApiCommitDetail,
    author: Option<ApiUser>,
}

impl ApiCommit {
    fn into_commit(self) -> Commit {
        let author = self
            .author
            .map(|a| a.login)
            .filter(|login| !login.is_empty())
            .or_else(|| self.commit.author.map(|a| a.name))
            .unwrap_or_default();
        Commit {
            id: self.sha,
            headline: Commit::headline_of(&self.commit.message),
            author,
            committed_at: self.created,
        }
    }
}

#[derive(Deserialize)]
struct ApiHtmlUrl {
    html_url: String,
}

/// Gitea API client.
#[derive(Debug)]
pub struct GiteaClient {
    http: HttpClient,
    web_url: String,
}

impl GiteaClient {
    /// Create a client for the Gitea instance at `host`.
    ///
    /// # Errors
    /// Returns error if the HTTP client can't be built.
    pub fn new(token: SecretString, host: &str) -> Result<Self> {
        Self::with_base_url(token, format!("https://{host}/api/v1"))
    }

    /// Create a client against an explicit API base URL.
    ///
    /// # Errors
    /// Returns error if the HTTP client can't be built.
    pub fn with_base_url(token: SecretString, base_url: impl Into<String>) -> Result<Self> {
        let http = HttpClient::new(base_url, AuthScheme::Token(token))?;
        let web_url = http.base_url().trim_end_matches("/api/v1").to_string();
        Ok(Self { http, web_url })
    }

    /// Replace the rate-limit retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.http.set_retry(retry);
        self
    }

    /// Whether the server answers like a Gitea or Forgejo instance.
    pub async fn is_compatible(&self) -> bool {
        match self.http.get::<serde_json::Value>("/version", &[]).await {
            Ok(body) => body.get("version").is_some(),
            Err(e) => {
                tracing::debug!(base_url = self.http.base_url(), error = %e, "not a Gitea API");
                false
            }
        }
    }

    async fn page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: PageToken,
    ) -> Result<Page<T>> {
        let page = token.page_number();
        let mut query = query.to_vec();
        query.push(("page", page.to_string()));
        query.push(("limit", LIMIT.to_string()));

        let fetched = self.http.get_with_headers::<Vec<T>>(path, &query).await?;
        let total = header_number(&fetched.headers, "x-total-count").map(total_pages);
        Ok(Page::numbered(fetched.body, page, total))
    }

    async fn all<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        Paginator::new(PageToken::FIRST_PAGE, move |token| self.page(path, query, token))
            .collect_all()
            .await
    }

    async fn latest_release(&self, owner: &str, name: &str) -> Result<Option<Release>> {
        let path = format!("/repos/{owner}/{name}/releases");
        // Drafts sort first, so look past them.
        let query = [("limit", RELEASE_WINDOW.to_string())];
        let releases: Vec<ApiRelease> = match self.http.get(&path, &query).await {
            Ok(releases) => releases,
            Err(Error::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        Ok(releases.into_iter().find(|r| !r.draft).map(|r| Release {
            name: if r.name.is_empty() {
                r.tag_name.clone()
            } else {
                r.name
            },
            tag_name: r.tag_name,
            published_at: r.published_at,
            url: r.html_url,
            commits_since: Vec::new(),
        }))
    }

    async fn with_release(&self, repo: ApiRepository) -> Result<Repository> {
        let release = self.latest_release(&repo.owner.login, &repo.name).await?;
        Ok(repo.into_repository(release))
    }

    async fn html_url(&self, path: &str) -> Result<Option<String>> {
        match self.http.get::<ApiHtmlUrl>(path, &[]).await {
            Ok(found) => Ok(Some(found.html_url)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Forge for GiteaClient {
    async fn issues(&self, owner: &str, name: &str) -> Result<Vec<Issue>> {
        let path = format!("/repos/{owner}/{name}/issues");
        let query = [
            ("state", "open".to_string()),
            ("type", "issues".to_string()),
        ];
        let items: Vec<ApiIssue> = match self.all(&path, &query).await {
            Ok(items) => items,
            Err(Error::NotFound(resource)) => {
                tracing::debug!(%resource, "issue tracker unavailable");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        Ok(items
            .into_iter()
            .map(|i| Issue {
                number: i.number,
                title: i.title,
                body: i.body,
                created_at: i.created_at,
                labels: ApiIssue::labels(i.labels),
            })
            .collect())
    }

    async fn pull_requests(&self, owner: &str, name: &str) -> Result<Vec<PullRequest>> {
        let path = format!("/repos/{owner}/{name}/pulls");
        let query = [("state", "open".to_string())];
        let items: Vec<ApiIssue> = self.all(&path, &query).await?;

        Ok(items
            .into_iter()
            .map(|p| PullRequest {
                number: p.number,
                title: p.title,
                body: p.body,
                created_at: p.created_at,
                labels: ApiIssue::labels(p.labels),
            })
            .collect())
    }

    async fn repository(&self, owner: &str, name: &str) -> Result<Repository> {
        let repo: ApiRepository = self
            .http
            .get(&format!("/repos/{owner}/{name}"), &[])
            .await?;
        self.with_release(repo).await
    }

    async fn repositories(&self, owner: &str) -> Result<Vec<Repository>> {
        let mut listed: Vec<ApiRepository> = Vec::new();
        for path in [format!("/orgs/{owner}/repos"), format!("/users/{owner}/repos")] {
            match self.all(&path, &[]).await {
                Ok(found) => listed.extend(found),
                Err(e) => tracing::warn!(%path, error = %e, "skipping repository listing"),
            }
        }

        let mut repos = Vec::new();
        for repo in listed.into_iter().filter(|r| !r.fork) {
            repos.push(self.with_release(repo).await?);
        }
        Ok(repos)
    }

    async fn branches(&self, owner: &str, name: &str) -> Result<Vec<Branch>> {
        let path = format!("/repos/{owner}/{name}/branches");
        let branches: Vec<ApiBranch> = self.all(&path, &[]).await?;

        Ok(branches
            .into_iter()
            .map(|b| {
                let author = b
                    .commit
                    .author
                    .map(|a| if a.username.is_empty() { a.name } else { a.username })
                    .unwrap_or_default();
                Branch {
                    url: format!("{}/{owner}/{name}/src/branch/{}", self.web_url, b.name),
                    last_commit: Commit {
                        id: b.commit.id,
                        headline: Commit::headline_of(&b.commit.message),
                        author,
                        committed_at: b.commit.timestamp,
                    },
                    name: b.name,
                }
            })
            .collect())
    }

    async fn history(
        &self,
        repo: &Repository,
        max_count: usize,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Commit>> {
        let path = format!("/repos/{}/{}/commits", repo.owner, repo.name);
        let query = [
            ("sha", repo.default_branch.clone()),
            ("stat", "false".to_string()),
        ];

        let (path, query) = (path.as_str(), query.as_slice());
        let pages = Paginator::new(PageToken::FIRST_PAGE, move |token| async move {
            let page: Page<ApiCommit> = self.page(path, query, token).await?;
            Ok::<_, Error>(Page {
                items: page.items.into_iter().map(ApiCommit::into_commit).collect(),
                next: page.next,
            })
        });
        collect_history(pages, max_count, since).await
    }

    async fn username(&self) -> Result<String> {
        let user: ApiUser = self.http.get("/user", &[]).await?;
        Ok(user.login)
    }

    async fn issue_url(&self, owner: &str, name: &str, number: u64) -> Result<Option<String>> {
        if let Some(url) = self
            .html_url(&format!("/repos/{owner}/{name}/issues/{number}"))
            .await?
        {
            return Ok(Some(url));
        }
        self.html_url(&format!("/repos/{owner}/{name}/pulls/{number}"))
            .await
    }
}

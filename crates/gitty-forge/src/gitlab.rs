//! GitLab REST v4 client.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

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

const PER_PAGE: u32 = 100;

/// Pastel colors handed out to labels, which GitLab lists without one.
const LABEL_PALETTE: [&str; 12] = [
    "#FFB3BA", "#FFDFBA", "#FFFFBA", "#BAFFC9", "#BAE1FF", "#D7BAFF", "#FFBAF2", "#C9F1FD",
    "#E2F0CB", "#FFDAC1", "#B5EAD7", "#C7CEEA",
];

/// Stable label → color assignment, least-used color first.
#[derive(Debug, Default)]
struct LabelPalette {
    assigned: HashMap<String, &'static str>,
    uses: [usize; LABEL_PALETTE.len()],
}

impl LabelPalette {
    fn color_for(&mut self, label: &str) -> &'static str {
        if let Some(color) = self.assigned.get(label) {
            return *color;
        }

        let mut least = 0;
        for (i, uses) in self.uses.iter().enumerate() {
            if *uses < self.uses[least] {
                least = i;
            }
        }

        self.uses[least] += 1;
        let color = LABEL_PALETTE[least];
        self.assigned.insert(label.to_string(), color);
        color
    }
}

/// `owner/name` with every `/` escaped, as GitLab expects in project paths.
fn project_id(owner: &str, name: &str) -> String {
    format!("{owner}/{name}").replace('/', "%2F")
}

/// GitLab renders some headlines with non-breaking spaces.
fn clean_headline(title: &str) -> String {
    title.replace('\u{a0}', " ")
}

// === Response types ===

#[derive(Deserialize)]
struct ApiIssue {
    iid: u64,
    title: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    labels: Vec<String>,
}

#[derive(Deserialize)]
struct ApiNamespace {
    full_path: String,
}

#[derive(Deserialize)]
struct ApiStatistics {
    commit_count: u64,
}

#[derive(Deserialize)]
struct ApiProject {
    id: u64,
    path: String,
    namespace: ApiNamespace,
    web_url: String,
    description: Option<String>,
    #[serde(default)]
    star_count: u64,
    #[serde(default)]
    forks_count: u64,
    default_branch: Option<String>,
    forked_from_project: Option<serde_json::Value>,
    statistics: Option<ApiStatistics>,
}

impl ApiProject {
    const fn is_fork(&self) -> bool {
        self.forked_from_project.is_some()
    }

    fn into_repository(self, last_release: Option<Release>) -> Repository {
        Repository {
            url: self.web_url,
            description: self.description.unwrap_or_default(),
            default_branch: self.default_branch.unwrap_or_default(),
            stargazers: self.star_count,
            forks: self.forks_count,
            commits: self.statistics.map_or(0, |s| s.commit_count),
            last_release,
            ..Repository::new(self.namespace.full_path, self.path)
        }
    }
}

#[derive(Deserialize)]
struct ApiReleaseLinks {
    #[serde(rename = "self")]
    self_url: Option<String>,
}

#[derive(Deserialize)]
struct ApiRelease {
    name: Option<String>,
    tag_name: String,
    released_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    #[serde(rename = "_links")]
    links: Option<ApiReleaseLinks>,
}

impl ApiRelease {
    fn into_release(self, repo_url: &str) -> Release {
        let url = self
            .links
            .and_then(|l| l.self_url)
            .unwrap_or_else(|| format!("{repo_url}/-/releases/{}", self.tag_name));
        Release {
            name: self
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| self.tag_name.clone()),
            tag_name: self.tag_name,
            published_at: self.released_at.unwrap_or(self.created_at),
            url,
            commits_since: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct ApiCommit {
    id: String,
    title: String,
    author_name: String,
    committed_date: DateTime<Utc>,
}

impl ApiCommit {
    fn into_commit(self) -> Commit {
        Commit {
            id: self.id,
            headline: clean_headline(&self.title),
            author: self.author_name,
            committed_at: self.committed_date,
        }
    }
}

#[derive(Deserialize)]
struct ApiBranch {
    name: String,
    web_url: String,
    commit: ApiCommit,
}

#[derive(Deserialize)]
struct ApiUser {
    username: String,
}

#[derive(Deserialize)]
struct ApiWebUrl {
    web_url: String,
}

/// GitLab API client.
#[derive(Debug)]
pub struct GitLabClient {
    http: HttpClient,
    labels: Mutex<LabelPalette>,
}

impl GitLabClient {
    /// Create a client for the GitLab instance at `host`.
    ///
    /// # Errors
    /// Returns error if the HTTP client can't be built.
    pub fn new(token: SecretString, host: &str) -> Result<Self> {
        Self::with_base_url(token, format!("https://{host}/api/v4"))
    }

    /// Create a client against an explicit API base URL.
    ///
    /// # Errors
    /// Returns error if the HTTP client can't be built.
    pub fn with_base_url(token: SecretString, base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(base_url, AuthScheme::PrivateToken(token))?,
            labels: Mutex::default(),
        })
    }

    /// Replace the rate-limit retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.http.set_retry(retry);
        self
    }

    /// Whether the server answers like a GitLab instance.
    pub async fn is_compatible(&self) -> bool {
        match self.http.get::<serde_json::Value>("/version", &[]).await {
            Ok(body) => body.get("version").is_some(),
            Err(e) => {
                tracing::debug!(base_url = self.http.base_url(), error = %e, "not a GitLab API");
                false
            }
        }
    }

    fn labels(&self, names: Vec<String>) -> Vec<Label> {
        let mut palette = self.labels.lock().unwrap_or_else(PoisonError::into_inner);
        names
            .into_iter()
            .map(|name| {
                let color = palette.color_for(&name);
                Label::new(name, color)
            })
            .collect()
    }

    /// Fetch one numbered page of a list endpoint.
    async fn page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: PageToken,
    ) -> Result<Page<T>> {
        let page = token.page_number();
        let mut query = query.to_vec();
        query.push(("page", page.to_string()));
        query.push(("per_page", PER_PAGE.to_string()));

        let fetched = self.http.get_with_headers::<Vec<T>>(path, &query).await?;
        let total = header_number(&fetched.headers, "x-total-pages");
        Ok(Page::numbered(fetched.body, page, total))
    }

    async fn all<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        Paginator::new(PageToken::FIRST_PAGE, move |token| self.page(path, query, token))
            .collect_all()
            .await
    }

    async fn open_items(&self, owner: &str, name: &str, kind: &str) -> Result<Vec<ApiIssue>> {
        let path = format!("/projects/{}/{kind}", project_id(owner, name));
        let query = [
            ("state", "opened".to_string()),
            ("order_by", "created_at".to_string()),
            ("sort", "desc".to_string()),
        ];
        self.all(&path, &query).await
    }

    /// Newest release; missing or forbidden release listings count as none.
    async fn latest_release(&self, project: &str, repo_url: &str) -> Result<Option<Release>> {
        let path = format!("/projects/{project}/releases");
        let query = [("per_page", "1".to_string())];
        match self.http.get::<Vec<ApiRelease>>(&path, &query).await {
            Ok(releases) => Ok(releases
                .into_iter()
                .next()
                .map(|r| r.into_release(repo_url))),
            Err(Error::NotFound(_) | Error::ApiError { status: 403, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn project_with_release(&self, project: ApiProject) -> Result<Repository> {
        let release = self
            .latest_release(&project.id.to_string(), &project.web_url)
            .await?;
        Ok(project.into_repository(release))
    }

    async fn owned_projects(&self, path: &str) -> Result<Vec<ApiProject>> {
        let query = [("statistics", "true".to_string())];
        self.all(path, &query).await
    }

    async fn web_url(&self, path: &str) -> Result<Option<String>> {
        match self.http.get::<ApiWebUrl>(path, &[]).await {
            Ok(found) => Ok(Some(found.web_url)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Forge for GitLabClient {
    async fn issues(&self, owner: &str, name: &str) -> Result<Vec<Issue>> {
        let items = match self.open_items(owner, name, "issues").await {
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
                labels: self.labels(i.labels),
                number: i.iid,
                title: i.title,
                body: i.description.unwrap_or_default(),
                created_at: i.created_at,
            })
            .collect())
    }

    async fn pull_requests(&self, owner: &str, name: &str) -> Result<Vec<PullRequest>> {
        let items = self.open_items(owner, name, "merge_requests").await?;

        Ok(items
            .into_iter()
            .map(|mr| PullRequest {
                labels: self.labels(mr.labels),
                number: mr.iid,
                title: mr.title,
                body: mr.description.unwrap_or_default(),
                created_at: mr.created_at,
            })
            .collect())
    }

    async fn repository(&self, owner: &str, name: &str) -> Result<Repository> {
        let id = project_id(owner, name);
        let query = [("statistics", "true".to_string())];
        let project: ApiProject = self.http.get(&format!("/projects/{id}"), &query).await?;
        let release = self.latest_release(&id, &project.web_url).await?;
        Ok(project.into_repository(release))
    }

    async fn repositories(&self, owner: &str) -> Result<Vec<Repository>> {
        let mut projects = Vec::new();
        for path in [
            format!("/groups/{owner}/projects"),
            format!("/users/{owner}/projects"),
        ] {
            match self.owned_projects(&path).await {
                Ok(found) => projects.extend(found),
                Err(e) => tracing::warn!(%path, error = %e, "skipping project listing"),
            }
        }

        let mut repos = Vec::new();
        for project in projects.into_iter().filter(|p| !p.is_fork()) {
            repos.push(self.project_with_release(project).await?);
        }
        Ok(repos)
    }

    async fn branches(&self, owner: &str, name: &str) -> Result<Vec<Branch>> {
        let path = format!("/projects/{}/repository/branches", project_id(owner, name));
        let branches: Vec<ApiBranch> = self.all(&path, &[]).await?;

        Ok(branches
            .into_iter()
            .map(|b| Branch {
                name: b.name,
                url: b.web_url,
                last_commit: b.commit.into_commit(),
            })
            .collect())
    }

    async fn history(
        &self,
        repo: &Repository,
        max_count: usize,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Commit>> {
        let path = format!(
            "/projects/{}/repository/commits",
            project_id(&repo.owner, &repo.name)
        );
        let mut query = vec![("ref_name", repo.default_branch.clone())];
        if let Some(since) = since {
            query.push(("since", since.to_rfc3339()));
        }

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
        Ok(user.username)
    }

    async fn issue_url(&self, owner: &str, name: &str, number: u64) -> Result<Option<String>> {
        let id = project_id(owner, name);
        if let Some(url) = self.web_url(&format!("/projects/{id}/issues/{number}")).await? {
            return Ok(Some(url));
        }
        self.web_url(&format!("/projects/{id}/merge_requests/{number}"))
            .await
    }
}

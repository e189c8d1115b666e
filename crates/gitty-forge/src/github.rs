//! GitHub GraphQL client.

use chrono::{DateTime, Utc};
use gitty_core::{
    Branch, Commit, Issue, Label, Page, PageToken, Paginator, PullRequest, Release, Repository,
    RetryPolicy,
};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::history::collect_history;
use crate::http::{AuthScheme, HttpClient};
use crate::traits::Forge;

// === Queries ===

const LABEL_FIELDS: &str = "labels(first: 100, orderBy: {field: NAME, direction: ASC}) { nodes { name color } }";

const COMMIT_FIELDS: &str =
    "fragment CommitFields on Commit { oid messageHeadline committedDate author { name user { login } } }";

const REPO_FIELDS: &str = r#"fragment RepoFields on Repository {
  owner { login } name nameWithOwner url description stargazerCount forkCount
  watchers { totalCount }
  defaultBranchRef { name }
  object(expression: "HEAD") { ... on Commit { history { totalCount } } }
  releases(first: 1, orderBy: {field: CREATED_AT, direction: DESC}) { nodes { name tagName publishedAt url } }
}"#;

fn issues_query() -> String {
    format!(
        "query($owner: String!, $name: String!, $after: String) {{ \
           repository(owner: $owner, name: $name) {{ \
             issues(first: 100, after: $after, states: OPEN, orderBy: {{field: CREATED_AT, direction: DESC}}) {{ \
               pageInfo {{ hasNextPage }} \
               edges {{ cursor node {{ number title body createdAt {LABEL_FIELDS} }} }} \
             }} }} }}"
    )
}

fn pull_requests_query() -> String {
    format!(
        "query($owner: String!, $name: String!, $after: String) {{ \
           repository(owner: $owner, name: $name) {{ \
             pullRequests(first: 100, after: $after, states: OPEN, orderBy: {{field: CREATED_AT, direction: DESC}}) {{ \
               pageInfo {{ hasNextPage }} \
               edges {{ cursor node {{ number title body createdAt {LABEL_FIELDS} }} }} \
             }} }} }}"
    )
}

fn repository_query() -> String {
    format!(
        "query($owner: String!, $name: String!) {{ \
           repository(owner: $owner, name: $name) {{ ...RepoFields }} }} {REPO_FIELDS}"
    )
}

fn repositories_query() -> String {
    format!(
        "query($owner: String!, $after: String) {{ \
           repositoryOwner(login: $owner) {{ \
             repositories(first: 100, after: $after, isFork: false, ownerAffiliations: OWNER, \
                          orderBy: {{field: CREATED_AT, direction: DESC}}) {{ \
               pageInfo {{ hasNextPage }} \
               edges {{ cursor node {{ ...RepoFields }} }} \
             }} }} }} {REPO_FIELDS}"
    )
}

fn branches_query() -> String {
    format!(
        "query($owner: String!, $name: String!, $after: String) {{ \
           repository(owner: $owner, name: $name) {{ \
             url \
             refs(first: 100, after: $after, refPrefix: \"refs/heads/\") {{ \
               pageInfo {{ hasNextPage }} \
               edges {{ cursor node {{ name target {{ ...CommitFields }} }} }} \
             }} }} }} {COMMIT_FIELDS}"
    )
}

fn history_query() -> String {
    format!(
        "query($owner: String!, $name: String!, $since: GitTimestamp, $after: String) {{ \
           repository(owner: $owner, name: $name) {{ \
             object(expression: \"HEAD\") {{ ... on Commit {{ \
               history(first: 100, after: $after, since: $since) {{ \
                 pageInfo {{ hasNextPage }} \
                 edges {{ cursor node {{ ...CommitFields }} }} \
             }} }} }} }} }} {COMMIT_FIELDS}"
    )
}

const VIEWER_QUERY: &str = "query { viewer { login } }";

const ISSUE_URL_QUERY: &str = "query($owner: String!, $name: String!, $number: Int!) { \
     repository(owner: $owner, name: $name) { issue(number: $number) { url } } }";

const PULL_REQUEST_URL_QUERY: &str = "query($owner: String!, $name: String!, $number: Int!) { \
     repository(owner: $owner, name: $name) { pullRequest(number: $number) { url } } }";

// === GraphQL envelope ===

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl<T> GraphQlResponse<T> {
    fn into_result(self) -> Result<T> {
        if !self.errors.is_empty() {
            let message = self
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            let not_found = self
                .errors
                .iter()
                .all(|e| e.kind.as_deref() == Some("NOT_FOUND"));
            return Err(if not_found {
                Error::NotFound(message)
            } else {
                Error::GraphQl(message)
            });
        }
        self.data
            .ok_or_else(|| Error::GraphQl("response carried no data".into()))
    }
}

// === Response types ===

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    page_info: PageInfo,
    edges: Vec<Edge<T>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
}

#[derive(Deserialize)]
struct Edge<T> {
    cursor: String,
    node: T,
}

impl<T> Connection<T> {
    /// Map nodes and carry the last edge's cursor while more pages exist.
    fn into_page<U>(self, map: impl FnMut(T) -> Option<U>) -> Page<U> {
        let next = self
            .page_info
            .has_next_page
            .then(|| self.edges.last().map(|e| e.cursor.clone()))
            .flatten();
        let items = self.edges.into_iter().map(|e| e.node).filter_map(map).collect();
        Page::cursor(items, next)
    }
}

#[derive(Deserialize)]
struct RepositoryData<T> {
    repository: Option<T>,
}

#[derive(Deserialize)]
struct Nodes<T> {
    nodes: Vec<T>,
}

#[derive(Deserialize)]
struct TotalCount {
    #[serde(rename = "totalCount")]
    total_count: u64,
}

#[derive(Deserialize)]
struct ApiLabel {
    name: String,
    color: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiIssue {
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    created_at: DateTime<Utc>,
    labels: Option<Nodes<ApiLabel>>,
}

impl ApiIssue {
    fn labels(labels: Option<Nodes<ApiLabel>>) -> Vec<Label> {
        labels
            .map(|l| l.nodes)
            .unwrap_or_default()
            .into_iter()
            .map(|l| Label::new(l.name, &l.color))
            .collect()
    }

    fn into_issue(self) -> Issue {
        Issue {
            number: self.number,
            title: self.title,
            body: self.body.unwrap_or_default(),
            created_at: self.created_at,
            labels: Self::labels(self.labels),
        }
    }

    fn into_pull_request(self) -> PullRequest {
        PullRequest {
            number: self.number,
            title: self.title,
            body: self.body.unwrap_or_default(),
            created_at: self.created_at,
            labels: Self::labels(self.labels),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiIssues {
    issues: Connection<ApiIssue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPullRequests {
    pull_requests: Connection<ApiIssue>,
}

#[derive(Deserialize)]
struct ApiLogin {
    login: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiRelease {
    name: Option<String>,
    tag_name: String,
    published_at: Option<DateTime<Utc>>,
    url: String,
}

#[derive(Deserialize)]
struct ApiHeadHistory {
    history: Option<TotalCount>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiRepository {
    owner: ApiLogin,
    name: String,
    url: String,
    description: Option<String>,
    stargazer_count: u64,
    fork_count: u64,
    watchers: TotalCount,
    default_branch_ref: Option<ApiRefName>,
    object: Option<ApiHeadHistory>,
    releases: Nodes<ApiRelease>,
}

#[derive(Deserialize)]
struct ApiRefName {
    name: String,
}

impl ApiRepository {
    fn into_repository(self) -> Repository {
        let last_release = self.releases.nodes.into_iter().next().and_then(|r| {
            // drafts have no publication time
            let published_at = r.published_at?;
            Some(Release {
                name: r.name.filter(|n| !n.is_empty()).unwrap_or_else(|| r.tag_name.clone()),
                tag_name: r.tag_name,
                published_at,
                url: r.url,
                commits_since: Vec::new(),
            })
        });

        Repository {
            url: self.url,
            description: self.description.unwrap_or_default(),
            default_branch: self.default_branch_ref.map(|r| r.name).unwrap_or_default(),
            stargazers: self.stargazer_count,
            watchers: self.watchers.total_count,
            forks: self.fork_count,
            commits: self
                .object
                .and_then(|o| o.history)
                .map_or(0, |h| h.total_count),
            last_release,
            ..Repository::new(self.owner.login, self.name)
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiRepositoryOwner {
    repository_owner: Option<ApiOwnedRepositories>,
}

#[derive(Deserialize)]
struct ApiOwnedRepositories {
    repositories: Connection<ApiRepository>,
}

#[derive(Deserialize)]
struct ApiAuthor {
    name: Option<String>,
    user: Option<ApiLogin>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCommit {
    oid: Option<String>,
    message_headline: Option<String>,
    committed_date: Option<DateTime<Utc>>,
    author: Option<ApiAuthor>,
}

impl ApiCommit {
    /// `None` for targets that are not commits.
    fn into_commit(self) -> Option<Commit> {
        let author = self
            .author
            .map(|a| a.user.map(|u| u.login).or(a.name).unwrap_or_default())
            .unwrap_or_default();
        Some(Commit {
            id: self.oid.filter(|oid| !oid.is_empty())?,
            headline: self.message_headline.unwrap_or_default(),
            author,
            committed_at: self.committed_date?,
        })
    }
}

#[derive(Deserialize)]
struct ApiBranch {
    name: String,
    target: ApiCommit,
}

#[derive(Deserialize)]
struct ApiRefs {
    url: String,
    refs: Connection<ApiBranch>,
}

#[derive(Deserialize)]
struct ApiHistoryTarget {
    history: Option<Connection<ApiCommit>>,
}

#[derive(Deserialize)]
struct ApiHistory {
    object: Option<ApiHistoryTarget>,
}

#[derive(Deserialize)]
struct ApiViewer {
    viewer: ApiLogin,
}

#[derive(Deserialize)]
struct ApiUrl {
    url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiIssueUrl {
    issue: Option<ApiUrl>,
    pull_request: Option<ApiUrl>,
}

/// GitHub API client.
#[derive(Debug)]
pub struct GitHubClient {
    http: HttpClient,
}

impl GitHubClient {
    /// Default GitHub API URL.
    pub const DEFAULT_API_URL: &'static str = "https://api.github.com";

    /// Create a new GitHub client for github.com.
    ///
    /// # Errors
    /// Returns error if the HTTP client can't be built.
    pub fn new(token: SecretString) -> Result<Self> {
        Self::with_base_url(token, Self::DEFAULT_API_URL)
    }

    /// Create a new GitHub client with a custom API URL (for GitHub Enterprise).
    ///
    /// # Errors
    /// Returns error if the HTTP client can't be built.
    pub fn with_base_url(token: SecretString, base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(base_url, AuthScheme::Bearer(token))?,
        })
    }

    /// Replace the rate-limit retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.http.set_retry(retry);
        self
    }

    /// Run a GraphQL query, retrying rate-limit errors reported in the body.
    async fn query<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let request = &GraphQlRequest { query, variables };
        self.http
            .with_retry(move || async move {
                let response: GraphQlResponse<T> = self.http.post_once("/graphql", request).await?;
                response.into_result()
            })
            .await
    }

    /// Query a `repository(owner:, name:)` root; a null repository is `NotFound`.
    async fn repository_query<T: DeserializeOwned>(
        &self,
        owner: &str,
        name: &str,
        query: &str,
        mut variables: Value,
    ) -> Result<T> {
        variables["owner"] = json!(owner);
        variables["name"] = json!(name);
        let data: RepositoryData<T> = self.query(query, variables).await?;
        data.repository
            .ok_or_else(|| Error::NotFound(format!("{owner}/{name}")))
    }

    async fn issues_page(&self, owner: &str, name: &str, token: PageToken) -> Result<Page<Issue>> {
        let data: ApiIssues = self
            .repository_query(owner, name, &issues_query(), json!({ "after": token.cursor() }))
            .await?;
        Ok(data.issues.into_page(|i| Some(i.into_issue())))
    }

    async fn pull_requests_page(
        &self,
        owner: &str,
        name: &str,
        token: PageToken,
    ) -> Result<Page<PullRequest>> {
        let data: ApiPullRequests = self
            .repository_query(
                owner,
                name,
                &pull_requests_query(),
                json!({ "after": token.cursor() }),
            )
            .await?;
        Ok(data.pull_requests.into_page(|p| Some(p.into_pull_request())))
    }

    async fn repositories_page(&self, owner: &str, token: PageToken) -> Result<Page<Repository>> {
        let data: ApiRepositoryOwner = self
            .query(
                &repositories_query(),
                json!({ "owner": owner, "after": token.cursor() }),
            )
            .await?;
        let owned = data
            .repository_owner
            .ok_or_else(|| Error::NotFound(owner.to_string()))?;
        Ok(owned
            .repositories
            .into_page(|r| Some(r.into_repository())))
    }

    async fn branches_page(&self, owner: &str, name: &str, token: PageToken) -> Result<Page<Branch>> {
        let data: ApiRefs = self
            .repository_query(owner, name, &branches_query(), json!({ "after": token.cursor() }))
            .await?;
        let repo_url = data.url;
        Ok(data.refs.into_page(|b| {
            let last_commit = b.target.into_commit()?;
            Some(Branch {
                url: format!("{repo_url}/tree/{}", b.name),
                name: b.name,
                last_commit,
            })
        }))
    }

    async fn history_page(
        &self,
        repo: &Repository,
        since: Option<DateTime<Utc>>,
        token: PageToken,
    ) -> Result<Page<Commit>> {
        let data: ApiHistory = self
            .repository_query(
                &repo.owner,
                &repo.name,
                &history_query(),
                json!({ "since": since.map(|s| s.to_rfc3339()), "after": token.cursor() }),
            )
            .await?;
        // empty repositories have no HEAD
        Ok(data
            .object
            .and_then(|o| o.history)
            .map_or_else(|| Page::last(Vec::new()), |h| h.into_page(ApiCommit::into_commit)))
    }

    async fn permalink(&self, owner: &str, name: &str, query: &str, number: u64) -> Result<Option<String>> {
        let result: Result<ApiIssueUrl> = self
            .repository_query(owner, name, query, json!({ "number": number }))
            .await;
        match result {
            Ok(found) => Ok(found.issue.or(found.pull_request).map(|u| u.url)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Forge for GitHubClient {
    async fn issues(&self, owner: &str, name: &str) -> Result<Vec<Issue>> {
        Paginator::new(PageToken::START, move |token| {
            self.issues_page(owner, name, token)
        })
        .collect_all()
        .await
    }

    async fn pull_requests(&self, owner: &str, name: &str) -> Result<Vec<PullRequest>> {
        Paginator::new(PageToken::START, move |token| {
            self.pull_requests_page(owner, name, token)
        })
        .collect_all()
        .await
    }

    async fn repository(&self, owner: &str, name: &str) -> Result<Repository> {
        let repo: ApiRepository = self
            .repository_query(owner, name, &repository_query(), json!({}))
            .await?;
        Ok(repo.into_repository())
    }

    async fn repositories(&self, owner: &str) -> Result<Vec<Repository>> {
        Paginator::new(PageToken::START, move |token| {
            self.repositories_page(owner, token)
        })
        .collect_all()
        .await
    }

    async fn branches(&self, owner: &str, name: &str) -> Result<Vec<Branch>> {
        Paginator::new(PageToken::START, move |token| {
            self.branches_page(owner, name, token)
        })
        .collect_all()
        .await
    }

    async fn history(
        &self,
        repo: &Repository,
        max_count: usize,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Commit>> {
        let pages = Paginator::new(PageToken::START, move |token| {
            self.history_page(repo, since, token)
        });
        collect_history(pages, max_count, since).await
    }

    async fn username(&self) -> Result<String> {
        let data: ApiViewer = self.query(VIEWER_QUERY, json!({})).await?;
        Ok(data.viewer.login)
    }

    async fn issue_url(&self, owner: &str, name: &str, number: u64) -> Result<Option<String>> {
        if let Some(url) = self.permalink(owner, name, ISSUE_URL_QUERY, number).await? {
            return Ok(Some(url));
        }
        self.permalink(owner, name, PULL_REQUEST_URL_QUERY, number)
            .await
    }
}

//! Backend selection by hostname.

use chrono::{DateTime, Utc};
use gitty_core::{
    Branch, Commit, Config, Issue, ProviderKind, PullRequest, Repository, RetryPolicy,
};
use secrecy::SecretString;

use crate::auth::{Auth, require_token};
use crate::bitbucket::BitbucketClient;
use crate::error::{Error, Result};
use crate::gitea::GiteaClient;
use crate::github::GitHubClient;
use crate::gitlab::GitLabClient;
use crate::traits::Forge;

/// Hosts whose backend is known without probing.
const KNOWN_HOSTS: [(&str, ProviderKind); 5] = [
    ("github.com", ProviderKind::GitHub),
    ("gitlab.com", ProviderKind::GitLab),
    ("gitea.com", ProviderKind::Gitea),
    ("codeberg.org", ProviderKind::Gitea),
    ("bitbucket.org", ProviderKind::BitbucketCloud),
];

/// Backend kind for well-known hosts.
#[must_use]
pub fn known_kind(host: &str) -> Option<ProviderKind> {
    let host = host.to_ascii_lowercase();
    KNOWN_HOSTS
        .iter()
        .find(|(known, _)| *known == host)
        .map(|(_, kind)| *kind)
        .or_else(|| host.contains("invent.kde.org").then_some(ProviderKind::GitLab))
}

/// One client per backend family.
#[derive(Debug)]
pub enum Provider {
    /// github.com or GitHub Enterprise.
    GitHub(GitHubClient),
    /// gitlab.com or a self-hosted GitLab.
    GitLab(GitLabClient),
    /// Gitea, Forgejo or Codeberg.
    Gitea(GiteaClient),
    /// Bitbucket Cloud.
    Bitbucket(BitbucketClient),
}

impl Provider {
    /// Build the client for `kind` at `host`.
    ///
    /// `api_url` overrides the backend's conventional API location.
    ///
    /// # Errors
    /// Returns `NoToken` for a blank token, `InvalidToken` for a malformed
    /// Bitbucket token, or an error if the HTTP client can't be built.
    pub fn new(
        kind: ProviderKind,
        host: &str,
        token: SecretString,
        api_url: Option<&str>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        require_token(host, &token)?;
        let provider = match kind {
            ProviderKind::GitHub => {
                let base = api_url.map_or_else(
                    || {
                        if host.eq_ignore_ascii_case("github.com") {
                            GitHubClient::DEFAULT_API_URL.to_string()
                        } else {
                            format!("https://{host}/api")
                        }
                    },
                    str::to_string,
                );
                Self::GitHub(GitHubClient::with_base_url(token, base)?.with_retry(retry))
            }
            ProviderKind::GitLab => {
                let client = match api_url {
                    Some(base) => GitLabClient::with_base_url(token, base)?,
                    None => GitLabClient::new(token, host)?,
                };
                Self::GitLab(client.with_retry(retry))
            }
            ProviderKind::Gitea => {
                let client = match api_url {
                    Some(base) => GiteaClient::with_base_url(token, base)?,
                    None => GiteaClient::new(token, host)?,
                };
                Self::Gitea(client.with_retry(retry))
            }
            ProviderKind::BitbucketCloud => {
                let base = api_url.unwrap_or(BitbucketClient::DEFAULT_API_URL);
                Self::Bitbucket(BitbucketClient::with_base_url(&token, base)?.with_retry(retry))
            }
        };
        Ok(provider)
    }

    /// Pick and build the client for `host`.
    ///
    /// Well-known hosts come first, then `[hosts]` pins from the config;
    /// anything else is tried as GitLab, then Gitea.
    ///
    /// # Errors
    /// Returns `NoToken` if no token is available for `host`, or
    /// `UnrecognizedProvider` if neither API answers.
    pub async fn connect(host: &str, auth: &Auth, config: &Config) -> Result<Self> {
        let token = auth.resolve(host)?;
        let retry = config.retry.policy();

        if let Some(kind) = known_kind(host) {
            return Self::new(kind, host, token, None, retry);
        }
        if let Some(pinned) = config.host(host) {
            tracing::debug!(%host, kind = %pinned.kind, "using configured backend");
            return Self::new(pinned.kind, host, token, pinned.api_url.as_deref(), retry);
        }

        Self::detect(
            host,
            &format!("https://{host}/api/v4"),
            &format!("https://{host}/api/v1"),
            token,
            retry,
        )
        .await
    }

    async fn detect(
        host: &str,
        gitlab_url: &str,
        gitea_url: &str,
        token: SecretString,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let gitlab = GitLabClient::with_base_url(token.clone(), gitlab_url)?.with_retry(retry);
        if gitlab.is_compatible().await {
            tracing::debug!(%host, "detected GitLab");
            return Ok(Self::GitLab(gitlab));
        }

        let gitea = GiteaClient::with_base_url(token, gitea_url)?.with_retry(retry);
        if gitea.is_compatible().await {
            tracing::debug!(%host, "detected Gitea");
            return Ok(Self::Gitea(gitea));
        }

        Err(Error::UnrecognizedProvider(host.to_string()))
    }

    /// Backend family of this client.
    #[must_use]
    pub const fn kind(&self) -> ProviderKind {
        match self {
            Self::GitHub(_) => ProviderKind::GitHub,
            Self::GitLab(_) => ProviderKind::GitLab,
            Self::Gitea(_) => ProviderKind::Gitea,
            Self::Bitbucket(_) => ProviderKind::BitbucketCloud,
        }
    }
}

/// Forward a call to whichever client this is.
macro_rules! dispatch {
    ($self:ident, $client:ident => $call:expr) => {
        match $self {
            Self::GitHub($client) => $call.await,
            Self::GitLab($client) => $call.await,
            Self::Gitea($client) => $call.await,
            Self::Bitbucket($client) => $call.await,
        }
    };
}

impl Forge for Provider {
    async fn issues(&self, owner: &str, name: &str) -> Result<Vec<Issue>> {
        dispatch!(self, c => c.issues(owner, name))
    }

    async fn pull_requests(&self, owner: &str, name: &str) -> Result<Vec<PullRequest>> {
        dispatch!(self, c => c.pull_requests(owner, name))
    }

    async fn repository(&self, owner: &str, name: &str) -> Result<Repository> {
        dispatch!(self, c => c.repository(owner, name))
    }

    async fn repositories(&self, owner: &str) -> Result<Vec<Repository>> {
        dispatch!(self, c => c.repositories(owner))
    }

    async fn branches(&self, owner: &str, name: &str) -> Result<Vec<Branch>> {
        dispatch!(self, c => c.branches(owner, name))
    }

    async fn history(
        &self,
        repo: &Repository,
        max_count: usize,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Commit>> {
        dispatch!(self, c => c.history(repo, max_count, since))
    }

    async fn username(&self) -> Result<String> {
        dispatch!(self, c => c.username())
    }

    async fn issue_url(&self, owner: &str, name: &str, number: u64) -> Result<Option<String>> {
        dispatch!(self, c => c.issue_url(owner, name, number))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use gitty_core::config::HostConfig;
    use serde_json::json;
    use std::collections::BTreeMap;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token() -> SecretString {
        SecretString::from("test-token")
    }

    #[test]
    fn test_known_hosts() {
        assert_eq!(known_kind("github.com"), Some(ProviderKind::GitHub));
        assert_eq!(known_kind("GitHub.com"), Some(ProviderKind::GitHub));
        assert_eq!(known_kind("gitlab.com"), Some(ProviderKind::GitLab));
        assert_eq!(known_kind("gitea.com"), Some(ProviderKind::Gitea));
        assert_eq!(known_kind("codeberg.org"), Some(ProviderKind::Gitea));
        assert_eq!(known_kind("bitbucket.org"), Some(ProviderKind::BitbucketCloud));
        assert_eq!(known_kind("invent.kde.org"), Some(ProviderKind::GitLab));
        assert_eq!(known_kind("git.example.com"), None);
    }

    #[test]
    fn test_new_builds_matching_variant() {
        for kind in [ProviderKind::GitHub, ProviderKind::GitLab, ProviderKind::Gitea] {
            let provider =
                Provider::new(kind, "git.example.com", token(), None, RetryPolicy::never()).unwrap();
            assert_eq!(provider.kind(), kind);
        }

        let provider = Provider::new(
            ProviderKind::BitbucketCloud,
            "bitbucket.org",
            SecretString::from("user:app-password"),
            None,
            RetryPolicy::never(),
        )
        .unwrap();
        assert_eq!(provider.kind(), ProviderKind::BitbucketCloud);
    }

    #[test]
    fn test_new_rejects_blank_token() {
        for kind in ProviderKind::ALL {
            for blank in ["", " \t "] {
                let result = Provider::new(
                    kind,
                    "example.org",
                    SecretString::from(blank),
                    None,
                    RetryPolicy::never(),
                );
                assert!(
                    matches!(result, Err(Error::NoToken { ref host }) if host == "example.org"),
                    "{kind} accepted a blank token"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_connect_rejects_blank_explicit_token() {
        let auth = Auth::Token(SecretString::from(""));
        let result = Provider::connect("github.com", &auth, &Config::default()).await;
        assert!(matches!(result, Err(Error::NoToken { .. })));
    }

    #[test]
    fn test_bitbucket_rejects_plain_token() {
        let result = Provider::new(
            ProviderKind::BitbucketCloud,
            "bitbucket.org",
            token(),
            None,
            RetryPolicy::never(),
        );
        assert!(matches!(result, Err(Error::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_connect_known_host_skips_probing() {
        let auth = Auth::Token(token());
        let provider = Provider::connect("codeberg.org", &auth, &Config::default())
            .await
            .unwrap();
        assert_eq!(provider.kind(), ProviderKind::Gitea);
    }

    #[tokio::test]
    async fn test_connect_uses_configured_pin() {
        let pinned = HostConfig {
            kind: ProviderKind::GitLab,
            api_url: Some("https://git.example.com/gitlab/api/v4".into()),
        };
        let config = Config {
            hosts: BTreeMap::from([("git.example.com".to_string(), pinned)]),
            ..Config::default()
        };

        let provider = Provider::connect("git.example.com", &Auth::Token(token()), &config)
            .await
            .unwrap();
        assert_eq!(provider.kind(), ProviderKind::GitLab);
    }

    #[tokio::test]
    async fn test_detect_falls_through_to_gitea() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v4/version"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "1.21.11" })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let uri = mock_server.uri();
        let provider = Provider::detect(
            "git.example.com",
            &format!("{uri}/api/v4"),
            &format!("{uri}/api/v1"),
            token(),
            RetryPolicy::never(),
        )
        .await
        .unwrap();

        assert_eq!(provider.kind(), ProviderKind::Gitea);
    }

    #[tokio::test]
    async fn test_detect_prefers_gitlab() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v4/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "version": "16.9.1",
                "revision": "abc"
            })))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "1.21.11" })))
            .expect(0)
            .mount(&mock_server)
            .await;

        let uri = mock_server.uri();
        let provider = Provider::detect(
            "git.example.com",
            &format!("{uri}/api/v4"),
            &format!("{uri}/api/v1"),
            token(),
            RetryPolicy::never(),
        )
        .await
        .unwrap();

        assert_eq!(provider.kind(), ProviderKind::GitLab);
    }

    #[tokio::test]
    async fn test_unrecognized_host() {
        let mock_server = MockServer::start().await;
        let uri = mock_server.uri();

        let result = Provider::detect(
            "git.example.com",
            &format!("{uri}/api/v4"),
            &format!("{uri}/api/v1"),
            token(),
            RetryPolicy::never(),
        )
        .await;

        assert!(matches!(result, Err(Error::UnrecognizedProvider(h)) if h == "git.example.com"));
    }

    #[tokio::test]
    async fn test_dispatch_reaches_backend() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "login": "fnetx" })))
            .mount(&mock_server)
            .await;

        let provider = Provider::new(
            ProviderKind::Gitea,
            "codeberg.org",
            token(),
            Some(&mock_server.uri()),
            RetryPolicy::never(),
        )
        .unwrap();

        assert_eq!(provider.username().await.unwrap(), "fnetx");
    }
}

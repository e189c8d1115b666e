//! Shared HTTP plumbing: authentication, status mapping and rate-limit retry.

use std::future::Future;

use gitty_core::RetryPolicy;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// How a backend expects its token to be presented.
pub(crate) enum AuthScheme {
    /// `Authorization: Bearer <token>` (GitHub).
    Bearer(SecretString),
    /// `PRIVATE-TOKEN: <token>` (GitLab).
    PrivateToken(SecretString),
    /// `Authorization: token <token>` (Gitea).
    Token(SecretString),
    /// HTTP basic auth (Bitbucket app passwords).
    Basic {
        username: String,
        password: SecretString,
    },
}

impl AuthScheme {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Bearer(token) => {
                request.header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()))
            }
            Self::PrivateToken(token) => request.header("PRIVATE-TOKEN", token.expose_secret()),
            Self::Token(token) => {
                request.header(AUTHORIZATION, format!("token {}", token.expose_secret()))
            }
            Self::Basic { username, password } => {
                request.basic_auth(username, Some(password.expose_secret()))
            }
        }
    }

    const fn name(&self) -> &'static str {
        match self {
            Self::Bearer(_) => "bearer",
            Self::PrivateToken(_) => "private-token",
            Self::Token(_) => "token",
            Self::Basic { .. } => "basic",
        }
    }
}

/// A decoded response body plus the headers it came with.
pub(crate) struct Fetched<T> {
    pub body: T,
    pub headers: HeaderMap,
}

/// Authenticated JSON client for one API base URL.
pub(crate) struct HttpClient {
    client: Client,
    base_url: String,
    auth: AuthScheme,
    retry: RetryPolicy,
}

impl HttpClient {
    pub(crate) fn new(base_url: impl Into<String>, auth: AuthScheme) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("gitty"));

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            retry: RetryPolicy::default(),
        })
    }

    pub(crate) const fn set_retry(&mut self, retry: RetryPolicy) {
        self.retry = retry;
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs (e.g. a `next` link) are used as-is.
    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Run `action`, backing off while it reports a rate limit.
    ///
    /// Once retries are exhausted a rate-limit failure surfaces as
    /// [`Error::RateLimited`].
    pub(crate) async fn with_retry<T, F, Fut>(&self, action: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.retry
            .run(action, Error::is_rate_limit)
            .await
            .map_err(|e| if e.is_rate_limit() { Error::RateLimited } else { e })
    }

    /// GET and decode JSON.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        Ok(self.get_with_headers(path, query).await?.body)
    }

    /// GET and decode JSON, keeping response headers for pagination.
    pub(crate) async fn get_with_headers<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Fetched<T>> {
        self.with_retry(move || self.get_once(path, query)).await
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Fetched<T>> {
        let url = self.url(path);
        tracing::debug!(%url, ?query, "GET");
        let response = self
            .auth
            .apply(self.client.get(&url))
            .query(query)
            .send()
            .await?;

        handle_response(response).await
    }

    /// POST a JSON body once, without retry.
    pub(crate) async fn post_once<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(path);
        tracing::debug!(%url, "POST");
        let response = self
            .auth
            .apply(self.client.post(&url))
            .json(body)
            .send()
            .await?;

        Ok(handle_response(response).await?.body)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth.name())
            .field("token", &"[redacted]")
            .finish_non_exhaustive()
    }
}

/// Handle API response.
async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<Fetched<T>> {
    let status = response.status();

    if status.is_success() {
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice(&bytes)?;
        return Ok(Fetched { body, headers });
    }

    // Handle error responses
    let status_code = status.as_u16();

    match status_code {
        401 => Err(Error::AuthenticationFailed),
        429 => Err(Error::RateLimited),
        403 if response
            .headers()
            .get("x-ratelimit-remaining")
            .is_some_and(|v| v == "0") =>
        {
            Err(Error::RateLimited)
        }
        404 => Err(Error::NotFound(response.url().path().to_string())),
        _ => {
            let text = response.text().await.unwrap_or_default();
            Err(Error::ApiError {
                status: status_code,
                message: text,
            })
        }
    }
}

/// Numeric response header, e.g. `x-total-pages`.
pub(crate) fn header_number(headers: &HeaderMap, name: &str) -> Option<u32> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    fn test_client(base_url: &str) -> HttpClient {
        let mut client =
            HttpClient::new(base_url, AuthScheme::Token(SecretString::from("test-token"))).unwrap();
        client.set_retry(fast_retry());
        client
    }

    #[tokio::test]
    async fn test_get_sends_auth_and_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/things"))
            .and(query_param("page", "2"))
            .and(header("authorization", "token test-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-total-pages", "4")
                    .set_body_json(serde_json::json!([1, 2])),
            )
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());
        let fetched: Fetched<Vec<u32>> = client
            .get_with_headers("/things", &[("page", "2".into())])
            .await
            .unwrap();

        assert_eq!(fetched.body, vec![1, 2]);
        assert_eq!(header_number(&fetched.headers, "x-total-pages"), Some(4));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let mock_server = MockServer::start().await;

        Mock::given(path("/unauthorized"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        Mock::given(path("/broken"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());

        let err = client.get::<serde_json::Value>("/unauthorized", &[]).await;
        assert!(matches!(err, Err(Error::AuthenticationFailed)));

        let err = client.get::<serde_json::Value>("/missing", &[]).await;
        assert!(matches!(err, Err(Error::NotFound(p)) if p == "/missing"));

        let err = client.get::<serde_json::Value>("/broken", &[]).await;
        assert!(matches!(err, Err(Error::ApiError { status: 500, message }) if message == "boom"));
    }

    #[tokio::test]
    async fn test_retries_rate_limit_then_succeeds() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/limited"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-ratelimit-remaining", "0")
                    .set_body_json(serde_json::json!({ "message": "API rate limit exceeded" })),
            )
            .up_to_n_times(2)
            .expect(2)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/limited"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());
        let body: serde_json::Value = client.get("/limited", &[]).await.unwrap();

        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_rate_limit_surfaces_after_retries() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/limited"))
            .respond_with(ResponseTemplate::new(429))
            .expect(4)
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());
        let result = client.get::<serde_json::Value>("/limited", &[]).await;

        assert!(matches!(result, Err(Error::RateLimited)));
    }

    #[tokio::test]
    async fn test_absolute_url_bypasses_base() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/elsewhere"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&mock_server)
            .await;

        let client = test_client("https://api.invalid");
        let next = format!("{}/elsewhere", mock_server.uri());
        let body: Vec<u32> = client.get(&next, &[]).await.unwrap();

        assert!(body.is_empty());
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = HttpClient::new(
            "https://api.example.com",
            AuthScheme::Bearer(SecretString::from("super-secret-token")),
        )
        .unwrap();

        let debug_output = format!("{client:?}");

        assert!(debug_output.contains("[redacted]"));
        assert!(!debug_output.contains("super-secret-token"));
    }
}

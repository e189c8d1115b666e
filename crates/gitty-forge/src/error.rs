//! Error types for gitty-forge.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Case-insensitive markers backends put in rate-limit error messages.
const RATE_LIMIT_MARKERS: [&str; 3] = [
    "abuse-rate-limits",
    "secondary rate limit",
    "rate limit exceeded",
];

/// Errors that can occur while talking to a hosting backend.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No token configured for the host.
    #[error("no token found for {host} - set GITTY_TOKENS=\"{host}=<token>\"")]
    NoToken { host: String },

    /// The configured token has the wrong shape for its backend.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The backend rejected the token.
    #[error("authentication failed - check the token for this host")]
    AuthenticationFailed,

    /// Host matches no known backend and failed every compatibility check.
    #[error("{0} is not a recognized git provider")]
    UnrecognizedProvider(String),

    /// Rate limit still in effect after all retries.
    #[error("API rate limit exceeded - wait and try again")]
    RateLimited,

    /// Resource not found or no access.
    #[error("not found: {0}")]
    NotFound(String),

    /// API error with status code.
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// The GraphQL endpoint answered with errors.
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// Network error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// IO error (e.g., reading gh CLI token).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether backing off and resubmitting the same request may succeed.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::RateLimited | Self::ApiError { status: 429, .. } => true,
            Self::ApiError { message, .. } | Self::GraphQl(message) => {
                let message = message.to_ascii_lowercase();
                RATE_LIMIT_MARKERS.iter().any(|m| message.contains(m))
            }
            _ => false,
        }
    }
}

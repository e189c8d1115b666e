//! Per-host token resolution.

use std::process::Command;

use secrecy::{ExposeSecret, SecretString};

use crate::error::{Error, Result};

/// Semicolon-separated `host=token` list.
pub const TOKENS_ENV: &str = "GITTY_TOKENS";

/// Single-token variables consulted for `github.com` only, in order.
pub const LEGACY_GITHUB_TOKEN_ENVS: [&str; 2] = ["GITTY_TOKEN", "GITHUB_TOKEN"];

const GITHUB_HOST: &str = "github.com";

/// Authentication method for a hosting backend.
#[derive(Debug, Clone, Default)]
pub enum Auth {
    /// Look the token up in the environment, falling back to the gh CLI
    /// for `github.com`.
    #[default]
    Auto,

    /// Use a specific token.
    Token(SecretString),
}

impl Auth {
    /// Resolve the token for `host`.
    ///
    /// # Errors
    /// Returns `NoToken` if no non-empty token is available.
    pub fn resolve(&self, host: &str) -> Result<SecretString> {
        match self {
            Self::Token(token) => require_token(host, token).map(|()| token.clone()),
            Self::Auto => token_from_env(host, |key| std::env::var(key).ok())
                .or_else(|| is_github(host).then(get_gh_token).and_then(Result::ok))
                .map(SecretString::from)
                .ok_or_else(|| Error::NoToken { host: host.into() }),
        }
    }
}

/// Reject blank tokens for `host`.
pub(crate) fn require_token(host: &str, token: &SecretString) -> Result<()> {
    if token.expose_secret().trim().is_empty() {
        return Err(Error::NoToken { host: host.into() });
    }
    Ok(())
}

fn is_github(host: &str) -> bool {
    host.eq_ignore_ascii_case(GITHUB_HOST)
}

/// Find the token for `host` using `lookup` to read environment variables.
///
/// `GITTY_TOKENS` entries match the host case-insensitively; values are
/// trimmed and empty values are ignored. For `github.com` the legacy
/// single-token variables are consulted afterwards.
pub(crate) fn token_from_env(host: &str, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    let from_list = lookup(TOKENS_ENV).and_then(|list| {
        list.split(';')
            .filter_map(|entry| entry.split_once('='))
            .filter(|(key, _)| key.trim().eq_ignore_ascii_case(host))
            .map(|(_, value)| value.trim().to_string())
            .find(|value| !value.is_empty())
    });
    if from_list.is_some() {
        return from_list;
    }

    if !is_github(host) {
        return None;
    }

    LEGACY_GITHUB_TOKEN_ENVS
        .iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Get GitHub token from gh CLI.
fn get_gh_token() -> Result<String> {
    let output = Command::new("gh").args(["auth", "token"]).output()?;

    if !output.status.success() {
        return Err(Error::NoToken {
            host: GITHUB_HOST.into(),
        });
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();

    if token.is_empty() {
        return Err(Error::NoToken {
            host: GITHUB_HOST.into(),
        });
    }

    tracing::debug!("using token from gh CLI");
    Ok(token)
}

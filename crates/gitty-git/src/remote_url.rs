//! Normalization of git remote strings into hosted-repository coordinates.

use std::fmt;

use crate::error::{Error, Result};

/// A hosted repository identified by host, owner and name.
///
/// Displays as the canonical `https://host/owner/name` web URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUrl {
    /// Lowercased hostname without port or user info.
    pub host: String,

    /// Owning user, organization or top-level group.
    pub owner: String,

    /// Repository name; may contain `/` for nested groups.
    pub name: String,
}

impl RemoteUrl {
    /// Parse a remote URL or repository argument.
    ///
    /// Accepts `https://`, `http://`, `ssh://` and `git://` URLs as well as
    /// scp-style `git@host:owner/name.git` and bare `host/owner/name`.
    /// Ports, user info and a trailing `.git` are dropped, and
    /// `ssh.github.com` (GitHub's SSH-over-443 endpoint) maps to `github.com`.
    ///
    /// # Errors
    /// Returns `InvalidRemoteUrl` if no host, owner and name can be extracted.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let invalid = || Error::InvalidRemoteUrl(raw.to_string());

        let rest = match raw.split_once("://") {
            Some((_scheme, rest)) => rest.to_string(),
            None => raw.replacen(':', "/", 1),
        };

        let (authority, path) = rest.split_once('/').ok_or_else(invalid)?;
        let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
        let host = strip_port(host).to_ascii_lowercase();
        if host.is_empty() {
            return Err(invalid());
        }

        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = path.trim_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);

        let (owner, name) = path.split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() {
            return Err(invalid());
        }

        let host = if host == "ssh.github.com" {
            "github.com".to_string()
        } else {
            host
        };

        Ok(Self {
            host,
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// `owner/name`.
    #[must_use]
    pub fn name_with_owner(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "https://{}/{}/{}", self.host, self.owner, self.name)
    }
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

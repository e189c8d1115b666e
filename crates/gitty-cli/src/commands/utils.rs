//! Shared helpers for commands.

use std::path::Path;

use anyhow::{Context, Result};
use gitty_core::Config;
use gitty_core::config::GeneralConfig;
use gitty_forge::{Auth, Provider};
use gitty_git::{RemoteUrl, Repository};

/// The hosted repository a command works on.
pub struct Target {
    /// Normalized web coordinates.
    pub url: RemoteUrl,

    /// Local checkout and the remote it was resolved from, when the
    /// argument was a path.
    pub local: Option<(Repository, String)>,
}

/// Resolve a path or URL argument.
///
/// Existing paths are opened as working copies; anything else must parse
/// as a remote URL.
pub fn resolve_target(arg: &str, settings: &GeneralConfig) -> Result<Target> {
    if !Path::new(arg).exists() {
        let url = RemoteUrl::parse(arg)
            .with_context(|| format!("{arg} is neither a local repository nor a repository URL"))?;
        return Ok(Target { url, local: None });
    }

    let repo = Repository::open(arg).context("Not inside a git repository")?;
    let (remote, url) = match &settings.remote {
        Some(name) => {
            let url = RemoteUrl::parse(&repo.remote_url(name)?)?;
            (name.clone(), url)
        }
        None => repo.preferred_remote()?,
    };

    Ok(Target {
        url,
        local: Some((repo, remote)),
    })
}

/// Connect to the backend serving `host`.
pub async fn connect(host: &str, config: &Config) -> Result<Provider> {
    Provider::connect(host, &Auth::Auto, config)
        .await
        .with_context(|| format!("Failed to connect to {host}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_url_argument_has_no_local_checkout() {
        let target =
            resolve_target("git@github.com:muesli/gitty.git", &GeneralConfig::default()).unwrap();

        assert_eq!(target.url.to_string(), "https://github.com/muesli/gitty");
        assert!(target.local.is_none());
    }

    #[test]
    fn test_path_argument_uses_preferred_remote() {
        let temp = TempDir::new().unwrap();
        let git = git2::Repository::init(temp.path()).unwrap();
        git.remote("origin", "https://github.com/me/gitty.git").unwrap();
        git.remote("upstream", "https://github.com/muesli/gitty.git")
            .unwrap();

        let target =
            resolve_target(temp.path().to_str().unwrap(), &GeneralConfig::default()).unwrap();
        assert_eq!(target.url.name_with_owner(), "muesli/gitty");
        assert_eq!(target.local.as_ref().unwrap().1, "upstream");

        let pinned = GeneralConfig {
            remote: Some("origin".into()),
            ..GeneralConfig::default()
        };
        let target = resolve_target(temp.path().to_str().unwrap(), &pinned).unwrap();
        assert_eq!(target.url.name_with_owner(), "me/gitty");
    }

    #[test]
    fn test_unparseable_argument() {
        let err = resolve_target("not-a-repo", &GeneralConfig::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("neither a local repository"));
    }
}

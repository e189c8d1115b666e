//! Release overview across every repository of the authenticated user.

use std::cmp::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use gitty_core::{Repository, repos_with_release};
use gitty_forge::Forge;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

/// Service collecting released repositories and their unreleased commits.
pub struct ProjectsService<F: Forge + 'static> {
    forge: Arc<F>,
}

impl<F: Forge + 'static> ProjectsService<F> {
    /// Create a new projects service.
    pub const fn new(forge: Arc<F>) -> Self {
        Self { forge }
    }

    /// Every repository with a release, newest release first, each carrying
    /// the commits made since that release.
    ///
    /// History is fetched concurrently, one task per repository, each
    /// appending to a shared list. The first failing task aborts the rest.
    pub async fn fetch(&self) -> Result<Vec<Repository>> {
        let user = self
            .forge
            .username()
            .await
            .context("Failed to look up the authenticated user")?;
        let repos = self
            .forge
            .repositories(&user)
            .await
            .with_context(|| format!("Failed to list repositories of {user}"))?;

        let released = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = JoinSet::new();
        for mut repo in repos_with_release(repos) {
            let forge = Arc::clone(&self.forge);
            let released = Arc::clone(&released);
            tasks.spawn(async move {
                let since = repo.released_at();
                let commits = forge.history(&repo, 0, since).await?;
                tracing::debug!(
                    repo = %repo.name_with_owner,
                    commits = commits.len(),
                    "collected release history"
                );
                if let Some(release) = repo.last_release.as_mut() {
                    release.commits_since = commits;
                }
                released.lock().await.push(repo);
                Ok::<_, gitty_forge::Error>(())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            joined.context("History task panicked")??;
        }

        let mut released = std::mem::take(&mut *released.lock().await);
        released.sort_by(by_release_date);
        Ok(released)
    }
}

/// Newest release first; same-instant releases ordered by name.
fn by_release_date(a: &Repository, b: &Repository) -> Ordering {
    b.released_at()
        .cmp(&a.released_at())
        .then_with(|| a.name.cmp(&b.name))
}

/// Number of commits since the repository's last release.
pub fn new_commits(repo: &Repository) -> usize {
    repo.last_release
        .as_ref()
        .map_or(0, |release| release.commits_since.len())
}

/// Whether a repository has too little unreleased work to be listed.
pub fn is_stale(repo: &Repository, min_new_commits: usize) -> bool {
    new_commits(repo) < min_new_commits
}

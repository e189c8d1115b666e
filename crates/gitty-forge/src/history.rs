//! Early-exit collection of commit history pages.

use std::future::Future;

use chrono::{DateTime, Utc};
use gitty_core::{Commit, Page, PageToken, Paginator};

use crate::error::{Error, Result};

/// Pull commit pages until a commit older than `since` appears or
/// `max_count` commits (when non-zero) have been collected.
///
/// Backends page history newest first, so the first commit older than
/// `since` ends the walk without fetching further pages.
pub(crate) async fn collect_history<F, Fut>(
    mut pages: Paginator<F>,
    max_count: usize,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<Commit>>
where
    F: FnMut(PageToken) -> Fut,
    Fut: Future<Output = std::result::Result<Page<Commit>, Error>>,
{
    let mut commits = Vec::new();

    while let Some(page) = pages.next_page().await? {
        for commit in page {
            if since.is_some_and(|since| commit.committed_at < since) {
                return Ok(commits);
            }
            commits.push(commit);
            if max_count > 0 && commits.len() >= max_count {
                return Ok(commits);
            }
        }
    }

    Ok(commits)
}

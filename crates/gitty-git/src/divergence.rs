//! Ahead/behind computation between two commits.
//!
//! Both counts come from one rule: the symmetric difference of the two
//! ancestry cones. Linear counting along first parents would miscount
//! across merges, so each side's full reachability set is materialized.

use gitty_core::BranchTrackingStatus;
use git2::Oid;

use crate::error::Result;
use crate::repository::Repository;

/// Count commits reachable from `local` but not `remote` (ahead), and from
/// `remote` but not `local` (behind).
///
/// # Errors
/// Returns `CommitNotFound` if either side is missing from the local object
/// database, or a git error if the history walk fails.
pub fn divergence(repo: &Repository, local: Oid, remote: Oid) -> Result<(usize, usize)> {
    if local == remote {
        repo.require_commit(local)?;
        return Ok((0, 0));
    }

    let local_cone = repo.ancestry(local)?;
    let remote_cone = repo.ancestry(remote)?;

    let ahead = local_cone.difference(&remote_cone).count();
    let behind = remote_cone.difference(&local_cone).count();
    tracing::trace!(%local, %remote, ahead, behind, "computed divergence");

    Ok((ahead, behind))
}

/// Tracking status of a matched branch pair.
///
/// `remote` is the live remote-tracking ref; `recorded_tip` is the tip hash
/// the provider reported earlier in the same run. A mismatch marks the
/// status outdated, while ahead/behind are still measured against `remote`.
///
/// # Errors
/// See [`divergence`].
pub fn tracking_status(
    repo: &Repository,
    local: Oid,
    remote: Oid,
    recorded_tip: &str,
) -> Result<BranchTrackingStatus> {
    let (ahead, behind) = divergence(repo, local, remote)?;
    Ok(BranchTrackingStatus {
        ahead,
        behind,
        outdated: remote.to_string() != recorded_tip,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::test_support::{commit, extend, init_test_repo};

    fn graph_counts(git: &git2::Repository, local: Oid, remote: Oid) -> (usize, usize) {
        git.graph_ahead_behind(local, remote).unwrap()
    }

    #[test]
    fn test_same_commit_is_in_sync() {
        let (temp, git) = init_test_repo();
        let root = commit(&git, &[], "root");
        let repo = Repository::open(temp.path()).unwrap();

        let status = tracking_status(&repo, root, root, &root.to_string()).unwrap();
        assert_eq!(status, BranchTrackingStatus::default());
        assert!(status.is_in_sync());
    }

    #[test]
    fn test_unpushed_commits_are_ahead() {
        let (temp, git) = init_test_repo();
        let remote = extend(&git, commit(&git, &[], "root"), 3, "shared");
        let local = extend(&git, remote, 2, "local");
        let repo = Repository::open(temp.path()).unwrap();

        let status = tracking_status(&repo, local, remote, &remote.to_string()).unwrap();
        assert_eq!((status.ahead, status.behind), (2, 0));
        assert!(!status.outdated);
    }

    #[test]
    fn test_counts_swap_when_roles_swap() {
        let (temp, git) = init_test_repo();
        let base = extend(&git, commit(&git, &[], "root"), 2, "base");
        let local = extend(&git, base, 4, "local");
        let remote = extend(&git, base, 7, "remote");
        let repo = Repository::open(temp.path()).unwrap();

        assert_eq!(divergence(&repo, local, remote).unwrap(), (4, 7));
        assert_eq!(divergence(&repo, remote, local).unwrap(), (7, 4));
        assert_eq!(
            divergence(&repo, local, remote).unwrap(),
            graph_counts(&git, local, remote)
        );
    }

    #[test]
    fn test_merge_history_counts_reachability_not_length() {
        // root - a1 - a2 ----- m   (local)
        //    \             /
        //     b1 - b2 - b3         (remote)
        let (temp, git) = init_test_repo();
        let root = commit(&git, &[], "root");
        let a = extend(&git, root, 2, "a");
        let b = extend(&git, root, 3, "b");
        let merge = commit(&git, &[a, b], "merge");
        let repo = Repository::open(temp.path()).unwrap();

        // a1, a2 and the merge itself; every b commit is reachable from both
        assert_eq!(divergence(&repo, merge, b).unwrap(), (3, 0));
        assert_eq!(divergence(&repo, b, merge).unwrap(), (0, 3));
        assert_eq!(divergence(&repo, a, b).unwrap(), graph_counts(&git, a, b));
    }

    #[test]
    fn test_force_push_marks_outdated_and_counts_against_live_tip() {
        let (temp, git) = init_test_repo();
        let base = commit(&git, &[], "root");
        let recorded = extend(&git, base, 2, "before force push");
        let live = extend(&git, base, 1, "after force push");
        let local = recorded;
        let repo = Repository::open(temp.path()).unwrap();

        let status = tracking_status(&repo, local, live, &recorded.to_string()).unwrap();
        assert!(status.outdated);
        assert_eq!((status.ahead, status.behind), (2, 1));
    }

    #[test]
    fn test_outdated_even_when_in_sync() {
        let (temp, git) = init_test_repo();
        let root = commit(&git, &[], "root");
        let repo = Repository::open(temp.path()).unwrap();

        let status = tracking_status(&repo, root, root, "deadbeef").unwrap();
        assert!(status.outdated);
        assert!(status.is_in_sync());
    }

    #[test]
    fn test_missing_commit_is_an_error() {
        let (temp, git) = init_test_repo();
        let root = commit(&git, &[], "root");
        let missing = Oid::from_str("2222222222222222222222222222222222222222").unwrap();
        let repo = Repository::open(temp.path()).unwrap();

        assert!(matches!(
            divergence(&repo, root, missing),
            Err(Error::CommitNotFound(_))
        ));
        assert!(matches!(
            divergence(&repo, missing, missing),
            Err(Error::CommitNotFound(_))
        ));
    }
}

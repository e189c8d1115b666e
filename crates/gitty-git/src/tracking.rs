//! Matching local branches to remote branch records.

use std::collections::{BTreeMap, HashMap, HashSet};

use gitty_core::{Branch, BranchTrackingStatus};

use crate::divergence::tracking_status;
use crate::error::Result;
use crate::repository::Repository;

/// Which rule paired a local branch with a remote one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// The local branch's tracking config names this remote and branch.
    Upstream,
    /// No tracking config, but the local branch has the same name.
    ///
    /// Best effort: two unrelated branches can share a name.
    SameName,
}

/// The local counterpart of a remote branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedBranch {
    /// Local branch name.
    pub local: String,

    /// How the pairing was made.
    pub rule: MatchRule,
}

/// Pair each remote branch with a local branch, if one tracks it.
///
/// Branches whose tracking config points at a different remote are never
/// used for same-name matching.
///
/// # Errors
/// Returns error if local branches or their config can't be read.
pub fn resolve_tracking(
    repo: &Repository,
    remote: &str,
    remote_branches: &[Branch],
) -> Result<BTreeMap<String, Option<TrackedBranch>>> {
    let mut by_upstream: HashMap<String, String> = HashMap::new();
    let mut untracked: HashSet<String> = HashSet::new();

    for local in repo.list_branches()? {
        match repo.upstream(&local)? {
            Some(upstream) if upstream.remote == remote => {
                by_upstream
                    .entry(upstream.merge_short().to_string())
                    .or_insert(local);
            }
            Some(_) => {}
            None => {
                untracked.insert(local);
            }
        }
    }

    Ok(remote_branches
        .iter()
        .map(|branch| {
            let tracked = by_upstream
                .get(&branch.name)
                .map(|local| TrackedBranch {
                    local: local.clone(),
                    rule: MatchRule::Upstream,
                })
                .or_else(|| {
                    untracked.contains(&branch.name).then(|| TrackedBranch {
                        local: branch.name.clone(),
                        rule: MatchRule::SameName,
                    })
                });
            if let Some(t) = &tracked {
                tracing::debug!(branch = %branch.name, local = %t.local, rule = ?t.rule, "matched local branch");
            }
            (branch.name.clone(), tracked)
        })
        .collect())
}

/// Tracking status for every remote branch, keyed by remote branch name.
///
/// `None` means no local counterpart, or that the local or remote ref could
/// not be resolved to a commit (e.g. the remote branch was never fetched).
/// Such failures only affect their own branch.
///
/// # Errors
/// Returns error if local branches or their config can't be read.
pub fn tracking_statuses(
    repo: &Repository,
    remote: &str,
    remote_branches: &[Branch],
) -> Result<BTreeMap<String, Option<BranchTrackingStatus>>> {
    let matches = resolve_tracking(repo, remote, remote_branches)?;

    Ok(remote_branches
        .iter()
        .map(|branch| {
            let status = matches
                .get(&branch.name)
                .and_then(Option::as_ref)
                .and_then(|tracked| match branch_status(repo, remote, branch, tracked) {
                    Ok(status) => Some(status),
                    Err(e) => {
                        tracing::debug!(branch = %branch.name, error = %e, "no tracking status");
                        None
                    }
                });
            (branch.name.clone(), status)
        })
        .collect())
}

fn branch_status(
    repo: &Repository,
    remote: &str,
    branch: &Branch,
    tracked: &TrackedBranch,
) -> Result<BranchTrackingStatus> {
    let local = repo.branch_commit(&tracked.local)?;
    let live = repo.remote_branch_commit(remote, &branch.name)?;
    tracking_status(repo, local, live, &branch.last_commit.id)
}

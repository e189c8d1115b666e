//! Helpers for building throwaway repositories in tests.

#![allow(clippy::unwrap_used)]

use git2::{Oid, Signature};
use tempfile::TempDir;

/// A fresh repository with no commits.
///
/// Open the [`crate::Repository`] wrapper after setup so it sees the
/// final config.
pub fn init_test_repo() -> (TempDir, git2::Repository) {
    let temp = TempDir::new().unwrap();
    let git = git2::Repository::init(temp.path()).unwrap();
    (temp, git)
}

/// Write a commit with the given parents without moving any ref.
///
/// Messages must be unique within a test so that commits never collide.
pub fn commit(git: &git2::Repository, parents: &[Oid], message: &str) -> Oid {
    let sig = Signature::now("gitty", "gitty@example.com").unwrap();
    let tree_id = {
        let mut builder = git.treebuilder(None).unwrap();
        let blob = git.blob(message.as_bytes()).unwrap();
        builder.insert("file.txt", blob, 0o100_644).unwrap();
        builder.write().unwrap()
    };
    let tree = git.find_tree(tree_id).unwrap();
    let parents: Vec<git2::Commit<'_>> = parents
        .iter()
        .map(|oid| git.find_commit(*oid).unwrap())
        .collect();
    let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();

    git.commit(None, &sig, &sig, message, &tree, &parent_refs)
        .unwrap()
}

/// Linear chain of `count` commits on top of `base`, returning the new tip.
pub fn extend(git: &git2::Repository, base: Oid, count: usize, label: &str) -> Oid {
    (0..count).fold(base, |tip, i| commit(git, &[tip], &format!("{label} {i}")))
}

/// Point `name` at `oid`, creating or overwriting it.
pub fn set_ref(git: &git2::Repository, name: &str, oid: Oid) {
    git.reference(name, oid, true, "test").unwrap();
}

/// Configure `branch` to track `remote/merge`.
pub fn set_upstream(git: &git2::Repository, branch: &str, remote: &str, merge: &str) {
    let mut config = git.config().unwrap();
    config
        .set_str(&format!("branch.{branch}.remote"), remote)
        .unwrap();
    config
        .set_str(&format!("branch.{branch}.merge"), &format!("refs/heads/{merge}"))
        .unwrap();
}

//! # gitty-git
//!
//! Read-only access to a local working copy, built on git2-rs.
//! Resolves the hosted repository a checkout belongs to, matches local
//! branches to their remote counterparts and computes how far each pair
//! has diverged.

mod divergence;
mod error;
mod remote_url;
mod repository;
#[cfg(test)]
mod test_support;
mod tracking;

pub use divergence::{divergence, tracking_status};
pub use error::{Error, Result};
pub use git2::Oid;
pub use remote_url::RemoteUrl;
pub use repository::{Repository, Upstream};
pub use tracking::{MatchRule, TrackedBranch, resolve_tracking, tracking_statuses};

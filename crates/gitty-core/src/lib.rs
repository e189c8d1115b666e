//! # gitty-core
//!
//! Core library for gitty, providing the canonical model that every
//! hosting backend is normalized into, plus the two mechanisms shared by
//! all backends: lazy pagination and rate-limit retry.

pub mod config;
mod error;
pub mod pagination;
pub mod retry;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use pagination::{Page, PageToken, Paginator};
pub use retry::RetryPolicy;
pub use types::{
    Branch, BranchTrackingStatus, Commit, Issue, Label, ProviderKind, PullRequest, Release,
    Repository, repos_with_release,
};

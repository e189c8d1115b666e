//! # gitty-forge
//!
//! Read-only clients for the git hosting backends gitty supports:
//! GitHub (GraphQL), GitLab, Gitea/Forgejo and Bitbucket Cloud (REST).
//! Every backend implements [`Forge`] and normalizes its responses into
//! the canonical types from `gitty-core`. [`Provider`] picks the backend
//! for a hostname.
//!
//! # Security
//!
//! Authentication tokens are stored using `SecretString` which automatically
//! zeroizes memory when dropped, reducing credential exposure in memory dumps.

mod auth;
mod bitbucket;
mod error;
mod gitea;
mod github;
mod gitlab;
mod history;
mod http;
mod provider;
mod traits;

pub use auth::{Auth, LEGACY_GITHUB_TOKEN_ENVS, TOKENS_ENV};
pub use bitbucket::BitbucketClient;
pub use error::{Error, Result};
pub use gitea::GiteaClient;
pub use github::GitHubClient;
pub use gitlab::GitLabClient;
pub use provider::{Provider, known_kind};
// Re-export SecretString for constructing Auth::Token
pub use secrecy::SecretString;
pub use traits::Forge;

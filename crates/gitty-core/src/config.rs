//! Configuration management for gitty.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::types::ProviderKind;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "GITTY_CONFIG";

/// gitty configuration loaded from `~/.config/gitty/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Rate-limit retry settings.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Per-host backend overrides, keyed by hostname.
    #[serde(default)]
    pub hosts: BTreeMap<String, HostConfig>,
}

impl Config {
    /// Load config from a TOML file.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    /// Returns error if file can't be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse {
            file: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load config from [`Config::default_path`], or defaults if there is none.
    ///
    /// # Errors
    /// Returns error if an existing file can't be read or parsed.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// `$GITTY_CONFIG`, else `<user config dir>/gitty/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        resolve_path(std::env::var_os(CONFIG_ENV), dirs::config_dir())
    }

    /// Settings pinned for `host`, matched case-insensitively.
    #[must_use]
    pub fn host(&self, host: &str) -> Option<&HostConfig> {
        self.hosts
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(host))
            .map(|(_, cfg)| cfg)
    }
}

fn resolve_path(env_override: Option<OsString>, config_dir: Option<PathBuf>) -> Option<PathBuf> {
    env_override
        .map(PathBuf::from)
        .or_else(|| config_dir.map(|dir| dir.join("gitty").join("config.toml")))
}

/// General gitty settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Remote to resolve the repository from and track branches against.
    ///
    /// Unset means `upstream`, then `origin`, then the first remote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,

    /// Max active branches to show.
    #[serde(default = "default_list_limit")]
    pub max_branches: usize,

    /// Max commits to show.
    #[serde(default = "default_list_limit")]
    pub max_commits: usize,

    /// Max issues to show.
    #[serde(default = "default_list_limit")]
    pub max_issues: usize,

    /// Max pull requests to show.
    #[serde(default = "default_list_limit")]
    pub max_pull_requests: usize,

    /// Branches whose tip is older than this many days are hidden.
    #[serde(default = "default_max_branch_age_days")]
    pub max_branch_age_days: i64,

    /// Repositories with fewer new commits than this count as stale.
    #[serde(default = "default_min_new_commits")]
    pub min_new_commits: usize,

    /// Hide stale repositories in all-projects mode.
    #[serde(default = "default_true")]
    pub skip_stale_repos: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            remote: None,
            max_branches: default_list_limit(),
            max_commits: default_list_limit(),
            max_issues: default_list_limit(),
            max_pull_requests: default_list_limit(),
            max_branch_age_days: default_max_branch_age_days(),
            min_new_commits: default_min_new_commits(),
            skip_stale_repos: true,
        }
    }
}

const fn default_list_limit() -> usize {
    10
}

const fn default_max_branch_age_days() -> i64 {
    28
}

const fn default_min_new_commits() -> usize {
    1
}

const fn default_true() -> bool {
    true
}

/// Rate-limit retry settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries before a rate limit becomes fatal.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First back-off delay in seconds.
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,

    /// Back-off ceiling in seconds.
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_secs: default_initial_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

impl RetryConfig {
    /// The retry policy these settings describe.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_secs(self.initial_delay_secs),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

const fn default_max_retries() -> u32 {
    5
}

const fn default_initial_delay_secs() -> u64 {
    60
}

const fn default_max_delay_secs() -> u64 {
    300
}

/// Settings for a self-hosted instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Backend family, skipping compatibility checks.
    pub kind: ProviderKind,

    /// API base URL, when it differs from the backend's conventional path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

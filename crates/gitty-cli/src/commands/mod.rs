//! Command-line surface and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use gitty_core::Config;
use gitty_core::config::GeneralConfig;

pub mod all_projects;
pub mod dashboard;
pub mod issue_url;
pub mod utils;

/// Contextual information about your git projects, right on the command-line.
#[derive(Debug, Parser)]
#[command(name = "gitty", version, about)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Local path or repository URL (defaults to the current directory).
    #[arg(value_name = "PATH_OR_URL")]
    pub target: Option<String>,

    /// Issue or pull request number to print the URL of.
    #[arg(value_name = "NUMBER")]
    pub number: Option<String>,

    /// Max amount of active branches to show.
    #[arg(long, value_name = "N")]
    pub max_branches: Option<usize>,

    /// Max amount of commits to show.
    #[arg(long, value_name = "N")]
    pub max_commits: Option<usize>,

    /// Max amount of issues to show.
    #[arg(long, value_name = "N")]
    pub max_issues: Option<usize>,

    /// Max amount of pull requests to show.
    #[arg(long, value_name = "N")]
    pub max_pull_requests: Option<usize>,

    /// Max age of a branch in days to be considered active.
    #[arg(long, value_name = "DAYS")]
    pub max_branch_age: Option<i64>,

    /// Min amount of new commits for a repo to be considered new.
    #[arg(long, value_name = "N")]
    pub min_new_commits: Option<usize>,

    /// Skip repos without new activity.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub skip_stale_repos: Option<bool>,

    /// Show new commits.
    #[arg(long)]
    pub with_commits: bool,

    /// Retrieve information for all source repositories.
    #[arg(long)]
    pub all_projects: bool,

    /// Print the collected data as JSON.
    #[arg(long)]
    pub json: bool,

    /// Remote to resolve the repository from.
    #[arg(long, value_name = "NAME")]
    pub remote: Option<String>,

    /// Log debug output to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

/// What the positional arguments ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Path or URL of the repository.
    pub target: String,

    /// Issue or pull request to resolve instead of showing the dashboard.
    pub number: Option<u64>,
}

impl Cli {
    /// Interpret the positional arguments.
    ///
    /// A lone numeric argument is a number for the current directory.
    ///
    /// # Errors
    /// Returns error if the number argument isn't a positive integer.
    pub fn invocation(&self) -> Result<Invocation> {
        let (target, number) = match (&self.target, &self.number) {
            (None, _) => (".".to_string(), None),
            (Some(arg), None) => match arg.parse::<u64>() {
                Ok(n) => (".".to_string(), Some(n)),
                Err(_) => (arg.clone(), None),
            },
            (Some(target), Some(number)) => {
                let n = number
                    .parse::<u64>()
                    .with_context(|| format!("invalid issue number: {number}"))?;
                (target.clone(), Some(n))
            }
        };
        Ok(Invocation { target, number })
    }

    /// File settings with command-line overrides applied.
    #[must_use]
    pub fn settings(&self, file: &GeneralConfig) -> GeneralConfig {
        GeneralConfig {
            remote: self.remote.clone().or_else(|| file.remote.clone()),
            max_branches: self.max_branches.unwrap_or(file.max_branches),
            max_commits: self.max_commits.unwrap_or(file.max_commits),
            max_issues: self.max_issues.unwrap_or(file.max_issues),
            max_pull_requests: self.max_pull_requests.unwrap_or(file.max_pull_requests),
            max_branch_age_days: self.max_branch_age.unwrap_or(file.max_branch_age_days),
            min_new_commits: self.min_new_commits.unwrap_or(file.min_new_commits),
            skip_stale_repos: self.skip_stale_repos.unwrap_or(file.skip_stale_repos),
        }
    }
}

/// Run whichever mode the arguments select.
pub fn run(cli: &Cli) -> Result<()> {
    let config = Config::load_default().context("Failed to load config")?;
    let invocation = cli.invocation()?;
    let settings = cli.settings(&config.general);

    if cli.all_projects {
        return all_projects::run(cli, &invocation, &config, &settings);
    }
    if let Some(number) = invocation.number {
        return issue_url::run(&invocation.target, number, &config, &settings);
    }
    dashboard::run(cli, &invocation.target, &config, &settings)
}

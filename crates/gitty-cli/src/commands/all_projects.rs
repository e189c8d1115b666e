//! Release overview of every repository the authenticated user owns.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use gitty_core::config::GeneralConfig;
use gitty_core::{Config, Release, Repository};

use crate::commands::dashboard::print_commit;
use crate::commands::utils::{connect, resolve_target};
use crate::commands::{Cli, Invocation};
use crate::output::{self, theme};
use crate::services::ProjectsService;
use crate::services::projects::{is_stale, new_commits};

/// Run all-projects mode against the host the target lives on.
pub fn run(
    cli: &Cli,
    invocation: &Invocation,
    config: &Config,
    settings: &GeneralConfig,
) -> Result<()> {
    let host = resolve_target(&invocation.target, settings)?.url.host;

    let rt = tokio::runtime::Runtime::new()?;
    let repos = rt.block_on(async {
        let provider = Arc::new(connect(&host, config).await?);
        ProjectsService::new(provider)
            .fetch()
            .await
            .with_context(|| format!("Failed to collect releases from {host}"))
    })?;

    let total = repos.len();
    let shown: Vec<&Repository> = repos
        .iter()
        .filter(|repo| !(settings.skip_stale_repos && is_stale(repo, settings.min_new_commits)))
        .collect();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    println!("{total} repositories with a release:");
    for repo in shown {
        let Some(release) = &repo.last_release else {
            continue;
        };
        print_release(repo, release);

        if cli.with_commits && !release.commits_since.is_empty() {
            let max = settings.max_commits;
            let count = if max > 0 { max } else { usize::MAX };
            for commit in release.commits_since.iter().take(count) {
                print_commit(commit);
            }
            println!();
        }
    }
    Ok(())
}

fn print_release(repo: &Repository, release: &Release) {
    let age = Utc::now() - release.published_at;
    let age_color = if age > Duration::weeks(4 * 6) {
        theme::RED
    } else if age > Duration::weeks(4 * 3) {
        theme::YELLOW
    } else {
        theme::GREEN
    };

    let commits = new_commits(repo);
    let commits_color = match commits {
        n if n > 32 => theme::RED,
        n if n > 16 => theme::YELLOW,
        _ => theme::GREEN,
    };

    println!(
        "{} {}{}{}{}{}{}",
        output::paint(&repo.name, theme::BLUE),
        output::paint(&release.tag_name, theme::MAGENTA),
        output::paint(" (", theme::GRAY),
        output::paint(&released_ago(release), age_color),
        output::paint(", ", theme::GRAY),
        output::paint(&format!("{commits} new commits since"), commits_color),
        output::paint(")", theme::GRAY),
    );
}

fn released_ago(release: &Release) -> String {
    match output::ago(release.published_at) {
        now if now == "now" => now,
        age => format!("{age} ago"),
    }
}

//! Single-repository dashboard.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use gitty_core::config::GeneralConfig;
use gitty_core::{Branch, Commit, Config, Label};

use crate::commands::Cli;
use crate::commands::utils::{Target, connect, resolve_target};
use crate::output::{self, AGE_WIDTH, LINE_WIDTH, theme};
use crate::services::{BranchRow, Dashboard, DashboardService};

/// Width of an abbreviated commit id.
const SHORT_ID_WIDTH: usize = 7;

/// Run the dashboard for a path or URL.
pub fn run(cli: &Cli, arg: &str, config: &Config, settings: &GeneralConfig) -> Result<()> {
    let target = resolve_target(arg, settings)?;
    tracing::debug!(url = %target.url, "resolved repository");

    let rt = tokio::runtime::Runtime::new()?;
    let mut dashboard = rt.block_on(async {
        let provider = connect(&target.url.host, config).await?;
        DashboardService::new(&provider, target.url.owner.clone(), target.url.name.clone())
            .fetch(
                settings.max_commits,
                settings.max_branch_age_days,
                settings.max_branches,
            )
            .await
            .with_context(|| format!("Failed to fetch {}", target.url))
    })?;

    attach_tracking(&target, &mut dashboard);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
        return Ok(());
    }

    print_dashboard(&target, &dashboard, settings);
    Ok(())
}

/// Compare remote branches with the local checkout, if there is one.
fn attach_tracking(target: &Target, dashboard: &mut Dashboard) {
    let Some((repo, remote)) = &target.local else {
        return;
    };

    let branches: Vec<Branch> = dashboard
        .branches
        .iter()
        .map(|row| row.branch.clone())
        .collect();
    match gitty_git::tracking_statuses(repo, remote, &branches) {
        Ok(statuses) => dashboard.attach_tracking(&statuses),
        Err(e) => output::warn(&format!("Could not compare local branches: {e}")),
    }
}

fn print_dashboard(target: &Target, dashboard: &Dashboard, settings: &GeneralConfig) {
    println!(
        "{}{}",
        output::paint("🏠 Repository ", theme::TOOLTIP),
        output::paint(&target.url.to_string(), theme::CYAN)
    );

    output::header(&format!("🐛 {} open issues", dashboard.issues.len()));
    let issues: Vec<_> = dashboard
        .issues
        .iter()
        .map(|i| (i.number, i.title.as_str(), i.created_at, i.labels.as_slice()))
        .collect();
    print_numbered(&issues, settings.max_issues);

    output::header(&format!(
        "📌 {} open pull requests",
        dashboard.pull_requests.len()
    ));
    let pull_requests: Vec<_> = dashboard
        .pull_requests
        .iter()
        .map(|p| (p.number, p.title.as_str(), p.created_at, p.labels.as_slice()))
        .collect();
    print_numbered(&pull_requests, settings.max_pull_requests);

    output::header(&format!(
        "🌳 {}",
        output::pluralize(dashboard.branches.len(), "active branch", "active branches")
    ));
    print_branches(&dashboard.branches, target.local.is_some());

    print_commits(dashboard, settings.max_commits);
}

/// Issue or pull request rows: number, title, age, labels.
fn print_numbered(rows: &[(u64, &str, DateTime<Utc>, &[Label])], max: usize) {
    let rows = if max > 0 && rows.len() > max {
        &rows[..max]
    } else {
        rows
    };
    let width = rows
        .iter()
        .map(|(number, ..)| number.to_string().len())
        .max()
        .unwrap_or(0);

    for (number, title, created_at, labels) in rows {
        let mut line = format!(
            "{} {} {} ",
            output::paint(&format!("{number:>width$}"), theme::BLUE),
            output::paint(
                &output::fit(title, LINE_WIDTH.saturating_sub(width)),
                theme::DARK_GRAY
            ),
            output::paint(&format!("{:>AGE_WIDTH$}", output::ago(*created_at)), theme::GREEN),
        );
        for label in *labels {
            line.push_str(&output::label(label));
            line.push(' ');
        }
        println!("{}", line.trim_end());
    }
}

fn print_branches(rows: &[BranchRow], with_tracking: bool) {
    let width = rows
        .iter()
        .map(|row| row.branch.name.chars().count())
        .max()
        .unwrap_or(0);

    for row in rows {
        let commit = &row.branch.last_commit;
        let tracking = if with_tracking {
            format!("{} ", output::tracking(row.tracking.as_ref()))
        } else {
            String::new()
        };
        println!(
            "{} {tracking}{} {} {}",
            output::paint(&format!("{:<width$}", row.branch.name), theme::BLUE),
            output::paint(
                &output::fit(&commit.headline, LINE_WIDTH.saturating_sub(width)),
                theme::DARK_GRAY
            ),
            output::paint(&format!("{:>AGE_WIDTH$}", output::ago(commit.committed_at)), theme::GREEN),
            output::paint(&commit.author, theme::BLUE),
        );
    }
}

fn print_commits(dashboard: &Dashboard, max: usize) {
    let since = dashboard
        .repository
        .last_release
        .as_ref()
        .map_or("creation", |release| release.tag_name.as_str());

    let commits = &dashboard.commits;
    if commits.is_empty() {
        output::header(&format!("🔥 No new commits since {since}"));
        return;
    }
    output::header(&format!("🔥 {} commits since {since}", commits.len()));

    let shown = if max > 0 { max.min(commits.len()) } else { commits.len() };
    for commit in &commits[..shown] {
        print_commit(commit);
    }
}

/// One commit row: short id, headline, age, author.
pub fn print_commit(commit: &Commit) {
    println!(
        "{} {} {} {}",
        output::paint(commit.short_id(), theme::BLUE),
        output::paint(
            &output::fit(&commit.headline, LINE_WIDTH - SHORT_ID_WIDTH),
            theme::DARK_GRAY
        ),
        output::paint(&format!("{:>AGE_WIDTH$}", output::ago(commit.committed_at)), theme::GREEN),
        output::paint(&commit.author, theme::BLUE),
    );
}

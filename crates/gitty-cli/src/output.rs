//! Terminal output formatting utilities.

use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use gitty_core::{BranchTrackingStatus, Label};

/// Width of the title column plus its leading number column.
pub const LINE_WIDTH: usize = 80;

/// Width of the right-aligned age column.
pub const AGE_WIDTH: usize = 8;

/// Width of each ahead/behind column.
const TRACK_WIDTH: usize = 4;

/// Palette, as `(r, g, b)`.
pub mod theme {
    pub const RED: (u8, u8, u8) = (0xE8, 0x83, 0x88);
    pub const YELLOW: (u8, u8, u8) = (0xDB, 0xAB, 0x79);
    pub const GREEN: (u8, u8, u8) = (0xA8, 0xCC, 0x8C);
    pub const BLUE: (u8, u8, u8) = (0x71, 0xBE, 0xF2);
    pub const DARK_GRAY: (u8, u8, u8) = (0x88, 0x88, 0x88);
    pub const TOOLTIP: (u8, u8, u8) = (0x55, 0x55, 0x55);
    pub const GRAY: (u8, u8, u8) = (0xB9, 0xBF, 0xCA);
    pub const MAGENTA: (u8, u8, u8) = (0xD2, 0x90, 0xE4);
    pub const CYAN: (u8, u8, u8) = (0x66, 0xC2, 0xCD);
}

/// Paint `text` in one of the [`theme`] colors.
pub fn paint(text: &str, (r, g, b): (u8, u8, u8)) -> ColoredString {
    text.truecolor(r, g, b)
}

/// Print an error message (always prints to stderr).
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a warning message (always prints to stderr).
pub fn warn(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print a section header, separated from the previous section.
pub fn header(msg: &str) {
    println!();
    println!("{}", paint(msg, theme::MAGENTA));
}

/// `"No {plural}"`, `"1 {singular}"` or `"{n} {plural}"`.
#[must_use]
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    match count {
        0 => format!("No {plural}"),
        1 => format!("1 {singular}"),
        n => format!("{n} {plural}"),
    }
}

/// Compact age of `then`: `now`, `5h`, `3d`, `2w`, `4m` or `1y`.
#[must_use]
pub fn ago(then: DateTime<Utc>) -> String {
    ago_at(then, Utc::now())
}

/// [`ago`] relative to a fixed `now`.
#[must_use]
pub fn ago_at(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    const HOUR: i64 = 60 * 60;
    const DAY: i64 = 24 * HOUR;
    const WEEK: i64 = 7 * DAY;
    const MONTH: i64 = 30 * DAY;
    const YEAR: i64 = 12 * MONTH;

    let secs = (now - then).num_seconds().max(0);
    match secs {
        s if s < HOUR => "now".to_string(),
        s if s < DAY => format!("{}h", s / HOUR),
        s if s < WEEK => format!("{}d", s / DAY),
        s if s < MONTH => format!("{}w", s / WEEK),
        s if s < YEAR => format!("{}m", s / MONTH),
        s => format!("{}y", s / YEAR),
    }
}

/// Cut `s` to at most `width` characters.
#[must_use]
pub fn truncate(s: &str, width: usize) -> String {
    s.chars().take(width).collect()
}

/// Truncate and pad `s` to exactly `width` characters.
#[must_use]
pub fn fit(s: &str, width: usize) -> String {
    format!("{:<width$}", truncate(s, width))
}

/// Parse `#RRGGBB`.
fn rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// `◖name◗` in the label's own color.
#[must_use]
pub fn label(label: &Label) -> String {
    let text = format!("◖{}◗", label.name);
    let color = rgb(&label.color).unwrap_or(theme::GRAY);
    paint(&text, color).to_string()
}

/// Outdated marker plus ahead/behind columns.
///
/// Branches without a local counterpart render as blank columns of the
/// same width.
#[must_use]
pub fn tracking(status: Option<&BranchTrackingStatus>) -> String {
    let Some(status) = status else {
        return " ".repeat(1 + 2 * TRACK_WIDTH);
    };

    let marker = if status.outdated {
        paint("↻", theme::RED)
    } else {
        paint(" ", theme::GRAY)
    };
    let color = if status.is_in_sync() {
        theme::GREEN
    } else {
        theme::YELLOW
    };
    let count = |n: usize, capped: String, arrow: char| {
        let text = if n == 0 {
            arrow.to_string()
        } else {
            format!("{capped}{arrow}")
        };
        paint(&format!("{text:>TRACK_WIDTH$}"), color).to_string()
    };

    format!(
        "{marker}{}{}",
        count(status.ahead, status.ahead_label(), '↑'),
        count(status.behind, status.behind_label(), '↓'),
    )
}

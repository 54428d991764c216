//! CLI output formatting for build and check.
//!
//! Output is **episode-centric**: each episode leads with its number and
//! title, with the written file shown after an arrow and feed status as an
//! indented context line.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Staged public/ (3 files)
//! Staged media/ (14 files)
//! Feed: 3 items, 2 excluded
//!     012 The Long Night
//!     011 Static
//!     009 Open Lines
//! 012 The Long Night → 12/index.html
//! 010 Off Air → 10/index.html
//!     not in feed
//! Wrote index.html
//! Wrote store/index.html
//! Wrote feed.rss
//! Swapped favicon.ico
//!
//! Built 5 episodes (3 in feed), 14 staged files → dist
//! ```
//!
//! Episode pages arrive in completion order, which varies between runs when
//! rendering in parallel.
//!
//! ## Check
//!
//! ```text
//! Site: Late Night Radio (https://example.com)
//! Templates: episode.html, index.html, store.html
//! Episodes: 5
//! Feed
//!     012 The Long Night
//!     011 Static
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::build::{BuildEvent, BuildSummary, CheckReport};

/// Format an episode number as 3-digit zero-padded.
fn format_number(number: u32) -> String {
    format!("{:0>3}", number)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn episode_line(number: u32, title: &str) -> String {
    format!("{} {}", format_number(number), title)
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

// ============================================================================
// Build output
// ============================================================================

/// Format a single build progress event as display lines.
pub fn format_build_event(event: &BuildEvent) -> Vec<String> {
    match event {
        BuildEvent::Staged { label, files } => {
            vec![format!("Staged {}/ ({})", label, plural(*files, "file", "files"))]
        }
        BuildEvent::FeedAssembled { included, excluded } => {
            let mut lines = vec![format!(
                "Feed: {}, {} excluded",
                plural(included.len(), "item", "items"),
                excluded
            )];
            lines.extend(
                included
                    .iter()
                    .map(|(number, title)| format!("{}{}", indent(1), episode_line(*number, title))),
            );
            lines
        }
        BuildEvent::Page(page) => {
            let mut lines = vec![format!(
                "{} \u{2192} {}",
                episode_line(page.number, &page.title),
                page.path
            )];
            if !page.in_feed {
                lines.push(format!("{}not in feed", indent(1)));
            }
            lines
        }
        BuildEvent::Written { path } => vec![format!("Wrote {}", path)],
        BuildEvent::FaviconSwapped { favicon } => vec![format!("Swapped {}", favicon)],
    }
}

/// Format the closing summary of a build.
pub fn format_build_summary(summary: &BuildSummary) -> Vec<String> {
    let variant = if summary.restricted { " (restricted)" } else { "" };
    vec![
        String::new(),
        format!(
            "Built {} ({} in feed), {} \u{2192} {}{}",
            plural(summary.episodes, "episode", "episodes"),
            summary.feed_items,
            plural(summary.staged_files, "staged file", "staged files"),
            summary.output.display(),
            variant
        ),
    ]
}

pub fn print_build_summary(summary: &BuildSummary) {
    for line in format_build_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Check output
// ============================================================================

/// Format the result of a dry run.
pub fn format_check_report(report: &CheckReport) -> Vec<String> {
    let mut lines = vec![format!("Site: {} ({})", report.site_name, report.site_url)];
    if report.restricted {
        lines.push(format!("{}restricted variant", indent(1)));
    }
    lines.push(format!("Templates: {}", report.templates.join(", ")));
    lines.push(format!("Episodes: {}", report.episodes));
    lines.push("Feed".to_string());
    if report.feed.is_empty() {
        lines.push(format!("{}(empty)", indent(1)));
    }
    for (number, title) in &report.feed {
        lines.push(format!("{}{}", indent(1), episode_line(*number, title)));
    }
    lines
}

pub fn print_check_report(report: &CheckReport) {
    for line in format_check_report(report) {
        println!("{}", line);
    }
}

//! CLI output formatting for builds and checks.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Home
//!     index (3 posts) → pages/index.html
//! Pages
//!     about → pages/about.html
//! Posts
//!     Converting : hello-world → posts/rust/hello-world.html
//!     No changes : lisbon, skipping...
//!     Draft      : unfinished, skipping...
//! ```
//!
//! ## Check
//!
//! ```text
//! Posts       3 (1 draft)
//! Pages       1
//! Categories  2
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects. Artifact paths are shown
//! relative to the output directory.

use crate::pipeline::{BuildEvent, CheckSummary, Phase, PostOutcome};
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Path relative to `output`, falling back to the full path.
fn display_path(path: &Path, output: &Path) -> String {
    path.strip_prefix(output)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Build output
// ============================================================================

/// Format a single build progress event as display lines.
pub fn format_build_event(event: &BuildEvent, output: &Path) -> Vec<String> {
    let line = match event {
        BuildEvent::PhaseStarted(phase) => match phase {
            Phase::Home => "Home".to_string(),
            Phase::Pages => "Pages".to_string(),
            Phase::Posts => "Posts".to_string(),
        },
        BuildEvent::HomeWritten { path, listed } => format!(
            "{}index ({}) → {}",
            indent(1),
            plural(*listed, "post"),
            display_path(path, output)
        ),
        BuildEvent::PageWritten { slug, path } => {
            format!("{}{} → {}", indent(1), slug, display_path(path, output))
        }
        BuildEvent::Post { slug, outcome } => match outcome {
            PostOutcome::SkippedDraft => format!("{}Draft      : {}, skipping...", indent(1), slug),
            PostOutcome::SkippedUnchanged => {
                format!("{}No changes : {}, skipping...", indent(1), slug)
            }
            PostOutcome::Converted { path } => format!(
                "{}Converting : {} → {}",
                indent(1),
                slug,
                display_path(path, output)
            ),
        },
    };
    vec![line]
}

/// Print a build event to stdout.
pub fn print_build_event(event: &BuildEvent, output: &Path) {
    for line in format_build_event(event, output) {
        println!("{}", line);
    }
}

// ============================================================================
// Check output
// ============================================================================

pub fn format_check_summary(summary: &CheckSummary) -> Vec<String> {
    let posts = if summary.drafts > 0 {
        format!("{} ({})", summary.posts, plural(summary.drafts, "draft"))
    } else {
        summary.posts.to_string()
    };
    vec![
        format!("Posts       {}", posts),
        format!("Pages       {}", summary.pages),
        format!("Categories  {}", summary.categories),
    ]
}

pub fn print_check_summary(summary: &CheckSummary) {
    for line in format_check_summary(summary) {
        println!("{}", line);
    }
}

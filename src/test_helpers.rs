//! Shared test utilities for the quire test suite.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let events = build_fixtures(&tmp, &BuildOptions::default());
//! assert_eq!(post_outcome(&events, "unfinished"), &PostOutcome::SkippedDraft);
//! ```

use std::path::Path;
use std::sync::mpsc;
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::cache::JsonManifest;
use crate::config::ProjectConfig;
use crate::pipeline::{BuildEvent, BuildOptions, Pipeline, PostOutcome};
use crate::styles::StaticStyleSource;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src).map_err(std::io::Error::other)?;
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(dst.join(rel))?;
        } else {
            std::fs::copy(entry.path(), dst.join(rel))?;
        }
    }
    Ok(())
}

// =========================================================================
// Build helpers
// =========================================================================

/// Build the fixture site offline (no styles, no minification) and
/// collect every event. Panics on build failure.
pub fn build_fixtures(tmp: &TempDir, options: &BuildOptions) -> Vec<BuildEvent> {
    let paths = ProjectConfig::default().paths(tmp.path());
    let manifest = JsonManifest::in_dir(&paths.output);
    let styles = StaticStyleSource::default();
    let (tx, rx) = mpsc::channel();
    Pipeline::new(paths, false, &styles, &manifest)
        .with_events(tx)
        .run(options)
        .unwrap_or_else(|e| panic!("fixture build failed: {e}"));
    rx.iter().collect()
}

/// The outcome reported for `slug`. Panics if the post never appeared.
pub fn post_outcome<'a>(events: &'a [BuildEvent], slug: &str) -> &'a PostOutcome {
    events
        .iter()
        .find_map(|e| match e {
            BuildEvent::Post { slug: s, outcome } if s == slug => Some(outcome),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no event for post '{slug}'"))
}

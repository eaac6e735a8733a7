//! Output layout and read-side lookup of built artifacts.
//!
//! ```text
//! var/
//! ├── manifest.json             # checksums, see crate::cache
//! ├── pages/
//! │   ├── index.html            # home page
//! │   └── <slug>.html
//! └── posts/
//!     └── <category>/<slug>.html
//! ```
//!
//! Lookups return `Ok(None)` for artifacts that were never built, so a
//! serving layer can answer "not found" without inspecting error kinds.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const PAGES_DIR: &str = "pages";
pub const POSTS_DIR: &str = "posts";
pub const HOME_FILENAME: &str = "index.html";

pub fn home_path(output: &Path) -> PathBuf {
    output.join(PAGES_DIR).join(HOME_FILENAME)
}

pub fn page_path(output: &Path, slug: &str) -> PathBuf {
    output.join(PAGES_DIR).join(format!("{slug}.html"))
}

pub fn post_path(output: &Path, category: &str, slug: &str) -> PathBuf {
    output.join(POSTS_DIR).join(category).join(format!("{slug}.html"))
}

/// A built post, or `None` if it does not exist.
pub fn read_post(output: &Path, category: &str, slug: &str) -> io::Result<Option<String>> {
    check_segment(category)?;
    check_segment(slug)?;
    read_optional(&post_path(output, category, slug))
}

/// A built page, or `None` if it does not exist.
pub fn read_page(output: &Path, slug: &str) -> io::Result<Option<String>> {
    check_segment(slug)?;
    read_optional(&page_path(output, slug))
}

fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(html) => Ok(Some(html)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Lookup keys come from request paths; keep them inside the output tree.
fn check_segment(segment: &str) -> io::Result<()> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\'])
    {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid artifact name: {segment:?}"),
        ));
    }
    Ok(())
}

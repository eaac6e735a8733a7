//! Content repository: locating and reading Markdown sources.
//!
//! Posts and pages are two disjoint Markdown trees under the content root.
//! Both are walked recursively, so sources may be grouped into
//! subdirectories freely; only the file name matters:
//!
//! ```text
//! content/
//! ├── posts/
//! │   ├── hello-world.md        # slug "hello-world"
//! │   └── 2024/
//! │       └── ownership.md      # slug "ownership"
//! └── pages/
//!     └── about.md              # slug "about"
//! ```
//!
//! Sources are returned in file-name order at every directory level, so two
//! builds over the same tree visit posts in the same order.

use crate::config::ProjectPaths;
use crate::settings::{BuildContext, MetadataError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error};
use walkdir::WalkDir;

const MARKDOWN_EXTENSION: &str = "md";

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("cannot walk {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("cannot read source {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("source {0} is not valid UTF-8")]
    Encoding(PathBuf),
}

/// A Markdown source file and its slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// File name without the `.md` extension.
    pub slug: String,
}

impl SourceFile {
    pub fn new(path: PathBuf) -> Self {
        let slug = slug_of(&path);
        Self { path, slug }
    }

    /// Directory containing the source, used to resolve relative image paths.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    /// Read the exact source text.
    ///
    /// Read failures are logged here and returned to the caller.
    pub fn read(&self) -> Result<String, ContentError> {
        let bytes = fs::read(&self.path).map_err(|source| {
            error!(path = %self.path.display(), %source, "failed to read source");
            ContentError::Read {
                path: self.path.clone(),
                source,
            }
        })?;
        String::from_utf8(bytes).map_err(|_| {
            error!(path = %self.path.display(), "source is not valid UTF-8");
            ContentError::Encoding(self.path.clone())
        })
    }
}

/// Slug of a source path: the file name with its extension removed.
pub fn slug_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Every `*.md` file below `root`, in file-name order.
///
/// A missing root yields no sources rather than an error.
pub fn discover(root: &Path) -> Result<Vec<SourceFile>, ContentError> {
    if !root.exists() {
        debug!(root = %root.display(), "content root missing, nothing to build");
        return Ok(Vec::new());
    }

    let mut sources = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| ContentError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && is_markdown(entry.path()) {
            sources.push(SourceFile::new(entry.into_path()));
        }
    }
    Ok(sources)
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case(MARKDOWN_EXTENSION))
        .unwrap_or(false)
}

/// Read access to one project's sources and metadata.
#[derive(Debug, Clone)]
pub struct ContentRepository {
    paths: ProjectPaths,
}

impl ContentRepository {
    pub fn new(paths: ProjectPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn posts(&self) -> Result<Vec<SourceFile>, ContentError> {
        discover(&self.paths.posts_source())
    }

    pub fn pages(&self) -> Result<Vec<SourceFile>, ContentError> {
        discover(&self.paths.pages_source())
    }

    /// Load a fresh [`BuildContext`] from the settings directory.
    pub fn load_context(&self) -> Result<BuildContext, MetadataError> {
        BuildContext::load(&self.paths.settings)
    }
}

//! Checksum manifest for incremental builds.
//!
//! Rendering a post is cheap compared to a full site rebuild, but rewriting
//! every artifact on every run churns timestamps and defeats downstream
//! caches. This module lets the posts phase skip any post whose Markdown
//! source hasn't changed since it was last rendered.
//!
//! # Design
//!
//! The manifest is a flat JSON object mapping a post slug to the SHA-256 of
//! the source bytes that produced the artifact currently on disk:
//!
//! ```json
//! {
//!   "hello-world": "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
//!   "second-post": "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
//! }
//! ```
//!
//! Hashes are content-based rather than mtime-based so they survive
//! `git checkout` (which resets modification times). Bytes are hashed raw;
//! line endings are not normalised.
//!
//! ## Storage
//!
//! Every mutation is a full read-modify-write of the file: load everything,
//! set one key, persist everything. The write lands in a temporary file next
//! to the manifest and is renamed over it, so a crash mid-write never leaves
//! a truncated manifest behind. Concurrent builds are still last-writer-wins.
//!
//! The orchestrator only talks to the [`ManifestStore`] trait, so the JSON
//! file can be swapped for a transactional store without touching it.
//!
//! ## Bypassing the manifest
//!
//! `quire build --force` disables checksum gating for the run: every
//! non-draft post is rendered and its entry refreshed.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Name of the manifest file within the output directory.
pub const MANIFEST_FILENAME: &str = "manifest.json";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("manifest I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed manifest {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Persisted `slug → checksum` store consulted by the posts phase.
pub trait ManifestStore {
    /// Stored checksum for `key`, or `None` if the key was never recorded.
    fn get(&self, key: &str) -> Result<Option<String>, ManifestError>;

    /// Record `checksum` for `key`, replacing any previous value.
    fn put(&self, key: &str, checksum: &str) -> Result<(), ManifestError>;
}

/// JSON-file backed manifest.
///
/// Holds no entries in memory between calls: each `get` reads the file and
/// each `put` rewrites it.
#[derive(Debug, Clone)]
pub struct JsonManifest {
    path: PathBuf,
}

impl JsonManifest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Manifest stored as [`MANIFEST_FILENAME`] inside `output_dir`.
    pub fn in_dir(output_dir: &Path) -> Self {
        Self::new(output_dir.join(MANIFEST_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every entry. A missing file is an empty manifest.
    pub fn load(&self) -> Result<BTreeMap<String, String>, ManifestError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(ManifestError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&content).map_err(|source| ManifestError::Json {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the whole manifest with `entries`.
    pub fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), ManifestError> {
        let json = serde_json::to_string_pretty(entries).map_err(|source| ManifestError::Json {
            path: self.path.clone(),
            source,
        })?;
        self.write_atomic(json.as_bytes()).map_err(|source| ManifestError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn write_atomic(&self, bytes: &[u8]) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl ManifestStore for JsonManifest {
    fn get(&self, key: &str) -> Result<Option<String>, ManifestError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "creating empty manifest");
            self.save(&BTreeMap::new())?;
            return Ok(None);
        }
        Ok(self.load()?.remove(key))
    }

    fn put(&self, key: &str, checksum: &str) -> Result<(), ManifestError> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), checksum.to_string());
        self.save(&entries)
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(hash_bytes(&bytes))
}

/// SHA-256 hash of raw bytes, returned as a hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

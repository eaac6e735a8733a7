//! Fixture site harness shared by the integration tests.
#![allow(dead_code)]

use quire::cache::JsonManifest;
use quire::config::{ProjectConfig, ProjectPaths};
use quire::pipeline::{BuildError, BuildEvent, BuildOptions, BuildReport, Pipeline, PostOutcome};
use quire::styles::StaticStyleSource;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tempfile::TempDir;

pub const STYLE: &str = "body{margin:0}";

/// A mutable copy of `fixtures/site`.
pub struct Site {
    dir: TempDir,
    pub minify: bool,
}

impl Site {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
        copy_tree(&fixtures, dir.path());
        Self { dir, minify: true }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn paths(&self) -> ProjectPaths {
        ProjectConfig::default().paths(self.root())
    }

    pub fn output(&self) -> PathBuf {
        self.paths().output
    }

    pub fn build(&self, options: &BuildOptions) -> Result<Build, BuildError> {
        let paths = self.paths();
        let manifest = JsonManifest::in_dir(&paths.output);
        let styles = StaticStyleSource::new(STYLE);
        let (tx, rx) = mpsc::channel();
        let report = Pipeline::new(paths, self.minify, &styles, &manifest)
            .with_events(tx)
            .run(options)?;
        Ok(Build {
            report,
            events: rx.iter().collect(),
        })
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    pub fn append(&self, rel: &str, contents: &str) {
        let mut text = fs::read_to_string(self.root().join(rel)).unwrap();
        text.push_str(contents);
        self.write(rel, &text);
    }

    pub fn read_output(&self, rel: &str) -> String {
        fs::read_to_string(self.output().join(rel))
            .unwrap_or_else(|e| panic!("cannot read output {rel}: {e}"))
    }

    pub fn manifest(&self) -> BTreeMap<String, String> {
        JsonManifest::in_dir(&self.output()).load().unwrap()
    }

    /// Every file under the output directory with its bytes.
    pub fn snapshot(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        let mut files = BTreeMap::new();
        for entry in walkdir::WalkDir::new(self.output()) {
            let entry = entry.unwrap();
            if entry.file_type().is_file() {
                files.insert(entry.path().to_path_buf(), fs::read(entry.path()).unwrap());
            }
        }
        files
    }
}

pub struct Build {
    pub report: BuildReport,
    pub events: Vec<BuildEvent>,
}

impl Build {
    pub fn outcome(&self, slug: &str) -> &PostOutcome {
        self.events
            .iter()
            .find_map(|e| match e {
                BuildEvent::Post { slug: s, outcome } if s == slug => Some(outcome),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no event for post '{slug}'"))
    }

    pub fn converted(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                BuildEvent::Post {
                    slug,
                    outcome: PostOutcome::Converted { .. },
                } => Some(slug.as_str()),
                _ => None,
            })
            .collect()
    }
}

fn copy_tree(src: &Path, dst: &Path) {
    for entry in walkdir::WalkDir::new(src).min_depth(1) {
        let entry = entry.unwrap();
        let target = dst.join(entry.path().strip_prefix(src).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}

//! Build orchestration.
//!
//! A build runs three phases strictly in order:
//!
//! 1. **Home**: the listing of every non-draft post, newest first. Always written.
//! 2. **Pages**: every Markdown file under `content/pages`. Always re-rendered.
//! 3. **Posts**: every Markdown file under `content/posts`. Drafts are skipped;
//!    with checksum gating on, posts whose source checksum matches the
//!    manifest entry are skipped too.
//!
//! Metadata is loaded and validated before anything is written, so a post
//! with an unknown category aborts the build with no new artifacts. Any
//! later failure aborts the rest of the run; artifacts already written stay
//! on disk and the manifest only ever records posts that were written.
//!
//! ## Incremental builds
//!
//! Each source is read once. Its exact bytes are both hashed and rendered,
//! so the checksum stored after a write always describes the content that
//! produced the artifact.

use crate::artifacts;
use crate::assemble::{AssembleError, PageAssembler};
use crate::cache::{JsonManifest, ManifestError, ManifestStore, hash_bytes};
use crate::config::{ConfigError, ProjectPaths, load_config};
use crate::content::{ContentError, ContentRepository};
use crate::markdown::{MarkdownRenderer, RenderError};
use crate::settings::{BuildContext, ListedPost, MetadataError};
use crate::styles::{HttpStyleSource, StyleError, StyleSource};
use crate::templates::{PageContext, Template};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("configuration error: {0}")]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    #[error(transparent)]
    Style(#[from] StyleError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Skip posts whose source checksum matches the manifest.
    pub use_checksum: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { use_checksum: true }
    }
}

impl BuildOptions {
    /// Re-render every non-draft post regardless of the manifest.
    pub fn force() -> Self {
        Self { use_checksum: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Home,
    Pages,
    Posts,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Home => write!(f, "home"),
            Phase::Pages => write!(f, "pages"),
            Phase::Posts => write!(f, "posts"),
        }
    }
}

/// What happened to one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    SkippedDraft,
    SkippedUnchanged,
    Converted { path: PathBuf },
}

/// Progress notifications sent while a build runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    PhaseStarted(Phase),
    HomeWritten { path: PathBuf, listed: usize },
    PageWritten { slug: String, path: PathBuf },
    Post { slug: String, outcome: PostOutcome },
}

/// Counts for a completed build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Static pages written, not counting the home page.
    pub pages: usize,
    pub converted: usize,
    pub unchanged: usize,
    pub drafts: usize,
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "home + {} pages, {} posts converted, {} unchanged, {} drafts skipped",
            self.pages, self.converted, self.unchanged, self.drafts
        )
    }
}

/// One build over a project's sources.
pub struct Pipeline<'a, S: StyleSource, M: ManifestStore> {
    repo: ContentRepository,
    renderer: MarkdownRenderer,
    assembler: PageAssembler,
    styles: &'a S,
    manifest: &'a M,
    events: Option<Sender<BuildEvent>>,
}

impl<'a, S: StyleSource, M: ManifestStore> Pipeline<'a, S, M> {
    pub fn new(paths: ProjectPaths, minify: bool, styles: &'a S, manifest: &'a M) -> Self {
        Self {
            repo: ContentRepository::new(paths),
            renderer: MarkdownRenderer::default(),
            assembler: PageAssembler::new(minify),
            styles,
            manifest,
            events: None,
        }
    }

    /// Send progress events to `tx` as the build runs.
    pub fn with_events(mut self, tx: Sender<BuildEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn run(&self, options: &BuildOptions) -> Result<BuildReport, BuildError> {
        let ctx = self.repo.load_context()?;
        let listing = ctx.listing()?;
        let style = self.styles.styles(&ctx.site)?;
        let mut report = BuildReport::default();

        self.emit(BuildEvent::PhaseStarted(Phase::Home));
        self.build_home(&ctx, &listing, &style)?;

        self.emit(BuildEvent::PhaseStarted(Phase::Pages));
        self.build_pages(&ctx, &style, &mut report)?;

        self.emit(BuildEvent::PhaseStarted(Phase::Posts));
        self.build_posts(&ctx, &style, options, &mut report)?;

        info!(%report, "build complete");
        Ok(report)
    }

    fn output(&self) -> &Path {
        &self.repo.paths().output
    }

    fn emit(&self, event: BuildEvent) {
        if let BuildEvent::PhaseStarted(phase) = &event {
            info!(%phase, "phase started");
        }
        if let Some(tx) = &self.events {
            // A closed receiver only means nobody is listening.
            tx.send(event).ok();
        }
    }

    fn build_home(
        &self,
        ctx: &BuildContext,
        listing: &[ListedPost<'_>],
        style: &str,
    ) -> Result<(), BuildError> {
        let mut page = PageContext::new(ctx.site.title.clone(), &ctx.site, style);
        page.posts = Some(listing);
        page.categories = Some(&ctx.categories);
        let html = self.assembler.assemble(Template::Home, &page)?;

        let path = artifacts::home_path(self.output());
        write_artifact(&path, &html)?;
        debug!(path = %path.display(), listed = listing.len(), "wrote home page");
        self.emit(BuildEvent::HomeWritten {
            path,
            listed: listing.len(),
        });
        Ok(())
    }

    fn build_pages(
        &self,
        ctx: &BuildContext,
        style: &str,
        report: &mut BuildReport,
    ) -> Result<(), BuildError> {
        for source in self.repo.pages()? {
            let meta = ctx.page(&source.slug)?;
            let body = self.renderer.render_file(&source.path)?;

            let title = format!("{} - {}", ctx.site.title, meta.name);
            let mut page = PageContext::new(title, &ctx.site, style);
            page.body = &body;
            page.categories = Some(&ctx.categories);
            let html = self.assembler.assemble(Template::Page, &page)?;

            let path = artifacts::page_path(self.output(), &source.slug);
            write_artifact(&path, &html)?;
            debug!(slug = %source.slug, path = %path.display(), "wrote page");
            report.pages += 1;
            self.emit(BuildEvent::PageWritten {
                slug: source.slug,
                path,
            });
        }
        Ok(())
    }

    fn build_posts(
        &self,
        ctx: &BuildContext,
        style: &str,
        options: &BuildOptions,
        report: &mut BuildReport,
    ) -> Result<(), BuildError> {
        for source in self.repo.posts()? {
            let slug = source.slug.as_str();
            let meta = ctx.post(slug)?;
            if meta.draft {
                debug!(slug, "draft, skipping");
                report.drafts += 1;
                self.post_event(slug, PostOutcome::SkippedDraft);
                continue;
            }

            let text = source.read()?;
            let checksum = hash_bytes(text.as_bytes());
            if options.use_checksum
                && self.manifest.get(slug)?.as_deref() == Some(checksum.as_str())
            {
                debug!(slug, "checksum unchanged, skipping");
                report.unchanged += 1;
                self.post_event(slug, PostOutcome::SkippedUnchanged);
                continue;
            }

            let category = ctx.category_of(slug, meta)?;
            let body = self.renderer.render_in(&text, source.dir())?;

            let title = format!("{} - {}", category.name, meta.title);
            let mut page = PageContext::new(title, &ctx.site, style);
            page.body = &body;
            page.post = Some(meta);
            page.category = Some(category);
            page.page_url = Some(ctx.site.post_url(&meta.category, slug));
            page.page_id = Some(format!("{}-{}", meta.category, slug));
            page.categories = Some(&ctx.categories);
            let html = self.assembler.assemble(Template::Post, &page)?;

            let path = artifacts::post_path(self.output(), &meta.category, slug);
            write_artifact(&path, &html)?;
            self.manifest.put(slug, &checksum)?;
            debug!(slug, path = %path.display(), "converted post");
            report.converted += 1;
            self.post_event(slug, PostOutcome::Converted { path });
        }
        Ok(())
    }

    fn post_event(&self, slug: &str, outcome: PostOutcome) {
        self.emit(BuildEvent::Post {
            slug: slug.to_string(),
            outcome,
        });
    }
}

fn write_artifact(path: &Path, html: &str) -> Result<(), BuildError> {
    let write_err = |source| BuildError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, html).map_err(write_err)
}

/// Build the project at `root` using its `quire.toml` layout.
///
/// Styles are fetched over HTTP and the manifest lives in the output
/// directory.
pub fn build(
    root: &Path,
    options: &BuildOptions,
    events: Option<Sender<BuildEvent>>,
) -> Result<BuildReport, BuildError> {
    let config = load_config(root)?;
    let paths = config.paths(root);
    let styles = HttpStyleSource::new(paths.stylesheet())?;
    let manifest = JsonManifest::in_dir(&paths.output);
    info!(root = %root.display(), output = %paths.output.display(), "building");

    let mut pipeline = Pipeline::new(paths, config.minify.enabled, &styles, &manifest);
    if let Some(tx) = events {
        pipeline = pipeline.with_events(tx);
    }
    pipeline.run(options)
}

/// Summary of a successful [`check`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub posts: usize,
    pub drafts: usize,
    pub pages: usize,
    pub categories: usize,
}

/// Validate a project without writing anything.
///
/// Every source must have metadata, and every non-draft post must name a
/// known category and carry a parseable date.
pub fn check(root: &Path) -> Result<CheckSummary, BuildError> {
    let config = load_config(root)?;
    let repo = ContentRepository::new(config.paths(root));
    let ctx = repo.load_context()?;
    ctx.validate()?;

    let mut summary = CheckSummary {
        categories: ctx.categories.len(),
        ..CheckSummary::default()
    };
    for source in repo.posts()? {
        if ctx.post(&source.slug)?.draft {
            summary.drafts += 1;
        } else {
            summary.posts += 1;
        }
    }
    for source in repo.pages()? {
        ctx.page(&source.slug)?;
        summary.pages += 1;
    }
    Ok(summary)
}

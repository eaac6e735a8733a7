//! # Quire
//!
//! An incremental static site generator for a small blog. Markdown sources
//! plus YAML metadata go in; minified HTML comes out, and only posts whose
//! source actually changed are re-rendered.
//!
//! # Architecture: Three-Phase Build
//!
//! Every build runs the same phases in a fixed order:
//!
//! ```text
//! 1. Home    settings/*.yaml      →  var/pages/index.html        (always)
//! 2. Pages   content/pages/*.md   →  var/pages/<slug>.html       (always)
//! 3. Posts   content/posts/*.md   →  var/posts/<cat>/<slug>.html (changed only)
//! ```
//!
//! All metadata is loaded into one immutable [`settings::BuildContext`] at
//! the start of the build and validated before the first write. A post that
//! names an unknown category stops the build before anything is written.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Orchestrates the three phases, emits progress events, `check` |
//! | [`settings`] | YAML metadata: site, categories, posts, pages; listing order |
//! | [`content`] | Discovers Markdown sources and reads them |
//! | [`markdown`] | Markdown → HTML with tag-class rewrites, `==mark==`, emoji, embedded images |
//! | [`templates`] | Maud templates for the home, page, and post layouts |
//! | [`assemble`] | Template rendering plus HTML minification |
//! | [`styles`] | Stylesheet sources: external URLs + local `styles.css` |
//! | [`cache`] | Checksum manifest (`manifest.json`) and SHA-256 hashing |
//! | [`artifacts`] | Output layout and read-side artifact lookup |
//! | [`config`] | `quire.toml` project layout loading and validation |
//! | [`output`] | CLI output formatting for builds and checks |
//!
//! # Design Decisions
//!
//! ## Checksum Gating
//!
//! The manifest maps each post slug to the SHA-256 of its source bytes. A
//! post is skipped when its current checksum matches; the entry is written
//! only after the post's HTML is on disk, so an interrupted build never
//! records a post it didn't produce. Pages and the home page are cheap and
//! depend on global metadata, so they are rebuilt every time.
//!
//! Checksums cover the Markdown source only. Changing a post's metadata,
//! a template, or the stylesheet needs `quire build --force`.
//!
//! ## Maud Over Template Engines
//!
//! Templates are compile-time [Maud](https://maud.lambda.xyz/) markup: no
//! template directory to ship, all interpolation auto-escaped, and a missing
//! field is a compile error.

pub mod artifacts;
pub mod assemble;
pub mod cache;
pub mod config;
pub mod content;
pub mod markdown;
pub mod output;
pub mod pipeline;
pub mod settings;
pub mod styles;
pub mod templates;

#[cfg(test)]
pub(crate) mod test_helpers;

//! Site, category, post, and page metadata.
//!
//! Metadata lives in four YAML documents under the settings directory:
//!
//! ```text
//! settings/
//! ├── site.yaml         # Site-wide attributes (title, external styles, ...)
//! ├── categories.yaml   # category id → { name, ... }
//! ├── posts.yaml        # post slug → { title, category, draft, published_at, ... }
//! └── pages.yaml        # page slug → { name, ... }
//! ```
//!
//! Everything is loaded fresh at the start of a build into an immutable
//! [`BuildContext`], which is passed explicitly to every stage and dropped
//! when the build ends.
//!
//! ## Publication dates
//!
//! `published_at` uses a fixed human-readable format, `DD Month, YYYY`
//! (e.g. `15 June, 2024`). The home page lists posts newest first; posts
//! sharing a date keep slug order.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// `chrono` format of `published_at`.
pub const DATE_FORMAT: &str = "%d %B, %Y";

pub const SITE_FILE: &str = "site.yaml";
pub const CATEGORIES_FILE: &str = "categories.yaml";
pub const POSTS_FILE: &str = "posts.yaml";
pub const PAGES_FILE: &str = "pages.yaml";

/// Extra presentation fields carried through to templates untouched.
pub type Extra = BTreeMap<String, serde_yaml_ng::Value>;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },
    #[error("post '{slug}' has no entry in posts.yaml")]
    MissingPost { slug: String },
    #[error("page '{slug}' has no entry in pages.yaml")]
    MissingPage { slug: String },
    #[error("post '{slug}' references unknown category '{category}'")]
    UnknownCategory { slug: String, category: String },
    #[error("post '{slug}' has invalid published_at '{value}' (expected e.g. \"15 June, 2024\")")]
    InvalidDate {
        slug: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Site-wide attributes from `site.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSettings {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// Prefix for canonical post URLs, e.g. `https://example.com`.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Stylesheet URLs fetched and inlined ahead of the local stylesheet.
    #[serde(default)]
    pub external_styles: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl SiteSettings {
    /// Canonical URL of a post: `<base_url>/<category>/<slug>/`.
    ///
    /// Without a `base_url` the URL is site-relative.
    pub fn post_url(&self, category: &str, slug: &str) -> String {
        let base = self.base_url.as_deref().unwrap_or("").trim_end_matches('/');
        format!("{base}/{category}/{slug}/")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMeta {
    pub title: String,
    /// Key into the category mapping.
    pub category: String,
    #[serde(default)]
    pub draft: bool,
    /// `DD Month, YYYY`; see [`DATE_FORMAT`].
    pub published_at: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl PostMeta {
    pub fn published(&self) -> Result<NaiveDate, chrono::ParseError> {
        parse_published(&self.published_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMeta {
    /// Display name, appended to the site title in the page `<title>`.
    pub name: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Parse a `DD Month, YYYY` publication date.
pub fn parse_published(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
}

/// A non-draft post as shown in the home-page listing.
#[derive(Debug, Clone)]
pub struct ListedPost<'a> {
    pub slug: &'a str,
    pub meta: &'a PostMeta,
    pub category: &'a Category,
    pub published: NaiveDate,
    pub url: String,
}

/// All metadata for one build invocation.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub site: SiteSettings,
    pub categories: BTreeMap<String, Category>,
    pub posts: BTreeMap<String, PostMeta>,
    pub pages: BTreeMap<String, PageMeta>,
}

impl BuildContext {
    /// Load every metadata document from `settings_dir`.
    pub fn load(settings_dir: &Path) -> Result<Self, MetadataError> {
        Ok(Self {
            site: load_yaml(&settings_dir.join(SITE_FILE))?,
            categories: load_yaml_map(&settings_dir.join(CATEGORIES_FILE))?,
            posts: load_yaml_map(&settings_dir.join(POSTS_FILE))?,
            pages: load_yaml_map(&settings_dir.join(PAGES_FILE))?,
        })
    }

    pub fn post(&self, slug: &str) -> Result<&PostMeta, MetadataError> {
        self.posts.get(slug).ok_or_else(|| MetadataError::MissingPost {
            slug: slug.to_string(),
        })
    }

    pub fn page(&self, slug: &str) -> Result<&PageMeta, MetadataError> {
        self.pages.get(slug).ok_or_else(|| MetadataError::MissingPage {
            slug: slug.to_string(),
        })
    }

    /// Resolve a post's category. An unknown key is fatal, never a skip.
    pub fn category_of(&self, slug: &str, post: &PostMeta) -> Result<&Category, MetadataError> {
        self.categories
            .get(&post.category)
            .ok_or_else(|| MetadataError::UnknownCategory {
                slug: slug.to_string(),
                category: post.category.clone(),
            })
    }

    /// Non-draft posts, newest first.
    ///
    /// Every listed post must resolve its category and parse its date.
    /// The sort is stable, so posts published on the same day stay in
    /// slug order.
    pub fn listing(&self) -> Result<Vec<ListedPost<'_>>, MetadataError> {
        let mut listed = Vec::new();
        for (slug, meta) in self.posts.iter().filter(|(_, m)| !m.draft) {
            let category = self.category_of(slug, meta)?;
            let published = meta.published().map_err(|source| MetadataError::InvalidDate {
                slug: slug.clone(),
                value: meta.published_at.clone(),
                source,
            })?;
            listed.push(ListedPost {
                slug,
                meta,
                category,
                published,
                url: self.site.post_url(&meta.category, slug),
            });
        }
        listed.sort_by(|a, b| b.published.cmp(&a.published));
        Ok(listed)
    }

    /// Check every non-draft post's category and date.
    pub fn validate(&self) -> Result<(), MetadataError> {
        self.listing().map(|_| ())
    }
}

fn read_settings_file(path: &Path) -> Result<String, MetadataError> {
    fs::read_to_string(path).map_err(|source| MetadataError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, MetadataError> {
    let content = read_settings_file(path)?;
    serde_yaml_ng::from_str(&content).map_err(|source| MetadataError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`load_yaml`], but an empty document is an empty mapping.
fn load_yaml_map<V: DeserializeOwned>(path: &Path) -> Result<BTreeMap<String, V>, MetadataError> {
    let content = read_settings_file(path)?;
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_yaml_ng::from_str(&content).map_err(|source| MetadataError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

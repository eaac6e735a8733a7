//! Stylesheet sources.
//!
//! Every page inlines one stylesheet: the site's `external_styles` fetched
//! in listed order, followed by the project's local `static/styles.css`.
//! The text is concatenated as-is and minified along with the page.

use crate::settings::SiteSettings;
use reqwest::blocking::Client;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum StyleError {
    #[error("failed to fetch stylesheet {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("cannot read stylesheet {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Produces the stylesheet text inlined into every page.
pub trait StyleSource {
    fn styles(&self, site: &SiteSettings) -> Result<String, StyleError>;
}

/// Fetches external stylesheets over HTTP and appends the local one.
#[derive(Debug, Clone)]
pub struct HttpStyleSource {
    client: Client,
    stylesheet: PathBuf,
}

impl HttpStyleSource {
    pub fn new(stylesheet: impl Into<PathBuf>) -> Result<Self, StyleError> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(StyleError::Client)?;
        Ok(Self {
            client,
            stylesheet: stylesheet.into(),
        })
    }

    fn fetch(&self, url: &str) -> Result<String, StyleError> {
        let fetch_err = |source| StyleError::Fetch {
            url: url.to_string(),
            source,
        };
        let text = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .map_err(fetch_err)?;
        debug!(url, bytes = text.len(), "fetched stylesheet");
        Ok(text)
    }
}

impl StyleSource for HttpStyleSource {
    fn styles(&self, site: &SiteSettings) -> Result<String, StyleError> {
        let mut styles = String::new();
        for url in &site.external_styles {
            styles.push_str(&self.fetch(url)?);
        }
        styles.push_str(&read_local(&self.stylesheet)?);
        Ok(styles)
    }
}

/// Read the local stylesheet; a missing file contributes nothing.
pub fn read_local(path: &Path) -> Result<String, StyleError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "local stylesheet missing, using none");
            Ok(String::new())
        }
        Err(source) => Err(StyleError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// A fixed stylesheet, for offline builds and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticStyleSource(pub String);

impl StaticStyleSource {
    pub fn new(styles: impl Into<String>) -> Self {
        Self(styles.into())
    }
}

impl StyleSource for StaticStyleSource {
    fn styles(&self, _site: &SiteSettings) -> Result<String, StyleError> {
        Ok(self.0.clone())
    }
}

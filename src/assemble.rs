//! Page assembly: template rendering plus optional HTML minification.
//!
//! The assembled string is exactly what gets written to disk, so two
//! assemblies of the same context produce identical bytes.

use crate::templates::{PageContext, Template, render};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("minified {template} page is not valid UTF-8: {source}")]
    Utf8 {
        template: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct PageAssembler {
    minify: bool,
}

impl PageAssembler {
    pub fn new(minify: bool) -> Self {
        Self { minify }
    }

    /// Render `template` against `ctx` and minify the result when enabled.
    pub fn assemble(&self, template: Template, ctx: &PageContext<'_>) -> Result<String, AssembleError> {
        let html = render(template, ctx).into_string();
        if !self.minify {
            return Ok(html);
        }
        let before = html.len();
        let minified = minify(&html).map_err(|source| {
            error!(template = template.name(), error = %source, "minification failed");
            AssembleError::Utf8 {
                template: template.name(),
                source,
            }
        })?;
        debug!(template = template.name(), before, after = minified.len(), "minified page");
        Ok(minified)
    }
}

/// Strip comments and collapse insignificant whitespace.
///
/// Whitespace inside `<pre>` and `<textarea>` is left alone, as are
/// closing tags and the `<html>`/`<head>` opening tags.
pub fn minify(html: &str) -> Result<String, std::string::FromUtf8Error> {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    cfg.remove_bangs = true;
    cfg.remove_processing_instructions = true;
    String::from_utf8(minify_html::minify(html.as_bytes(), &cfg))
}

//! Markdown rendering.
//!
//! Converts Markdown into HTML with pulldown-cmark and then rewrites a fixed
//! set of tag openings so the output carries presentation classes.
//!
//! ## Extensions
//!
//! On top of CommonMark (which already covers fenced code blocks):
//!
//! - **Tables** and **strikethrough** via pulldown-cmark options.
//! - **Mark**: `==text==` becomes `<mark>text</mark>`. A span may wrap other
//!   inline markup (`==see *this*==`) but never crosses a tag or block
//!   boundary; an unpaired `==` stays as written.
//! - **Emoji shortcodes**: `:rocket:` becomes 🚀 for any GitHub (gemoji)
//!   shortcode; unknown names are left as written.
//! - **Inline images**: an image whose `src` is a relative path to a local
//!   file next to the source is embedded as a base64 `data:` URI, so the
//!   rendered page has no external image dependencies.
//!
//! Mark and emoji rewriting never touch code spans, code blocks, or image
//! alt text.
//!
//! ## Tag rules
//!
//! After conversion, [`TagRules`] applies an ordered list of literal
//! substring replacements across the whole document:
//!
//! | Pattern     | Replacement                                   |
//! |-------------|-----------------------------------------------|
//! | `<img`      | `<img class="img-fluid mx-auto"`              |
//! | `<blockquote` | `<blockquote class="blockquote"`            |
//! | `<table`    | `<div class="table"><table class="table"`     |
//! | `</table>`  | `</table></div>`                              |
//!
//! This is a text transform, not a DOM pass: a pattern matches wherever it
//! appears, so patterns must only target tag openings. Text content is
//! HTML-escaped by the renderer, which keeps `<` out of prose.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd, html::push_html};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error};

const MARK_DELIMITER: &str = "==";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("cannot read markdown {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot embed image {path}: {source}")]
    Embed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ─── Tag rules ───────────────────────────────────────────────────────────────

/// One literal `pattern → replacement` rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRule {
    pub pattern: String,
    pub replacement: String,
}

impl TagRule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// Ordered tag rewrite table applied to rendered HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRules(Vec<TagRule>);

impl TagRules {
    pub fn new(rules: Vec<TagRule>) -> Self {
        Self(rules)
    }

    /// A table that leaves HTML untouched.
    pub fn none() -> Self {
        Self(Vec::new())
    }

    /// Apply every rule in order, each replacing all its occurrences.
    pub fn apply(&self, html: &str) -> String {
        self.0
            .iter()
            .fold(html.to_string(), |acc, rule| acc.replace(&rule.pattern, &rule.replacement))
    }
}

impl Default for TagRules {
    fn default() -> Self {
        Self(vec![
            TagRule::new("<img", r#"<img class="img-fluid mx-auto""#),
            TagRule::new("<blockquote", r#"<blockquote class="blockquote""#),
            TagRule::new("<table", r#"<div class="table"><table class="table""#),
            TagRule::new("</table>", "</table></div>"),
        ])
    }
}

// ─── Renderer ────────────────────────────────────────────────────────────────

/// Markdown → HTML converter with presentation rewrites.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    rules: TagRules,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(TagRules::default())
    }
}

impl MarkdownRenderer {
    pub fn new(rules: TagRules) -> Self {
        Self { rules }
    }

    /// Render Markdown text. Relative images are left as links.
    pub fn render(&self, markdown: &str) -> Result<String, RenderError> {
        self.render_inner(markdown, None)
    }

    /// Render Markdown text, embedding local images found under `base_dir`.
    pub fn render_in(&self, markdown: &str, base_dir: &Path) -> Result<String, RenderError> {
        self.render_inner(markdown, Some(base_dir))
    }

    /// Read and render a Markdown file, embedding images next to it.
    ///
    /// Read failures are logged here and returned to the caller.
    pub fn render_file(&self, path: &Path) -> Result<String, RenderError> {
        let markdown = fs::read_to_string(path).map_err(|source| {
            error!(path = %path.display(), %source, "failed to read markdown");
            RenderError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        self.render_in(&markdown, base_dir)
    }

    fn render_inner(&self, markdown: &str, base_dir: Option<&Path>) -> Result<String, RenderError> {
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        let parser = Parser::new_ext(markdown, options);

        let events = merge_text(parser, base_dir).inspect_err(|e| {
            error!(error = %e, "markdown conversion failed");
        })?;
        let events = replace_shortcodes(mark_spans(events));

        let mut html = String::with_capacity(markdown.len() * 2);
        push_html(&mut html, events.into_iter());
        debug!(bytes = html.len(), "rendered markdown");
        Ok(self.rules.apply(&html))
    }
}

// ─── Event passes ────────────────────────────────────────────────────────────

/// Merge adjacent text events and embed local images.
///
/// pulldown-cmark splits text at characters that might open inline markup,
/// so a `:white_check_mark:` or `==` can arrive in pieces.
fn merge_text<'a>(
    parser: Parser<'a>,
    base_dir: Option<&Path>,
) -> Result<Vec<Event<'a>>, RenderError> {
    let mut events: Vec<Event<'a>> = Vec::new();

    for event in parser {
        match event {
            Event::Text(text) => match events.last_mut() {
                Some(Event::Text(prev)) => {
                    let mut joined = prev.to_string();
                    joined.push_str(&text);
                    *prev = CowStr::from(joined);
                }
                _ => events.push(Event::Text(text)),
            },
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                let dest_url = match base_dir {
                    Some(dir) => embed_image(dir, dest_url)?,
                    None => dest_url,
                };
                events.push(Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }));
            }
            other => events.push(other),
        }
    }
    Ok(events)
}

/// Tracks nesting while walking the event stream.
///
/// Text inside code blocks and image alt text is verbatim.
#[derive(Default)]
struct Nesting {
    depth: usize,
    verbatim: usize,
}

impl Nesting {
    fn enter(&mut self, event: &Event<'_>) {
        match event {
            Event::Start(tag) => {
                self.depth += 1;
                if matches!(tag, Tag::CodeBlock(_) | Tag::Image { .. }) {
                    self.verbatim += 1;
                }
            }
            Event::End(tag) => {
                self.depth = self.depth.saturating_sub(1);
                if matches!(tag, TagEnd::CodeBlock | TagEnd::Image) {
                    self.verbatim = self.verbatim.saturating_sub(1);
                }
            }
            _ => {}
        }
    }

    fn is_verbatim(&self) -> bool {
        self.verbatim > 0
    }
}

/// A `==` occurrence: event index and byte offset in that event's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Delimiter {
    event: usize,
    offset: usize,
}

/// Pair `==` delimiters and splice `<mark>`/`</mark>` into the stream.
///
/// An opener must be followed by non-whitespace and a closer preceded by
/// it. A closer only pairs with an opener at the same nesting depth; an
/// opener still pending when its enclosing tag or block ends stays literal.
fn mark_spans(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut nesting = Nesting::default();
    let mut pending: Vec<(usize, Delimiter)> = Vec::new();
    // event index → (offset, is_open)
    let mut splits: BTreeMap<usize, Vec<(usize, bool)>> = BTreeMap::new();

    for (index, event) in events.iter().enumerate() {
        if let Event::End(_) = event {
            pending.retain(|(depth, _)| *depth < nesting.depth);
        }
        nesting.enter(event);
        let Event::Text(text) = event else {
            continue;
        };
        if nesting.is_verbatim() {
            continue;
        }
        for (offset, _) in text.match_indices(MARK_DELIMITER) {
            let can_close = text[..offset].chars().next_back().is_none_or(|c| !c.is_whitespace());
            let can_open = text[offset + MARK_DELIMITER.len()..]
                .chars()
                .next()
                .is_none_or(|c| !c.is_whitespace());

            let opener = pending.last().copied().filter(|(depth, open)| {
                *depth == nesting.depth
                    && !(open.event == index && open.offset + MARK_DELIMITER.len() == offset)
            });
            match opener {
                Some((_, open)) if can_close => {
                    pending.pop();
                    splits.entry(open.event).or_default().push((open.offset, true));
                    splits.entry(index).or_default().push((offset, false));
                }
                _ if can_open => pending.push((nesting.depth, Delimiter { event: index, offset })),
                _ => {}
            }
        }
    }

    if splits.is_empty() {
        return events;
    }

    let mut out = Vec::with_capacity(events.len() + splits.len() * 2);
    for (index, event) in events.into_iter().enumerate() {
        match (splits.get_mut(&index), event) {
            (Some(cuts), Event::Text(text)) => {
                cuts.sort_unstable();
                let mut last = 0;
                for &(offset, open) in cuts.iter() {
                    if offset > last {
                        out.push(Event::Text(CowStr::from(text[last..offset].to_string())));
                    }
                    let tag = if open { "<mark>" } else { "</mark>" };
                    out.push(Event::InlineHtml(CowStr::Borrowed(tag)));
                    last = offset + MARK_DELIMITER.len();
                }
                if last < text.len() {
                    out.push(Event::Text(CowStr::from(text[last..].to_string())));
                }
            }
            (_, event) => out.push(event),
        }
    }
    out
}

/// Replace known `:name:` shortcodes in text outside verbatim regions.
fn replace_shortcodes(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut nesting = Nesting::default();
    events
        .into_iter()
        .map(|event| {
            nesting.enter(&event);
            match event {
                Event::Text(text) if !nesting.is_verbatim() && text.contains(':') => {
                    Event::Text(CowStr::from(emojify(&text)))
                }
                other => other,
            }
        })
        .collect()
}

/// Replace every known `:name:` shortcode in `text` with its emoji.
fn emojify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(':') {
        let after = &rest[start + 1..];
        let len = after.find(|c: char| !is_shortcode_char(c)).unwrap_or(after.len());
        if len > 0
            && after[len..].starts_with(':')
            && let Some(emoji) = emojis::get_by_shortcode(&after[..len])
        {
            out.push_str(&rest[..start]);
            out.push_str(emoji.as_str());
            rest = &after[len + 1..];
            continue;
        }
        out.push_str(&rest[..start + 1]);
        rest = after;
    }
    out.push_str(rest);
    out
}

fn is_shortcode_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '+' || c == '-'
}

/// Turn a relative local image path into a `data:` URI.
///
/// Remote URLs, absolute paths, and files that don't exist are returned as-is.
fn embed_image<'a>(base_dir: &Path, dest: CowStr<'a>) -> Result<CowStr<'a>, RenderError> {
    if dest.is_empty() || dest.contains("://") || dest.starts_with('/') || dest.starts_with("data:")
    {
        return Ok(dest);
    }
    let path = base_dir.join(&*dest);
    if !path.is_file() {
        debug!(path = %path.display(), "image not found locally, leaving link");
        return Ok(dest);
    }
    let bytes = fs::read(&path).map_err(|source| RenderError::Embed {
        path: path.clone(),
        source,
    })?;
    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    Ok(CowStr::from(format!(
        "data:{};base64,{}",
        mime.essence_str(),
        BASE64.encode(bytes)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn render(md: &str) -> String {
        MarkdownRenderer::default().render(md).unwrap()
    }

    // =========================================================================
    // Tag rules
    // =========================================================================

    #[test]
    fn table_is_wrapped() {
        let html = render("| a | b |\n|---|---|\n| 1 | 2 |\n");
        let start = html.find(r#"<div class="table"><table class="table">"#).unwrap();
        let end = html.find("</table></div>").unwrap();
        assert!(start < end);
        assert!(html[start..end].contains("<td>1</td>"));
    }

    #[test]
    fn headings_are_not_rewritten() {
        let html = render("## Section\n");
        assert!(html.contains("<h2>Section</h2>"));
    }

    #[test]
    fn image_gets_class() {
        let html = render("![alt](https://example.com/a.png)");
        assert!(html.contains(r#"<img class="img-fluid mx-auto" src="https://example.com/a.png""#));
    }

    #[test]
    fn blockquote_gets_class() {
        let html = render("> quoted\n");
        assert!(html.contains(r#"<blockquote class="blockquote">"#));
    }

    #[test]
    fn rules_apply_in_order() {
        let rules = TagRules::new(vec![TagRule::new("a", "b"), TagRule::new("b", "c")]);
        assert_eq!(rules.apply("a"), "c");
    }

    #[test]
    fn rules_replace_every_occurrence() {
        let html = render("| a |\n|---|\n| 1 |\n\n| b |\n|---|\n| 2 |\n");
        assert_eq!(html.matches(r#"<div class="table">"#).count(), 2);
        assert_eq!(html.matches("</table></div>").count(), 2);
    }

    #[test]
    fn custom_rule_table() {
        let renderer = MarkdownRenderer::new(TagRules::new(vec![TagRule::new(
            "<h2",
            r#"<h2 class="title""#,
        )]));
        let html = renderer.render("## Hi\n").unwrap();
        assert!(html.contains(r#"<h2 class="title">Hi</h2>"#));
    }

    #[test]
    fn empty_rule_table_leaves_html() {
        let renderer = MarkdownRenderer::new(TagRules::none());
        let html = renderer.render("| a |\n|---|\n| 1 |\n").unwrap();
        assert!(html.contains("<table>"));
        assert!(!html.contains("class=\"table\""));
    }

    #[test]
    fn escaped_text_is_not_rewritten() {
        let html = render("Write `<table>` or <table in prose.\n");
        assert!(!html.contains(r#"<div class="table">"#));
    }

    // =========================================================================
    // Core markdown
    // =========================================================================

    #[test]
    fn fenced_code_block() {
        let html = render("```rust\nlet x = 1;\n```\n");
        assert!(html.contains(r#"<pre><code class="language-rust">let x = 1;"#));
    }

    #[test]
    fn emphasis_and_strikethrough() {
        let html = render("*a* **b** ~~c~~");
        assert!(html.contains("<em>a</em>"));
        assert!(html.contains("<strong>b</strong>"));
        assert!(html.contains("<del>c</del>"));
    }

    // =========================================================================
    // Inline extensions
    // =========================================================================

    #[test]
    fn mark_span() {
        let html = render("this is ==important== text");
        assert!(html.contains("this is <mark>important</mark> text"));
    }

    #[test]
    fn unmatched_mark_is_literal() {
        let html = render("a == b");
        assert!(html.contains("a == b"));
        assert!(!html.contains("<mark>"));
    }

    #[test]
    fn mark_content_is_escaped() {
        let html = render("==a & b==");
        assert!(html.contains("<mark>a &amp; b</mark>"));
    }

    #[test]
    fn emoji_shortcode() {
        let html = render("Shipped :rocket: today :tada:");
        assert!(html.contains("Shipped 🚀 today 🎉"));
    }

    #[test]
    fn unknown_shortcode_left_alone() {
        let html = render("time 10:30:45 and :not_an_emoji:");
        assert!(html.contains("time 10:30:45 and :not_an_emoji:"));
    }

    #[test]
    fn no_rewrites_inside_code() {
        let html = render("`==x== :rocket:`\n\n```\n==y== :tada:\n```\n");
        assert!(html.contains("<code>==x== :rocket:</code>"));
        assert!(html.contains("==y== :tada:"));
        assert!(!html.contains("<mark>"));
        assert!(!html.contains('🚀'));
    }

    #[test]
    fn gemoji_shortcodes() {
        let html = render(":heart_eyes: :100: :smile_cat: :ok_hand: :+1:");
        assert!(html.contains("😍 💯 😸 👌 👍"), "{html}");
    }

    #[test]
    fn shortcode_split_by_underscores() {
        let html = render("done :white_check_mark:");
        assert!(html.contains("done ✅"), "{html}");
    }

    #[test]
    fn mark_wraps_emphasis() {
        let html = render("==some *emph* text==\n");
        assert!(html.contains("<mark>some <em>emph</em> text</mark>"), "{html}");
    }

    #[test]
    fn mark_wraps_strong_at_edges() {
        let html = render("==**bold** word==\n");
        assert!(html.contains("<mark><strong>bold</strong> word</mark>"), "{html}");
    }

    #[test]
    fn mark_wraps_link() {
        let html = render("==see [docs](https://example.com) now==\n");
        assert!(
            html.contains(r#"<mark>see <a href="https://example.com">docs</a> now</mark>"#),
            "{html}"
        );
    }

    #[test]
    fn mark_inside_emphasis() {
        let html = render("*a ==b== c*\n");
        assert!(html.contains("<em>a <mark>b</mark> c</em>"), "{html}");
    }

    #[test]
    fn mark_never_crosses_tag_boundary() {
        let html = render("*a ==b* c==\n");
        assert!(!html.contains("<mark>"), "{html}");
        assert!(html.contains("==b"));
    }

    #[test]
    fn mark_never_crosses_paragraphs() {
        let html = render("==a\n\nb==\n");
        assert!(!html.contains("<mark>"), "{html}");
    }

    #[test]
    fn two_marks_in_one_paragraph() {
        let html = render("==a== and ==b==\n");
        assert_eq!(html.matches("<mark>").count(), 2);
        assert!(html.contains("<mark>a</mark> and <mark>b</mark>"));
    }

    #[test]
    fn emoji_inside_mark() {
        let html = render("==ship it :rocket:==\n");
        assert!(html.contains("<mark>ship it 🚀</mark>"), "{html}");
    }

    #[test]
    fn image_alt_is_verbatim() {
        let html = render("![==a== :rocket:](https://example.com/x.png)\n");
        assert!(html.contains(r#"alt="==a== :rocket:""#), "{html}");
    }

    // =========================================================================
    // Files
    // =========================================================================

    #[test]
    fn render_file_embeds_relative_images() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("dot.png"), b"PNGDATA").unwrap();
        let path = tmp.path().join("post.md");
        fs::write(&path, "# Title\n\n![dot](dot.png)\n").unwrap();

        let html = MarkdownRenderer::default().render_file(&path).unwrap();
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("data:image/png;base64,"));
    }

    #[test]
    fn render_file_missing_is_read_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gone.md");
        assert!(matches!(
            MarkdownRenderer::default().render_file(&path),
            Err(RenderError::Read { path: p, .. }) if p == path
        ));
    }

    // =========================================================================
    // Image embedding
    // =========================================================================

    #[test]
    fn local_image_is_embedded() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("dot.png"), b"PNGDATA").unwrap();
        let html = MarkdownRenderer::default()
            .render_in("![dot](dot.png)", tmp.path())
            .unwrap();
        let expected = format!("src=\"data:image/png;base64,{}\"", BASE64.encode(b"PNGDATA"));
        assert!(html.contains(&expected), "{html}");
    }

    #[test]
    fn missing_local_image_keeps_link() {
        let tmp = TempDir::new().unwrap();
        let html = MarkdownRenderer::default()
            .render_in("![x](missing.png)", tmp.path())
            .unwrap();
        assert!(html.contains(r#"src="missing.png""#));
    }

    #[test]
    fn remote_image_not_embedded() {
        let tmp = TempDir::new().unwrap();
        let html = MarkdownRenderer::default()
            .render_in("![x](https://example.com/x.png)", tmp.path())
            .unwrap();
        assert!(html.contains(r#"src="https://example.com/x.png""#));
    }

    #[test]
    fn render_without_base_dir_never_embeds() {
        let html = render("![dot](dot.png)");
        assert!(html.contains(r#"src="dot.png""#));
    }
}

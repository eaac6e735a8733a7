//! Page templates.
//!
//! Three named templates cover every artifact:
//!
//! - [`Template::Home`]: site header, then the post listing (newest first)
//! - [`Template::Page`]: a static page body
//! - [`Template::Post`]: a post body with title, date, category, canonical link
//!
//! Templates are [maud](https://maud.lambda.xyz/) markup compiled into the
//! binary. Interpolated values are HTML-escaped; the rendered Markdown body
//! and the stylesheet are inserted verbatim.

use crate::settings::{Category, ListedPost, PostMeta, SiteSettings};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::collections::BTreeMap;

/// Named template selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    Home,
    Page,
    Post,
}

impl Template {
    pub fn name(self) -> &'static str {
        match self {
            Template::Home => "index",
            Template::Page => "page",
            Template::Post => "post",
        }
    }
}

/// Values available to a template.
///
/// Optional fields only render when present, so the same context type
/// serves every template.
#[derive(Debug, Clone)]
pub struct PageContext<'a> {
    /// Document `<title>`.
    pub title: String,
    pub site: &'a SiteSettings,
    /// Rendered HTML body; empty for the home page.
    pub body: &'a str,
    /// Stylesheet text inlined into `<head>`.
    pub style: &'a str,
    pub post: Option<&'a PostMeta>,
    pub category: Option<&'a Category>,
    /// Canonical URL of the page.
    pub page_url: Option<String>,
    /// Stable element id, e.g. `rust-hello-world`.
    pub page_id: Option<String>,
    /// Home listing, newest first.
    pub posts: Option<&'a [ListedPost<'a>]>,
    pub categories: Option<&'a BTreeMap<String, Category>>,
}

impl<'a> PageContext<'a> {
    pub fn new(title: impl Into<String>, site: &'a SiteSettings, style: &'a str) -> Self {
        Self {
            title: title.into(),
            site,
            body: "",
            style,
            post: None,
            category: None,
            page_url: None,
            page_id: None,
            posts: None,
            categories: None,
        }
    }
}

/// Render `template` against `ctx`.
pub fn render(template: Template, ctx: &PageContext<'_>) -> Markup {
    match template {
        Template::Home => render_home(ctx),
        Template::Page => render_page(ctx),
        Template::Post => render_post(ctx),
    }
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(ctx: &PageContext<'_>, body_class: &str, content: Markup) -> Markup {
    let description = ctx
        .post
        .and_then(|p| p.description.as_deref())
        .or(ctx.site.description.as_deref());

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (ctx.title) }
                @if let Some(desc) = description {
                    meta name="description" content=(desc);
                }
                @if let Some(author) = &ctx.site.author {
                    meta name="author" content=(author);
                }
                @if let Some(url) = &ctx.page_url {
                    link rel="canonical" href=(url);
                }
                style { (PreEscaped(ctx.style)) }
            }
            body class=(body_class) {
                (site_header(ctx))
                (content)
                (site_footer(ctx.site))
            }
        }
    }
}

fn site_header(ctx: &PageContext<'_>) -> Markup {
    html! {
        header.site-header {
            a.site-title href="/" { (ctx.site.title) }
            @if let Some(categories) = ctx.categories {
                nav.site-nav {
                    ul {
                        @for (key, category) in categories {
                            li data-category=(key) { (category.name) }
                        }
                    }
                }
            }
        }
    }
}

fn site_footer(site: &SiteSettings) -> Markup {
    html! {
        footer.site-footer {
            @if let Some(author) = &site.author {
                p { "© " (author) }
            }
        }
    }
}

fn post_meta_line(published_at: &str, category: Option<&Category>) -> Markup {
    html! {
        p.post-meta {
            time { (published_at) }
            @if let Some(category) = category {
                " · "
                span.post-category { (category.name) }
            }
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

fn render_home(ctx: &PageContext<'_>) -> Markup {
    let posts = ctx.posts.unwrap_or(&[]);
    let content = html! {
        main.home {
            @if let Some(desc) = &ctx.site.description {
                p.site-description { (desc) }
            }
            @if posts.is_empty() {
                p.empty { "No posts yet." }
            }
            @for post in posts {
                article.post-summary id=(format!("{}-{}", post.meta.category, post.slug)) {
                    h2 { a href=(post.url) { (post.meta.title) } }
                    (post_meta_line(&post.meta.published_at, Some(post.category)))
                    @if let Some(desc) = &post.meta.description {
                        p.post-description { (desc) }
                    }
                }
            }
        }
    };
    base_document(ctx, "home-page", content)
}

fn render_page(ctx: &PageContext<'_>) -> Markup {
    let content = html! {
        main.page {
            article.page-content {
                (PreEscaped(ctx.body))
            }
        }
    };
    base_document(ctx, "static-page", content)
}

fn render_post(ctx: &PageContext<'_>) -> Markup {
    let content = html! {
        main.post {
            article.post-content id=[ctx.page_id.as_deref()] {
                @if let Some(post) = ctx.post {
                    header.post-header {
                        h1 { (post.title) }
                        (post_meta_line(&post.published_at, ctx.category))
                    }
                }
                div.post-body {
                    (PreEscaped(ctx.body))
                }
            }
        }
    };
    base_document(ctx, "post-page", content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Extra;
    use chrono::NaiveDate;

    fn site() -> SiteSettings {
        SiteSettings {
            title: "Field Notes".into(),
            description: Some("Notes from the workbench".into()),
            author: Some("Ada".into()),
            base_url: None,
            external_styles: vec![],
            extra: Extra::new(),
        }
    }

    fn category() -> Category {
        Category {
            name: "Rust".into(),
            description: None,
            extra: Extra::new(),
        }
    }

    fn post(title: &str, date: &str) -> PostMeta {
        PostMeta {
            title: title.into(),
            category: "rust".into(),
            draft: false,
            published_at: date.into(),
            description: None,
            extra: Extra::new(),
        }
    }

    #[test]
    fn template_names() {
        assert_eq!(Template::Home.name(), "index");
        assert_eq!(Template::Page.name(), "page");
        assert_eq!(Template::Post.name(), "post");
    }

    #[test]
    fn base_document_includes_doctype_and_style() {
        let site = site();
        let ctx = PageContext::new("Field Notes", &site, "body{color:red}");
        let html = render(Template::Page, &ctx).into_string();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Field Notes</title>"));
        assert!(html.contains("<style>body{color:red}</style>"));
    }

    #[test]
    fn page_body_is_not_escaped() {
        let site = site();
        let mut ctx = PageContext::new("t", &site, "");
        ctx.body = "<p>hello</p>";
        let html = render(Template::Page, &ctx).into_string();
        assert!(html.contains("<p>hello</p>"));
    }

    #[test]
    fn titles_are_escaped() {
        let site = site();
        let ctx = PageContext::new("<script>x</script>", &site, "");
        let html = render(Template::Page, &ctx).into_string();
        assert!(!html.contains("<script>x"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn post_renders_header_and_canonical_link() {
        let site = site();
        let cat = category();
        let meta = post("Hello", "01 January, 2023");
        let mut ctx = PageContext::new("Rust - Hello", &site, "");
        ctx.body = "<p>body</p>";
        ctx.post = Some(&meta);
        ctx.category = Some(&cat);
        ctx.page_url = Some("/rust/hello/".into());
        ctx.page_id = Some("rust-hello".into());

        let html = render(Template::Post, &ctx).into_string();
        assert!(html.contains("<h1>Hello</h1>"));
        assert!(html.contains("01 January, 2023"));
        assert!(html.contains(r#"<link rel="canonical" href="/rust/hello/">"#));
        assert!(html.contains(r#"id="rust-hello""#));
        assert!(html.contains("Rust"));
    }

    #[test]
    fn optional_blocks_absent_when_unset() {
        let mut site = site();
        site.author = None;
        let ctx = PageContext::new("t", &site, "");
        let html = render(Template::Post, &ctx).into_string();
        assert!(!html.contains("canonical"));
        assert!(!html.contains("<h1>"));
        assert!(!html.contains("©"));
    }

    #[test]
    fn home_lists_posts_in_given_order() {
        let site = site();
        let cat = category();
        let newer = post("Newer", "15 June, 2024");
        let older = post("Older", "01 January, 2023");
        let listing = vec![
            ListedPost {
                slug: "newer",
                meta: &newer,
                category: &cat,
                published: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
                url: "/rust/newer/".into(),
            },
            ListedPost {
                slug: "older",
                meta: &older,
                category: &cat,
                published: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                url: "/rust/older/".into(),
            },
        ];
        let mut ctx = PageContext::new("Field Notes", &site, "");
        ctx.posts = Some(&listing);

        let html = render(Template::Home, &ctx).into_string();
        let a = html.find("Newer").unwrap();
        let b = html.find("Older").unwrap();
        assert!(a < b);
        assert!(html.contains(r#"href="/rust/newer/""#));
        assert!(html.contains(r#"id="rust-newer""#));
    }

    #[test]
    fn home_without_posts() {
        let site = site();
        let ctx = PageContext::new("Field Notes", &site, "");
        let html = render(Template::Home, &ctx).into_string();
        assert!(html.contains("No posts yet."));
    }

    #[test]
    fn header_lists_categories() {
        let site = site();
        let mut categories = BTreeMap::new();
        categories.insert("rust".to_string(), category());
        let mut ctx = PageContext::new("t", &site, "");
        ctx.categories = Some(&categories);
        let html = render(Template::Home, &ctx).into_string();
        assert!(html.contains(r#"data-category="rust""#));
    }
}

//! View generators.
//!
//! One function per route. HTML is generated with maud; the feed and the
//! sitemap are small enough to write out line by line, escaping every
//! catalog-provided value.
//!
//! Views never fail as a whole except where a missing file means the server
//! is misconfigured (the body or bio of a listed article on its own page).
//! Inside the feed and the yearly editions a missing body or bio is shown
//! in place as the error description, so one broken article does not take
//! the whole page down.

use crate::catalog::Article;
use crate::config::SiteConfig;
use crate::files::ContentSource;
use crate::router::{self, Request, Response};
use crate::site::ContentSnapshot;
use chrono::{DateTime, Datelike, Utc};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fmt::Write as _;
use std::sync::Arc;

/// Everything a view may consult.
pub struct ViewContext<'a> {
    pub config: &'a SiteConfig,
    pub files: &'a dyn ContentSource,
    pub snapshot: &'a ContentSnapshot,
    pub now: DateTime<Utc>,
}

impl ViewContext<'_> {
    /// Edition years from the current one down to the first, newest first.
    pub fn edition_years(&self) -> impl Iterator<Item = i32> {
        (self.config.site.first_year..=self.now.year()).rev()
    }

    fn article_source(&self, article: &Article) -> String {
        format!("{}{}", self.config.article_prefix(), article.slug)
    }

    fn body(&self, article: &Article) -> Result<Arc<str>, crate::files::FileError> {
        self.snapshot
            .cache
            .get(self.files, &self.article_source(article))
    }

    fn bio(&self, article: &Article) -> Result<String, crate::files::FileError> {
        let bytes = self.files.read(&self.config.author_path(&article.author))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure. Only pages meant as search
/// entry points ask robots to index and follow.
fn base_document(title: &str, stylesheet: &str, indexable: bool, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                title { (title) }
                meta charset="utf-8";
                @if indexable {
                    meta name="robots" content="index,follow";
                }
                link rel="stylesheet" type="text/css" href=(stylesheet);
            }
            body {
                (content)
            }
        }
    }
}

/// Two-tone logo: first word of the site name in the primary colour.
fn logo(name: &str) -> Markup {
    let upper = name.to_uppercase();
    let (primary, secondary) = upper.split_once(' ').unwrap_or((upper.as_str(), ""));
    html! {
        text.logo1 { (primary) }
        @if !secondary.is_empty() {
            " "
            text.logo2 { (secondary) }
        }
    }
}

fn escape(value: &str) -> String {
    html! { (value) }.into_string()
}

/// Wrap `html` in CDATA, splitting any `]]>` it contains.
fn cdata(html: &str) -> String {
    format!("<![CDATA[\n{}\n]]>", html.replace("]]>", "]]]]><![CDATA[>"))
}

// ============================================================================
// Views
// ============================================================================

pub fn bad_method(_: &ViewContext<'_>, _: &Request) -> Response {
    Response::bad_method()
}

/// Redirect a short path to its canonical URL.
pub fn short_link(ctx: &ViewContext<'_>, req: &Request) -> Response {
    let key = req
        .path
        .strip_prefix(&ctx.config.links.path_prefix)
        .unwrap_or(&req.path);
    let key = if key.is_empty() { "/" } else { key };
    match ctx.snapshot.links.resolve(key) {
        Some(url) => Response::redirect(url),
        None => Response::not_found(),
    }
}

/// Year navigation and the full article listing.
pub fn index(ctx: &ViewContext<'_>, _: &Request) -> Response {
    let site = &ctx.config.site;
    let dir = &ctx.config.content.articles_dir;
    let content = html! {
        (logo(&site.name))
        br; br;
        @for year in ctx.edition_years() {
            a href=(year) { "GA " (year) }
            " "
        }
        a href="rss.xml" { "RSS Feed" }
        ul {
            @for article in &ctx.snapshot.catalog {
                li {
                    (article.published.date_label())
                    " – "
                    a href={ (dir) "/" (article.slug) } { (article.title) }
                }
            }
        }
    };
    Response::html(base_document(&site.name, "style.css", true, content).into_string())
}

/// One article with its author footer.
pub fn article(ctx: &ViewContext<'_>, req: &Request) -> Response {
    let prefix = ctx.config.article_prefix();
    let rest = req.path.strip_prefix(&prefix).unwrap_or_default();
    let slug = rest.strip_suffix(".html").unwrap_or(rest);
    let Some(article) = ctx.snapshot.catalog.find_by_slug(slug) else {
        return Response::not_found();
    };

    let body = match ctx.body(article) {
        Ok(body) => body,
        Err(e) => return Response::internal_error(&e),
    };
    let bio = match ctx.bio(article) {
        Ok(bio) => bio,
        Err(e) => return Response::internal_error(&e),
    };

    let content = html! {
        a href="/" { "zurück" }
        h1 { (article.title) }
        (PreEscaped(&*body))
        br;
        footer { "von " strong { (PreEscaped(bio)) } }
    };
    Response::html(base_document(&article.title, "../style.css", false, content).into_string())
}

struct EditionEntry<'a> {
    article: &'a Article,
    body: Result<Arc<str>, String>,
    bio: Result<String, String>,
}

/// All articles of one year, with print-edition links when available.
pub fn year_archive(ctx: &ViewContext<'_>, req: &Request) -> Response {
    let digits = router::year_segment(&req.path).unwrap_or_default();
    let year: i32 = match digits.parse() {
        Ok(year) => year,
        Err(e) => return Response::internal_error(&e),
    };

    let print_edition =
        ctx.files.exists(&format!("/{year}.pdf")) && ctx.files.exists(&format!("/{year}.svg"));
    let entries: Vec<EditionEntry<'_>> = ctx
        .snapshot
        .catalog
        .in_year(year)
        .map(|article| EditionEntry {
            article,
            body: ctx.body(article).map_err(|e| e.to_string()),
            bio: ctx.bio(article).map_err(|e| e.to_string()),
        })
        .collect();

    let dir = &ctx.config.content.articles_dir;
    let content = html! {
        (logo(&ctx.config.site.name))
        " "
        text.logo1 { "G" } text.logo2 { "esamt" }
        " "
        text.logo1 { "A" } text.logo2 { "usgabe" }
        " "
        text.logo1 { (year) }
        @if print_edition {
            p {
                i {
                    "Die Druckversion finden Sie auch als "
                    a href={ (year) ".pdf" } { "PDF" }
                    " mit einer "
                    a href={ (year) ".svg" } { "separaten Vorderseite" }
                    "."
                }
            }
        }
        @for entry in &entries {
            @let slug = &entry.article.slug;
            div.entry {
                h2 id=(slug) { (entry.article.title) }
                small {
                    "[" a href={ "#" (slug) } { "link" } "—"
                    a href={ (dir) "/" (slug) ".html" } { "standalone" } "]"
                }
                br;
                @match &entry.body {
                    Ok(body) => { (PreEscaped(&**body)) }
                    Err(e) => { (e) }
                }
                @match &entry.bio {
                    Ok(bio) => {
                        small { "von " strong { (PreEscaped(bio)) } }
                        br;
                    }
                    Err(e) => { (e) }
                }
                small { (entry.article.published.stamp_label()) }
            }
        }
    };
    let title = format!("{} GA {year}", ctx.config.site.name);
    Response::html(base_document(&title, "style.css", false, content).into_string())
}

/// RSS 2.0 feed with every catalog article and its rendered body.
pub fn rss(ctx: &ViewContext<'_>, _: &Request) -> Response {
    let site = &ctx.config.site;
    let mut xml = String::new();
    let _ = writeln!(xml, r#"<?xml version="1.0" encoding="utf-8"?>"#);
    let _ = writeln!(xml, r#"<?xml-stylesheet type="text/css" href="rss.css" ?>"#);
    let _ = writeln!(
        xml,
        r#"<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">"#
    );
    let _ = writeln!(xml, "<channel>");
    let _ = writeln!(xml, "<title>{}</title>", escape(&site.feed_title));
    let _ = writeln!(
        xml,
        "<description>{}</description>",
        escape(&site.feed_description)
    );
    let _ = writeln!(xml, "<language>{}</language>", escape(&site.language));
    let _ = writeln!(xml, "<link>{}/rss.xml</link>", escape(&site.url));
    let _ = writeln!(
        xml,
        r#"<atom:link href="{}/rss.xml" rel="self" type="application/rss+xml" />"#,
        escape(&site.url)
    );

    for article in &ctx.snapshot.catalog {
        let body = match ctx.body(article) {
            Ok(body) => body.to_string(),
            Err(e) => escape(&e.to_string()),
        };
        let _ = writeln!(xml, "<item>");
        let _ = writeln!(xml, "<title>{}</title>", escape(&article.title));
        let _ = writeln!(
            xml,
            "<guid>{}/{}.html#{}</guid>",
            escape(&site.url),
            article.published.year(),
            escape(&article.slug)
        );
        let _ = writeln!(xml, "<pubDate>{}</pubDate>", article.published.rfc1123());
        let _ = writeln!(xml, "<description>{}</description>", cdata(&body));
        let _ = writeln!(xml, "</item>");
    }

    let _ = writeln!(xml, "</channel>");
    let _ = writeln!(xml, "</rss>");
    Response::ok(router::RSS, xml)
}

/// XML sitemap: root, every edition year, every article.
pub fn sitemap(ctx: &ViewContext<'_>, _: &Request) -> Response {
    let url = escape(&ctx.config.site.url);
    let dir = &ctx.config.content.articles_dir;
    let current = ctx.now.year();
    let mut xml = String::new();
    let _ = writeln!(xml, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        xml,
        r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#
    );
    let _ = writeln!(
        xml,
        "<url><loc>{url}/</loc><changefreq>daily</changefreq></url>"
    );
    for year in ctx.edition_years() {
        let freq = if year == current { "daily" } else { "monthly" };
        let _ = writeln!(
            xml,
            "<url><loc>{url}/{year}.html</loc><changefreq>{freq}</changefreq></url>"
        );
    }
    for article in &ctx.snapshot.catalog {
        let _ = writeln!(
            xml,
            "<url><loc>{url}/{dir}/{}.html</loc><changefreq>monthly</changefreq></url>",
            escape(&article.slug)
        );
    }
    let _ = writeln!(xml, "</urlset>");
    Response::ok(router::XML, xml)
}

/// Serve a file from the content root as-is.
pub fn static_file(ctx: &ViewContext<'_>, req: &Request) -> Response {
    match ctx.files.read(&req.path) {
        Ok(bytes) => Response::ok(&content_type_for(&req.path), bytes),
        Err(e) => Response {
            info: Some(e.to_string()),
            ..Response::not_found()
        },
    }
}

/// MIME type from the file extension; textual types get a charset.
pub fn content_type_for(path: &str) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.type_() == mime_guess::mime::TEXT {
        format!("{}; charset=utf-8", mime.essence_str())
    } else {
        mime.essence_str().to_string()
    }
}

//! Request classification and dispatch.
//!
//! Routing is an ordered table of `(predicate, view)` entries, evaluated top
//! to bottom; the first matching predicate wins and the last entry matches
//! everything. The table is independent of the HTTP transport: it works on
//! the plain [`Request`] / [`Response`] values defined here, so the whole
//! site can be exercised in tests without a listener.
//!
//! | Order | Route | Predicate |
//! |-------|-------|-----------|
//! | 1 | `bad-method` | method is not `GET` |
//! | 2 | `short-link` | host contains the short-link marker, or path has the short-link prefix |
//! | 3 | `index` | `/` or anything starting with `/index` |
//! | 4 | `sitemap` | `/sitemap.xml` |
//! | 5 | `rss` | `/rss.xml` |
//! | 6 | `article` | starts with `/<articles_dir>/` |
//! | 7 | `year` | `/20YY` or `/20YY.html` |
//! | 8 | `static` | anything else |

use crate::config::SiteConfig;
use crate::site::Site;
use crate::views::{self, ViewContext};
use axum::http::{Method, StatusCode};
use chrono::{DateTime, Utc};

/// The parts of an HTTP request routing looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub host: String,
    pub path: String,
}

impl Request {
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::GET,
            host: String::new(),
            path: path.to_string(),
        }
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }
}

/// A rendered response, ready for any transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub content_type: String,
    pub location: Option<String>,
    pub body: Vec<u8>,
    /// Redirect target or error description, for the access log.
    pub info: Option<String>,
    pub route: Route,
}

pub const HTML: &str = "text/html; charset=utf-8";
pub const PLAIN: &str = "text/plain; charset=utf-8";
pub const XML: &str = "text/xml; charset=utf-8";
pub const RSS: &str = "application/rss+xml; charset=utf-8";

pub const BAD_METHOD_MESSAGE: &str = "This server only answers GET requests.";
pub const NOT_FOUND_MESSAGE: &str = "404 page not found";

impl Response {
    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: content_type.to_string(),
            location: None,
            body: body.into(),
            info: None,
            route: Route::Static,
        }
    }

    pub fn html(body: String) -> Self {
        Self::ok(HTML, body)
    }

    pub fn text(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            ..Self::ok(PLAIN, format!("{message}\n"))
        }
    }

    pub fn not_found() -> Self {
        Self::text(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)
    }

    pub fn bad_method() -> Self {
        Self::text(StatusCode::BAD_REQUEST, BAD_METHOD_MESSAGE)
    }

    /// Plain-text 500 carrying the error description.
    pub fn internal_error(error: &dyn std::error::Error) -> Self {
        let description = error.to_string();
        Self {
            info: Some(description.clone()),
            ..Self::text(StatusCode::INTERNAL_SERVER_ERROR, &description)
        }
    }

    /// 307 to `url`, with the customary tiny HTML body.
    pub fn redirect(url: &str) -> Self {
        let body = maud::html! { a href=(url) { "Temporary Redirect" } "." }.into_string();
        Self {
            status: StatusCode::TEMPORARY_REDIRECT,
            location: Some(url.to_string()),
            info: Some(url.to_string()),
            ..Self::ok(HTML, body + "\n")
        }
    }

    fn routed(mut self, route: Route) -> Self {
        self.route = route;
        self
    }

    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Which view handled a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    BadMethod,
    ShortLink,
    Index,
    Sitemap,
    Rss,
    Article,
    YearArchive,
    Static,
}

impl Route {
    pub fn name(self) -> &'static str {
        match self {
            Route::BadMethod => "bad-method",
            Route::ShortLink => "short-link",
            Route::Index => "index",
            Route::Sitemap => "sitemap",
            Route::Rss => "rss",
            Route::Article => "article",
            Route::YearArchive => "year",
            Route::Static => "static",
        }
    }
}

type Predicate = fn(&SiteConfig, &Request) -> bool;
type View = fn(&ViewContext<'_>, &Request) -> Response;

struct Entry {
    route: Route,
    matches: Predicate,
    view: View,
}

const ROUTES: &[Entry] = &[
    Entry {
        route: Route::BadMethod,
        matches: is_bad_method,
        view: views::bad_method,
    },
    Entry {
        route: Route::ShortLink,
        matches: is_short_link,
        view: views::short_link,
    },
    Entry {
        route: Route::Index,
        matches: is_index,
        view: views::index,
    },
    Entry {
        route: Route::Sitemap,
        matches: is_sitemap,
        view: views::sitemap,
    },
    Entry {
        route: Route::Rss,
        matches: is_rss,
        view: views::rss,
    },
    Entry {
        route: Route::Article,
        matches: is_article,
        view: views::article,
    },
    Entry {
        route: Route::YearArchive,
        matches: is_year,
        view: views::year_archive,
    },
    Entry {
        route: Route::Static,
        matches: always,
        view: views::static_file,
    },
];

fn is_bad_method(_: &SiteConfig, req: &Request) -> bool {
    req.method != Method::GET
}

fn is_short_link(config: &SiteConfig, req: &Request) -> bool {
    req.host.contains(&config.links.host_marker) || req.path.starts_with(&config.links.path_prefix)
}

fn is_index(_: &SiteConfig, req: &Request) -> bool {
    req.path == "/" || req.path.starts_with("/index")
}

fn is_sitemap(_: &SiteConfig, req: &Request) -> bool {
    req.path == "/sitemap.xml"
}

fn is_rss(_: &SiteConfig, req: &Request) -> bool {
    req.path == "/rss.xml"
}

fn is_article(config: &SiteConfig, req: &Request) -> bool {
    req.path.starts_with(&config.article_prefix())
}

fn is_year(_: &SiteConfig, req: &Request) -> bool {
    year_segment(&req.path).is_some()
}

fn always(_: &SiteConfig, _: &Request) -> bool {
    true
}

/// The `20YY` part of `/20YY` or `/20YY.html`.
pub fn year_segment(path: &str) -> Option<&str> {
    let rest = path.strip_prefix('/')?;
    let digits = rest.strip_suffix(".html").unwrap_or(rest);
    let is_year = digits.len() == 4
        && digits.starts_with("20")
        && digits.bytes().all(|b| b.is_ascii_digit());
    is_year.then_some(digits)
}

fn entry_for(config: &SiteConfig, req: &Request) -> &'static Entry {
    ROUTES
        .iter()
        .find(|entry| (entry.matches)(config, req))
        .unwrap_or(&ROUTES[ROUTES.len() - 1])
}

/// The route a request would take.
pub fn classify(config: &SiteConfig, req: &Request) -> Route {
    entry_for(config, req).route
}

/// Refresh the site if due, then dispatch against the current snapshot.
pub fn handle(site: &Site, req: &Request) -> Response {
    site.refresh_if_due();
    dispatch(site, req)
}

/// Dispatch against the current snapshot without refreshing.
pub fn dispatch(site: &Site, req: &Request) -> Response {
    dispatch_at(site, req, Utc::now())
}

/// Dispatch as of `now`, which decides the current edition year.
pub fn dispatch_at(site: &Site, req: &Request, now: DateTime<Utc>) -> Response {
    let snapshot = site.snapshot();
    let ctx = ViewContext {
        config: site.config(),
        files: site.files(),
        snapshot: &snapshot,
        now,
    };
    let entry = entry_for(site.config(), req);
    (entry.view)(&ctx, req).routed(entry.route)
}

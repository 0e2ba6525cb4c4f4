//! End-to-end checks over HTTP against a publication written from scratch.
//!
//! Each test builds a small content root in a temp directory, opens it the
//! same way `gazette serve` does, and talks to the axum app in-process.

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, HOST, LOCATION};
use axum::http::{Method, Request, StatusCode};
use chrono::{Datelike, Utc};
use gazette::config::{self, SiteConfig};
use gazette::files::SafeFiles;
use gazette::server;
use gazette::site::Site;
use http_body_util::BodyExt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const CATALOG: &str = "\
10.05.2022 08:30:00 CEST,mai-bericht,Bericht aus dem Mai,clara,mai
02.02.2023 12:00:00 UTC,februar,\"Kälte, Schnee & Eis\",clara,
01.01.2098 00:00:00 UTC,zukunft,Aus der Zukunft,clara,fut
";

fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(full, content).unwrap();
}

fn publication() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "articles.csv", CATALOG);
    write(root, "zerm/mai-bericht.md", "Im Mai\\{Wonnemonat\\} war \\,viel\\' los.");
    write(root, "zerm/februar.md", "# Februar\n\nKalt.");
    write(root, "zerm/zukunft.md", "Noch nicht.");
    write(root, "authors/clara.html", "Clara Chronistin");
    write(root, "style.css", "body { margin: 0 }");
    write(root, "2022.pdf", "%PDF-1.4");
    write(root, "2022.svg", "<svg/>");
    write(
        root,
        "config.toml",
        "[site]\nname = \"Test Blatt\"\nurl = \"https://blatt.example\"\nfirst_year = 2022\n",
    );
    tmp
}

fn open(root: &Path) -> Arc<Site> {
    let config = config::load_config(root).unwrap();
    Arc::new(Site::open(config, Box::new(SafeFiles::new(root))).unwrap())
}

async fn request(site: &Arc<Site>, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = server::app(Arc::clone(site)).oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, String::from_utf8_lossy(&bytes).into_owned())
}

async fn get(site: &Arc<Site>, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
    request(site, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn index_links_current_year_and_lists_articles() {
    let tmp = publication();
    let site = open(tmp.path());
    let (status, headers, body) = get(&site, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));

    let year = Utc::now().year();
    assert!(body.contains(&format!(r#"<a href="{year}">GA {year}</a>"#)));
    assert!(body.contains("<title>Test Blatt</title>"));
    assert!(body.contains("Kälte, Schnee &amp; Eis"));
    assert!(body.find("februar").unwrap() < body.find("mai-bericht").unwrap());
    assert!(!body.contains("zukunft"));
}

#[tokio::test]
async fn non_get_is_rejected_with_fixed_message() {
    let tmp = publication();
    let site = open(tmp.path());
    for method in [Method::POST, Method::PUT, Method::DELETE] {
        let req = Request::builder()
            .method(method)
            .uri("/")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = request(&site, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.trim_end(), "This server only answers GET requests.");
    }
}

#[tokio::test]
async fn article_pages() {
    let tmp = publication();
    let site = open(tmp.path());

    let (status, _, body) = get(&site, "/zerm/mai-bericht").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<sup>[1]</sup>"));
    assert!(body.contains("„viel“"));
    assert!(body.contains("Clara Chronistin"));

    let (status, _, body) = get(&site, "/zerm/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body.trim_end(), "404 page not found");

    let (status, _, _) = get(&site, "/zerm/zukunft").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn short_links_by_host() {
    let tmp = publication();
    let site = open(tmp.path());
    let link = |path: &str| {
        Request::builder()
            .uri(path)
            .header(HOST, "blatt.link")
            .body(Body::empty())
            .unwrap()
    };

    let (status, headers, _) = request(&site, link("/mai")).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(headers[LOCATION], "https://blatt.example/zerm/mai-bericht");

    let (status, headers, _) = request(&site, link("/")).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(headers[LOCATION], "https://blatt.example/");

    let (status, _, _) = request(&site, link("/unbekannt")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = request(&site, link("/fut")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn yearly_editions() {
    let tmp = publication();
    let site = open(tmp.path());

    let (status, _, body) = get(&site, "/2022").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Druckversion"));
    assert!(body.contains(r#"<h2 id="mai-bericht">"#));
    assert!(body.contains("10.05.2022 08:30 CEST"));

    let (status, _, body) = get(&site, "/2023.html").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("Druckversion"));
    assert!(body.contains(r#"<h2 id="februar">"#));

    let (status, _, body) = get(&site, "/2030").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("<h2"));
}

#[tokio::test]
async fn feeds() {
    let tmp = publication();
    let site = open(tmp.path());

    let (status, headers, rss) = get(&site, "/rss.xml").await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[CONTENT_TYPE].to_str().unwrap().starts_with("application/rss+xml"));
    assert_eq!(rss.matches("<item>").count(), 2);
    assert!(rss.contains("<title>Kälte, Schnee &amp; Eis</title>"));
    assert!(rss.contains("<guid>https://blatt.example/2022.html#mai-bericht</guid>"));

    let (status, _, sitemap) = get(&site, "/sitemap.xml").await;
    assert_eq!(status, StatusCode::OK);
    assert!(sitemap.contains("<loc>https://blatt.example/2022.html</loc>"));
    assert!(sitemap.contains("<loc>https://blatt.example/zerm/februar.html</loc>"));
    assert!(!sitemap.contains("zukunft"));
}

#[tokio::test]
async fn static_files_and_traversal() {
    let tmp = publication();
    let site = open(tmp.path());

    let (status, headers, body) = get(&site, "/style.css").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[CONTENT_TYPE], "text/css; charset=utf-8");
    assert_eq!(body, "body { margin: 0 }");

    let (status, headers, _) = get(&site, "/2022.pdf").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[CONTENT_TYPE], "application/pdf");

    let (status, _, _) = get(&site, "/nichts.txt").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for path in ["/../articles.csv", "/zerm/../articles.csv", "/authors/..%2Fconfig.toml"] {
        let (status, _, body) = get(&site, path).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{path}");
        assert!(!body.contains("mai-bericht"), "{path}");
    }
}

#[test]
fn invalid_config_is_rejected() {
    let tmp = publication();
    write(tmp.path(), "config.toml", "[site]\nurl = \"https://x.example/\"\n");
    assert!(config::load_config(tmp.path()).is_err());

    write(tmp.path(), "config.toml", "[site]\nnmae = \"typo\"\n");
    assert!(config::load_config(tmp.path()).is_err());
}

#[test]
fn stock_config_parses_to_defaults() {
    let value: toml::Value = toml::from_str(config::stock_config_toml()).unwrap();
    let parsed: SiteConfig = value.try_into().unwrap();
    assert_eq!(parsed, SiteConfig::default());
}

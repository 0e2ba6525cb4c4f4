//! Site configuration module.
//!
//! Handles loading, validating, and merging the optional `config.toml` at the
//! content root. Stock defaults describe the original publication; a config
//! file only needs the keys it wants to change.
//!
//! Where the server listens and which TLS material it uses are not part of
//! this file. They come from command-line flags or `GAZETTE_*` environment
//! variables (see `main.rs`), since they describe the deployment rather than
//! the publication.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [site]
//! name = "ZERM Online"
//! url = "https://zerm.eu"
//! language = "de-de"
//! feed_title = "ZERM Artikel"
//! feed_description = "Alle Artikel der Zeitung zur Erhaltung der Rechte des Menschen."
//! first_year = 2019
//!
//! [content]
//! catalog = "articles.csv"
//! articles_dir = "zerm"
//! authors_dir = "authors"
//!
//! [links]
//! host_marker = "link"
//! path_prefix = "/_link"
//!
//! [refresh]
//! interval_secs = 60
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Publication configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Names, canonical URL and feed metadata.
    pub site: SiteInfo,
    /// Where catalog, article bodies and author bios live.
    pub content: ContentConfig,
    /// When a request is treated as a short link.
    pub links: LinksConfig,
    /// How often the catalog is reloaded.
    pub refresh: RefreshConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site.url.trim().is_empty() {
            return Err(ConfigError::Validation("site.url must not be empty".into()));
        }
        if self.site.url.ends_with('/') {
            return Err(ConfigError::Validation(
                "site.url must not end with '/'".into(),
            ));
        }
        if self.site.first_year > 9999 {
            return Err(ConfigError::Validation(
                "site.first_year must have at most four digits".into(),
            ));
        }
        for (key, value) in [
            ("content.articles_dir", &self.content.articles_dir),
            ("content.authors_dir", &self.content.authors_dir),
        ] {
            if !is_single_segment(value) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a single directory name, got {value:?}"
                )));
            }
        }
        if self.content.catalog.is_empty() || self.content.catalog.contains("..") {
            return Err(ConfigError::Validation(
                "content.catalog must be a path below the content root".into(),
            ));
        }
        if self.links.host_marker.is_empty() {
            return Err(ConfigError::Validation(
                "links.host_marker must not be empty".into(),
            ));
        }
        if !self.links.path_prefix.starts_with('/') || self.links.path_prefix.len() < 2 {
            return Err(ConfigError::Validation(
                "links.path_prefix must start with '/' and name a path".into(),
            ));
        }
        Ok(())
    }

    /// Logical path of the catalog file.
    pub fn catalog_path(&self) -> String {
        format!("/{}", self.content.catalog.trim_start_matches('/'))
    }

    /// URL path prefix under which articles are served, e.g. `/zerm/`.
    pub fn article_prefix(&self) -> String {
        format!("/{}/", self.content.articles_dir)
    }

    /// Logical path of an author's bio fragment.
    pub fn author_path(&self, author: &str) -> String {
        format!("/{}/{author}.html", self.content.authors_dir)
    }
}

fn is_single_segment(value: &str) -> bool {
    !value.is_empty() && !value.contains('/') && !value.contains("..")
}

/// Names, canonical URL and feed metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteInfo {
    /// Site name. The first word is set in the primary logo colour.
    pub name: String,
    /// Canonical absolute base URL, without trailing slash.
    pub url: String,
    /// Feed language tag.
    pub language: String,
    /// RSS channel title.
    pub feed_title: String,
    /// RSS channel description.
    pub feed_description: String,
    /// Earliest edition listed in navigation and the sitemap.
    pub first_year: i32,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            name: "ZERM Online".to_string(),
            url: "https://zerm.eu".to_string(),
            language: "de-de".to_string(),
            feed_title: "ZERM Artikel".to_string(),
            feed_description: "Alle Artikel der Zeitung zur Erhaltung der Rechte des Menschen."
                .to_string(),
            first_year: 2019,
        }
    }
}

/// Content root layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    /// Catalog CSV, relative to the content root.
    pub catalog: String,
    /// Directory of `<slug>.md` bodies; also the URL prefix of article pages.
    pub articles_dir: String,
    /// Directory of `<author>.html` bio fragments.
    pub authors_dir: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            catalog: "articles.csv".to_string(),
            articles_dir: "zerm".to_string(),
            authors_dir: "authors".to_string(),
        }
    }
}

/// Short-link routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinksConfig {
    /// Requests whose `Host` contains this string are short links.
    pub host_marker: String,
    /// Requests whose path starts with this prefix are short links on any host.
    pub path_prefix: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            host_marker: "link".to_string(),
            path_prefix: "/_link".to_string(),
        }
    }
}

/// Catalog reload policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RefreshConfig {
    /// Seconds between reloads. A reload happens on the first request after
    /// the interval has passed.
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default())
        .unwrap_or_else(|_| toml::Value::Table(toml::map::Map::new()))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the content root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# gazette configuration
# =====================
# Place this file at <content root>/config.toml.
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.
#
# Listen address and TLS are set on the command line or via
# GAZETTE_LISTEN, GAZETTE_TLS_CERT and GAZETTE_TLS_KEY.

# ---------------------------------------------------------------------------
# Publication
# ---------------------------------------------------------------------------
[site]
# Site name; the first word is drawn in the primary logo colour.
name = "ZERM Online"

# Canonical absolute URL used in feed, sitemap and short links. No trailing slash.
url = "https://zerm.eu"

# Language tag announced by the RSS feed.
language = "de-de"

# RSS channel title and description.
feed_title = "ZERM Artikel"
feed_description = "Alle Artikel der Zeitung zur Erhaltung der Rechte des Menschen."

# Earliest yearly edition listed in navigation and the sitemap.
first_year = 2019

# ---------------------------------------------------------------------------
# Content root layout
# ---------------------------------------------------------------------------
[content]
# Catalog CSV: publishedAt,slug,title,author,shortID (no header row).
catalog = "articles.csv"

# Article bodies live at <articles_dir>/<slug>.md and are served under /<articles_dir>/.
articles_dir = "zerm"

# Author bio fragments live at <authors_dir>/<author>.html.
authors_dir = "authors"

# ---------------------------------------------------------------------------
# Short links
# ---------------------------------------------------------------------------
[links]
# Any request whose Host header contains this string is a short link.
host_marker = "link"

# Requests under this path prefix are short links on every host.
path_prefix = "/_link"

# ---------------------------------------------------------------------------
# Reloading
# ---------------------------------------------------------------------------
[refresh]
# Seconds between catalog reloads; the render cache is dropped on each reload.
interval_secs = 60
"##
}

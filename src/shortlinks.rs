//! Vanity short links.
//!
//! Every article with a short id gets a redirect `/<short_id>` → canonical
//! article URL, served on the short-link host (or under the short-link path
//! prefix). `/` and `/index` always redirect to the main site.
//!
//! When two articles share a short id the one later in catalog order (the
//! older one) wins. This is a simplification, not a guarantee; `gazette
//! check` lists the resulting table so collisions are easy to spot.

use crate::catalog::Catalog;
use std::collections::BTreeMap;

/// Mapping from short path to absolute URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortLinkTable {
    links: BTreeMap<String, String>,
}

impl ShortLinkTable {
    /// Build the table for `catalog`. `site_url` has no trailing slash.
    pub fn build(catalog: &Catalog, site_url: &str, articles_dir: &str) -> Self {
        let mut links = BTreeMap::new();
        links.insert("/".to_string(), format!("{site_url}/"));
        links.insert("/index".to_string(), format!("{site_url}/index.html"));
        for article in catalog.iter().filter(|a| !a.short_id.is_empty()) {
            links.insert(
                format!("/{}", article.short_id),
                format!("{site_url}/{articles_dir}/{}", article.slug),
            );
        }
        Self { links }
    }

    pub fn resolve(&self, path: &str) -> Option<&str> {
        self.links.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.links.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

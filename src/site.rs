//! Content snapshots and the refresh scheduler.
//!
//! Everything a request reads about the publication lives in one immutable
//! [`ContentSnapshot`]: the catalog, the short-link table derived from it,
//! and the render cache for article bodies. [`Site`] holds the current
//! snapshot behind an `RwLock<Arc<_>>`. A request clones the `Arc` once and
//! keeps using that snapshot even if a reload publishes a newer one halfway
//! through, so no request ever sees a new catalog with an old short-link
//! table, or a new catalog with bodies cached for the old one.
//!
//! ## Reloading
//!
//! Reloads are lazy: [`Site::refresh_if_due`] runs before each request and
//! reloads when the configured interval has passed since the last attempt.
//! The first request to notice claims the refresh by advancing the
//! timestamp, so concurrent requests do not reload in parallel. A failed
//! reload keeps serving the previous snapshot, logs the error, and still
//! counts as an attempt.

use crate::cache::RenderCache;
use crate::catalog::{Catalog, CatalogError};
use crate::config::SiteConfig;
use crate::files::ContentSource;
use crate::shortlinks::ShortLinkTable;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;
use tracing::{error, info};

/// One consistent view of the publication.
#[derive(Debug)]
pub struct ContentSnapshot {
    pub catalog: Catalog,
    pub links: ShortLinkTable,
    pub cache: RenderCache,
    pub loaded_at: DateTime<Utc>,
}

impl ContentSnapshot {
    /// Load the catalog and derive everything else from it. The render cache
    /// starts empty and fills on demand.
    pub fn load(
        config: &SiteConfig,
        files: &dyn ContentSource,
        now: DateTime<Utc>,
    ) -> Result<Self, CatalogError> {
        let catalog = Catalog::load(files, &config.catalog_path(), now)?;
        let links = ShortLinkTable::build(&catalog, &config.site.url, &config.content.articles_dir);
        Ok(Self {
            catalog,
            links,
            cache: RenderCache::new(),
            loaded_at: now,
        })
    }
}

/// The served publication: configuration, content source, and the current
/// snapshot.
pub struct Site {
    config: SiteConfig,
    files: Box<dyn ContentSource>,
    current: RwLock<Arc<ContentSnapshot>>,
    last_refresh: Mutex<Instant>,
}

impl Site {
    /// Load the initial snapshot. Failure here is fatal for the caller: there
    /// is no previous snapshot to fall back on.
    pub fn open(config: SiteConfig, files: Box<dyn ContentSource>) -> Result<Self, CatalogError> {
        let snapshot = ContentSnapshot::load(&config, files.as_ref(), Utc::now())?;
        info!(
            articles = snapshot.catalog.len(),
            short_links = snapshot.links.len(),
            "catalog loaded"
        );
        Ok(Self {
            config,
            files,
            current: RwLock::new(Arc::new(snapshot)),
            last_refresh: Mutex::new(Instant::now()),
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn files(&self) -> &dyn ContentSource {
        self.files.as_ref()
    }

    /// The current snapshot. Hold on to it for the whole request.
    pub fn snapshot(&self) -> Arc<ContentSnapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Reload if the refresh interval has passed. Returns whether a new
    /// snapshot was published.
    pub fn refresh_if_due(&self) -> bool {
        self.refresh_if_due_at(Instant::now(), Utc::now())
    }

    pub fn refresh_if_due_at(&self, instant: Instant, now: DateTime<Utc>) -> bool {
        {
            let mut last = self.last_refresh.lock().unwrap_or_else(|e| e.into_inner());
            if instant.saturating_duration_since(*last) <= self.config.refresh.interval() {
                return false;
            }
            *last = instant;
        }

        match self.reload(now) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "cannot reload catalog, keeping previous snapshot");
                false
            }
        }
    }

    /// Build a fresh snapshot and publish it. On error the current snapshot
    /// stays in place.
    pub fn reload(&self, now: DateTime<Utc>) -> Result<(), CatalogError> {
        let fresh = Arc::new(ContentSnapshot::load(&self.config, self.files(), now)?);
        let articles = fresh.catalog.len();
        let short_links = fresh.links.len();

        let previous = {
            let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *guard, fresh)
        };
        info!(
            articles,
            short_links,
            previous_loaded_at = %previous.loaded_at,
            render_cache = %previous.cache.stats(),
            "catalog reloaded, render cache flushed"
        );
        Ok(())
    }
}

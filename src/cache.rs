//! Render cache for article bodies.
//!
//! Rendering markdown is cheap next to network latency, but the RSS feed and
//! the yearly editions render every article of the catalog on each request.
//! This module memoizes the [`markdown::render`](crate::markdown::render)
//! output so each body is read and converted once per content snapshot.
//!
//! # Design
//!
//! ## Keys
//!
//! Entries are keyed by the logical markdown path, normalized so that
//! `/zerm/slug`, `/zerm/slug.html` and `/zerm/slug.md` all share the entry
//! `/zerm/slug.md` (see [`cache_key`]).
//!
//! ## Invalidation
//!
//! There is none per entry. A cache belongs to one
//! [`ContentSnapshot`](crate::site::ContentSnapshot); a reload builds a new
//! snapshot with an empty cache and the old one is dropped with the last
//! request still holding it. Between reloads the cache may serve bodies that
//! have since changed on disk.
//!
//! ## Failures
//!
//! Read errors propagate to the caller and are not cached, so a missing body
//! that appears later is picked up on the next request.

use crate::files::{ContentSource, FileError};
use crate::markdown;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Normalize a logical article path to the markdown source path.
pub fn cache_key(path: &str) -> String {
    let path = path.strip_suffix(".html").unwrap_or(path);
    if path.ends_with(".md") {
        path.to_string()
    } else {
        format!("{path}.md")
    }
}

/// Summary of cache behaviour over the lifetime of one snapshot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} rendered ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} rendered", self.misses)
        }
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, Arc<str>>,
    stats: CacheStats,
}

/// Memo table from markdown path to rendered HTML.
#[derive(Debug, Default)]
pub struct RenderCache {
    state: Mutex<CacheState>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    // The table only ever holds complete entries, so a poisoned lock is
    // still safe to use.
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Rendered HTML for the article at `path`, reading and rendering it on
    /// a miss. The lock is not held while reading or rendering.
    pub fn get(&self, files: &dyn ContentSource, path: &str) -> Result<Arc<str>, FileError> {
        let key = cache_key(path);
        {
            let mut state = self.lock();
            if let Some(html) = state.entries.get(&key).cloned() {
                state.stats.hit();
                debug!(path = %key, "render cache hit");
                return Ok(html);
            }
        }

        let source = files.read(&key)?;
        let html: Arc<str> = markdown::render(&source).into();

        let mut state = self.lock();
        state.stats.miss();
        debug!(path = %key, "render cache miss");
        let entry = state.entries.entry(key).or_insert(html);
        Ok(Arc::clone(entry))
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }
}

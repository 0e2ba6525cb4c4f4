//! Shared test utilities for the gazette test suite.
//!
//! Provides the sample publication under `fixtures/content/`, an article
//! builder, and [`RecordingSource`], an in-memory [`ContentSource`] that
//! records every call so tests can assert which files were touched.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let site = fixture_site(tmp.path());
//! let snapshot = site.snapshot();
//! assert_eq!(snapshot.catalog.len(), FIXTURE_PUBLISHED);
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

use crate::catalog::{Article, Published};
use crate::config::SiteConfig;
use crate::files::{ContentSource, FileError, SafeFiles, check_path};
use crate::site::Site;

/// Articles in `fixtures/content/articles.csv` that are not scheduled for
/// the future.
pub const FIXTURE_PUBLISHED: usize = 4;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/content/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/content");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// A loaded [`Site`] over a fixture copy with stock configuration.
pub fn fixture_site(root: &Path) -> Site {
    Site::open(SiteConfig::default(), Box::new(SafeFiles::new(root))).unwrap()
}

// =========================================================================
// Builders
// =========================================================================

/// An article by `anna` titled after its slug.
pub fn article(slug: &str, published: &str, short_id: &str) -> Article {
    Article {
        author: "anna".to_string(),
        slug: slug.to_string(),
        title: slug.replace('-', " "),
        short_id: short_id.to_string(),
        published: Published::parse(published).unwrap(),
    }
}

// =========================================================================
// Recording content source
// =========================================================================

/// In-memory [`ContentSource`] that records reads.
///
/// Uses Mutex (not RefCell) so it is Sync, as the trait requires.
#[derive(Default)]
pub struct RecordingSource {
    files: HashMap<String, Vec<u8>>,
    reads: Mutex<Vec<String>>,
    probes: Mutex<Vec<String>>,
}

impl RecordingSource {
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(p, c)| (p.to_string(), c.as_bytes().to_vec()))
                .collect(),
            ..Default::default()
        }
    }

    /// Paths passed to `read`, in call order.
    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }

    /// Paths passed to `exists`, in call order.
    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }
}

impl ContentSource for RecordingSource {
    fn read(&self, path: &str) -> Result<Vec<u8>, FileError> {
        check_path(path)?;
        self.reads.lock().unwrap().push(path.to_string());
        self.files.get(path).cloned().ok_or_else(|| FileError::Io {
            path: path.to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.probes.lock().unwrap().push(path.to_string());
        check_path(path).is_ok() && self.files.contains_key(path)
    }
}

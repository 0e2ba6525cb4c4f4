//! Sandboxed, read-only access to the content root.
//!
//! Every byte the server sends, apart from generated markup, comes through
//! a [`ContentSource`]. The production implementation is [`SafeFiles`],
//! which resolves logical paths (`/zerm/some-article.md`) against the
//! configured root directory.
//!
//! ## Path safety
//!
//! Any logical path containing `..` is refused with
//! [`FileError::PathTraversal`] before the filesystem is touched. This is a
//! substring heuristic, not canonical path resolution: symlinks inside the
//! root that point outside of it are still followed. Leading slashes are
//! stripped before joining so an absolute-looking path can never replace
//! the root.
//!
//! ## Reads
//!
//! A read opens the file, stats it, and reads exactly the reported size.
//! Fewer bytes than announced is an error ([`FileError::ShortRead`]) rather
//! than a silently truncated response.

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("refusing path containing \"..\": {0}")]
    PathTraversal(String),
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("not a regular file: {0}")]
    NotAFile(String),
    #[error("short read on {path}: expected {expected} bytes, got {read}")]
    ShortRead {
        path: String,
        expected: u64,
        read: u64,
    },
}

impl FileError {
    /// True when the request was refused before any I/O happened.
    pub fn is_traversal(&self) -> bool {
        matches!(self, FileError::PathTraversal(_))
    }
}

/// Read-only access to logical paths below some content root.
///
/// Views and the render cache only ever see this trait, which keeps them
/// testable against recording doubles.
pub trait ContentSource: Send + Sync {
    /// Read the full contents of `path`.
    fn read(&self, path: &str) -> Result<Vec<u8>, FileError>;

    /// Whether `path` names a readable regular file. Refused paths are
    /// reported as absent.
    fn exists(&self, path: &str) -> bool;
}

/// Reject logical paths that could climb out of the root.
pub fn check_path(path: &str) -> Result<(), FileError> {
    if path.contains("..") {
        warn!(path, "refusing to read path containing \"..\"");
        return Err(FileError::PathTraversal(path.to_string()));
    }
    Ok(())
}

/// Filesystem-backed [`ContentSource`] rooted at a directory.
#[derive(Debug)]
pub struct SafeFiles {
    root: PathBuf,
    io_ops: AtomicU64,
}

impl SafeFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            io_ops: AtomicU64::new(0),
        }
    }

    /// Number of filesystem operations (open, stat) performed so far.
    pub fn io_operations(&self) -> u64 {
        self.io_ops.load(Ordering::Relaxed)
    }

    /// Map a logical path onto the root. Callers must run [`check_path`]
    /// first.
    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    fn count_io(&self) {
        self.io_ops.fetch_add(1, Ordering::Relaxed);
    }
}

impl ContentSource for SafeFiles {
    fn read(&self, path: &str) -> Result<Vec<u8>, FileError> {
        check_path(path)?;
        let full = self.resolve(path);
        let io_err = |source| FileError::Io {
            path: path.to_string(),
            source,
        };

        self.count_io();
        let file = File::open(&full).map_err(|e| {
            warn!(path, error = %e, "cannot open file");
            io_err(e)
        })?;

        self.count_io();
        let meta = file.metadata().map_err(io_err)?;
        if !meta.is_file() {
            return Err(FileError::NotAFile(path.to_string()));
        }

        let expected = meta.len();
        let mut buf = Vec::with_capacity(expected as usize);
        file.take(expected).read_to_end(&mut buf).map_err(io_err)?;
        if (buf.len() as u64) < expected {
            return Err(FileError::ShortRead {
                path: path.to_string(),
                expected,
                read: buf.len() as u64,
            });
        }
        Ok(buf)
    }

    fn exists(&self, path: &str) -> bool {
        if check_path(path).is_err() {
            return false;
        }
        self.count_io();
        std::fs::metadata(self.resolve(path)).is_ok_and(|m| m.is_file())
    }
}

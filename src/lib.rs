//! # Gazette
//!
//! A small server for a chronological publication kept in flat files.
//! Articles are grouped into yearly editions; the catalog is a CSV file,
//! article bodies are markdown, and author bios are HTML fragments.
//!
//! # Architecture: Snapshot, Route, Render
//!
//! ```text
//! content/ ──load──▶ ContentSnapshot ──route──▶ view ──▶ Response
//!            (catalog, short links,      (ordered     (maud / xml /
//!             empty render cache)          table)       raw file)
//! ```
//!
//! Every request takes the current [`site::ContentSnapshot`], classifies
//! itself against the route table in [`router`], and hands the snapshot to
//! one view in [`views`]. The snapshot is replaced wholesale when the catalog
//! is reloaded, taking its render cache with it, so cached bodies can never
//! outlive the catalog they were rendered for.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`files`] | Sandboxed reads below the content root, rejecting `..` before any I/O |
//! | [`markdown`] | Quote and footnote shorthand around a CommonMark conversion |
//! | [`catalog`] | CSV catalog loading, timestamp parsing, newest-first ordering |
//! | [`shortlinks`] | Short path → canonical URL table derived from the catalog |
//! | [`cache`] | Render cache for article bodies, keyed by logical path |
//! | [`site`] | Current snapshot and the lazy refresh scheduler |
//! | [`router`] | Ordered `(predicate, view)` table, transport independent |
//! | [`views`] | Index, article, yearly edition, RSS, sitemap, redirect, static file |
//! | [`server`] | axum transport, access logging, optional TLS |
//! | [`config`] | Optional `config.toml` loading, merging onto stock defaults, validation |
//! | [`output`] | Console report for the `check` command |
//!
//! # Design Decisions
//!
//! ## Lazy Reloading
//!
//! There is no file watcher. The first request after the refresh interval
//! reloads the catalog before it is served; everyone else keeps using the
//! snapshot they already hold. A broken catalog edit is logged and ignored
//! until the next interval, so the site stays up with the previous content.
//!
//! ## Scheduled Publishing
//!
//! Catalog rows dated in the future are dropped at load time. They appear on
//! the first reload after their timestamp passes, with no other action needed.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/). Catalog values are
//! escaped on interpolation; only rendered markdown and author fragments,
//! which come from the content root, are inserted verbatim.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod files;
pub mod markdown;
pub mod output;
pub mod router;
pub mod server;
pub mod shortlinks;
pub mod site;
pub mod views;

#[cfg(test)]
pub(crate) mod test_helpers;

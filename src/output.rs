//! CLI output formatting for the `check` command.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Each article is shown
//! by its position in the catalog and its title, with the files it depends on
//! as indented context lines. Missing files are flagged in place so the
//! listing doubles as a content audit.
//!
//! # Output Format
//!
//! ```text
//! Articles (4 published)
//! 001 Ins neue Jahr
//!     Published: 01.01.2025 00:05 CET
//!     Source: zerm/neues-jahr.md
//!     Author: authors/bernd.html
//!     Short link: /neu
//! 002 Sommerpause
//!     Published: 01.07.2024 09:00 CEST
//!     Source: zerm/sommerpause.md (missing)
//!     Author: authors/anna.html
//!
//! Editions
//!     2025: 1 article
//!     2024: 1 article
//!
//! Short links
//!     / → https://zerm.eu/
//!     /neu → https://zerm.eu/zerm/neues-jahr
//! ```
//!
//! # Architecture
//!
//! [`CheckReport::build`] does the file probing; [`format_check_output`]
//! is pure and returns lines for testability; [`print_check_output`] writes
//! them to stdout. The report also serializes to JSON for `check --json`.

use crate::catalog::Article;
use crate::config::SiteConfig;
use crate::files::ContentSource;
use crate::site::ContentSnapshot;
use serde::Serialize;
use std::collections::BTreeMap;

/// One catalog entry plus the state of the files it needs.
#[derive(Debug, Serialize)]
pub struct ArticleCheck {
    #[serde(flatten)]
    pub article: Article,
    pub body_path: String,
    pub body_found: bool,
    pub bio_path: String,
    pub bio_found: bool,
}

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub articles: Vec<ArticleCheck>,
    /// Year → number of published articles, newest year first.
    pub editions: Vec<(i32, usize)>,
    pub short_links: BTreeMap<String, String>,
}

impl CheckReport {
    pub fn build(config: &SiteConfig, snapshot: &ContentSnapshot, files: &dyn ContentSource) -> Self {
        let articles = snapshot
            .catalog
            .iter()
            .map(|article| {
                let body_path = format!("{}{}.md", config.article_prefix(), article.slug);
                let bio_path = config.author_path(&article.author);
                ArticleCheck {
                    article: article.clone(),
                    body_found: files.exists(&body_path),
                    body_path,
                    bio_found: files.exists(&bio_path),
                    bio_path,
                }
            })
            .collect();

        let mut editions: Vec<(i32, usize)> = Vec::new();
        for article in &snapshot.catalog {
            let year = article.published.year();
            match editions.last_mut() {
                Some((last, count)) if *last == year => *count += 1,
                _ => editions.push((year, 1)),
            }
        }

        let short_links = snapshot
            .links
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();

        Self {
            articles,
            editions,
            short_links,
        }
    }

    /// Files referenced by the catalog that do not exist.
    pub fn missing_files(&self) -> usize {
        self.articles
            .iter()
            .map(|a| usize::from(!a.body_found) + usize::from(!a.bio_found))
            .sum()
    }
}

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn source_line(label: &str, path: &str, found: bool) -> String {
    let shown = path.trim_start_matches('/');
    if found {
        format!("{}{}: {}", indent(1), label, shown)
    } else {
        format!("{}{}: {} (missing)", indent(1), label, shown)
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

pub fn format_check_output(report: &CheckReport) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push(format!("Articles ({} published)", report.articles.len()));
    for (i, check) in report.articles.iter().enumerate() {
        let article = &check.article;
        lines.push(format!("{} {}", format_index(i + 1), article.title));
        lines.push(format!(
            "{}Published: {}",
            indent(1),
            article.published.stamp_label()
        ));
        lines.push(source_line("Source", &check.body_path, check.body_found));
        lines.push(source_line("Author", &check.bio_path, check.bio_found));
        if !article.short_id.is_empty() {
            lines.push(format!("{}Short link: /{}", indent(1), article.short_id));
        }
    }

    if !report.editions.is_empty() {
        lines.push(String::new());
        lines.push("Editions".to_string());
        for (year, count) in &report.editions {
            lines.push(format!("{}{}: {}", indent(1), year, plural(*count, "article")));
        }
    }

    lines.push(String::new());
    lines.push("Short links".to_string());
    for (from, to) in &report.short_links {
        lines.push(format!("{}{} → {}", indent(1), from, to));
    }

    lines
}

pub fn print_check_output(report: &CheckReport) {
    for line in format_check_output(report) {
        println!("{}", line);
    }
}

//! The article catalog.
//!
//! `articles.csv` is the single source of truth for what is published. Each
//! row has five columns and no header:
//!
//! ```text
//! publishedAt,slug,title,author,shortID
//! 24.12.2023 18:00:00 CET,weihnachten,Frohe Weihnachten,anna,xmas
//! ```
//!
//! Loading is all-or-nothing: a single unparseable timestamp (or a row with
//! too few columns) fails the whole load, so a half-edited catalog never
//! replaces a good one. Rows dated after the load time are dropped, which is
//! how articles are scheduled. The remaining rows are sorted newest first;
//! rows with equal timestamps keep their file order.

use crate::files::{ContentSource, FileError};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

const DATETIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";
const COLUMNS: usize = 5;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("cannot read catalog: {0}")]
    Read(#[from] FileError),
    #[error("malformed catalog CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("catalog row {row}: expected {COLUMNS} columns, found {found}")]
    MissingColumns { row: usize, found: usize },
    #[error("catalog row {row}: cannot parse timestamp {value:?}: {source}")]
    Timestamp {
        row: usize,
        value: String,
        #[source]
        source: TimestampError,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimestampError {
    #[error("missing time zone")]
    MissingZone,
    #[error("unknown time zone {0:?}")]
    UnknownZone(String),
    #[error("{0}")]
    Format(#[from] chrono::ParseError),
}

/// A publication time as written in the catalog: the instant plus the zone
/// abbreviation it was written in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Published {
    pub at: DateTime<FixedOffset>,
    pub zone: String,
}

impl Published {
    /// Parse `DD.MM.YYYY HH:MM:SS TZ`.
    pub fn parse(value: &str) -> Result<Self, TimestampError> {
        let (datetime, zone) = value
            .trim()
            .rsplit_once(' ')
            .ok_or(TimestampError::MissingZone)?;
        let naive = NaiveDateTime::parse_from_str(datetime.trim_end(), DATETIME_FORMAT)?;
        let offset =
            zone_offset(zone).ok_or_else(|| TimestampError::UnknownZone(zone.to_string()))?;
        let at = offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| TimestampError::UnknownZone(zone.to_string()))?;
        Ok(Self {
            at,
            zone: zone.to_string(),
        })
    }

    pub fn year(&self) -> i32 {
        self.at.year()
    }

    /// `DD.MM.YYYY`, as listed on the index.
    pub fn date_label(&self) -> String {
        self.at.format("%d.%m.%Y").to_string()
    }

    /// `DD.MM.YYYY HH:MM TZ`, as stamped under archive entries.
    pub fn stamp_label(&self) -> String {
        format!("{} {}", self.at.format("%d.%m.%Y %H:%M"), self.zone)
    }

    /// RFC 1123 style with a numeric offset, for RSS `pubDate`.
    pub fn rfc1123(&self) -> String {
        self.at.format("%a, %-d %b %Y %H:%M:%S %z").to_string()
    }
}

impl fmt::Display for Published {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.at.format(DATETIME_FORMAT), self.zone)
    }
}

/// Fixed offset for a zone abbreviation.
///
/// Well-known European abbreviations map to their offsets. Any other token of
/// three to five ASCII letters is taken as UTC, which is what the catalog's
/// original tooling did with abbreviations it did not recognise.
fn zone_offset(zone: &str) -> Option<FixedOffset> {
    let hours = match zone {
        "UTC" | "GMT" | "Z" | "WET" => 0,
        "WEST" | "CET" | "MEZ" | "BST" => 1,
        "CEST" | "MESZ" | "EET" => 2,
        "EEST" => 3,
        other
            if (3..=5).contains(&other.len())
                && other.bytes().all(|b| b.is_ascii_alphabetic()) =>
        {
            0
        }
        _ => return None,
    };
    FixedOffset::east_opt(hours * 3600)
}

/// One published piece.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    pub author: String,
    pub slug: String,
    pub title: String,
    pub short_id: String,
    pub published: Published,
}

/// Ordered, time-filtered snapshot of all articles. Immutable once loaded.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    articles: Vec<Article>,
}

impl Catalog {
    /// Read and parse the catalog at `path` through the content source.
    pub fn load(
        files: &dyn ContentSource,
        path: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, CatalogError> {
        let bytes = files.read(path)?;
        Self::from_csv(&bytes, now)
    }

    /// Parse catalog CSV, dropping rows published after `now`.
    pub fn from_csv(bytes: &[u8], now: DateTime<Utc>) -> Result<Self, CatalogError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);

        let mut articles = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            let row = idx + 1;
            if record.len() < COLUMNS {
                return Err(CatalogError::MissingColumns {
                    row,
                    found: record.len(),
                });
            }
            let published =
                Published::parse(&record[0]).map_err(|source| CatalogError::Timestamp {
                    row,
                    value: record[0].to_string(),
                    source,
                })?;
            if published.at > now {
                continue;
            }
            articles.push(Article {
                slug: record[1].to_string(),
                title: record[2].to_string(),
                author: record[3].to_string(),
                short_id: record[4].to_string(),
                published,
            });
        }

        // Stable: equal timestamps keep file order.
        articles.sort_by(|a, b| b.published.at.cmp(&a.published.at));
        Ok(Self { articles })
    }

    pub fn from_articles(mut articles: Vec<Article>) -> Self {
        articles.sort_by(|a, b| b.published.at.cmp(&a.published.at));
        Self { articles }
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Article> {
        self.articles.iter()
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// First (newest) article with this slug.
    pub fn find_by_slug(&self, slug: &str) -> Option<&Article> {
        self.articles.iter().find(|a| a.slug == slug)
    }

    /// Articles of one edition, newest first.
    pub fn in_year(&self, year: i32) -> impl Iterator<Item = &Article> {
        self.articles
            .iter()
            .filter(move |a| a.published.year() == year)
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Article;
    type IntoIter = std::slice::Iter<'a, Article>;

    fn into_iter(self) -> Self::IntoIter {
        self.articles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn slugs(catalog: &Catalog) -> Vec<&str> {
        catalog.iter().map(|a| a.slug.as_str()).collect()
    }

    // =========================================================================
    // Timestamps
    // =========================================================================

    #[test]
    fn parses_cet_timestamp() {
        let p = Published::parse("24.12.2023 18:00:00 CET").unwrap();
        assert_eq!(p.at.offset().local_minus_utc(), 3600);
        assert_eq!(p.at.to_rfc3339(), "2023-12-24T18:00:00+01:00");
        assert_eq!(p.zone, "CET");
    }

    #[test]
    fn parses_summer_time() {
        let p = Published::parse("01.07.2022 09:30:15 CEST").unwrap();
        assert_eq!(p.at.offset().local_minus_utc(), 7200);
    }

    #[test]
    fn parses_british_summer_time() {
        let p = Published::parse("01.07.2024 09:00:00 BST").unwrap();
        assert_eq!(p.at.offset().local_minus_utc(), 3600);
        assert_eq!(p.stamp_label(), "01.07.2024 09:00 BST");
    }

    #[test]
    fn unknown_letter_zone_is_utc() {
        let p = Published::parse("01.01.2021 00:00:00 XYZ").unwrap();
        assert_eq!(p.at.offset().local_minus_utc(), 0);
        assert_eq!(p.zone, "XYZ");
    }

    #[test]
    fn rejects_malformed_timestamps() {
        assert!(Published::parse("2021-01-01 00:00:00 UTC").is_err());
        assert!(Published::parse("01.01.2021 00:00:00").is_err());
        assert!(Published::parse("01.01.2021 00:00:00 +0100").is_err());
        assert!(Published::parse("32.01.2021 00:00:00 UTC").is_err());
        assert_eq!(Published::parse(""), Err(TimestampError::MissingZone));
    }

    #[test]
    fn display_formats() {
        let p = Published::parse("02.03.2021 04:05:06 CET").unwrap();
        assert_eq!(p.date_label(), "02.03.2021");
        assert_eq!(p.stamp_label(), "02.03.2021 04:05 CET");
        assert_eq!(p.rfc1123(), "Tue, 2 Mar 2021 04:05:06 +0100");
        assert_eq!(p.to_string(), "02.03.2021 04:05:06 CET");
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn copies_fields_verbatim() {
        let csv = "01.02.2021 10:00:00 UTC,my-slug,\"Title, with comma\",anna,abc\n";
        let catalog = Catalog::from_csv(csv.as_bytes(), now()).unwrap();
        let a = &catalog.articles()[0];
        assert_eq!(a.slug, "my-slug");
        assert_eq!(a.title, "Title, with comma");
        assert_eq!(a.author, "anna");
        assert_eq!(a.short_id, "abc");
        assert_eq!(a.published.year(), 2021);
    }

    #[test]
    fn future_rows_are_dropped() {
        let csv = "\
01.01.2025 00:00:00 UTC,past,P,a,p
01.06.2025 12:00:00 UTC,exactly-now,N,a,n
01.06.2025 12:00:01 UTC,future,F,a,f
";
        let catalog = Catalog::from_csv(csv.as_bytes(), now()).unwrap();
        assert_eq!(slugs(&catalog), vec!["exactly-now", "past"]);
        assert!(catalog.iter().all(|a| a.published.at <= now()));
    }

    #[test]
    fn sorted_newest_first_with_stable_ties() {
        let csv = "\
01.01.2020 00:00:00 UTC,old,O,a,
05.05.2022 12:00:00 UTC,tie-first,T1,a,
05.05.2022 13:00:00 CET,tie-second,T2,a,
03.03.2021 00:00:00 UTC,middle,M,a,
";
        let catalog = Catalog::from_csv(csv.as_bytes(), now()).unwrap();
        assert_eq!(
            slugs(&catalog),
            vec!["tie-first", "tie-second", "middle", "old"]
        );
        for pair in catalog.articles().windows(2) {
            assert!(pair[0].published.at >= pair[1].published.at);
        }
    }

    #[test]
    fn one_bad_timestamp_fails_whole_load() {
        let csv = "\
01.01.2020 00:00:00 UTC,good,G,a,g
not a date,bad,B,a,b
";
        let err = Catalog::from_csv(csv.as_bytes(), now()).unwrap_err();
        match err {
            CatalogError::Timestamp { row, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(value, "not a date");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn short_rows_fail_the_load() {
        let csv = "01.01.2020 00:00:00 UTC,slug,title\n";
        assert!(matches!(
            Catalog::from_csv(csv.as_bytes(), now()),
            Err(CatalogError::MissingColumns { row: 1, found: 3 })
        ));
    }

    #[test]
    fn empty_catalog_is_valid() {
        let catalog = Catalog::from_csv(b"", now()).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn loads_fixture_catalog() {
        let tmp = setup_fixtures();
        let files = crate::files::SafeFiles::new(tmp.path());
        let catalog = Catalog::load(&files, "/articles.csv", Utc::now()).unwrap();
        assert!(catalog.find_by_slug("scheduled").is_none());
        assert_eq!(catalog.len(), FIXTURE_PUBLISHED);
        assert_eq!(catalog.articles()[0].slug, "neues-jahr");
    }

    #[test]
    fn missing_catalog_is_read_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let files = crate::files::SafeFiles::new(tmp.path());
        assert!(matches!(
            Catalog::load(&files, "/articles.csv", now()),
            Err(CatalogError::Read(_))
        ));
    }

    // =========================================================================
    // Queries
    // =========================================================================

    #[test]
    fn year_filter_and_slug_lookup() {
        let csv = "\
01.01.2021 00:00:00 UTC,a,A,x,
01.06.2020 00:00:00 UTC,b,B,x,
31.12.2020 23:30:00 UTC,c,C,x,
";
        let catalog = Catalog::from_csv(csv.as_bytes(), now()).unwrap();
        let in_2020: Vec<_> = catalog.in_year(2020).map(|a| a.slug.as_str()).collect();
        assert_eq!(in_2020, vec!["c", "b"]);
        assert_eq!(catalog.find_by_slug("b").unwrap().title, "B");
        assert!(catalog.find_by_slug("zzz").is_none());
    }

    #[test]
    fn year_follows_written_zone() {
        // 00:30 CET on New Year is still the old year in UTC.
        let csv = "01.01.2021 00:30:00 CET,nye,N,x,\n";
        let catalog = Catalog::from_csv(csv.as_bytes(), now()).unwrap();
        assert_eq!(catalog.in_year(2021).count(), 1);
    }
}

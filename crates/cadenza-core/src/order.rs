//! Display ordering for search hits.
//!
//! Scans return hits in catalog order. Front ends usually want them grouped
//! by album or by artist instead, with leading articles ignored so that
//! "The Beatles" files under B.

use crate::catalog::Catalog;
use crate::types::{parse_int_or, CatalogRecord, Field, SearchHits};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static LEADING_JUNK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^(the\s+|a\s+|an\s+|les?\s+|las?\s+|"|'|\.+\s*)"#).expect("valid junk pattern")
});

/// Numeric fields sort with this value when unparseable.
const SORT_FALLBACK: i64 = 1;

/// How to order hits for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Album,
    Artist,
    /// Keep catalog order
    None,
}

impl SortBy {
    /// Field precedence for this ordering.
    pub fn keys(self) -> &'static [Field] {
        match self {
            SortBy::Album => &[
                Field::Album,
                Field::Artist,
                Field::Year,
                Field::Disc,
                Field::Track,
                Field::Name,
                Field::Pathname,
            ],
            SortBy::Artist => &[
                Field::Artist,
                Field::Year,
                Field::Album,
                Field::Disc,
                Field::Track,
                Field::Name,
                Field::Pathname,
            ],
            SortBy::None => &[],
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortBy::Album => "album",
            SortBy::Artist => "artist",
            SortBy::None => "none",
        })
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "album" => Ok(SortBy::Album),
            "artist" => Ok(SortBy::Artist),
            "none" | "catalog" => Ok(SortBy::None),
            other => Err(format!("unknown sort order '{}'", other)),
        }
    }
}

/// Strip a leading article, quote, or run of dots.
pub fn strip_leading_junk(title: &str) -> &str {
    match LEADING_JUNK.find(title) {
        Some(m) => &title[m.end()..],
        None => title,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum KeyPart {
    Number(i64),
    Text(String),
}

fn sort_key(record: &CatalogRecord, keys: &[Field]) -> Vec<KeyPart> {
    keys.iter()
        .map(|&field| {
            if field.is_numeric() {
                KeyPart::Number(parse_int_or(record.get(field), SORT_FALLBACK))
            } else {
                KeyPart::Text(strip_leading_junk(record.normalized(field)).to_string())
            }
        })
        .collect()
}

/// Reorder `hits` for display. Stable; indices missing from the catalog
/// sort last.
pub fn sort_hits(catalog: &Catalog, hits: &mut SearchHits, sort_by: SortBy) {
    let keys = sort_by.keys();
    if keys.is_empty() {
        return;
    }

    hits.sort_by_cached_key(|&i| match catalog.get(i) {
        Some(record) => (false, sort_key(record, keys)),
        None => (true, Vec::new()),
    });
}

/// Order `hits` for display, then keep at most `limit` of them.
///
/// The cap applies after sorting so the rows kept are the first ones in
/// display order, not the first ones the scan found.
pub fn arrange_hits(catalog: &Catalog, hits: &mut SearchHits, sort_by: SortBy, limit: Option<usize>) {
    sort_hits(catalog, hits, sort_by);
    if let Some(limit) = limit {
        hits.truncate(limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_tsv(
            "The Beatles/Abbey Road/1-02 Something.mp3\tAbbey Road\tThe Beatles\tSomething\t1\t2\t1969\n\
             ABBA/Arrival/1-01 When I Kissed the Teacher.mp3\tArrival\tABBA\tWhen I Kissed the Teacher\t1\t1\t1976\n\
             The Beatles/Abbey Road/1-01 Come Together.mp3\tAbbey Road\tThe Beatles\tCome Together\t1\t1\t1969\n\
             Björk/Debut/1-10 Come to Me.mp3\tDebut\tBjörk\tCome to Me\t1\t10\t1993\n\
             Björk/Debut/1-02 Human Behaviour.mp3\tDebut\tBjörk\tHuman Behaviour\t1\t2\t1993\n",
        )
    }

    #[test]
    fn test_strip_leading_junk() {
        assert_eq!(strip_leading_junk("the beatles"), "beatles");
        assert_eq!(strip_leading_junk("The  Who"), "Who");
        assert_eq!(strip_leading_junk("les negresses vertes"), "negresses vertes");
        assert_eq!(strip_leading_junk("...and you will know us"), "and you will know us");
        assert_eq!(strip_leading_junk("'til tuesday"), "til tuesday");
        assert_eq!(strip_leading_junk("theatre"), "theatre");
        assert_eq!(strip_leading_junk("abba"), "abba");
    }

    #[test]
    fn test_sort_by_album() {
        let catalog = catalog();
        let mut hits = catalog.all_hits();
        sort_hits(&catalog, &mut hits, SortBy::Album);
        // abbey road, arrival, debut; tracks numerically within an album
        assert_eq!(hits, vec![2, 0, 1, 4, 3]);
    }

    #[test]
    fn test_sort_by_artist() {
        let catalog = catalog();
        let mut hits = catalog.all_hits();
        sort_hits(&catalog, &mut hits, SortBy::Artist);
        // abba, beatles, bjork
        assert_eq!(hits, vec![1, 2, 0, 4, 3]);
    }

    #[test]
    fn test_sort_none_keeps_order() {
        let catalog = catalog();
        let mut hits = vec![3, 0, 2];
        sort_hits(&catalog, &mut hits, SortBy::None);
        assert_eq!(hits, vec![3, 0, 2]);
    }

    #[test]
    fn test_out_of_range_hits_sort_last() {
        let catalog = catalog();
        let mut hits = vec![99, 1, 0];
        sort_hits(&catalog, &mut hits, SortBy::Artist);
        assert_eq!(hits, vec![1, 0, 99]);
    }

    #[test]
    fn test_arrange_caps_after_sorting() {
        let catalog = Catalog::from_tsv(
            "Z/Zed/01 Last.mp3\tZed\tZ\n\
             a/Alpha/01 First.mp3\tAlpha\ta\n",
        );
        let mut hits = catalog.all_hits();
        arrange_hits(&catalog, &mut hits, SortBy::Album, Some(1));
        assert_eq!(hits, vec![1]);

        let mut hits = catalog.all_hits();
        arrange_hits(&catalog, &mut hits, SortBy::None, None);
        assert_eq!(hits, vec![0, 1]);
    }

    #[test]
    fn test_parse_sort_by() {
        assert_eq!("Artist".parse::<SortBy>(), Ok(SortBy::Artist));
        assert!("genre".parse::<SortBy>().is_err());
    }
}

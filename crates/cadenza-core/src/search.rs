//! Query front door and catalog scan.
//!
//! Two query dialects compile to the same [`SearchQuery`]:
//!
//! - **Terms** (default): `artist:prince -live "purple rain" after:1980`
//! - **Expression**: `(and (artist ^prince) (not live))`
//!
//! With [`Dialect::Auto`] a query whose first non-blank character is `(` is
//! read as an expression; anything else as terms.
//!
//! ## Performance
//!
//! A scan is a linear filter over the catalog. Above the parallel threshold
//! the filter runs on the Rayon pool; results keep catalog order either way.

use crate::error::{CadenzaError, Result};
use crate::expr::{parse_expression, Evaluator, ExpressionMatcher, DEFAULT_RECENT_MONTHS};
use crate::matcher::TermMatcher;
use crate::normalize::NormalizeCache;
use crate::terms::build_terms;
use crate::tokenizer::tokenize;
use crate::types::{CatalogRecord, SearchHits};
use chrono::Utc;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Catalog size above which scans run in parallel.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 10_000;

/// Trait for record matching strategies.
pub trait Matcher: Send + Sync {
    /// Check if a record matches.
    fn matches(&self, record: &CatalogRecord) -> bool;

    /// Whether this matcher accepts every record.
    fn matches_all(&self) -> bool {
        false
    }

    /// Human-readable form of the compiled query.
    fn describe(&self) -> String;
}

/// Which query language to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Terms,
    Expression,
    #[default]
    Auto,
}

impl Dialect {
    /// Resolve `Auto` for a concrete query.
    pub fn resolve(self, query: &str) -> Dialect {
        match self {
            Dialect::Auto if query.trim_start().starts_with('(') => Dialect::Expression,
            Dialect::Auto => Dialect::Terms,
            other => other,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dialect::Terms => "terms",
            Dialect::Expression => "expression",
            Dialect::Auto => "auto",
        })
    }
}

impl FromStr for Dialect {
    type Err = CadenzaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "terms" | "term" => Ok(Dialect::Terms),
            "expression" | "expr" | "sexp" => Ok(Dialect::Expression),
            "auto" => Ok(Dialect::Auto),
            other => Err(CadenzaError::ConfigError {
                reason: format!("unknown query dialect '{}'", other),
            }),
        }
    }
}

/// A compiled search query ready for matching.
///
/// Queries are compiled once and can be shared across threads.
#[derive(Clone)]
pub struct SearchQuery {
    matcher: Arc<dyn Matcher>,
}

impl fmt::Debug for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchQuery")
            .field("matcher", &self.matcher.describe())
            .finish()
    }
}

impl SearchQuery {
    /// Wrap a custom matcher.
    pub fn from_matcher(matcher: impl Matcher + 'static) -> Self {
        SearchQuery {
            matcher: Arc::new(matcher),
        }
    }

    /// Compile a term-dialect query.
    pub fn terms(query: &str) -> Self {
        QueryParser::new(Dialect::Terms).parse(query)
    }

    /// Compile an expression-dialect query.
    pub fn expression(query: &str) -> Self {
        QueryParser::new(Dialect::Expression).parse(query)
    }

    /// Check if a record matches this query.
    pub fn matches(&self, record: &CatalogRecord) -> bool {
        self.matcher.matches(record)
    }

    /// Whether every record matches (empty query).
    pub fn matches_all(&self) -> bool {
        self.matcher.matches_all()
    }

    /// Describe the compiled query.
    pub fn explain(&self) -> String {
        self.matcher.describe()
    }
}

/// Compiles raw query strings, keeping a normalization memo across queries.
///
/// Interactive search re-parses the query on every keystroke, so one parser
/// is kept per session.
#[derive(Debug)]
pub struct QueryParser {
    dialect: Dialect,
    recent_months: u32,
    cache: NormalizeCache,
}

impl Default for QueryParser {
    fn default() -> Self {
        QueryParser::new(Dialect::Auto)
    }
}

impl QueryParser {
    pub fn new(dialect: Dialect) -> Self {
        QueryParser {
            dialect,
            recent_months: DEFAULT_RECENT_MONTHS,
            cache: NormalizeCache::new(),
        }
    }

    /// Set the width of the expression dialect's `recent` window.
    pub fn with_recent_months(mut self, months: u32) -> Self {
        self.recent_months = months;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Compile `input` with this parser's dialect.
    pub fn parse(&self, input: &str) -> SearchQuery {
        self.parse_as(input, self.dialect)
    }

    /// Compile `input` with an explicit dialect.
    pub fn parse_as(&self, input: &str, dialect: Dialect) -> SearchQuery {
        let query = match dialect.resolve(input) {
            Dialect::Expression => {
                let evaluator = Evaluator::new(Utc::now(), self.recent_months);
                SearchQuery::from_matcher(ExpressionMatcher::new(parse_expression(input), evaluator))
            }
            _ => {
                let terms = build_terms(&tokenize(input), &self.cache);
                SearchQuery::from_matcher(TermMatcher::new(terms))
            }
        };
        debug!(input, query = %query.explain(), "Compiled query");
        query
    }
}

/// Compile `input` in the given dialect. Never fails; malformed queries
/// degrade to the closest sensible reading.
pub fn parse_query(input: &str, dialect: Dialect) -> SearchQuery {
    QueryParser::new(dialect).parse(input)
}

/// Knobs for a catalog scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Scan on the Rayon pool above the threshold
    pub parallel: bool,

    /// Catalog size above which the parallel scan kicks in
    pub parallel_threshold: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            parallel: true,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

/// Indices of every record matching `query`, in catalog order.
pub fn search(records: &[CatalogRecord], query: &SearchQuery) -> SearchHits {
    search_with(records, query, SearchOptions::default())
}

/// [`search`] with explicit scan options.
pub fn search_with(
    records: &[CatalogRecord],
    query: &SearchQuery,
    options: SearchOptions,
) -> SearchHits {
    if query.matches_all() {
        return (0..records.len()).collect();
    }

    if options.parallel && records.len() > options.parallel_threshold {
        search_parallel(records, query)
    } else {
        search_sequential(records, query)
    }
}

fn search_sequential(records: &[CatalogRecord], query: &SearchQuery) -> SearchHits {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| query.matches(r))
        .map(|(i, _)| i)
        .collect()
}

fn search_parallel(records: &[CatalogRecord], query: &SearchQuery) -> SearchHits {
    records
        .par_iter()
        .enumerate()
        .filter(|(_, r)| query.matches(r))
        .map(|(i, _)| i)
        .collect()
}

/// Search with a limit on results.
///
/// Stops scanning once `limit` hits are found.
pub fn search_limited(records: &[CatalogRecord], query: &SearchQuery, limit: usize) -> SearchHits {
    let mut hits = Vec::with_capacity(limit.min(records.len()));
    if limit == 0 {
        return hits;
    }

    for (i, record) in records.iter().enumerate() {
        if query.matches(record) {
            hits.push(i);
            if hits.len() >= limit {
                break;
            }
        }
    }

    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Field;

    fn catalog() -> Vec<CatalogRecord> {
        vec![
            CatalogRecord::new("Prince/Purple Rain/1-01 Let's Go Crazy.flac")
                .with(Field::Artist, "Prince")
                .with(Field::Album, "Purple Rain")
                .with(Field::Name, "Let's Go Crazy")
                .with(Field::Year, "1984"),
            CatalogRecord::new("Björk/Homogenic/1-01 Hunter.mp3")
                .with(Field::Artist, "Björk")
                .with(Field::Album, "Homogenic")
                .with(Field::Name, "Hunter")
                .with(Field::Year, "1997"),
            CatalogRecord::new("Various/Purple Hits/1-03 Rain Song.ogg")
                .with(Field::Artist, "Various")
                .with(Field::Album, "Purple Hits")
                .with(Field::Name, "Rain Song")
                .with(Field::Year, "2001"),
            CatalogRecord::new("Films/Prince - Sign o' the Times.mkv"),
        ]
    }

    #[test]
    fn test_dialect_resolution() {
        assert_eq!(Dialect::Auto.resolve("  (artist x)"), Dialect::Expression);
        assert_eq!(Dialect::Auto.resolve("artist:x"), Dialect::Terms);
        assert_eq!(Dialect::Terms.resolve("(artist x)"), Dialect::Terms);
        assert_eq!("expr".parse::<Dialect>().unwrap(), Dialect::Expression);
        assert!("lisp".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_empty_query_returns_everything() {
        let records = catalog();
        for dialect in [Dialect::Terms, Dialect::Expression, Dialect::Auto] {
            let query = parse_query("   ", dialect);
            assert!(query.matches_all());
            assert_eq!(search(&records, &query), vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn test_unmatched_token_returns_nothing() {
        let records = catalog();
        assert!(search(&records, &SearchQuery::terms("zzqxj")).is_empty());
        assert!(search(&records, &SearchQuery::expression("zzqxj")).is_empty());
    }

    #[test]
    fn test_negation_partitions_catalog() {
        let records = catalog();
        let with = search(&records, &SearchQuery::terms("purple"));
        let without = search(&records, &SearchQuery::terms("-purple"));
        assert_eq!(with.len() + without.len(), records.len());
        assert!(with.iter().all(|i| !without.contains(i)));
    }

    #[test]
    fn test_property_narrows_free_text() {
        let records = catalog();
        let free = search(&records, &SearchQuery::terms("prince"));
        let scoped = search(&records, &SearchQuery::terms("artist:prince"));
        assert_eq!(free, vec![0, 3]);
        assert_eq!(scoped, vec![0]);
        assert!(scoped.iter().all(|i| free.contains(i)));
    }

    #[test]
    fn test_results_in_catalog_order() {
        let records = catalog();
        let hits = search(&records, &SearchQuery::terms("rain"));
        assert_eq!(hits, vec![0, 2]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let records: Vec<CatalogRecord> = (0..500)
            .map(|i| {
                CatalogRecord::new(format!("Artist {}/Album/1-01 Song {}.mp3", i % 7, i))
                    .with(Field::Artist, format!("Artist {}", i % 7))
            })
            .collect();
        let query = SearchQuery::terms("artist:\"artist 3\"");
        let sequential = search_with(
            &records,
            &query,
            SearchOptions {
                parallel: false,
                parallel_threshold: 0,
            },
        );
        let parallel = search_with(
            &records,
            &query,
            SearchOptions {
                parallel: true,
                parallel_threshold: 0,
            },
        );
        assert_eq!(sequential, parallel);
        assert!(sequential.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_search_limited() {
        let records = catalog();
        let query = SearchQuery::terms("purple");
        assert_eq!(search_limited(&records, &query, 1), vec![0]);
        assert_eq!(search_limited(&records, &query, 10), vec![0, 2]);
        assert!(search_limited(&records, &query, 0).is_empty());
    }

    #[test]
    fn test_dialects_agree_on_simple_queries() {
        let records = catalog();
        let terms = search(&records, &parse_query("purple", Dialect::Terms));
        let expr = search(&records, &parse_query("(any purple)", Dialect::Auto));
        assert_eq!(terms, expr);
    }

    #[test]
    fn test_parser_reuses_cache() {
        let parser = QueryParser::new(Dialect::Terms);
        parser.parse("Björk");
        parser.parse("Björk artist:Björk");
        assert!(!parser.cache.is_empty());
    }

    #[test]
    fn test_explain() {
        assert_eq!(
            SearchQuery::terms("-artist:Prince").explain(),
            "terms [-artist:\"prince\"]"
        );
        assert_eq!(
            SearchQuery::expression("(year 1984)").explain(),
            "expression (year 1984)"
        );
    }
}

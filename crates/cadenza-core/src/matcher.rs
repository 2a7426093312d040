//! Record matcher for the term dialect.
//!
//! A record matches a term list when every term holds (AND). Each term is
//! evaluated as `negated XOR matched`:
//!
//! | term                | matched when                                          |
//! |---------------------|-------------------------------------------------------|
//! | `value`             | normalized free-text haystack contains `value`        |
//! | `path:value`        | normalized pathname contains `value`                  |
//! | `artist:value` etc. | normalized field starts with `value`                  |
//! | `year:1999` etc.    | parsed field equals parsed value (fallbacks applied)  |
//! | `before:1990`       | year < 1990 (`after`, `mbefore`, `mafter` likewise)   |
//! | `field:`            | field is non-empty                                    |
//! | `unknown:value`     | never                                                 |

use crate::search::Matcher;
use crate::terms::Term;
use crate::types::{parse_int_or, CatalogRecord, Field};

/// What a property name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    /// Equality or text match on a field
    Field(Field),
    /// Field value strictly below the term value
    Before(Field),
    /// Field value strictly above the term value
    After(Field),
}

impl Property {
    /// The record field this property reads.
    pub fn field(&self) -> Field {
        match *self {
            Property::Field(f) | Property::Before(f) | Property::After(f) => f,
        }
    }
}

/// Resolve a normalized property name. Unknown names resolve to `None`.
pub fn resolve_property(name: &str) -> Option<Property> {
    let property = match name {
        "path" | "pathname" => Property::Field(Field::Pathname),
        "album" => Property::Field(Field::Album),
        "artist" => Property::Field(Field::Artist),
        "name" => Property::Field(Field::Name),
        "disc" => Property::Field(Field::Disc),
        "track" => Property::Field(Field::Track),
        "year" => Property::Field(Field::Year),
        "genre" => Property::Field(Field::Genre),
        "mtime" | "added" => Property::Field(Field::Mtime),
        "before" => Property::Before(Field::Year),
        "after" => Property::After(Field::Year),
        "mbefore" => Property::Before(Field::Mtime),
        "mafter" => Property::After(Field::Mtime),
        _ => return None,
    };
    Some(property)
}

/// Test one property against a record, ignoring negation.
pub fn match_property(property: Property, value: &str, record: &CatalogRecord) -> bool {
    let field = property.field();

    if value.is_empty() {
        return record.has(field);
    }

    match property {
        Property::Field(f) if f.is_numeric() => record.number(f) == parse_int_or(value, f.fallback()),
        Property::Field(Field::Pathname) => record.normalized(Field::Pathname).contains(value),
        Property::Field(f) => record.normalized(f).starts_with(value),
        Property::Before(f) => record.number(f) < parse_int_or(value, f.fallback()),
        Property::After(f) => record.number(f) > parse_int_or(value, f.fallback()),
    }
}

/// Decide whether a single term holds for `record`.
pub fn match_term(term: &Term, record: &CatalogRecord) -> bool {
    let property = term.property.as_deref().and_then(resolve_property);
    match_resolved(term, property, record)
}

/// Evaluate `term` with its property already resolved. A named but unknown
/// property (`property` is `None`) never matches before negation.
fn match_resolved(term: &Term, property: Option<Property>, record: &CatalogRecord) -> bool {
    let matched = match (&term.property, property) {
        (None, _) => record.haystack().contains(term.value.as_str()),
        (Some(_), Some(property)) => match_property(property, &term.value, record),
        (Some(_), None) => false,
    };
    matched != term.negated
}

/// Decide whether every term holds for `record`.
pub fn matches(terms: &[Term], record: &CatalogRecord) -> bool {
    terms.iter().all(|term| match_term(term, record))
}

/// A term with its property resolved up front.
#[derive(Debug, Clone)]
struct CompiledTerm {
    term: Term,
    property: Option<Property>,
}

/// Term-dialect matcher with property names resolved once per query.
#[derive(Debug, Clone)]
pub struct TermMatcher {
    terms: Vec<CompiledTerm>,
}

impl TermMatcher {
    pub fn new(terms: Vec<Term>) -> Self {
        let terms = terms
            .into_iter()
            .map(|term| {
                let property = term.property.as_deref().and_then(resolve_property);
                CompiledTerm { term, property }
            })
            .collect();
        TermMatcher { terms }
    }

    /// The terms this matcher evaluates.
    pub fn terms(&self) -> impl Iterator<Item = &Term> {
        self.terms.iter().map(|c| &c.term)
    }
}

impl Matcher for TermMatcher {
    fn matches(&self, record: &CatalogRecord) -> bool {
        self.terms
            .iter()
            .all(|compiled| match_resolved(&compiled.term, compiled.property, record))
    }

    fn matches_all(&self) -> bool {
        self.terms.is_empty()
    }

    fn describe(&self) -> String {
        let terms: Vec<String> = self.terms().map(|t| t.to_string()).collect();
        format!("terms [{}]", terms.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NormalizeCache;
    use crate::terms::parse_terms;

    fn song() -> CatalogRecord {
        CatalogRecord::new("A/B/01 Song.mp3")
            .with(Field::Album, "B")
            .with(Field::Artist, "A")
            .with(Field::Name, "Song")
            .with(Field::Disc, "1")
            .with(Field::Track, "1")
            .with(Field::Year, "1999")
            .with(Field::Genre, "Rock")
            .with(Field::Mtime, "0")
    }

    fn check(query: &str, record: &CatalogRecord) -> bool {
        let terms = parse_terms(query, &NormalizeCache::new());
        let plain = matches(&terms, record);
        let compiled = TermMatcher::new(terms).matches(record);
        assert_eq!(plain, compiled, "matcher forms disagree for {:?}", query);
        plain
    }

    #[test]
    fn test_resolve_property() {
        assert_eq!(resolve_property("path"), Some(Property::Field(Field::Pathname)));
        assert_eq!(resolve_property("after"), Some(Property::After(Field::Year)));
        assert_eq!(resolve_property("mbefore"), Some(Property::Before(Field::Mtime)));
        assert_eq!(resolve_property("colour"), None);
    }

    #[test]
    fn test_end_to_end_examples() {
        let record = song();
        assert!(check("artist:A", &record));
        assert!(!check("artist:Z", &record));
        assert!(!check("-artist:A", &record));
        assert!(check("song", &record));
        assert!(check("year:1999", &record));
        assert!(!check("year:2000", &record));
    }

    #[test]
    fn test_prefix_vs_substring() {
        let record = CatalogRecord::new("Prince/Purple Rain/01 Let's Go Crazy.mp3")
            .with(Field::Artist, "Prince")
            .with(Field::Album, "Purple Rain");
        assert!(check("album:purple", &record));
        assert!(!check("album:rain", &record));
        assert!(check("path:rain", &record));
        assert!(check("rain", &record));
    }

    #[test]
    fn test_diacritics_ignored() {
        let record = CatalogRecord::new("x.mp3").with(Field::Artist, "Café Tacvba");
        assert!(check("artist:cafe", &record));
        assert!(check("CAFÉ", &record));
    }

    #[test]
    fn test_numeric_fallbacks() {
        let record = CatalogRecord::new("x.mp3").with(Field::Track, "B2");
        assert!(check("track:1", &record));
        assert!(check("year:1970", &record));
        assert!(check("disc:01", &record));
    }

    #[test]
    fn test_unknown_property() {
        let record = song();
        assert!(!check("colour:red", &record));
        assert!(check("-colour:red", &record));
    }

    #[test]
    fn test_compiled_and_plain_agree_on_negation() {
        let record = song();
        for query in ["-song", "-path:zzz", "-year:1999", "-colour:", "-after:2000"] {
            check(query, &record);
        }
        assert!(!check("-song", &record));
        assert!(check("-path:zzz", &record));
    }

    #[test]
    fn test_presence() {
        let record = song();
        assert!(check("genre:", &record));
        assert!(!check("-genre:", &record));
        let bare = CatalogRecord::new("x.mp3");
        assert!(!check("genre:", &bare));
        assert!(check("-genre:", &bare));
    }

    #[test]
    fn test_ranges() {
        let record = song().with(Field::Mtime, "1700000000");
        assert!(check("after:1990 before:2000", &record));
        assert!(!check("after:1999", &record));
        assert!(!check("before:1999", &record));
        assert!(check("mafter:1600000000", &record));
        assert!(!check("mbefore:1600000000", &record));
    }

    #[test]
    fn test_no_cross_field_match() {
        let record = CatalogRecord::new("x.mp3")
            .with(Field::Album, "Some")
            .with(Field::Artist, "Artist");
        // "e a" would only exist by joining album and artist
        assert!(!check("\"e a\"", &record));
    }

    #[test]
    fn test_empty_terms_match_everything() {
        assert!(check("", &song()));
        assert!(TermMatcher::new(Vec::new()).matches_all());
    }
}

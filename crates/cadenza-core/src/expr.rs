//! Expression dialect: parenthesized predicate calls.
//!
//! ```text
//! (and (artist ^prince) (or (year 1984) (year 1987 1991)) (not live))
//! ```
//!
//! A query is parsed into an [`Expr`] tree and interpreted once per record.
//! The first element of a list names a predicate from a fixed registry; the
//! rest are its arguments. A query that does not start with `(` is read as
//! `(any <query>)`, and an empty query as `(all)`.
//!
//! ## Predicates
//!
//! | name                                    | holds when                                          |
//! |-----------------------------------------|-----------------------------------------------------|
//! | `and`, `or`, `not`                      | boolean combination of the arguments                |
//! | `all`                                   | always                                              |
//! | `any pat...`                            | every pattern matches some free-text field          |
//! | `path`, `album`, `artist`, `name`, `genre` | every pattern matches the field; no args: non-empty |
//! | `disc`, `track`, `year`                 | one arg: equal; two args: inclusive range           |
//! | `audio`, `video`                        | pathname has an audio/video extension               |
//! | `recent`                                | mtime is inside the recent window                   |
//!
//! Patterns are case-insensitive regular expressions tested against both the
//! raw and the normalized field value. A pattern that is not a valid regex is
//! used as a literal substring instead.
//!
//! Evaluation never fails. An atom in boolean position means `(any atom)`,
//! an unknown predicate name turns its list into `(any ...)`, and a list
//! headed by another list is read as `(and ...)`.

use crate::normalize::normalize;
use crate::search::Matcher;
use crate::types::{CatalogRecord, Field, MediaKind};
use chrono::{DateTime, Months, Utc};
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Default size of the `recent` window, in months.
pub const DEFAULT_RECENT_MONTHS: u32 = 2;

/// A node of a parsed expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A symbol or string literal
    Atom(String),
    /// A call: predicate name followed by arguments
    List(Vec<Expr>),
}

impl Expr {
    /// Shorthand for an atom node.
    pub fn atom(s: impl Into<String>) -> Self {
        Expr::Atom(s.into())
    }

    /// The `(all)` expression.
    pub fn all() -> Self {
        Expr::List(vec![Expr::atom("all")])
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Atom(s) => {
                let plain = !s.is_empty()
                    && !s
                        .chars()
                        .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '"'));
                if plain {
                    f.write_str(s)
                } else {
                    write!(f, "\"{}\"", s.replace('"', "\\\""))
                }
            }
            Expr::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Atom(String),
}

fn lex(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            c if c.is_whitespace() => {}
            '"' => {
                let mut literal = String::new();
                while let Some(c) = chars.next() {
                    match c {
                        '\\' if chars.peek() == Some(&'"') => {
                            chars.next();
                            literal.push('"');
                        }
                        '"' => break,
                        _ => literal.push(c),
                    }
                }
                tokens.push(Token::Atom(literal));
            }
            _ => {
                let mut symbol = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || matches!(next, '(' | ')' | '"') {
                        break;
                    }
                    symbol.push(next);
                    chars.next();
                }
                tokens.push(Token::Atom(symbol));
            }
        }
    }

    tokens
}

/// Parse an expression query.
///
/// Unbalanced `(` are closed at the end of input and stray `)` are ignored.
/// Several top-level forms are combined with `and`.
pub fn parse_expression(query: &str) -> Expr {
    let query = query.trim();
    if query.is_empty() {
        return Expr::all();
    }

    let source = if query.starts_with('(') {
        query.to_string()
    } else {
        format!("(any {})", query)
    };

    let mut stack: Vec<Vec<Expr>> = vec![Vec::new()];
    for token in lex(&source) {
        match token {
            Token::Open => stack.push(Vec::new()),
            Token::Close => close_list(&mut stack),
            Token::Atom(s) => {
                if let Some(top) = stack.last_mut() {
                    top.push(Expr::Atom(s));
                }
            }
        }
    }
    while stack.len() > 1 {
        close_list(&mut stack);
    }

    let mut forms = stack.pop().unwrap_or_default();
    match forms.len() {
        0 => Expr::all(),
        1 => forms.remove(0),
        _ => {
            forms.insert(0, Expr::atom("and"));
            Expr::List(forms)
        }
    }
}

fn close_list(stack: &mut Vec<Vec<Expr>>) {
    if stack.len() < 2 {
        return;
    }
    if let Some(list) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.push(Expr::List(list));
        }
    }
}

/// A compiled pattern argument.
#[derive(Debug)]
enum Pattern {
    Regex(Regex),
    /// Normalized literal, used when the argument is not a valid regex
    Literal(String),
}

impl Pattern {
    fn compile(source: &str) -> Self {
        match Regex::new(&format!("(?i){}", source)) {
            Ok(regex) => Pattern::Regex(regex),
            Err(_) => Pattern::Literal(normalize(source)),
        }
    }

    fn is_match(&self, record: &CatalogRecord, field: Field) -> bool {
        match self {
            Pattern::Regex(regex) => {
                regex.is_match(record.get(field)) || regex.is_match(record.normalized(field))
            }
            Pattern::Literal(literal) => record.normalized(field).contains(literal.as_str()),
        }
    }
}

/// Signature shared by every registered predicate.
pub type Predicate = fn(&Scope<'_>, &[Expr]) -> bool;

static REGISTRY: &[(&str, Predicate)] = &[
    ("and", and),
    ("or", or),
    ("not", not),
    ("all", all),
    ("any", any),
    ("audio", audio),
    ("video", video),
    ("path", path),
    ("album", album),
    ("artist", artist),
    ("name", name),
    ("genre", genre),
    ("disc", disc),
    ("track", track),
    ("year", year),
    ("recent", recent),
];

/// Look up a predicate by name (case-insensitive).
pub fn lookup(name: &str) -> Option<Predicate> {
    let name = name.to_ascii_lowercase();
    REGISTRY
        .iter()
        .find(|(registered, _)| *registered == name)
        .map(|(_, predicate)| *predicate)
}

/// Names of all registered predicates.
pub fn predicate_names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(name, _)| *name)
}

/// Shared evaluation state for one query: the `recent` cutoff and the
/// compiled pattern cache.
#[derive(Debug)]
pub struct Evaluator {
    recent_cutoff: i64,
    patterns: RwLock<HashMap<String, Arc<Pattern>>>,
}

impl Evaluator {
    /// Create an evaluator whose `recent` window ends at `now`.
    pub fn new(now: DateTime<Utc>, recent_months: u32) -> Self {
        let cutoff = now
            .checked_sub_months(Months::new(recent_months))
            .unwrap_or(now);
        Evaluator {
            recent_cutoff: cutoff.timestamp(),
            patterns: RwLock::new(HashMap::new()),
        }
    }

    /// Unix timestamp an mtime must exceed to count as recent.
    pub fn recent_cutoff(&self) -> i64 {
        self.recent_cutoff
    }

    fn pattern(&self, source: &str) -> Arc<Pattern> {
        if let Some(pattern) = self.patterns.read().get(source) {
            return Arc::clone(pattern);
        }
        let pattern = Arc::new(Pattern::compile(source));
        self.patterns
            .write()
            .entry(source.to_string())
            .or_insert(pattern)
            .clone()
    }

    /// Evaluate `expr` against one record.
    pub fn evaluate(&self, expr: &Expr, record: &CatalogRecord) -> bool {
        Scope {
            record,
            evaluator: self,
        }
        .truthy(expr)
    }
}

/// The record currently under evaluation, handed to every predicate.
pub struct Scope<'a> {
    pub record: &'a CatalogRecord,
    evaluator: &'a Evaluator,
}

impl Scope<'_> {
    /// Evaluate `expr` as a boolean.
    pub fn truthy(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Atom(text) => self.matches_any_field(text),
            Expr::List(items) => match items.split_first() {
                None => true,
                Some((Expr::Atom(head), args)) => match lookup(head) {
                    Some(predicate) => predicate(self, args),
                    None => any(self, items),
                },
                Some((Expr::List(_), _)) => and(self, items),
            },
        }
    }

    fn matches_field(&self, field: Field, pattern: &str) -> bool {
        self.evaluator.pattern(pattern).is_match(self.record, field)
    }

    fn matches_any_field(&self, pattern: &str) -> bool {
        let pattern = self.evaluator.pattern(pattern);
        Field::FREE_TEXT
            .iter()
            .any(|&field| pattern.is_match(self.record, field))
    }

    /// Apply `test` to atom arguments and evaluate list arguments as
    /// booleans; all must hold.
    fn all_args(&self, args: &[Expr], test: impl Fn(&str) -> bool) -> bool {
        args.iter().all(|arg| match arg {
            Expr::Atom(text) => test(text),
            Expr::List(_) => self.truthy(arg),
        })
    }
}

fn and(scope: &Scope<'_>, args: &[Expr]) -> bool {
    args.iter().all(|arg| scope.truthy(arg))
}

fn or(scope: &Scope<'_>, args: &[Expr]) -> bool {
    args.iter().any(|arg| scope.truthy(arg))
}

fn not(scope: &Scope<'_>, args: &[Expr]) -> bool {
    !and(scope, args)
}

fn all(_scope: &Scope<'_>, _args: &[Expr]) -> bool {
    true
}

fn any(scope: &Scope<'_>, args: &[Expr]) -> bool {
    scope.all_args(args, |pattern| scope.matches_any_field(pattern))
}

fn media(scope: &Scope<'_>, kind: MediaKind, args: &[Expr]) -> bool {
    scope.record.media_kind() == kind && and(scope, args)
}

fn audio(scope: &Scope<'_>, args: &[Expr]) -> bool {
    media(scope, MediaKind::Audio, args)
}

fn video(scope: &Scope<'_>, args: &[Expr]) -> bool {
    media(scope, MediaKind::Video, args)
}

fn text_field(scope: &Scope<'_>, field: Field, args: &[Expr]) -> bool {
    if args.is_empty() {
        return scope.record.has(field);
    }
    scope.all_args(args, |pattern| scope.matches_field(field, pattern))
}

fn path(scope: &Scope<'_>, args: &[Expr]) -> bool {
    text_field(scope, Field::Pathname, args)
}

fn album(scope: &Scope<'_>, args: &[Expr]) -> bool {
    text_field(scope, Field::Album, args)
}

fn artist(scope: &Scope<'_>, args: &[Expr]) -> bool {
    text_field(scope, Field::Artist, args)
}

fn name(scope: &Scope<'_>, args: &[Expr]) -> bool {
    text_field(scope, Field::Name, args)
}

fn genre(scope: &Scope<'_>, args: &[Expr]) -> bool {
    text_field(scope, Field::Genre, args)
}

fn numeric_field(scope: &Scope<'_>, field: Field, args: &[Expr]) -> bool {
    let mut bounds = Vec::new();
    for arg in args {
        match arg {
            Expr::Atom(text) => bounds.push(crate::types::parse_int_or(text, field.fallback())),
            Expr::List(_) => {
                if !scope.truthy(arg) {
                    return false;
                }
            }
        }
    }

    let value = scope.record.number(field);
    match bounds.as_slice() {
        [] => scope.record.has(field),
        [exact] => value == *exact,
        [a, b, ..] => (*a.min(b)..=*a.max(b)).contains(&value),
    }
}

fn disc(scope: &Scope<'_>, args: &[Expr]) -> bool {
    numeric_field(scope, Field::Disc, args)
}

fn track(scope: &Scope<'_>, args: &[Expr]) -> bool {
    numeric_field(scope, Field::Track, args)
}

fn year(scope: &Scope<'_>, args: &[Expr]) -> bool {
    numeric_field(scope, Field::Year, args)
}

fn recent(scope: &Scope<'_>, _args: &[Expr]) -> bool {
    scope.record.number(Field::Mtime) > scope.evaluator.recent_cutoff
}

/// Expression-dialect matcher.
#[derive(Debug)]
pub struct ExpressionMatcher {
    expr: Expr,
    evaluator: Evaluator,
}

impl ExpressionMatcher {
    pub fn new(expr: Expr, evaluator: Evaluator) -> Self {
        ExpressionMatcher { expr, evaluator }
    }
}

impl Matcher for ExpressionMatcher {
    fn matches(&self, record: &CatalogRecord) -> bool {
        self.evaluator.evaluate(&self.expr, record)
    }

    fn matches_all(&self) -> bool {
        self.expr == Expr::all()
    }

    fn describe(&self) -> String {
        format!("expression {}", self.expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn eval(query: &str, record: &CatalogRecord) -> bool {
        let matcher = ExpressionMatcher::new(parse_expression(query), Evaluator::new(now(), 2));
        matcher.matches(record)
    }

    fn record() -> CatalogRecord {
        CatalogRecord::new("Prince/Purple Rain/1-05 Purple Rain.flac")
            .with(Field::Artist, "Prince")
            .with(Field::Album, "Purple Rain")
            .with(Field::Name, "Purple Rain")
            .with(Field::Track, "5")
            .with(Field::Year, "1984")
            .with(Field::Genre, "Pop")
    }

    #[test]
    fn test_parse_wrapping() {
        assert_eq!(parse_expression(""), Expr::all());
        assert_eq!(parse_expression("   "), Expr::all());
        assert_eq!(
            parse_expression("purple rain"),
            Expr::List(vec![Expr::atom("any"), Expr::atom("purple"), Expr::atom("rain")])
        );
    }

    #[test]
    fn test_parse_nested() {
        let expr = parse_expression("(and (artist ^prince) (not (year 1999)))");
        assert_eq!(expr.to_string(), "(and (artist ^prince) (not (year 1999)))");
    }

    #[test]
    fn test_parse_quoted_atoms() {
        let expr = parse_expression(r#"(album "Purple Rain (Deluxe)")"#);
        assert_eq!(
            expr,
            Expr::List(vec![Expr::atom("album"), Expr::atom("Purple Rain (Deluxe)")])
        );
        assert_eq!(expr.to_string(), r#"(album "Purple Rain (Deluxe)")"#);
    }

    #[test]
    fn test_parse_unbalanced() {
        assert_eq!(
            parse_expression("(and (artist prince"),
            parse_expression("(and (artist prince))")
        );
        assert_eq!(
            parse_expression("(artist prince)) )"),
            parse_expression("(artist prince)")
        );
        assert_eq!(
            parse_expression("(audio) (year 1984)"),
            parse_expression("(and (audio) (year 1984))")
        );
        assert_eq!(parse_expression("()"), Expr::List(Vec::new()));
    }

    #[test]
    fn test_field_predicates() {
        let record = record();
        assert!(eval("(artist ^prince)", &record));
        assert!(eval("(artist ^P)", &record));
        assert!(!eval("(artist ^rain)", &record));
        assert!(eval("(album rain$)", &record));
        assert!(eval("(path /1-05)", &record));
        assert!(eval("(genre)", &record));
        assert!(!eval("(genre rock)", &record));
    }

    #[test]
    fn test_regex_against_raw_and_normalized() {
        let record = CatalogRecord::new("x.mp3").with(Field::Artist, "Björk");
        assert!(eval("(artist ^bjork)", &record));
        assert!(eval("(artist ^björk)", &record));
    }

    #[test]
    fn test_invalid_regex_is_literal() {
        let record = CatalogRecord::new("x.mp3").with(Field::Name, "Track [Live");
        assert!(eval("(name \"[live\")", &record));
        assert!(!eval("(name \"[studio\")", &record));
    }

    #[test]
    fn test_boolean_combinators() {
        let record = record();
        assert!(eval("(and (artist prince) (year 1984))", &record));
        assert!(eval("(or (year 1999) (year 1984))", &record));
        assert!(!eval("(not (year 1984))", &record));
        assert!(eval("(and)", &record));
        assert!(!eval("(or)", &record));
        assert!(eval("(all)", &record));
        assert!(eval("()", &record));
    }

    #[test]
    fn test_numeric_predicates() {
        let record = record();
        assert!(eval("(year 1984)", &record));
        assert!(eval("(year 1980 1989)", &record));
        assert!(eval("(year 1989 1980)", &record));
        assert!(!eval("(year 1990 1999)", &record));
        assert!(eval("(track 5)", &record));
        assert!(eval("(disc 1)", &record));
    }

    #[test]
    fn test_media_predicates() {
        let record = record();
        assert!(eval("(audio)", &record));
        assert!(!eval("(video)", &record));
        assert!(eval("(video)", &CatalogRecord::new("Films/Heima.mkv")));
    }

    #[test]
    fn test_recent() {
        let cutoff = Evaluator::new(now(), 2).recent_cutoff();
        let fresh = record().with(Field::Mtime, (cutoff + 60).to_string());
        let stale = record().with(Field::Mtime, (cutoff - 60).to_string());
        assert!(eval("(recent)", &fresh));
        assert!(!eval("(recent)", &stale));
        assert!(!eval("(recent)", &CatalogRecord::new("x.mp3")));
    }

    #[test]
    fn test_bare_query_and_fallbacks() {
        let record = record();
        assert!(eval("purple prince", &record));
        assert!(!eval("purple madonna", &record));
        // unknown predicate name degrades to literal text
        assert!(eval("(purple rain)", &record));
        // atoms in boolean position are free-text tests
        assert!(eval("(and prince (not madonna))", &record));
        // list-headed list is a conjunction
        assert!(eval("((artist prince) (year 1984))", &record));
    }

    #[test]
    fn test_lookup_case_insensitive() {
        assert!(lookup("AND").is_some());
        assert!(lookup("frobnicate").is_none());
        assert_eq!(predicate_names().count(), 16);
    }
}

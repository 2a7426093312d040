//! Term builder: turns tokens into structured search terms.
//!
//! ```text
//! query        := term*
//! term         := "-"? (property-term | value)
//! property-term := property ":" value?
//! ```
//!
//! Property names and values are normalized here, so the matcher only ever
//! compares normalized strings.

use crate::normalize::NormalizeCache;
use crate::tokenizer::tokenize;
use std::fmt;

/// One atomic condition of a term query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    /// Normalized property name, or `None` for a free-text term
    pub property: Option<String>,

    /// Normalized literal value; empty means "property is present"
    pub value: String,

    /// Whether the condition is inverted
    pub negated: bool,
}

impl Term {
    /// Free-text term matched against every text field.
    pub fn free(value: impl Into<String>) -> Self {
        Term {
            property: None,
            value: value.into(),
            negated: false,
        }
    }

    /// Term scoped to one property.
    pub fn scoped(property: impl Into<String>, value: impl Into<String>) -> Self {
        Term {
            property: Some(property.into()),
            value: value.into(),
            negated: false,
        }
    }

    /// Invert this term.
    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("-")?;
        }
        if let Some(ref property) = self.property {
            write!(f, "{}:", property)?;
        }
        write!(f, "{:?}", self.value)
    }
}

/// Build terms from a token stream.
///
/// Invalid fragments (a bare `-`, a bare `:`) are skipped rather than
/// reported; user queries are untrusted free text.
pub fn build_terms(tokens: &[String], cache: &NormalizeCache) -> Vec<Term> {
    let mut terms = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let mut token = tokens[i].as_str();
        i += 1;

        let negated = match token.strip_prefix('-') {
            Some("") => continue,
            Some(rest) => {
                token = rest;
                true
            }
            None => false,
        };

        let (property, value) = match token.strip_suffix(':') {
            Some("") => continue,
            Some(name) => {
                let value = tokens.get(i).map(String::as_str).unwrap_or("");
                i += 1;
                (Some(cache.get(name)), value)
            }
            None => (None, token),
        };

        if property.is_none() && value.is_empty() {
            continue;
        }

        terms.push(Term {
            property,
            value: cache.get(value),
            negated,
        });
    }

    terms
}

/// Tokenize and build terms in one step.
pub fn parse_terms(query: &str, cache: &NormalizeCache) -> Vec<Term> {
    build_terms(&tokenize(query), cache)
}

//! String canonicalization for comparisons.
//!
//! Every value the engine compares goes through [`normalize`] first: the
//! string is lowercased, put in canonical decomposition (NFD), and combining
//! marks that follow a base character are dropped. `"Café"`, `"CAFÉ"` and
//! `"cafe"` all normalize to `"cafe"`.
//!
//! Only the combining-mark blocks below are stripped:
//!
//! - Combining Diacritical Marks (U+0300..U+036F)
//! - Combining Diacritical Marks Extended (U+1AB0..U+1AFF)
//! - Combining Diacritical Marks Supplement (U+1DC0..U+1DFF)
//! - Combining Diacritical Marks for Symbols (U+20D0..U+20FF)
//! - Combining Half Marks (U+FE20..U+FE2F)
//!
//! Marks in other scripts (e.g. Devanagari vowel signs) are preserved, and a
//! mark with no base character before it is kept as-is.

use dashmap::DashMap;
use unicode_normalization::UnicodeNormalization;

/// Returns true if `c` lies in one of the stripped combining-mark blocks.
pub fn is_stripped_mark(c: char) -> bool {
    matches!(
        c,
        '\u{0300}'..='\u{036F}'
            | '\u{1AB0}'..='\u{1AFF}'
            | '\u{1DC0}'..='\u{1DFF}'
            | '\u{20D0}'..='\u{20FF}'
            | '\u{FE20}'..='\u{FE2F}'
    )
}

/// Canonicalize `s` for comparison.
///
/// Pure and total; `normalize(&normalize(s)) == normalize(s)` for every input.
pub fn normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut after_base = false;

    for c in s.to_lowercase().nfd() {
        if is_stripped_mark(c) {
            if !after_base {
                out.push(c);
            }
        } else {
            after_base = true;
            out.push(c);
        }
    }

    out
}

/// Memoizing wrapper around [`normalize`].
///
/// Safe to share between threads; entries are never invalidated since the
/// result only depends on the input string.
#[derive(Debug, Default)]
pub struct NormalizeCache {
    entries: DashMap<String, String>,
}

impl NormalizeCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize `s`, reusing a previous result when available.
    pub fn get(&self, s: &str) -> String {
        if let Some(hit) = self.entries.get(s) {
            return hit.value().clone();
        }
        let normalized = normalize(s);
        self.entries.insert(s.to_string(), normalized.clone());
        normalized
    }

    /// Number of memoized entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all memoized entries.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

//! Query tokenizer for the term dialect.
//!
//! Splits a raw query into string tokens:
//!
//! - Whitespace outside quotes separates tokens.
//! - `"` toggles quoted mode; inside quotes whitespace and `:` are literal.
//! - `\"` is a literal quote character, inside or outside quotes.
//! - An unquoted `:` closes the current token and stays attached to it, so
//!   `artist:prince` becomes `["artist:", "prince"]`.
//! - A closing quote directly followed by `:` produces a property token, so
//!   `"artist":prince` also becomes `["artist:", "prince"]`.
//! - Tokens are trimmed; empty tokens are dropped.
//! - An unterminated quote flushes whatever was collected.
//!
//! Tokenizing never fails.

/// Split `query` into tokens.
pub fn tokenize(query: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = query.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'"') {
            chars.next();
            current.push('"');
            continue;
        }

        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&':') {
                    chars.next();
                    current.push(':');
                }
                push_token(&mut tokens, &mut current);
                in_quotes = false;
            } else {
                current.push(c);
            }
        } else if c == '"' {
            in_quotes = true;
        } else if c.is_whitespace() {
            push_token(&mut tokens, &mut current);
        } else if c == ':' {
            current.push(':');
            push_token(&mut tokens, &mut current);
        } else {
            current.push(c);
        }
    }

    push_token(&mut tokens, &mut current);
    tokens
}

fn push_token(tokens: &mut Vec<String>, current: &mut String) {
    let token = current.trim();
    if !token.is_empty() {
        tokens.push(token.to_string());
    }
    current.clear();
}

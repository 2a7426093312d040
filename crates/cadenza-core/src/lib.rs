//! # Cadenza Core Library
//!
//! This crate provides the catalog model and the query engine for the
//! Cadenza media-library player: given a user's query string and a loaded
//! catalog, it returns the ordered indices of every matching record.
//!
//! ## Architecture
//!
//! - **Normalize** (`normalize`): case and diacritic folding shared by
//!   queries and catalog data
//! - **Types** (`types`): records, fields, and integer-like parsing
//! - **Tokenizer / Terms / Matcher**: the term dialect
//!   (`artist:prince -live "purple rain"`)
//! - **Expr** (`expr`): the parenthesized expression dialect
//! - **Search** (`search`): query front door and the catalog scan
//! - **Catalog** (`catalog`): loading TSV/JSON catalogs
//! - **Order** (`order`): display ordering of hits
//! - **Worker** (`worker`): background search thread for interactive use
//! - **Config** (`config`): Configuration management
//!
//! ## Example
//!
//! ```rust,ignore
//! use cadenza_core::{Catalog, Dialect, parse_query};
//!
//! let catalog = Catalog::load(path)?;
//! let query = parse_query("artist:prince -live", Dialect::Auto);
//! for i in catalog.search(&query, Default::default()) {
//!     println!("{}", catalog.get(i).unwrap().pathname());
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod expr;
pub mod matcher;
pub mod normalize;
pub mod order;
pub mod search;
pub mod terms;
pub mod tokenizer;
pub mod types;
pub mod worker;

// Re-export commonly used types
pub use catalog::Catalog;
pub use config::Config;
pub use error::{CadenzaError, Result};
pub use expr::{parse_expression, Expr};
pub use normalize::{normalize, NormalizeCache};
pub use order::{arrange_hits, sort_hits, SortBy};
pub use search::{parse_query, search, search_limited, Dialect, SearchOptions, SearchQuery};
pub use terms::{parse_terms, Term};
pub use tokenizer::tokenize;
pub use types::{CatalogRecord, CatalogStats, Field, MediaKind, SearchHits};
pub use worker::{SearchDone, SearchWorker, WorkerSettings};

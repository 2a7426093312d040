//! The catalog: an ordered, read-only list of media records.
//!
//! Catalogs are loaded from either of two flat formats:
//!
//! - **TSV**: one record per line, tab-separated, columns in the order
//!   `pathname album artist name disc track year genre mtime`. Missing
//!   trailing columns take their defaults. A first line whose first column
//!   is `pathname` is a header and may list the columns in any order.
//! - **JSON**: an array of objects keyed by field name.
//!
//! Empty `artist`, `album`, `name`, `disc` and `track` values are filled in
//! from a `.../Artist/Album/D-TT Name.ext` pathname layout.

use crate::error::{CadenzaError, Result};
use crate::search::{search_with, SearchOptions, SearchQuery};
use crate::types::{CatalogRecord, CatalogStats, Field, RecordFields, SearchHits};
use regex::Regex;
use serde::Deserialize;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, instrument, warn};

static DISC_TRACK_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d*)?-?(\d*)?\s+(.*)$").expect("valid regex"));

/// On-disk catalog encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    Tsv,
    Json,
}

impl CatalogFormat {
    /// Pick the format from a file extension; anything but `.json` is TSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => CatalogFormat::Json,
            _ => CatalogFormat::Tsv,
        }
    }
}

/// Trim values, fill gaps from the pathname, then apply defaults.
fn complete(mut fields: RecordFields) -> RecordFields {
    for field in Field::ALL {
        let value = fields.get_mut(field);
        let trimmed = value.trim();
        if trimmed.len() != value.len() {
            *value = trimmed.to_string();
        }
    }

    let guessed = PathMetadata::from_pathname(&fields.pathname);
    let (artist, album, name, disc, track) = (
        guessed.artist.to_string(),
        guessed.album.to_string(),
        guessed.name.to_string(),
        guessed.disc.to_string(),
        guessed.track.to_string(),
    );
    fill(&mut fields.artist, artist);
    fill(&mut fields.album, album);
    fill(&mut fields.name, name);
    fill(&mut fields.disc, disc);
    fill(&mut fields.track, track);

    fields.with_defaults()
}

fn fill(slot: &mut String, guess: String) {
    if slot.is_empty() {
        *slot = guess;
    }
}

/// Metadata implied by a pathname.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMetadata<'a> {
    pub artist: &'a str,
    pub album: &'a str,
    pub disc: &'a str,
    pub track: &'a str,
    pub name: &'a str,
}

impl<'a> PathMetadata<'a> {
    /// Read `Artist/Album/D-TT Name.ext` from the tail of `pathname`.
    ///
    /// `TT Name.ext` alone sets only the track; a basename with no number
    /// prefix becomes the name as-is (minus its extension).
    pub fn from_pathname(pathname: &'a str) -> Self {
        let parts: Vec<&str> = pathname.split('/').collect();
        let n = parts.len();
        let mut meta = PathMetadata::default();

        if n > 2 {
            meta.artist = parts[n - 3];
        }
        if n > 1 {
            meta.album = parts[n - 2];
        }

        let basename = parts[n - 1];
        let (disc, track, name) = match DISC_TRACK_NAME.captures(basename) {
            Some(caps) => {
                let group = |i| caps.get(i).map_or("", |m| m.as_str());
                match (group(1), group(2), group(3)) {
                    (only, "", name) if !only.is_empty() => ("", only, name),
                    other => other,
                }
            }
            None => ("", "", basename),
        };
        meta.disc = disc;
        meta.track = track;
        meta.name = strip_extension(name);
        meta
    }
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

/// An ordered, read-only collection of records.
///
/// Indices into the catalog are what searches return; they stay valid for
/// the lifetime of the catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<CatalogRecord>,
    source: Option<PathBuf>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap already-built records.
    pub fn from_records(records: Vec<CatalogRecord>) -> Self {
        Catalog {
            records,
            source: None,
        }
    }

    /// Load a catalog file, picking the format from its extension.
    #[instrument]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CadenzaError::CatalogNotFound {
                path: path.to_path_buf(),
            });
        }

        info!(path = %path.display(), "Loading catalog");
        let bytes = fs::read(path)?;
        let contents = String::from_utf8_lossy(&bytes);
        if let Cow::Owned(_) = contents {
            warn!(path = %path.display(), "Catalog is not valid UTF-8; bad bytes replaced");
        }

        let mut catalog = match CatalogFormat::from_path(path) {
            CatalogFormat::Json => Catalog::from_json(&contents)?,
            CatalogFormat::Tsv => Catalog::from_tsv(&contents),
        };
        catalog.source = Some(path.to_path_buf());

        info!(records = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    /// Parse TSV catalog text. Never fails; bad lines are skipped.
    pub fn from_tsv(contents: &str) -> Self {
        let mut lines = contents.lines().enumerate().peekable();
        let mut columns: Vec<Option<Field>> = Field::ALL.iter().copied().map(Some).collect();

        if let Some(&(_, first)) = lines.peek() {
            let header: Vec<&str> = first.split('\t').map(str::trim).collect();
            if header.first().is_some_and(|c| c.eq_ignore_ascii_case("pathname")) {
                columns = header
                    .iter()
                    .map(|name| Field::from_name(&name.to_ascii_lowercase()))
                    .collect();
                debug!(columns = ?columns, "Catalog header found");
                lines.next();
            }
        }

        let mut records = Vec::new();
        for (i, line) in lines {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let mut fields = RecordFields::default();
            for (value, column) in line.split('\t').zip(&columns) {
                if let Some(field) = column {
                    *fields.get_mut(*field) = value.to_string();
                }
            }

            if fields.pathname.trim().is_empty() {
                warn!(line = i + 1, "Skipping catalog line without a pathname");
                continue;
            }
            records.push(CatalogRecord::from_fields(complete(fields)));
        }

        Catalog::from_records(records)
    }

    /// Parse a JSON array of record objects.
    pub fn from_json(contents: &str) -> Result<Self> {
        let raw: Vec<RecordFields> = serde_json::from_str(contents)
            .map_err(|e| CadenzaError::unreadable(format!("invalid JSON catalog: {}", e)))?;

        let total = raw.len();
        let records: Vec<CatalogRecord> = raw
            .into_iter()
            .filter(|r| !r.pathname.trim().is_empty())
            .map(|r| CatalogRecord::from_fields(complete(r)))
            .collect();

        if records.len() < total {
            warn!(
                skipped = total - records.len(),
                "Skipping catalog entries without a pathname"
            );
        }
        Ok(Catalog::from_records(records))
    }

    /// Write the catalog as TSV with a header line.
    pub fn to_tsv(&self) -> String {
        let mut out = Field::ALL.map(|f| f.name()).join("\t");
        out.push('\n');
        for record in &self.records {
            let row: Vec<&str> = Field::ALL
                .iter()
                .map(|&f| record.get(f))
                .collect();
            out.push_str(&row.join("\t"));
            out.push('\n');
        }
        out
    }

    /// File the catalog was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Get the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CatalogRecord> {
        self.records.get(index)
    }

    /// Every index, in catalog order.
    pub fn all_hits(&self) -> SearchHits {
        (0..self.records.len()).collect()
    }

    /// Get catalog statistics.
    pub fn stats(&self) -> CatalogStats {
        CatalogStats::collect(&self.records)
    }

    /// Search the catalog.
    #[instrument(skip(self), fields(records = self.records.len()))]
    pub fn search(&self, query: &SearchQuery, options: SearchOptions) -> SearchHits {
        let hits = search_with(&self.records, query, options);
        debug!(hits = hits.len(), "Catalog scan finished");
        hits
    }
}

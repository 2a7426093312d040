//! Core data types for Cadenza.
//!
//! A catalog is an ordered list of [`CatalogRecord`]s. A record's identity is
//! its position in the catalog, so nothing here carries an id of its own.
//!
//! Records are immutable once built. Construction pre-computes the normalized
//! form of every text field, the parsed value of every numeric field, and the
//! free-text haystack, so a scan never re-normalizes catalog data.

use crate::normalize::normalize;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

/// Separator between fields in the free-text haystack. Keeps a term such as
/// `"e a"` from matching across the end of one field and the start of the next.
pub const HAYSTACK_DELIMITER: char = '\0';

/// Extensions treated as audio
pub const AUDIO_EXTENSIONS: &[&str] = &[
    ".flac", ".m4a", ".mid", ".midi", ".mp3", ".ogg", ".wav", ".wave",
];

/// Extensions treated as video
pub const VIDEO_EXTENSIONS: &[&str] = &[
    ".avi", ".m4v", ".mkv", ".mov", ".mp4", ".mpeg", ".mpg", ".ogv", ".webm",
];

static LEADING_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?\d+)").expect("valid integer pattern"));

/// Parse the leading integer of an integer-like string (`"07"`, `" 3/12"`,
/// `"1999-05"`), returning `fallback` when there is none or it overflows.
pub fn parse_int_or(s: &str, fallback: i64) -> i64 {
    LEADING_INTEGER
        .captures(s)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(fallback)
}

/// A named field of a catalog record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Pathname,
    Album,
    Artist,
    Name,
    Disc,
    Track,
    Year,
    Genre,
    Mtime,
}

impl Field {
    /// All fields, in catalog column order.
    pub const ALL: [Field; 9] = [
        Field::Pathname,
        Field::Album,
        Field::Artist,
        Field::Name,
        Field::Disc,
        Field::Track,
        Field::Year,
        Field::Genre,
        Field::Mtime,
    ];

    /// Fields whose normalized values make up the free-text haystack.
    pub const FREE_TEXT: [Field; 6] = [
        Field::Pathname,
        Field::Album,
        Field::Artist,
        Field::Name,
        Field::Genre,
        Field::Year,
    ];

    /// Column name as it appears in catalog headers and JSON objects.
    pub fn name(&self) -> &'static str {
        match self {
            Field::Pathname => "pathname",
            Field::Album => "album",
            Field::Artist => "artist",
            Field::Name => "name",
            Field::Disc => "disc",
            Field::Track => "track",
            Field::Year => "year",
            Field::Genre => "genre",
            Field::Mtime => "mtime",
        }
    }

    /// Look up a field by its column name.
    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Position of this field in a fixed-order catalog line.
    pub fn column(&self) -> usize {
        *self as usize
    }

    /// Numeric fields compare by parsed integer value.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Field::Disc | Field::Track | Field::Year | Field::Mtime)
    }

    /// Value used when a numeric field is not integer-like.
    pub fn fallback(&self) -> i64 {
        match self {
            Field::Disc | Field::Track => 1,
            Field::Year => 1970,
            _ => 0,
        }
    }

    /// Value a record gets when the catalog omits this field.
    pub fn default_value(&self) -> &'static str {
        match self {
            Field::Disc | Field::Track => "1",
            _ => "",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of media a record points at, derived from its extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
    #[default]
    Other,
}

impl MediaKind {
    /// Classify a pathname by its (case-insensitive) extension.
    pub fn of(pathname: &str) -> MediaKind {
        let basename = pathname.rsplit('/').next().unwrap_or(pathname);
        let Some(dot) = basename.rfind('.') else {
            return MediaKind::Other;
        };
        let ext = basename[dot..].to_ascii_lowercase();
        if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Audio
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else {
            MediaKind::Other
        }
    }
}

/// Raw field values of a record, as they come out of a catalog payload.
///
/// Missing keys deserialize as empty strings so loaders can tell "absent"
/// from "defaulted"; [`with_defaults`](Self::with_defaults) fills the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordFields {
    pub pathname: String,
    pub album: String,
    pub artist: String,
    pub name: String,
    pub disc: String,
    pub track: String,
    pub year: String,
    pub genre: String,
    pub mtime: String,
}

impl RecordFields {
    /// Replace empty values with each field's default.
    pub fn with_defaults(mut self) -> Self {
        for field in Field::ALL {
            let value = self.get_mut(field);
            if value.is_empty() {
                value.push_str(field.default_value());
            }
        }
        self
    }

    /// Borrow the raw value of `field`.
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Pathname => &self.pathname,
            Field::Album => &self.album,
            Field::Artist => &self.artist,
            Field::Name => &self.name,
            Field::Disc => &self.disc,
            Field::Track => &self.track,
            Field::Year => &self.year,
            Field::Genre => &self.genre,
            Field::Mtime => &self.mtime,
        }
    }

    /// Mutably borrow the raw value of `field`.
    pub fn get_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Pathname => &mut self.pathname,
            Field::Album => &mut self.album,
            Field::Artist => &mut self.artist,
            Field::Name => &mut self.name,
            Field::Disc => &mut self.disc,
            Field::Track => &mut self.track,
            Field::Year => &mut self.year,
            Field::Genre => &mut self.genre,
            Field::Mtime => &mut self.mtime,
        }
    }
}

/// Values derived from the raw fields at construction time.
#[derive(Debug, Clone, Default)]
struct Derived {
    /// Normalized value per field, in column order
    normalized: [String; 9],
    /// Parsed value per field (fallback applied), in column order
    numbers: [i64; 9],
    /// Normalized free-text fields joined by `HAYSTACK_DELIMITER`
    haystack: String,
    media_kind: MediaKind,
}

/// A single media item in the catalog.
///
/// ## Design Notes
///
/// - Raw values are kept for display and for regex tests against the
///   original spelling.
/// - Normalized values and parsed integers are pre-computed so the scan
///   compares against ready-made strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RecordFields", into = "RecordFields")]
pub struct CatalogRecord {
    fields: RecordFields,
    derived: Derived,
}

impl From<RecordFields> for CatalogRecord {
    fn from(fields: RecordFields) -> Self {
        CatalogRecord::from_fields(fields.with_defaults())
    }
}

impl From<CatalogRecord> for RecordFields {
    fn from(record: CatalogRecord) -> Self {
        record.fields
    }
}

impl CatalogRecord {
    /// Create a record with only a pathname; other fields take their defaults.
    pub fn new(pathname: impl Into<String>) -> Self {
        CatalogRecord::from_fields(
            RecordFields {
                pathname: pathname.into(),
                ..RecordFields::default()
            }
            .with_defaults(),
        )
    }

    /// Build a record from raw field values.
    pub fn from_fields(fields: RecordFields) -> Self {
        let mut record = CatalogRecord {
            fields,
            derived: Derived::default(),
        };
        record.init_cache();
        record
    }

    /// Return a copy of this record with `field` set to `value`.
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        *self.fields.get_mut(field) = value.into();
        self.init_cache();
        self
    }

    fn init_cache(&mut self) {
        let mut derived = Derived::default();
        for field in Field::ALL {
            let raw = self.fields.get(field);
            derived.normalized[field.column()] = normalize(raw);
            derived.numbers[field.column()] = parse_int_or(raw, field.fallback());
        }

        let mut haystack = String::new();
        for (i, field) in Field::FREE_TEXT.iter().enumerate() {
            if i > 0 {
                haystack.push(HAYSTACK_DELIMITER);
            }
            haystack.push_str(&derived.normalized[field.column()]);
        }
        derived.haystack = haystack;
        derived.media_kind = MediaKind::of(&self.fields.pathname);

        self.derived = derived;
    }

    /// Raw value of `field`.
    pub fn get(&self, field: Field) -> &str {
        self.fields.get(field)
    }

    /// Normalized value of `field`.
    pub fn normalized(&self, field: Field) -> &str {
        &self.derived.normalized[field.column()]
    }

    /// Integer value of `field`, with the field's fallback applied.
    pub fn number(&self, field: Field) -> i64 {
        self.derived.numbers[field.column()]
    }

    /// Normalized free-text haystack.
    pub fn haystack(&self) -> &str {
        &self.derived.haystack
    }

    /// True if `field` holds something other than whitespace.
    pub fn has(&self, field: Field) -> bool {
        !self.fields.get(field).trim().is_empty()
    }

    /// Media kind derived from the pathname extension.
    pub fn media_kind(&self) -> MediaKind {
        self.derived.media_kind
    }

    /// Raw field values.
    pub fn fields(&self) -> &RecordFields {
        &self.fields
    }

    pub fn pathname(&self) -> &str {
        &self.fields.pathname
    }

    pub fn artist(&self) -> &str {
        &self.fields.artist
    }

    pub fn album(&self) -> &str {
        &self.fields.album
    }

    pub fn name(&self) -> &str {
        &self.fields.name
    }
}

impl PartialEq for CatalogRecord {
    fn eq(&self, other: &Self) -> bool {
        self.fields.pathname == other.fields.pathname
    }
}

impl Eq for CatalogRecord {}

/// Ordered catalog indices satisfying a query, in scan order.
pub type SearchHits = Vec<usize>;

/// Statistics about a loaded catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogStats {
    /// Total number of records
    pub records: u64,

    /// Records with an audio extension
    pub audio: u64,

    /// Records with a video extension
    pub video: u64,

    /// Distinct artists (after normalization)
    pub artists: u64,

    /// Distinct albums (after normalization)
    pub albums: u64,
}

impl CatalogStats {
    /// Compute statistics over a sequence of records.
    pub fn collect<'a>(records: impl IntoIterator<Item = &'a CatalogRecord>) -> Self {
        let mut stats = CatalogStats::default();
        let mut artists = HashSet::new();
        let mut albums = HashSet::new();

        for record in records {
            stats.records += 1;
            match record.media_kind() {
                MediaKind::Audio => stats.audio += 1,
                MediaKind::Video => stats.video += 1,
                MediaKind::Other => {}
            }
            if record.has(Field::Artist) {
                artists.insert(record.normalized(Field::Artist));
            }
            if record.has(Field::Album) {
                albums.insert(record.normalized(Field::Album));
            }
        }

        stats.artists = artists.len() as u64;
        stats.albums = albums.len() as u64;
        stats
    }
}

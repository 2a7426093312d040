//! Error types for Cadenza core operations.
//!
//! The query engine itself never fails: every query string produces a hit
//! list. Errors only come from the edges of the library (loading a catalog,
//! reading configuration, talking to the search worker). Library code uses
//! `CadenzaError`, while the CLI wraps it in `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using CadenzaError
pub type Result<T> = std::result::Result<T, CadenzaError>;

/// Core error types for Cadenza operations.
#[derive(Error, Debug)]
pub enum CadenzaError {
    // === Catalog Errors ===
    /// The catalog file is missing
    #[error("catalog not found at {path}")]
    CatalogNotFound { path: PathBuf },

    /// The catalog payload could not be interpreted
    #[error("catalog is unreadable: {reason}")]
    CatalogUnreadable { reason: String },

    // === Configuration Errors ===
    /// Configuration file parsing failed
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    // === Worker Errors ===
    /// The background search worker has gone away
    #[error("search worker disconnected")]
    WorkerDisconnected,

    // === I/O Errors ===
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// Serialization/deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl CadenzaError {
    /// Returns true if the catalog must be (re)loaded before searching again
    pub fn requires_reload(&self) -> bool {
        matches!(
            self,
            CadenzaError::CatalogNotFound { .. } | CadenzaError::CatalogUnreadable { .. }
        )
    }

    /// Returns true if this error is recoverable (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CadenzaError::Io(_))
    }

    /// Create a catalog format error
    pub fn unreadable(reason: impl Into<String>) -> Self {
        CadenzaError::CatalogUnreadable {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for CadenzaError {
    fn from(err: serde_json::Error) -> Self {
        CadenzaError::Serialization(err.to_string())
    }
}

//! Configuration management for Cadenza.
//!
//! Configuration is stored in TOML format in a platform-appropriate location.
//! Every section is optional; missing keys take their defaults.

use crate::error::{CadenzaError, Result};
use crate::expr::DEFAULT_RECENT_MONTHS;
use crate::order::SortBy;
use crate::search::{Dialect, QueryParser, SearchOptions, DEFAULT_PARALLEL_THRESHOLD};
use crate::worker::WorkerSettings;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const CONFIG_FILE: &str = "cadenza.toml";
const DEFAULT_CATALOG_FILE: &str = "catalog.tsv";

/// Main configuration structure for Cadenza.
///
/// ## Example Configuration File (cadenza.toml)
///
/// ```toml
/// [general]
/// catalog_path = "/srv/music/catalog.tsv"
/// max_results = 5000
///
/// [search]
/// dialect = "auto"
/// parallel_search = true
/// recent_months = 3
///
/// [ui]
/// sort_by = "artist"
/// debounce_ms = 80
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Query parsing and scan tuning
    pub search: SearchConfig,

    /// Interactive UI settings
    pub ui: UiConfig,
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Catalog file location (None = default location)
    pub catalog_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Maximum number of search results to show
    pub max_results: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            catalog_path: None,
            log_level: "info".to_string(),
            max_results: 10000,
        }
    }
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Query dialect used when none is given
    pub dialect: Dialect,

    /// Use parallel search for large catalogs
    pub parallel_search: bool,

    /// Threshold for switching to parallel search
    pub parallel_threshold: usize,

    /// Width of the `recent` window, in months
    pub recent_months: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            dialect: Dialect::Auto,
            parallel_search: true,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            recent_months: DEFAULT_RECENT_MONTHS,
        }
    }
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Result ordering
    pub sort_by: SortBy,

    /// Number of results to scroll per page
    pub page_size: usize,

    /// Quiet period after a keystroke before searching
    pub debounce_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            sort_by: SortBy::Album,
            page_size: 100,
            debounce_ms: 120,
        }
    }
}

impl UiConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default config if no config file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        info!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(|e| CadenzaError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
        })?;

        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Saving configuration");
        let contents = toml::to_string_pretty(self).map_err(|e| CadenzaError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, contents)?;
        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "cadenza").ok_or_else(|| CadenzaError::ConfigError {
            reason: "Could not determine project directories".to_string(),
        })
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join(CONFIG_FILE))
    }

    /// Get the default data directory path.
    pub fn default_data_dir() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    /// Get the catalog file (from config or default).
    pub fn catalog_path(&self) -> Result<PathBuf> {
        match self.general.catalog_path {
            Some(ref path) => Ok(path.clone()),
            None => Ok(Self::default_data_dir()?.join(DEFAULT_CATALOG_FILE)),
        }
    }

    /// Scan options derived from the `[search]` section.
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            parallel: self.search.parallel_search,
            parallel_threshold: self.search.parallel_threshold,
        }
    }

    /// A query parser set up with the configured dialect and window.
    pub fn query_parser(&self) -> QueryParser {
        QueryParser::new(self.search.dialect).with_recent_months(self.search.recent_months)
    }

    /// Settings for an interactive search worker.
    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            dialect: self.search.dialect,
            recent_months: self.search.recent_months,
            options: self.search_options(),
        }
    }

    /// Cap on displayed results; `max_results = 0` means no cap.
    pub fn result_limit(&self) -> Option<usize> {
        Some(self.general.max_results).filter(|&n| n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.max_results, 10000);
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.search.dialect, Dialect::Auto);
        assert_eq!(config.search.recent_months, 2);
        assert_eq!(config.ui.sort_by, SortBy::Album);
        assert_eq!(config.ui.debounce(), Duration::from_millis(120));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("test.toml");

        let mut config = Config::default();
        config.general.max_results = 5000;
        config.general.catalog_path = Some(PathBuf::from("/srv/music/catalog.json"));
        config.search.dialect = Dialect::Expression;
        config.ui.sort_by = SortBy::Artist;

        config.save_to(&config_path).unwrap();
        let loaded = Config::load_from(&config_path).unwrap();

        assert_eq!(loaded.general.max_results, 5000);
        assert_eq!(
            loaded.catalog_path().unwrap(),
            PathBuf::from("/srv/music/catalog.json")
        );
        assert_eq!(loaded.search.dialect, Dialect::Expression);
        assert_eq!(loaded.ui.sort_by, SortBy::Artist);
    }

    #[test]
    fn test_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.general.max_results, 10000); // Default value
    }

    #[test]
    fn test_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.toml");
        fs::write(&config_path, "[search]\ndialect = \"terms\"\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.search.dialect, Dialect::Terms);
        assert!(config.search.parallel_search);
        assert_eq!(config.ui.page_size, 100);
    }

    #[test]
    fn test_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("broken.toml");
        fs::write(&config_path, "[search]\ndialect = \"lisp\"\n").unwrap();

        let result = Config::load_from(&config_path);
        assert!(matches!(result, Err(CadenzaError::ConfigError { .. })));
    }

    #[test]
    fn test_worker_settings() {
        let mut config = Config::default();
        config.search.parallel_search = false;
        config.search.parallel_threshold = 500;

        let settings = config.worker_settings();
        assert!(!settings.options.parallel);
        assert_eq!(settings.options.parallel_threshold, 500);
    }

    #[test]
    fn test_result_limit() {
        let mut config = Config::default();
        assert_eq!(config.result_limit(), Some(10000));
        config.general.max_results = 0;
        assert_eq!(config.result_limit(), None);
    }
}

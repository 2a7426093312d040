//! Application state management.

use cadenza_core::{Catalog, Config};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Shared application state.
pub struct App {
    /// Configuration
    pub config: Config,

    /// Resolved catalog file
    pub catalog_path: PathBuf,

    /// The loaded catalog
    pub catalog: Arc<Catalog>,
}

impl App {
    /// Create a new application instance, loading the configured catalog.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let catalog_path = config.catalog_path()?;
        let catalog = match Catalog::load(&catalog_path) {
            Ok(catalog) => Arc::new(catalog),
            Err(e) if e.requires_reload() => anyhow::bail!(
                "{}\nPoint --catalog or general.catalog_path at a TSV or JSON catalog.",
                e
            ),
            Err(e) => return Err(e.into()),
        };

        info!(
            catalog = %catalog_path.display(),
            records = catalog.len(),
            "Application initialized"
        );

        Ok(App {
            config,
            catalog_path,
            catalog,
        })
    }
}

//! Status command - show catalog status and statistics.

use crate::app::App;
use cadenza_core::Config;

/// Run the status command.
pub fn run(config: Config) -> anyhow::Result<()> {
    let config_path = Config::default_config_path()?;
    let app = App::new(config)?;
    let stats = app.catalog.stats();

    println!("Cadenza Catalog Status");
    println!("======================");
    println!();

    if app.catalog.is_empty() {
        println!("Catalog is empty.");
    } else {
        println!("Summary:");
        println!("  Items:            {}", stats.records);
        println!("  Audio:            {}", stats.audio);
        println!("  Video:            {}", stats.video);
        println!("  Other:            {}", stats.records - stats.audio - stats.video);
        println!("  Artists:          {}", stats.artists);
        println!("  Albums:           {}", stats.albums);
    }

    println!();
    println!("Search:");
    println!("  Dialect:          {}", app.config.search.dialect);
    println!(
        "  Parallel scan:    {} (above {} items)",
        if app.config.search.parallel_search { "on" } else { "off" },
        app.config.search.parallel_threshold
    );
    println!("  Recent window:    {} months", app.config.search.recent_months);

    println!();
    println!("Catalog file:   {}", app.catalog_path.display());
    println!("Default config: {}", config_path.display());

    Ok(())
}

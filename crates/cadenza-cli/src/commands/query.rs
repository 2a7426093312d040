//! Query command - search the catalog.

use crate::app::App;
use crate::OutputFormat;
use cadenza_core::{arrange_hits, CatalogRecord, Config, Dialect, SortBy};
use std::time::Instant;

/// Options of the query command not covered by the configuration.
pub struct QueryArgs {
    pub dialect: Option<Dialect>,
    pub limit: Option<usize>,
    pub sort: Option<SortBy>,
    pub output: OutputFormat,
}

/// Run the query command.
pub fn run(config: Config, query_text: &str, args: QueryArgs) -> anyhow::Result<()> {
    let app = App::new(config)?;

    let parser = app.config.query_parser();
    let dialect = args.dialect.unwrap_or(parser.dialect());
    let query = parser.parse_as(query_text, dialect);

    let start = Instant::now();
    let mut hits = app.catalog.search(&query, app.config.search_options());
    let elapsed = start.elapsed();
    let total = hits.len();

    let sort_by = args.sort.unwrap_or(app.config.ui.sort_by);
    let limit = args.limit.or_else(|| app.config.result_limit());
    arrange_hits(&app.catalog, &mut hits, sort_by, limit);

    let rows: Vec<(usize, &CatalogRecord)> = hits
        .iter()
        .filter_map(|&i| app.catalog.get(i).map(|record| (i, record)))
        .collect();

    match args.output {
        OutputFormat::Text => {
            for (_, record) in &rows {
                println!("{}", format_record(record));
            }
        }
        OutputFormat::Ids => {
            for (i, _) in &rows {
                println!("{}", i);
            }
        }
        OutputFormat::Json => {
            let json_results: Vec<serde_json::Value> = rows
                .iter()
                .map(|(i, record)| {
                    serde_json::json!({
                        "index": i,
                        "record": record,
                    })
                })
                .collect();

            println!("{}", serde_json::to_string_pretty(&json_results)?);
        }
    }

    eprintln!();
    eprintln!(
        "Found {} results ({} shown) in {:.3}ms",
        total,
        rows.len(),
        elapsed.as_secs_f64() * 1000.0
    );

    Ok(())
}

/// One display line: `artist - album - track. name  (pathname)`.
pub fn format_record(record: &CatalogRecord) -> String {
    let artist = non_empty(record.artist(), "?");
    let album = non_empty(record.album(), "?");
    let name = non_empty(record.name(), record.pathname());
    format!(
        "{} - {} - {}. {}  ({})",
        artist,
        album,
        record.get(cadenza_core::Field::Track),
        name,
        record.pathname()
    )
}

fn non_empty<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

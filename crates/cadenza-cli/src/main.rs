//! # Cadenza CLI
//!
//! Command-line interface for the Cadenza media-library search engine.
//!
//! ## Commands
//!
//! - `cadenza query <query>` - Print catalog items matching a query
//! - `cadenza explain <query>` - Show how a query is parsed
//! - `cadenza status` - Show catalog statistics
//! - `cadenza interactive` - Start interactive TUI mode
//!
//! ## Example Usage
//!
//! ```bash
//! # Term dialect
//! cadenza query 'artist:prince -live after:1980'
//!
//! # Expression dialect
//! cadenza query '(and (artist ^prince) (year 1984 1987))'
//!
//! # Interactive search
//! cadenza --catalog ~/Music/catalog.tsv interactive
//! ```

mod app;
mod commands;
mod tui;

use cadenza_core::{Config, Dialect, SortBy};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Cadenza - Search a media catalog
#[derive(Parser)]
#[command(name = "cadenza")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Catalog file to search (TSV or JSON)
    #[arg(long, global = true, env = "CADENZA_CATALOG")]
    catalog: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print catalog items matching a query
    Query {
        /// Query text (terms, or an expression starting with '(')
        query: String,

        /// Query dialect (defaults to the configured one)
        #[arg(short, long)]
        dialect: Option<DialectArg>,

        /// Maximum number of results to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Result ordering (defaults to the configured one)
        #[arg(short, long)]
        sort: Option<SortArg>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Show how a query is tokenized and parsed
    Explain {
        /// Query text
        query: String,

        /// Query dialect (defaults to the configured one)
        #[arg(short, long)]
        dialect: Option<DialectArg>,
    },

    /// Show catalog status and statistics
    Status,

    /// Start interactive TUI mode
    #[command(alias = "i")]
    Interactive,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    /// Catalog indices only, one per line
    Ids,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DialectArg {
    Terms,
    Expression,
    Auto,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Terms => Dialect::Terms,
            DialectArg::Expression => Dialect::Expression,
            DialectArg::Auto => Dialect::Auto,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SortArg {
    Album,
    Artist,
    None,
}

impl From<SortArg> for SortBy {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Album => SortBy::Album,
            SortArg::Artist => SortBy::Artist,
            SortArg::None => SortBy::None,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(catalog) = cli.catalog.clone() {
        config.general.catalog_path = Some(catalog);
    }

    // Setup logging
    let log_level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.general.log_level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)))
        .init();

    // Execute command
    match cli.command {
        Commands::Query {
            query,
            dialect,
            limit,
            sort,
            output,
        } => commands::query::run(
            config,
            &query,
            commands::query::QueryArgs {
                dialect: dialect.map(Dialect::from),
                limit,
                sort: sort.map(SortBy::from),
                output,
            },
        ),
        Commands::Explain { query, dialect } => {
            commands::explain::run(config, &query, dialect.map(Dialect::from))
        }
        Commands::Status => commands::status::run(config),
        Commands::Interactive => tui::run(config),
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the document search engine.
//!
//! ```text
//! crion search <QUERY>... --rows data/urls.csv [--catalog aliases.toml] [--config search.toml] [--json]
//! crion expand <QUERY>... [--catalog aliases.toml] [--json]
//! crion inspect --rows public/manifest.json [--catalog aliases.toml] [--json]
//! ```
//!
//! `--rows`, `--catalog` and `--config` fall back to `CRION_ROWS`,
//! `CRION_CATALOG` and `CRION_CONFIG`. Set `RUST_LOG=debug` to see which
//! rows were dropped and how a query was expanded.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use crion_search::{AliasCatalog, IndexEntry, QueryExpansion, SearchConfig, SearchIndex};

#[derive(Parser)]
#[command(name = "crion", about = "Search the document catalog by state, city and brand")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CatalogArgs {
    /// Alias catalog TOML replacing the built-in one
    #[arg(long, env = "CRION_CATALOG")]
    catalog: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the documents listed in a row file
    Search {
        /// Query words
        #[arg(required = true)]
        query: Vec<String>,
        /// Row file: `name,url` CSV or JSON manifest
        #[arg(long, env = "CRION_ROWS")]
        rows: PathBuf,
        #[command(flatten)]
        catalog: CatalogArgs,
        /// Scoring configuration TOML
        #[arg(long, env = "CRION_CONFIG")]
        config: Option<PathBuf>,
        /// Print hits as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how a query is interpreted
    Expand {
        /// Query words
        #[arg(required = true)]
        query: Vec<String>,
        #[command(flatten)]
        catalog: CatalogArgs,
        /// Print the expansion as JSON
        #[arg(long)]
        json: bool,
    },
    /// List every index entry with its detected states and cities
    Inspect {
        /// Row file: `name,url` CSV or JSON manifest
        #[arg(long, env = "CRION_ROWS")]
        rows: PathBuf,
        #[command(flatten)]
        catalog: CatalogArgs,
        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            query,
            rows,
            catalog,
            config,
            json,
        } => {
            let config = config.as_deref().map(load_config).transpose()?;
            let index = build_index(&rows, catalog.catalog.as_deref(), config)?;
            let query = query.join(" ");
            let outcome = index.search_with_tier(&query);

            log::info!("Query {query:?} answered by tier {:?}", outcome.tier);

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.hits)?);
            } else if outcome.hits.is_empty() {
                eprintln!("No confident match for {query:?}");
            } else {
                for hit in &outcome.hits {
                    println!("{}\t{}", hit.name, hit.url);
                }
            }
        }
        Commands::Expand {
            query,
            catalog,
            json,
        } => {
            let catalog = load_catalog(catalog.catalog.as_deref())?;
            let catalog = catalog.as_ref().unwrap_or_else(|| AliasCatalog::embedded());
            let expansion = crion_search::expand_query(catalog, &query.join(" "));

            if json {
                println!("{}", serde_json::to_string_pretty(&expansion)?);
            } else {
                print_expansion(&expansion);
            }
        }
        Commands::Inspect {
            rows,
            catalog,
            json,
        } => {
            let index = build_index(&rows, catalog.catalog.as_deref(), None)?;

            if json {
                println!("{}", serde_json::to_string_pretty(index.entries())?);
            } else {
                for entry in index.entries() {
                    print_entry(entry);
                }
                println!("\n{} entries", index.len());
            }
        }
    }

    Ok(())
}

fn build_index(
    rows: &Path,
    catalog: Option<&Path>,
    config: Option<SearchConfig>,
) -> Result<SearchIndex, Box<dyn std::error::Error>> {
    let rows = crion_loader::load_rows(rows)?;

    let mut builder = SearchIndex::builder();
    if let Some(catalog) = load_catalog(catalog)? {
        builder = builder.catalog(catalog);
    }
    if let Some(config) = config {
        builder = builder.config(config);
    }

    Ok(builder.build(&rows))
}

fn load_catalog(path: Option<&Path>) -> Result<Option<AliasCatalog>, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(None);
    };

    let toml_str = std::fs::read_to_string(path)?;
    let catalog = AliasCatalog::from_toml_str(&toml_str)?;
    log::info!("Using alias catalog from {}", path.display());

    Ok(Some(catalog))
}

fn load_config(path: &Path) -> Result<SearchConfig, Box<dyn std::error::Error>> {
    let toml_str = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&toml_str)?)
}

fn print_expansion(expansion: &QueryExpansion) {
    let terms: Vec<&str> = expansion.terms.iter().map(String::as_str).collect();
    println!("terms:  {}", terms.join(" "));
    println!(
        "state:  {}",
        expansion.state.map_or_else(|| "-".to_string(), |s| s.upper())
    );
    println!("city:   {}", expansion.city.as_deref().unwrap_or("-"));
    println!("direct: {}", expansion.direct.as_deref().unwrap_or("-"));
}

fn print_entry(entry: &IndexEntry) {
    let states: Vec<String> = entry.states.iter().map(|s| s.upper()).collect();
    let cities: Vec<&str> = entry.cities.iter().map(String::as_str).collect();

    println!("{}", entry.name);
    println!("  url:     {}", entry.url);
    println!("  states:  {}", states.join(", "));
    println!("  cities:  {}", cities.join(", "));
    println!("  recency: {}", entry.recency);
}

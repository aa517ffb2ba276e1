//! # Academic IR CLI (`air`)
//!
//! The `air` binary queries student, course and document sources from the
//! command line, or serves the same queries over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! air --config ./config/air.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `air sources` | Show every configured source and whether it loads |
//! | `air search "<query>"` | Search entities, metrics and documents |
//! | `air fetch <id> <file>` | Locate (or copy out) a stored document |
//! | `air serve` | Start the JSON HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Everything about one student
//! air search S1
//!
//! # Only course results, as JSON
//! air search "data structures" --filter courses --json
//!
//! # Copy a document out of the corpus
//! air fetch S1 cv.pdf --output ./cv.pdf
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`); logs go to stderr.

use academic_ir::filter::Category;
use academic_ir::snapshot::Snapshot;
use academic_ir::{config, fetch, search, server, sources};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Academic IR: one query over student records, course results and
/// student documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/air.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "air",
    about = "Cross-source retrieval over student records, course results and documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/air.toml`. Relative source paths inside it
    /// resolve against the file's own directory.
    #[arg(long, global = true, default_value = "./config/air.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured sources and their load status.
    Sources,

    /// Search all sources.
    ///
    /// Matches the query case-insensitively against entity fields, metric
    /// records and document names and text.
    Search {
        /// The search query string.
        query: String,

        /// Result category: `all`, `entities` (`students`), `metrics`
        /// (`courses`) or `documents` (`docs`).
        #[arg(long, default_value = "all", value_parser = parse_category)]
        filter: Category,

        /// Print the full response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Locate a stored document by entity id and filename.
    ///
    /// Prints its path, or copies it to `--output`. Exits with status 1
    /// when the document does not exist.
    Fetch {
        entity_id: String,
        filename: String,

        /// Copy the document to this path instead of printing its location.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

fn parse_category(s: &str) -> Result<Category, String> {
    s.parse()
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Search {
            query,
            filter,
            json,
        } => {
            search::run_search(&cfg, &query, filter, json)?;
        }
        Commands::Fetch {
            entity_id,
            filename,
            output,
        } => {
            fetch::run_fetch(&cfg, &entity_id, &filename, output.as_deref())?;
        }
        Commands::Serve => {
            let snapshot = tokio::task::spawn_blocking(move || Snapshot::load(&cfg)).await?;
            server::run_server(Arc::new(snapshot)).await?;
        }
    }

    Ok(())
}

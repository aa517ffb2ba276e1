//! Raw document retrieval for the `air fetch` command.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::corpus::Corpus;

/// CLI entry point: prints the stored path of a document, or copies it to
/// `output` when given. A lookup miss exits with status 1.
pub fn run_fetch(
    config: &Config,
    entity_id: &str,
    filename: &str,
    output: Option<&Path>,
) -> Result<()> {
    let corpus = Corpus::new(&config.sources.documents);
    let path = match corpus.resolve_document_path(entity_id, filename) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match output {
        Some(dest) => {
            let bytes = std::fs::copy(&path, dest)
                .with_context(|| format!("failed to copy {} to {}", path.display(), dest.display()))?;
            tracing::info!(bytes, dest = %dest.display(), "document written");
            println!("{}", dest.display());
        }
        None => println!("{}", path.display()),
    }

    Ok(())
}

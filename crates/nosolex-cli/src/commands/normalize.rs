use std::path::Path;

use anyhow::Result;
use nosolex_normalise::Normaliser;
use tracing::info;

use super::{open, read_corpus, write_lines};
use crate::config::Config;

/// Merge groups printed after a run.
const MERGE_REPORT_ROWS: usize = 10;

pub fn run(
    config: &Config,
    input: &Path,
    output: &Path,
    column: Option<usize>,
    unmatched: Option<&Path>,
) -> Result<()> {
    let (canonicaliser, dictionary) = open(config)?;
    let labels = read_corpus(input, column)?;
    let outcome = Normaliser::new(&canonicaliser, &dictionary).normalise_batch(&labels);

    write_lines(
        output,
        outcome
            .canonical
            .iter()
            .map(|c| c.as_ref().map(|c| c.as_str()).unwrap_or("")),
    )?;
    info!("Wrote {} rows to {}", outcome.len(), output.display());

    if let Some(path) = unmatched {
        let rows = outcome.unmatched.iter().map(|u| {
            format!(
                "{}\t{}\t{}\t{}",
                u.row + 1,
                u.raw,
                u.key.as_deref().unwrap_or(""),
                u.reason.as_str()
            )
        });
        write_lines(path, rows)?;
        info!("Wrote {} unmatched rows to {}", outcome.unmatched.len(), path.display());
    }

    println!(
        "Normalised {} labels: {} matched, {} unmatched ({} empty after normalisation)",
        outcome.len(),
        outcome.matched_count(),
        outcome.unmatched.len(),
        outcome.empty_count()
    );

    let merged: Vec<_> = outcome
        .merge_groups()
        .into_iter()
        .filter(|g| g.variants.len() > 1)
        .take(MERGE_REPORT_ROWS)
        .collect();
    if !merged.is_empty() {
        println!("\nMost merged labels:");
        for group in merged {
            let variants: Vec<&str> = group.variants.iter().map(|v| v.as_str()).collect();
            println!("  {} <- {}", group.canonical, variants.join(" | "));
        }
    }
    Ok(())
}

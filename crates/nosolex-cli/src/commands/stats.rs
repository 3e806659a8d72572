use std::path::Path;

use anyhow::Result;
use nosolex_normalise::{coverage, Normaliser};
use tracing::info;

use super::{open, read_corpus, write_lines};
use crate::config::Config;

pub fn run(config: &Config, input: &Path, column: Option<usize>, candidates: Option<&Path>) -> Result<()> {
    let (canonicaliser, dictionary) = open(config)?;
    let labels = read_corpus(input, column)?;
    let report = coverage::analyze(&labels, &Normaliser::new(&canonicaliser, &dictionary));

    print!("{}", report.render_text(config.coverage.target, config.coverage.top_n));

    if let Some(path) = candidates {
        let entries = report.candidates();
        let lines = entries
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        write_lines(path, &lines)?;
        info!("Wrote {} candidate entries to {}", entries.len(), path.display());
    }
    Ok(())
}

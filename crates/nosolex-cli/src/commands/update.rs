use std::path::Path;

use anyhow::{Context, Result};
use nosolex_normalise::maintenance;
use nosolex_normalise::{Canonicaliser, Dictionary, LoadMode};
use tracing::{info, warn};

use super::load_dictionary;
use crate::config::Config;

/// Merge reviewed entries from `from` into the dictionary. Without `output`
/// the dictionary is backed up and then rewritten in place.
pub fn run(config: &Config, from: &Path, output: Option<&Path>) -> Result<()> {
    let canonicaliser =
        Canonicaliser::new(&config.canonicalise).context("invalid [canonicalise] configuration")?;

    let dictionary_path = config.dictionary.path.as_path();
    let mut dictionary = if dictionary_path.exists() {
        load_dictionary(config)?
    } else {
        info!("{} does not exist yet, starting an empty dictionary", dictionary_path.display());
        Dictionary::new()
    };

    let (incoming, report) = Dictionary::load(from, LoadMode::Lenient)
        .with_context(|| format!("loading new entries {}", from.display()))?;
    if report.warning_count() > 0 {
        warn!("{} malformed line(s) skipped in {}", report.warning_count(), from.display());
    }

    let summary = maintenance::merge_candidates(&mut dictionary, incoming.entries().cloned(), &canonicaliser);

    let target = output.unwrap_or(dictionary_path);
    if output.is_none() && !summary.changed() {
        println!("Dictionary unchanged ({} entries)", dictionary.len());
        return Ok(());
    }
    if target == dictionary_path && dictionary_path.exists() {
        maintenance::backup(dictionary_path, &config.dictionary.backup_dir)?;
    }
    dictionary
        .save(target)
        .with_context(|| format!("saving dictionary {}", target.display()))?;

    println!(
        "Updated {}: {} inserted, {} updated, {} unchanged, {} skipped ({} entries total)",
        target.display(),
        summary.inserted,
        summary.updated,
        summary.unchanged,
        summary.skipped,
        dictionary.len()
    );
    Ok(())
}

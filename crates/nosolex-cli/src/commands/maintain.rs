//! Dictionary maintenance commands that do not change entries.

use anyhow::Result;
use nosolex_normalise::maintenance::{self, MatchField};

use super::{load_dictionary, open};
use crate::config::Config;

/// Hits printed by `search`.
const SEARCH_ROWS: usize = 20;
/// Issues printed per run of `validate`.
const ISSUE_ROWS: usize = 50;

pub fn validate(config: &Config) -> Result<()> {
    let (canonicaliser, dictionary) = open(config)?;
    let issues = maintenance::validate(&dictionary, &canonicaliser);

    if issues.is_empty() {
        println!("No issues found in {} entries.", dictionary.len());
        return Ok(());
    }
    println!("Found {} issue(s) in {} entries:", issues.len(), dictionary.len());
    for issue in issues.iter().take(ISSUE_ROWS) {
        println!("  - {issue}");
    }
    if issues.len() > ISSUE_ROWS {
        println!("  ... and {} more", issues.len() - ISSUE_ROWS);
    }
    Ok(())
}

pub fn search(config: &Config, term: &str) -> Result<()> {
    let dictionary = load_dictionary(config)?;
    let hits = maintenance::search(&dictionary, term);

    println!("Search results for '{}': {} match(es)", term, hits.len());
    for hit in hits.iter().take(SEARCH_ROWS) {
        let field = match hit.field {
            MatchField::Variant => "variant",
            MatchField::Canonical => "canonical",
        };
        let freq = hit.entry.frequency.map(|f| f.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "  {} -> {}  (matched {}, frequency {})",
            hit.entry.variant, hit.entry.canonical, field, freq
        );
    }
    if hits.len() > SEARCH_ROWS {
        println!("  ... and {} more", hits.len() - SEARCH_ROWS);
    }
    Ok(())
}

pub fn summary(config: &Config) -> Result<()> {
    let dictionary = load_dictionary(config)?;
    print!("{}", maintenance::dictionary_stats(&dictionary).render_text());
    Ok(())
}

pub fn backup(config: &Config) -> Result<()> {
    // only back up a file that loads under the current mode
    load_dictionary(config)?;
    let target = maintenance::backup(&config.dictionary.path, &config.dictionary.backup_dir)?;
    println!("Dictionary backed up to {}", target.display());
    Ok(())
}

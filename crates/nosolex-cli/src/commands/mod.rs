//! Subcommand implementations. Each one maps onto a single library call and
//! only adds file handling around it.

pub mod maintain;
pub mod normalize;
pub mod stats;
pub mod update;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use nosolex_common::RawLabel;
use nosolex_normalise::{Canonicaliser, Dictionary};
use tracing::warn;

use crate::config::Config;

/// Build the canonicaliser and load the configured dictionary.
pub fn open(config: &Config) -> Result<(Canonicaliser, Dictionary)> {
    let canonicaliser = Canonicaliser::new(&config.canonicalise).context("invalid [canonicalise] configuration")?;
    let dictionary = load_dictionary(config)?;
    Ok((canonicaliser, dictionary))
}

pub fn load_dictionary(config: &Config) -> Result<Dictionary> {
    let path = &config.dictionary.path;
    let (dictionary, report) = Dictionary::load(path, config.load_mode())
        .with_context(|| format!("loading dictionary {}", path.display()))?;
    if report.warning_count() > 0 {
        warn!(
            "{} malformed line(s) skipped in {} (use --strict to fail instead)",
            report.warning_count(),
            path.display()
        );
    }
    Ok(dictionary)
}

/// One label per line. With `column`, take that tab-separated field
/// (0-based); rows without it count as blank.
pub fn read_corpus(path: &Path, column: Option<usize>) -> Result<Vec<RawLabel>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading corpus {}", path.display()))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    let labels = text
        .lines()
        .map(|line| match column {
            Some(n) => RawLabel::from(line.split('\t').nth(n).unwrap_or("")),
            None => RawLabel::from(line),
        })
        .collect();
    Ok(labels)
}

/// Write `lines` to `path`, one per line.
pub fn write_lines<I, S>(path: &Path, lines: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    fs::write(path, out).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_corpus_plain_and_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.tsv");
        fs::write(&path, "\u{feff}1\t腺癌\tx\r\n2\t\r\n3\n").unwrap();

        let plain = read_corpus(&path, None).unwrap();
        assert_eq!(plain.len(), 3);
        assert_eq!(plain[0].as_str(), "1\t腺癌\tx");

        let col: Vec<String> = read_corpus(&path, Some(1))
            .unwrap()
            .into_iter()
            .map(|l| l.as_str().to_string())
            .collect();
        assert_eq!(col, vec!["腺癌", "", ""]);
    }

    #[test]
    fn test_missing_dictionary_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.dictionary.path = dir.path().join("missing.jsonl");
        let err = open(&config).unwrap_err();
        assert!(format!("{err:#}").contains("open dictionary failed"), "{err:#}");
    }
}

//! Dictionary upkeep: statistics, validation, search, backups and merging
//! new terms back in (the `update` step of the coverage loop).

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use chrono::{Local, Utc};
use nosolex_common::entities::TAG_GENE;
use nosolex_common::{CanonicalLabel, DictionaryEntry, NosolexError, Result};
use tracing::{debug, info};

use crate::canonicalise::Canonicaliser;
use crate::dictionary::{Dictionary, Upsert};

/// Rows shown in the "most merged" list.
const TOP_CANONICALS: usize = 10;

// ── Statistics ────────────────────────────────────────────────────────────────

/// Entry counts by recorded corpus frequency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyBuckets {
    pub one: usize,
    pub two_to_five: usize,
    pub six_to_ten: usize,
    pub eleven_to_twenty: usize,
    pub over_twenty: usize,
    /// No frequency recorded.
    pub unknown: usize,
}

impl FrequencyBuckets {
    fn record(&mut self, frequency: Option<u64>) {
        match frequency {
            None | Some(0) => self.unknown += 1,
            Some(1) => self.one += 1,
            Some(2..=5) => self.two_to_five += 1,
            Some(6..=10) => self.six_to_ten += 1,
            Some(11..=20) => self.eleven_to_twenty += 1,
            Some(_) => self.over_twenty += 1,
        }
    }

    pub fn rows(&self) -> [(&'static str, usize); 6] {
        [
            ("1", self.one),
            ("2-5", self.two_to_five),
            ("6-10", self.six_to_ten),
            ("11-20", self.eleven_to_twenty),
            ("20+", self.over_twenty),
            ("unknown", self.unknown),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DictionaryStats {
    pub entries: usize,
    pub canonical_labels: usize,
    pub total_frequency: u64,
    pub tags: BTreeMap<String, usize>,
    pub categories: BTreeMap<String, usize>,
    pub frequency: FrequencyBuckets,
    /// Canonical labels with the most variant keys, descending.
    pub top_canonicals: Vec<(CanonicalLabel, usize)>,
}

pub fn dictionary_stats(dict: &Dictionary) -> DictionaryStats {
    let mut stats = DictionaryStats { entries: dict.len(), ..Default::default() };
    let mut variants_per_label: Vec<(CanonicalLabel, usize)> = Vec::new();
    let mut position: AHashMap<&str, usize> = AHashMap::new();

    for entry in dict.entries() {
        stats.total_frequency += entry.frequency.unwrap_or(0);
        stats.frequency.record(entry.frequency);
        for tag in &entry.tags {
            *stats.tags.entry(tag.clone()).or_default() += 1;
        }
        let category = entry.category.clone().unwrap_or_else(|| "Unknown".to_string());
        *stats.categories.entry(category).or_default() += 1;

        match position.get(entry.canonical.as_str()) {
            Some(&i) => variants_per_label[i].1 += 1,
            None => {
                position.insert(entry.canonical.as_str(), variants_per_label.len());
                variants_per_label.push((entry.canonical.clone(), 1));
            }
        }
    }

    stats.canonical_labels = variants_per_label.len();
    variants_per_label.sort_by(|a, b| b.1.cmp(&a.1));
    variants_per_label.truncate(TOP_CANONICALS);
    stats.top_canonicals = variants_per_label;
    stats
}

impl DictionaryStats {
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "DICTIONARY STATISTICS");
        let _ = writeln!(out, "{}", "=".repeat(60));
        let _ = writeln!(out, "Entries:                {}", self.entries);
        let _ = writeln!(out, "Canonical labels:       {}", self.canonical_labels);
        let _ = writeln!(out, "Recorded occurrences:   {}", self.total_frequency);

        let _ = writeln!(out, "\nFREQUENCY DISTRIBUTION");
        for (bucket, count) in self.frequency.rows() {
            let _ = writeln!(out, "  {bucket:>7}: {count}");
        }

        if !self.tags.is_empty() {
            let _ = writeln!(out, "\nTAGS");
            for (tag, count) in &self.tags {
                let _ = writeln!(out, "  {tag}: {count}");
            }
        }

        let _ = writeln!(out, "\nCATEGORIES");
        for (category, count) in &self.categories {
            let _ = writeln!(out, "  {category}: {count}");
        }

        let merged: Vec<_> = self.top_canonicals.iter().filter(|(_, n)| *n > 1).collect();
        if !merged.is_empty() {
            let _ = writeln!(out, "\nMOST VARIANTS MERGED");
            for (i, (label, n)) in merged.iter().enumerate() {
                let _ = writeln!(out, "  {:2}. {} ({} variants)", i + 1, label, n);
            }
        }
        out
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// Re-canonicalising the variant key changes it.
    VariantNotCanonical { expected: String },
    VariantEmptyAfterNormalization,
    /// The canonical label would itself be rewritten by canonicalisation.
    CanonicalNotStable { expected: String },
    MissingGeneTag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub variant: String,
    pub kind: IssueKind,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IssueKind::VariantNotCanonical { expected } => {
                write!(f, "'{}': variant is not canonical (expected '{}')", self.variant, expected)
            }
            IssueKind::VariantEmptyAfterNormalization => {
                write!(f, "'{}': variant is empty after normalisation", self.variant)
            }
            IssueKind::CanonicalNotStable { expected } => {
                write!(f, "'{}': canonical label is not stable (becomes '{}')", self.variant, expected)
            }
            IssueKind::MissingGeneTag => {
                write!(f, "'{}': contains a gene token but lacks the '{}' tag", self.variant, TAG_GENE)
            }
        }
    }
}

/// Check every entry against the current rule set. Entries are reported in
/// dictionary order; one entry can produce several issues.
pub fn validate(dict: &Dictionary, canonicaliser: &Canonicaliser) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for entry in dict.entries() {
        let key = canonicaliser.canonicalise(&entry.variant);
        if key.is_empty() {
            issues.push(ValidationIssue {
                variant: entry.variant.clone(),
                kind: IssueKind::VariantEmptyAfterNormalization,
            });
        } else if key != entry.variant {
            issues.push(ValidationIssue {
                variant: entry.variant.clone(),
                kind: IssueKind::VariantNotCanonical { expected: key },
            });
        }

        let canonical = canonicaliser.canonicalise(entry.canonical.as_str());
        if canonical != entry.canonical.as_str() {
            issues.push(ValidationIssue {
                variant: entry.variant.clone(),
                kind: IssueKind::CanonicalNotStable { expected: canonical },
            });
        }

        if canonicaliser.guard().contains_gene(&entry.variant) && !entry.has_tag(TAG_GENE) {
            issues.push(ValidationIssue {
                variant: entry.variant.clone(),
                kind: IssueKind::MissingGeneTag,
            });
        }
    }

    debug!("Validated {} entries: {} issues", dict.len(), issues.len());
    issues
}

// ── Search ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    Variant,
    Canonical,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit<'a> {
    pub entry: &'a DictionaryEntry,
    pub field: MatchField,
}

/// Case-insensitive substring search. The variant is tried before the
/// canonical label; each entry is reported at most once.
pub fn search<'a>(dict: &'a Dictionary, term: &str) -> Vec<SearchHit<'a>> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    dict.entries()
        .filter_map(|entry| {
            if entry.variant.to_lowercase().contains(&needle) {
                Some(SearchHit { entry, field: MatchField::Variant })
            } else if entry.canonical.as_str().to_lowercase().contains(&needle) {
                Some(SearchHit { entry, field: MatchField::Canonical })
            } else {
                None
            }
        })
        .collect()
}

// ── Backup ────────────────────────────────────────────────────────────────────

/// Copy the dictionary file to `backup_dir/dictionary_backup_YYYYmmdd_HHMMSS.jsonl`.
pub fn backup(path: impl AsRef<Path>, backup_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let backup_dir = backup_dir.as_ref();
    fs::create_dir_all(backup_dir).map_err(|e| NosolexError::io("create backup directory", backup_dir, e))?;

    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let mut target = backup_dir.join(format!("dictionary_backup_{stamp}.jsonl"));
    let mut n = 1;
    while target.exists() {
        target = backup_dir.join(format!("dictionary_backup_{stamp}_{n}.jsonl"));
        n += 1;
    }

    fs::copy(path, &target).map_err(|e| NosolexError::io("back up dictionary", path, e))?;
    info!("Dictionary backed up to {}", target.display());
    Ok(target)
}

// ── Merge ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Variants that canonicalised to nothing.
    pub skipped: usize,
}

impl MergeSummary {
    pub fn changed(&self) -> bool {
        self.inserted + self.updated > 0
    }
}

/// Merge reviewed entries into `dict`. Each variant is canonicalised into a
/// key first; the last record for a key wins. New keys are stamped with the
/// current time, existing keys keep their original `added` time.
pub fn merge_candidates<I>(dict: &mut Dictionary, entries: I, canonicaliser: &Canonicaliser) -> MergeSummary
where
    I: IntoIterator<Item = DictionaryEntry>,
{
    let mut summary = MergeSummary::default();
    let now = Utc::now();

    for mut entry in entries {
        let key = canonicaliser.canonicalise(&entry.variant);
        if key.is_empty() {
            debug!("Skipping '{}': empty after normalisation", entry.variant);
            summary.skipped += 1;
            continue;
        }
        entry.variant = key;

        if canonicaliser.guard().contains_gene(&entry.variant) {
            entry.add_tag(TAG_GENE);
        }

        match dict.get(&entry.variant) {
            Some(existing) => {
                entry.added = existing.added.or(entry.added);
                if entry.category.is_none() {
                    entry.category = existing.category.clone();
                }
                if entry.frequency.is_none() {
                    entry.frequency = existing.frequency;
                }
            }
            None => {
                entry.added.get_or_insert(now);
            }
        }

        match dict.upsert_entry(entry) {
            Upsert::Inserted => summary.inserted += 1,
            Upsert::Updated => summary.updated += 1,
            Upsert::Unchanged => summary.unchanged += 1,
        }
    }

    info!(
        "Merged candidates: {} inserted, {} updated, {} unchanged, {} skipped",
        summary.inserted, summary.updated, summary.unchanged, summary.skipped
    );
    summary
}

//! Coverage of a label corpus by the current dictionary.
//!
//! Coverage is occurrence-weighted: a label that appears 40 times counts 40
//! times. Unmatched labels are ranked by how often they occur so dictionary
//! work goes to the highest-impact terms first. Nothing here mutates the
//! dictionary; `candidates()` only proposes entries for the `update` step.

use std::fmt::Write as _;

use ahash::AHashMap;
use nosolex_common::entities::TAG_CANDIDATE;
use nosolex_common::{DictionaryEntry, RawLabel};

use crate::normaliser::{BatchOutcome, MissReason, Normaliser};

/// One distinct unmatched raw label and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmatchedTerm {
    pub raw: RawLabel,
    /// Canonicalised key; `None` when it came out empty.
    pub key: Option<String>,
    pub reason: MissReason,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageReport {
    /// Non-blank label occurrences.
    pub total_labels: usize,
    pub matched_count: usize,
    /// Whitespace-only cells, excluded from `total_labels`.
    pub blank_count: usize,
    /// Non-blank labels that canonicalised to nothing.
    pub empty_count: usize,
    /// Distinct raw labels, frequency descending, first-seen on ties.
    pub unmatched_labels: Vec<UnmatchedTerm>,
    pub dictionary_entries: usize,
}

/// Normalise `labels` and measure how many resolve.
pub fn analyze(labels: &[RawLabel], normaliser: &Normaliser<'_>) -> CoverageReport {
    let outcome = normaliser.normalise_batch(labels);
    let mut report = CoverageReport::from_outcome(&outcome);
    report.dictionary_entries = normaliser.dictionary().len();

    tracing::info!(
        "Coverage {:.2}% ({} of {} labels, {} distinct unmatched)",
        report.coverage() * 100.0,
        report.matched_count,
        report.total_labels,
        report.unmatched_labels.len()
    );
    report
}

impl CoverageReport {
    /// Build from an existing batch result. `dictionary_entries` is left at 0.
    pub fn from_outcome(outcome: &BatchOutcome) -> Self {
        let mut report = CoverageReport {
            matched_count: outcome.matched_count(),
            ..Default::default()
        };

        let mut position: AHashMap<&RawLabel, usize> = AHashMap::new();
        for miss in &outcome.unmatched {
            if miss.raw.is_blank() {
                report.blank_count += 1;
                continue;
            }
            if miss.reason == MissReason::EmptyAfterNormalization {
                report.empty_count += 1;
            }
            match position.get(&miss.raw) {
                Some(&i) => report.unmatched_labels[i].count += 1,
                None => {
                    position.insert(&miss.raw, report.unmatched_labels.len());
                    report.unmatched_labels.push(UnmatchedTerm {
                        raw: miss.raw.clone(),
                        key: miss.key.clone(),
                        reason: miss.reason,
                        count: 1,
                    });
                }
            }
        }

        report.total_labels = outcome.len() - report.blank_count;
        // stable: equal counts keep first-seen order
        report.unmatched_labels.sort_by(|a, b| b.count.cmp(&a.count));
        report
    }

    /// matched / total; 0.0 for an empty corpus.
    pub fn coverage(&self) -> f64 {
        if self.total_labels == 0 {
            return 0.0;
        }
        self.matched_count as f64 / self.total_labels as f64
    }

    pub fn meets_target(&self, target: f64) -> bool {
        self.coverage() >= target
    }

    pub fn unmatched_occurrences(&self) -> usize {
        self.unmatched_labels.iter().map(|t| t.count).sum()
    }

    /// Dictionary entry templates for unmatched keys, most frequent first.
    /// Raw labels sharing a key are merged; empty results are never proposed.
    pub fn candidates(&self) -> Vec<DictionaryEntry> {
        let mut entries: Vec<DictionaryEntry> = Vec::new();
        let mut position: AHashMap<&str, usize> = AHashMap::new();

        for term in &self.unmatched_labels {
            let Some(key) = term.key.as_deref() else { continue };
            match position.get(key) {
                Some(&i) => {
                    let freq = entries[i].frequency.get_or_insert(0);
                    *freq += term.count as u64;
                }
                None => {
                    position.insert(key, entries.len());
                    let mut entry = DictionaryEntry::new(key, key).with_tag(TAG_CANDIDATE);
                    entry.frequency = Some(term.count as u64);
                    entries.push(entry);
                }
            }
        }

        entries.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        entries
    }

    /// Plain-text summary printed by `nosolex stats`.
    pub fn render_text(&self, target: f64, top_n: usize) -> String {
        let mut out = String::new();
        let rule = "=".repeat(60);

        let _ = writeln!(out, "DICTIONARY COVERAGE REPORT");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Dictionary entries:        {}", self.dictionary_entries);
        let _ = writeln!(out, "Labels analysed:           {}", self.total_labels);
        let _ = writeln!(out, "Blank cells skipped:       {}", self.blank_count);
        let _ = writeln!(out, "Matched:                   {}", self.matched_count);
        let _ = writeln!(out, "Empty after normalisation: {}", self.empty_count);
        let _ = writeln!(out, "Unique unmatched labels:   {}", self.unmatched_labels.len());
        let _ = writeln!(out, "Coverage:                  {:.2}%", self.coverage() * 100.0);
        let _ = writeln!(out);

        if !self.unmatched_labels.is_empty() {
            let _ = writeln!(out, "TOP UNMATCHED");
            let _ = writeln!(out, "{}", "-".repeat(30));
            for term in self.unmatched_labels.iter().take(top_n) {
                let _ = writeln!(out, "  {:>6}  {}  [{}]", term.count, term.raw, term.reason.as_str());
            }
            let _ = writeln!(out);
        }

        if self.meets_target(target) {
            let _ = writeln!(out, "Coverage meets the {:.1}% target.", target * 100.0);
        } else {
            let _ = writeln!(
                out,
                "Coverage is below the {:.1}% target: review the candidates and add the most frequent terms.",
                target * 100.0
            );
        }
        out
    }
}

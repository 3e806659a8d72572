//! Raw label → canonical label resolution.
//!
//! The normaliser only composes the canonicaliser (which already runs the
//! gene guard) with an exact dictionary lookup. It never guesses: a key that
//! is not in the dictionary is reported, not approximated.

use nosolex_common::{CanonicalLabel, RawLabel};
use tracing::{debug, info};

use crate::canonicalise::Canonicaliser;
use crate::dictionary::Dictionary;

/// Result of normalising a single label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Matched { key: String, canonical: CanonicalLabel },
    /// Canonicalised key had no dictionary entry.
    NotFound { key: String },
    /// Nothing left after canonicalisation (blank cell, bare marker, status only).
    EmptyAfterNormalization,
}

impl Resolution {
    pub fn canonical(&self) -> Option<&CanonicalLabel> {
        match self {
            Resolution::Matched { canonical, .. } => Some(canonical),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Resolution::Matched { key, .. } | Resolution::NotFound { key } => Some(key),
            Resolution::EmptyAfterNormalization => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Resolution::Matched { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissReason {
    NotFound,
    EmptyAfterNormalization,
}

impl MissReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissReason::NotFound => "not-found",
            MissReason::EmptyAfterNormalization => "empty-after-normalization",
        }
    }
}

/// A label the batch could not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmatchedLabel {
    /// Position in the input batch.
    pub row: usize,
    pub raw: RawLabel,
    /// Canonicalised key; `None` when it came out empty.
    pub key: Option<String>,
    pub reason: MissReason,
}

/// A canonical label and the distinct raw variants that reached it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeGroup {
    pub canonical: CanonicalLabel,
    /// Distinct raw labels, first-seen order.
    pub variants: Vec<RawLabel>,
}

/// Per-row results of `normalise_batch`, aligned with the input.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub canonical: Vec<Option<CanonicalLabel>>,
    /// Unresolved rows in input order.
    pub unmatched: Vec<UnmatchedLabel>,
    raw: Vec<RawLabel>,
}

impl BatchOutcome {
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    pub fn matched_count(&self) -> usize {
        self.canonical.iter().filter(|c| c.is_some()).count()
    }

    pub fn empty_count(&self) -> usize {
        self.unmatched
            .iter()
            .filter(|u| u.reason == MissReason::EmptyAfterNormalization)
            .count()
    }

    pub fn raw(&self) -> &[RawLabel] {
        &self.raw
    }

    /// Every canonical label produced with the distinct raw spellings that
    /// reached it. Most-merged first; ties keep first-appearance order.
    pub fn merge_groups(&self) -> Vec<MergeGroup> {
        let mut groups: Vec<MergeGroup> = Vec::new();
        let mut position: ahash::AHashMap<&str, usize> = ahash::AHashMap::new();

        for (raw, canonical) in self.raw.iter().zip(&self.canonical) {
            let Some(canonical) = canonical else { continue };
            let idx = *position.entry(canonical.as_str()).or_insert_with(|| {
                groups.push(MergeGroup { canonical: canonical.clone(), variants: Vec::new() });
                groups.len() - 1
            });
            let variants = &mut groups[idx].variants;
            if !variants.contains(raw) {
                variants.push(raw.clone());
            }
        }

        groups.sort_by(|a, b| b.variants.len().cmp(&a.variants.len()));
        groups
    }
}

/// Borrows its rule set and dictionary; build once, share across threads.
#[derive(Debug, Clone, Copy)]
pub struct Normaliser<'a> {
    canonicaliser: &'a Canonicaliser,
    dictionary: &'a Dictionary,
}

impl<'a> Normaliser<'a> {
    pub fn new(canonicaliser: &'a Canonicaliser, dictionary: &'a Dictionary) -> Self {
        Self { canonicaliser, dictionary }
    }

    pub fn canonicaliser(&self) -> &'a Canonicaliser {
        self.canonicaliser
    }

    pub fn dictionary(&self) -> &'a Dictionary {
        self.dictionary
    }

    pub fn normalise(&self, raw: &str) -> Resolution {
        let key = self.canonicaliser.canonicalise(raw);
        if key.is_empty() {
            return Resolution::EmptyAfterNormalization;
        }
        match self.dictionary.lookup(&key) {
            Some(canonical) => Resolution::Matched { canonical: canonical.clone(), key },
            None => Resolution::NotFound { key },
        }
    }

    pub fn normalise_batch(&self, labels: &[RawLabel]) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            canonical: Vec::with_capacity(labels.len()),
            unmatched: Vec::new(),
            raw: labels.to_vec(),
        };

        for (row, raw) in labels.iter().enumerate() {
            if row > 0 && row % 100 == 0 {
                debug!("Normalised {}/{} labels", row, labels.len());
            }

            let resolution = self.normalise(raw.as_str());
            let (canonical, miss) = match resolution {
                Resolution::Matched { canonical, .. } => (Some(canonical), None),
                Resolution::NotFound { key } => (None, Some((Some(key), MissReason::NotFound))),
                Resolution::EmptyAfterNormalization => {
                    (None, Some((None, MissReason::EmptyAfterNormalization)))
                }
            };
            if let Some((key, reason)) = miss {
                outcome.unmatched.push(UnmatchedLabel { row, raw: raw.clone(), key, reason });
            }
            outcome.canonical.push(canonical);
        }

        info!(
            "Batch normalised: {} labels, {} matched, {} unmatched",
            outcome.len(),
            outcome.matched_count(),
            outcome.unmatched.len()
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::LoadMode;

    fn dictionary() -> Dictionary {
        let text = [
            r#"{"variant":"腺癌","canonical":"腺癌"}"#,
            r#"{"variant":"扁平上皮癌","canonical":"扁平上皮癌"}"#,
            r#"{"variant":"肺癌","canonical":"肺癌"}"#,
            r#"{"variant":"肺の癌","canonical":"肺癌"}"#,
            r#"{"variant":"ETV6::NTRK3","canonical":"ETV6::NTRK3","tags":["gene-containing"]}"#,
        ]
        .join("\n");
        Dictionary::from_jsonl(&text, LoadMode::Strict).unwrap().0
    }

    fn labels(items: &[&str]) -> Vec<RawLabel> {
        items.iter().map(|s| RawLabel::from(*s)).collect()
    }

    #[test]
    fn test_normalise_strips_then_looks_up() {
        let c = Canonicaliser::default();
        let d = dictionary();
        let n = Normaliser::new(&c, &d);

        let r = n.normalise("1) 腺癌（陰性）");
        assert_eq!(r.canonical().map(|c| c.as_str()), Some("腺癌"));
        assert_eq!(r.key(), Some("腺癌"));

        assert_eq!(n.normalise("２）扁平上皮癌").canonical().unwrap().as_str(), "扁平上皮癌");
    }

    #[test]
    fn test_gene_label_resolves_verbatim() {
        let c = Canonicaliser::default();
        let d = dictionary();
        let n = Normaliser::new(&c, &d);
        assert_eq!(n.normalise("ETV6::NTRK3").canonical().unwrap().as_str(), "ETV6::NTRK3");
    }

    #[test]
    fn test_miss_reasons() {
        let c = Canonicaliser::default();
        let d = dictionary();
        let n = Normaliser::new(&c, &d);
        assert_eq!(n.normalise("a: "), Resolution::EmptyAfterNormalization);
        assert_eq!(n.normalise("（陰性）"), Resolution::EmptyAfterNormalization);
        assert_eq!(n.normalise("未知の病変"), Resolution::NotFound { key: "未知の病変".to_string() });
    }

    #[test]
    fn test_batch_aligned_with_input() {
        let c = Canonicaliser::default();
        let d = dictionary();
        let n = Normaliser::new(&c, &d);

        let out = n.normalise_batch(&labels(&["腺癌", "謎", "", "肺がん"]));
        assert_eq!(out.len(), 4);
        assert_eq!(out.matched_count(), 2);
        assert_eq!(out.empty_count(), 1);
        assert!(out.canonical[1].is_none());
        assert_eq!(out.canonical[3].as_ref().unwrap().as_str(), "肺癌");

        let rows: Vec<usize> = out.unmatched.iter().map(|u| u.row).collect();
        assert_eq!(rows, vec![1, 2]);
        assert_eq!(out.unmatched[0].reason, MissReason::NotFound);
        assert_eq!(out.unmatched[0].key.as_deref(), Some("謎"));
    }

    #[test]
    fn test_empty_batch() {
        let c = Canonicaliser::default();
        let d = Dictionary::new();
        let out = Normaliser::new(&c, &d).normalise_batch(&[]);
        assert!(out.is_empty());
        assert!(out.unmatched.is_empty());
    }

    #[test]
    fn test_merge_groups() {
        let c = Canonicaliser::default();
        let d = dictionary();
        let n = Normaliser::new(&c, &d);

        let out = n.normalise_batch(&labels(&["肺がん", "腺癌", "肺の癌", "肺がん", "1) 肺癌"]));
        let groups = out.merge_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].canonical.as_str(), "肺癌");
        assert_eq!(groups[0].variants, labels(&["肺がん", "肺の癌", "1) 肺癌"]));
        assert_eq!(groups[1].canonical.as_str(), "腺癌");
        assert_eq!(groups[1].variants.len(), 1);
    }
}

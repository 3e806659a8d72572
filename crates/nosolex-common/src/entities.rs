/// Core label types shared by the normaliser, the dictionary store and the CLI.
/// Labels are plain strings on the wire; the newtypes only keep raw and
/// canonical text from being mixed up in signatures.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// A disease label exactly as extracted from the source column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawLabel(String);

impl RawLabel {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A blank spreadsheet cell: nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// The preferred surface form of a disease concept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalLabel(String);

impl CanonicalLabel {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

macro_rules! label_conversions {
    ($ty:ident) => {
        impl From<&str> for $ty {
            fn from(s: &str) -> Self {
                $ty(s.to_string())
            }
        }

        impl From<String> for $ty {
            fn from(s: String) -> Self {
                $ty(s)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

label_conversions!(RawLabel);
label_conversions!(CanonicalLabel);

// ---------------------------------------------------------------------------
// Dictionary record
// ---------------------------------------------------------------------------

/// Tag set on entries whose variant key contains a protected gene token.
pub const TAG_GENE: &str = "gene-containing";

/// Tag set on entries proposed by the coverage report and not yet curated.
pub const TAG_CANDIDATE: &str = "candidate";

/// One line of the dictionary file: variant key → canonical label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    /// Canonicalised raw variant used as the lookup key.
    pub variant: String,
    pub canonical: CanonicalLabel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Occurrences observed in the corpus the entry was authored from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<DateTime<Utc>>,
}

impl DictionaryEntry {
    pub fn new(variant: impl Into<String>, canonical: impl Into<CanonicalLabel>) -> Self {
        Self {
            variant: variant.into(),
            canonical: canonical.into(),
            tags: Vec::new(),
            category: None,
            frequency: None,
            added: None,
        }
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.add_tag(tag);
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Add a tag unless already present. Returns true if it was added.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        if self.has_tag(tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_serializes_minimal_fields() {
        let entry = DictionaryEntry::new("腺癌", "腺癌");
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"variant":"腺癌","canonical":"腺癌"}"#);
    }

    #[test]
    fn test_entry_parses_optional_fields() {
        let line = r#"{"variant":"ETV6::NTRK3","canonical":"ETV6::NTRK3","tags":["gene-containing"],"frequency":4}"#;
        let entry: DictionaryEntry = serde_json::from_str(line).unwrap();
        assert!(entry.has_tag(TAG_GENE));
        assert_eq!(entry.frequency, Some(4));
        assert!(entry.added.is_none());
    }

    #[test]
    fn test_add_tag_is_idempotent() {
        let mut entry = DictionaryEntry::new("C3", "C3");
        assert!(entry.add_tag(TAG_GENE));
        assert!(!entry.add_tag(TAG_GENE));
        assert_eq!(entry.tags.len(), 1);
    }

    #[test]
    fn test_blank_raw_label() {
        assert!(RawLabel::from("  \t").is_blank());
        assert!(!RawLabel::from("a: ").is_blank());
    }
}

//! Gene-token protection.
//!
//! Gene symbols and fusion notations (`MLH1`, `C3`, `ETV6::NTRK3`) must come
//! out of canonicalisation byte-for-byte. The guard swaps every such span for a
//! private-use placeholder before the text rules run and swaps it back after.
//!
//! Detection is a conservative pattern, not a gene database:
//! - a maximal ASCII alphanumeric run that starts with an upper-case letter,
//!   is at least two characters long and contains no lower-case letters
//! - two or more such runs chained with `::` form a single fusion token
//! - literal symbols from an optional allowlist (`p53`, `c-KIT`) that the
//!   pattern cannot express
//!
//! Ordinary upper-case abbreviations are protected too. That is accepted:
//! a missed normalisation is cheaper than a corrupted gene name.

use std::cmp::Reverse;
use std::sync::OnceLock;

use aho_corasick::{AhoCorasick, MatchKind};
use regex::Regex;

/// Placeholder delimiters. Private-use code points, never produced by NFKC.
pub const PLACEHOLDER_OPEN: char = '\u{E000}';
pub const PLACEHOLDER_CLOSE: char = '\u{E001}';

/// Separator used in fusion notation.
pub const FUSION_SEPARATOR: &str = "::";

/// ASCII alphanumeric runs, optionally chained with `::`.
fn alnum_chain() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9]+(?:::[A-Za-z0-9]+)*").unwrap())
}

pub fn is_sentinel(c: char) -> bool {
    c == PLACEHOLDER_OPEN || c == PLACEHOLDER_CLOSE
}

/// A protected byte range of the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Spans removed by `protect`, indexed by placeholder number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedSpans(Vec<String>);

impl ProtectedSpans {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.0.get(idx).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeneTokenGuard {
    /// Literal symbols protected in addition to the pattern.
    allowlist: Option<AhoCorasick>,
    allowlist_len: usize,
}

impl GeneTokenGuard {
    /// Guard using only the upper-case pattern.
    pub fn new() -> Self {
        Self::default()
    }

    /// Guard that also protects the given literal symbols (case-sensitive).
    pub fn with_allowlist<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = symbols
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if patterns.is_empty() {
            return Self::new();
        }

        // MatchKind::LeftmostLongest so `c-KIT2` wins over `c-KIT`
        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostLongest)
            .build(&patterns)
            .ok();
        if automaton.is_none() {
            tracing::warn!("Gene allowlist could not be compiled; falling back to pattern only");
        }

        Self {
            allowlist_len: if automaton.is_some() { patterns.len() } else { 0 },
            allowlist: automaton,
        }
    }

    pub fn allowlist_len(&self) -> usize {
        self.allowlist_len
    }

    /// Does `part` look like a gene symbol on its own?
    pub fn is_gene_symbol(part: &str) -> bool {
        let mut chars = part.chars();
        match chars.next() {
            Some(first) if first.is_ascii_uppercase() => {}
            _ => return false,
        }
        part.len() >= 2 && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    }

    /// True if the text contains at least one protected gene token.
    pub fn contains_gene(&self, text: &str) -> bool {
        self.detect(text)
            .iter()
            .any(|span| !span.text.chars().any(is_sentinel))
    }

    /// Find every span to protect, left to right, non-overlapping.
    pub fn detect(&self, text: &str) -> Vec<GeneSpan> {
        let mut spans = Vec::new();

        for mat in alnum_chain().find_iter(text) {
            let run = mat.as_str();
            let parts: Vec<&str> = run.split(FUSION_SEPARATOR).collect();

            if parts.iter().all(|p| Self::is_gene_symbol(p)) {
                spans.push(span(text, mat.start(), mat.end()));
                continue;
            }

            // Chain broken by a non-gene part: protect the parts that qualify.
            let mut offset = mat.start();
            for part in parts {
                if Self::is_gene_symbol(part) {
                    spans.push(span(text, offset, offset + part.len()));
                }
                offset += part.len() + FUSION_SEPARATOR.len();
            }
        }

        if let Some(ref automaton) = self.allowlist {
            for mat in automaton.find_iter(text) {
                if at_alnum_boundary(text, mat.start(), mat.end()) {
                    spans.push(span(text, mat.start(), mat.end()));
                }
            }
        }

        // Stray placeholder characters are masked as well so `restore` is lossless.
        for (idx, c) in text.char_indices() {
            if is_sentinel(c) {
                spans.push(span(text, idx, idx + c.len_utf8()));
            }
        }

        resolve_overlaps(spans)
    }

    /// Replace protected spans with numbered placeholders.
    pub fn protect(&self, text: &str) -> (String, ProtectedSpans) {
        let spans = self.detect(text);
        if spans.is_empty() {
            return (text.to_string(), ProtectedSpans::default());
        }

        let mut masked = String::with_capacity(text.len());
        let mut recovered = Vec::with_capacity(spans.len());
        let mut cursor = 0;

        for (idx, gene) in spans.into_iter().enumerate() {
            masked.push_str(&text[cursor..gene.start]);
            masked.push(PLACEHOLDER_OPEN);
            masked.push_str(&idx.to_string());
            masked.push(PLACEHOLDER_CLOSE);
            cursor = gene.end;
            recovered.push(gene.text);
        }
        masked.push_str(&text[cursor..]);

        (masked, ProtectedSpans(recovered))
    }

    /// Put the protected spans back, verbatim.
    pub fn restore(&self, masked: &str, spans: &ProtectedSpans) -> String {
        if spans.is_empty() {
            return masked.to_string();
        }

        let mut out = String::with_capacity(masked.len());
        let mut rest = masked;

        while let Some(open) = rest.find(PLACEHOLDER_OPEN) {
            out.push_str(&rest[..open]);
            let after_open = &rest[open + PLACEHOLDER_OPEN.len_utf8()..];

            let restored = after_open.find(PLACEHOLDER_CLOSE).and_then(|close| {
                let idx: usize = after_open[..close].parse().ok()?;
                spans.get(idx).map(|gene| (gene, close))
            });

            match restored {
                Some((gene, close)) => {
                    out.push_str(gene);
                    rest = &after_open[close + PLACEHOLDER_CLOSE.len_utf8()..];
                }
                None => {
                    // Not one of ours; keep the character as is.
                    out.push(PLACEHOLDER_OPEN);
                    rest = after_open;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn span(text: &str, start: usize, end: usize) -> GeneSpan {
    GeneSpan { text: text[start..end].to_string(), start, end }
}

/// Allowlisted symbols must not sit inside a longer ASCII alphanumeric word.
fn at_alnum_boundary(text: &str, start: usize, end: usize) -> bool {
    let before_ok = text[..start]
        .chars()
        .next_back()
        .map_or(true, |c| !c.is_ascii_alphanumeric());
    let after_ok = text[end..]
        .chars()
        .next()
        .map_or(true, |c| !c.is_ascii_alphanumeric());
    before_ok && after_ok
}

/// At each start position the longest span wins; a span that begins inside
/// one already kept is dropped.
fn resolve_overlaps(mut spans: Vec<GeneSpan>) -> Vec<GeneSpan> {
    spans.sort_by_key(|s| (s.start, Reverse(s.end)));
    spans.dedup_by(|later, kept| later.start < kept.end);
    spans
}

//! Text canonicalisation for raw disease labels.
//!
//! One pass applies, in order:
//! 1. NFKC (full/half width, compatibility forms); placeholder code points dropped
//! 2. leading enumeration markers (`1)`, `２）`, `a:`, `Ｂ：`), however many are stacked
//! 3. specimen-status terms as whole tokens or bracketed asides, and the
//!    qualifiers 良性/悪性/正常 when they form a delimited part of their own
//! 4. spelling unification and optional ASCII case folding
//! 5. bracket / delimiter / whitespace tidy-up
//!
//! Stages 3 to 5 run on text masked by the `GeneTokenGuard`.
//! A deletion can expose another marker or status token, so `canonicalise`
//! repeats the pass until the text stops changing. After the first pass every
//! stage either shortens the text or is a one-off fold (case, whitespace), and
//! spelling rules are required to shorten, so this terminates and makes the
//! result idempotent.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use ahash::{AHashMap, AHashSet};
use nosolex_common::{NosolexError, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::gene_guard::{self, GeneTokenGuard};
use crate::rules;

/// Passes allowed beyond the length of the first-pass result.
const EXTRA_PASSES: usize = 4;

fn leading_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:[0-9]+|[A-Za-z])(?:[):、]|\.(?:\s|$))\s*").unwrap())
}

fn empty_brackets() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"[{}]\s*[{}]",
            rules::OPEN_BRACKET_CLASS,
            rules::CLOSE_BRACKET_CLASS
        ))
        .unwrap()
    })
}

/// Whitespace or delimiters right after an opening bracket.
fn filler_after_open() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"([{}])[\s{}]+",
            rules::OPEN_BRACKET_CLASS,
            rules::DELIMITER_CLASS
        ))
        .unwrap()
    })
}

/// Whitespace or delimiters right before a closing bracket.
fn filler_before_close() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"[\s{}]+([{}])",
            rules::DELIMITER_CLASS,
            rules::CLOSE_BRACKET_CLASS
        ))
        .unwrap()
    })
}

fn delimiter_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"([{0}])(?:\s*[{0}])+", rules::DELIMITER_CLASS)).unwrap())
}

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Tunables for the canonicaliser. The built-in tables in `rules` are always
/// active; these only extend them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicaliseConfig {
    /// Lower-case ASCII letters outside protected gene tokens.
    #[serde(default = "bool_true")]
    pub fold_latin_case: bool,
    #[serde(default)]
    pub extra_status_terms: Vec<String>,
    /// Variant → preferred spelling.
    #[serde(default)]
    pub extra_spelling_variants: BTreeMap<String, String>,
    /// Symbols protected verbatim in addition to the upper-case pattern.
    #[serde(default)]
    pub gene_allowlist: Vec<String>,
}

fn bool_true() -> bool { true }

impl Default for CanonicaliseConfig {
    fn default() -> Self {
        Self {
            fold_latin_case: true,
            extra_status_terms: Vec::new(),
            extra_spelling_variants: BTreeMap::new(),
            gene_allowlist: Vec::new(),
        }
    }
}

/// Pure, deterministic label canonicaliser.
#[derive(Debug, Clone)]
pub struct Canonicaliser {
    guard: GeneTokenGuard,
    status_terms: AHashSet<String>,
    /// Removed only when no whitespace touches them, so `悪性 腫瘍` keeps its meaning.
    qualifier_terms: AHashSet<String>,
    /// `(陰性)`-style asides, qualifiers included.
    status_aside: Regex,
    spelling: AHashMap<String, String>,
    /// Spelling variant followed by a token boundary or end of text.
    spelling_at_token_end: Regex,
    fold_latin_case: bool,
}

impl Default for Canonicaliser {
    fn default() -> Self {
        Self::new(&CanonicaliseConfig::default()).expect("built-in rule tables are valid")
    }
}

impl Canonicaliser {
    pub fn new(config: &CanonicaliseConfig) -> Result<Self> {
        let mut status_terms: Vec<String> = rules::STATUS_TERMS.iter().map(|t| t.to_string()).collect();
        for term in &config.extra_status_terms {
            let term = term.trim();
            if term.is_empty() {
                return Err(NosolexError::Config("empty status term".to_string()));
            }
            if !status_terms.iter().any(|t| t == term) {
                status_terms.push(term.to_string());
            }
        }

        let qualifier_terms: Vec<String> = rules::QUALIFIER_TERMS
            .iter()
            .filter(|q| !status_terms.iter().any(|t| t == *q))
            .map(|q| q.to_string())
            .collect();

        let mut spelling: AHashMap<String, String> = rules::SPELLING_VARIANTS
            .iter()
            .map(|(v, p)| (v.to_string(), p.to_string()))
            .collect();
        for (variant, preferred) in &config.extra_spelling_variants {
            if variant.is_empty() {
                return Err(NosolexError::Config("empty spelling variant".to_string()));
            }
            if preferred.chars().count() >= variant.chars().count() {
                return Err(NosolexError::Config(format!(
                    "spelling rule '{variant}' → '{preferred}' must shorten the text"
                )));
            }
            spelling.insert(variant.clone(), preferred.clone());
        }
        for (variant, preferred) in &spelling {
            if let Some(other) = spelling.keys().find(|v| preferred.contains(v.as_str())) {
                return Err(NosolexError::Config(format!(
                    "spelling rule '{variant}' → '{preferred}' produces variant '{other}'"
                )));
            }
        }

        let status_aside = Regex::new(&format!(
            r"[{}]\s*(?:{})\s*[{}]",
            rules::OPEN_BRACKET_CLASS,
            alternation(status_terms.iter().chain(&qualifier_terms).map(String::as_str)),
            rules::CLOSE_BRACKET_CLASS,
        ))
        .map_err(|e| NosolexError::Config(format!("status terms: {e}")))?;

        let spelling_at_token_end = Regex::new(&format!(
            r"({})(\s|[{}{}{}]|$)",
            alternation(spelling.keys().map(String::as_str)),
            rules::DELIMITER_CLASS,
            rules::OPEN_BRACKET_CLASS,
            rules::CLOSE_BRACKET_CLASS,
        ))
        .map_err(|e| NosolexError::Config(format!("spelling variants: {e}")))?;

        Ok(Self {
            guard: GeneTokenGuard::with_allowlist(&config.gene_allowlist),
            status_terms: status_terms.into_iter().collect(),
            qualifier_terms: qualifier_terms.into_iter().collect(),
            status_aside,
            spelling,
            spelling_at_token_end,
            fold_latin_case: config.fold_latin_case,
        })
    }

    pub fn guard(&self) -> &GeneTokenGuard {
        &self.guard
    }

    /// Canonical surface form of `raw`. May be empty; callers decide what an
    /// empty result means.
    pub fn canonicalise(&self, raw: &str) -> String {
        let mut current = self.pass(raw);
        // Later passes only shorten, bar one case fold and one whitespace fold.
        let limit = current.chars().count() + EXTRA_PASSES;
        for _ in 0..limit {
            let next = self.pass(&current);
            if next == current {
                return next;
            }
            current = next;
        }
        tracing::warn!("Canonicalisation of {:?} did not settle after {} passes", raw, limit + 1);
        current
    }

    fn pass(&self, text: &str) -> String {
        let text = unicode_compat(text);
        let text = strip_leading_markers(&text);

        let (masked, spans) = self.guard.protect(text);
        let masked = self.remove_status_terms(&masked);
        let masked = self.unify_spelling(&masked);
        let masked = tidy(&masked);

        self.guard.restore(&masked, &spans)
    }

    // ── Stage 3 ───────────────────────────────────────────────────────────────

    fn remove_status_terms(&self, text: &str) -> String {
        let text = self.status_aside.replace_all(text, "");

        let mut out = String::with_capacity(text.len());
        let mut token = String::new();
        // Boundary before the current token; `None` at the start of the text.
        let mut before = None;
        for c in text.chars() {
            if rules::is_token_boundary(c) {
                if !self.is_removable(&token, before, Some(c)) {
                    out.push_str(&token);
                }
                token.clear();
                out.push(c);
                before = Some(c);
            } else {
                token.push(c);
            }
        }
        if !self.is_removable(&token, before, None) {
            out.push_str(&token);
        }
        out
    }

    fn is_removable(&self, token: &str, before: Option<char>, after: Option<char>) -> bool {
        if self.status_terms.contains(token) {
            return true;
        }
        self.qualifier_terms.contains(token)
            && !before.is_some_and(char::is_whitespace)
            && !after.is_some_and(char::is_whitespace)
    }

    // ── Stage 4 ───────────────────────────────────────────────────────────────

    fn unify_spelling(&self, text: &str) -> String {
        let unified = self.spelling_at_token_end.replace_all(text, |caps: &Captures| {
            let preferred = self.spelling.get(&caps[1]).map(String::as_str).unwrap_or(&caps[1]);
            format!("{}{}", preferred, &caps[2])
        });

        if self.fold_latin_case {
            // Gene tokens are masked, so folding everything is safe.
            unified.to_ascii_lowercase()
        } else {
            unified.into_owned()
        }
    }
}

// ── Stage 1 ───────────────────────────────────────────────────────────────────

fn unicode_compat(text: &str) -> String {
    text.nfkc().filter(|c| !gene_guard::is_sentinel(*c)).collect()
}

// ── Stage 2 ───────────────────────────────────────────────────────────────────

/// Remove every leading enumeration marker (`1) 2) a:`).
pub fn strip_leading_markers(text: &str) -> &str {
    let mut text = text.trim_start();
    while let Some(m) = leading_marker().find(text) {
        text = text[m.end()..].trim_start();
    }
    text
}

// ── Stage 5 ───────────────────────────────────────────────────────────────────

fn tidy(text: &str) -> String {
    let text = filler_after_open().replace_all(text, "$1");
    let text = filler_before_close().replace_all(&text, "$1");
    let text = empty_brackets().replace_all(&text, "");
    let text = delimiter_run().replace_all(&text, "$1");
    let text = whitespace_run().replace_all(&text, " ");
    text.trim_matches(|c: char| c.is_whitespace() || rules::is_delimiter(c))
        .to_string()
}

/// Longest-first alternation of escaped literals.
fn alternation<'a>(terms: impl Iterator<Item = &'a str>) -> String {
    let mut terms: Vec<&str> = terms.collect();
    terms.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b)));
    terms.dedup();
    terms.iter().map(|t| regex::escape(t)).collect::<Vec<_>>().join("|")
}

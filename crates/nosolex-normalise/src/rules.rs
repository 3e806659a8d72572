//! Fixed substitution tables for the canonicaliser.
//!
//! Kept as data so the vocabulary can grow (or be extended from config)
//! without touching the transform code in `canonicalise`.

/// Specimen-status terms. Irrelevant to disease identity; removed when they
/// stand alone as a token or as a bracketed aside.
pub const STATUS_TERMS: &[&str] = &[
    "陰性",
    "陽性",
    "検体適正",
    "検体不適正",
    "異常なし",
    // Cytology / resection codes. These look like gene symbols, so the
    // gene guard keeps them whenever they are written in upper case.
    "NILM",
    "ASC-US",
    "ASC-H",
    "R0",
    "R1",
    "R2",
];

/// Qualifiers that are specimen status on their own (`検体適正、悪性／…`) but
/// part of the diagnosis when they modify the next word (`悪性 腫瘍`). Removed
/// only when delimiters, brackets or the ends of the label bound them.
pub const QUALIFIER_TERMS: &[&str] = &["良性", "悪性", "正常"];

/// Spelling variant → preferred orthography. Applied at the end of a token only,
/// so e.g. ガングリオン is never rewritten.
pub const SPELLING_VARIANTS: &[(&str, &str)] = &[
    ("がん", "癌"),
    ("ガン", "癌"),
    ("腫よう", "腫瘍"),
    ("しゅよう", "腫瘍"),
];

/// List separators that delimit tokens (NFKC-folded forms).
pub const DELIMITERS: &[char] = &['、', ',', ';', '/', '・'];

pub const OPEN_BRACKETS: &[char] = &['(', '[', '【', '「'];

pub const CLOSE_BRACKETS: &[char] = &[')', ']', '】', '」'];

/// Regex character-class body matching any delimiter.
pub const DELIMITER_CLASS: &str = "、,;/・";

/// Regex character-class bodies for the bracket sets.
pub const OPEN_BRACKET_CLASS: &str = r"(\[【「";
pub const CLOSE_BRACKET_CLASS: &str = r")\]】」";

pub fn is_delimiter(c: char) -> bool {
    DELIMITERS.contains(&c)
}

pub fn is_bracket(c: char) -> bool {
    OPEN_BRACKETS.contains(&c) || CLOSE_BRACKETS.contains(&c)
}

/// Characters that end a token for status removal and spelling unification.
pub fn is_token_boundary(c: char) -> bool {
    c.is_whitespace() || is_delimiter(c) || is_bracket(c)
}

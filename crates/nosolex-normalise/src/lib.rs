//! nosolex-normalise: disease-label normalisation pipeline.
//!
//! Components, leaves first:
//! - `GeneTokenGuard`: masks gene symbols / fusion notations so text rules never touch them
//! - `Canonicaliser`: ordered, idempotent string transforms (NFKC, marker, status, spelling, tidy)
//! - `Dictionary`: JSONL synonym dictionary with lenient/strict loading and atomic saves
//! - `Normaliser`: batch lookup of canonical keys against a loaded dictionary
//! - `coverage`: occurrence-weighted coverage and ranked unmatched labels
//! - `maintenance`: statistics, validation, search, backup and candidate merging

pub mod canonicalise;
pub mod coverage;
pub mod dictionary;
pub mod gene_guard;
pub mod maintenance;
pub mod normaliser;
pub mod rules;

pub use canonicalise::{Canonicaliser, CanonicaliseConfig};
pub use coverage::{CoverageReport, UnmatchedTerm};
pub use dictionary::{Dictionary, LoadMode, LoadReport, MalformedRecord, Upsert};
pub use gene_guard::{GeneSpan, GeneTokenGuard, ProtectedSpans};
pub use normaliser::{BatchOutcome, MergeGroup, MissReason, Normaliser, Resolution, UnmatchedLabel};

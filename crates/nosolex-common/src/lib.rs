//! nosolex-common: Shared label types and errors used across all nosolex crates.

pub mod entities;
pub mod error;

// Re-export commonly used types
pub use entities::{CanonicalLabel, DictionaryEntry, RawLabel};
pub use error::{NosolexError, Result};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NosolexError {
    /// Malformed dictionary record while loading in strict mode.
    #[error("Corrupt dictionary {}:{line}: {reason}", path.display())]
    CorruptDictionary {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Repeated variant key while loading in strict mode.
    #[error("Duplicate dictionary key '{key}' at {}:{line} (first defined on line {first_line})", path.display())]
    DuplicateKey {
        path: PathBuf,
        line: usize,
        first_line: usize,
        key: String,
    },

    #[error("{op} failed for {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl NosolexError {
    /// Wrap an I/O failure with the operation name and the path it touched.
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NosolexError::Io { op, path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, NosolexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_operation_and_path() {
        let err = NosolexError::io(
            "open dictionary",
            "dict/missing.jsonl",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("open dictionary failed for dict/missing.jsonl"), "{msg}");
    }

    #[test]
    fn test_corrupt_dictionary_message_has_line() {
        let err = NosolexError::CorruptDictionary {
            path: PathBuf::from("d.jsonl"),
            line: 7,
            reason: "missing field `canonical`".to_string(),
        };
        assert_eq!(err.to_string(), "Corrupt dictionary d.jsonl:7: missing field `canonical`");
    }
}

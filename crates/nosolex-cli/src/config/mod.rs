//! Configuration loading for nosolex.
//! Reads nosolex.toml from the current directory or the path in the NOSOLEX_CONFIG env var.

use std::path::{Path, PathBuf};

use anyhow::Context;
use nosolex_normalise::{CanonicaliseConfig, LoadMode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dictionary: DictionaryConfig,
    #[serde(default)]
    pub canonicalise: CanonicaliseConfig,
    #[serde(default)]
    pub coverage: CoverageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryConfig {
    #[serde(default = "default_dictionary_path")]
    pub path: PathBuf,
    /// Abort on the first malformed line or repeated key.
    #[serde(default)]
    pub strict: bool,
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
}

fn default_dictionary_path() -> PathBuf { PathBuf::from("disease_dictionary.jsonl") }
fn default_backup_dir()      -> PathBuf { PathBuf::from("dictionary_backups") }

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            path: default_dictionary_path(),
            strict: false,
            backup_dir: default_backup_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageConfig {
    /// Fraction of label occurrences that should resolve.
    #[serde(default = "default_target")]
    pub target: f64,
    /// Unmatched labels listed in the report.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_target() -> f64   { 0.95 }
fn default_top_n()  -> usize { 20 }

impl Default for CoverageConfig {
    fn default() -> Self {
        Self { target: default_target(), top_n: default_top_n() }
    }
}

#[cfg(test)]
mod tests;

impl Config {
    /// Load from `explicit` if given (must exist), else from `NOSOLEX_CONFIG`
    /// or `nosolex.toml`, falling back to defaults when that file is absent.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(p) => {
                if !p.exists() {
                    anyhow::bail!("Config file not found: {}", p.display());
                }
                p.to_path_buf()
            }
            None => {
                let p = std::env::var("NOSOLEX_CONFIG")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("nosolex.toml"));
                if !p.exists() {
                    tracing::debug!("No config at {}, using defaults", p.display());
                    return Ok(Self::default());
                }
                p
            }
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        if !(0.0..=1.0).contains(&config.coverage.target) {
            anyhow::bail!("coverage.target must be between 0 and 1, got {}", config.coverage.target);
        }
        Ok(config)
    }

    pub fn load_mode(&self) -> LoadMode {
        if self.dictionary.strict {
            LoadMode::Strict
        } else {
            LoadMode::Lenient
        }
    }
}

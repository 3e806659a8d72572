//! Synonym dictionary: variant key → canonical label.
//!
//! On disk this is JSON Lines, one `DictionaryEntry` per line:
//! ```text
//! {"variant":"腺癌","canonical":"腺癌"}
//! {"variant":"ETV6::NTRK3","canonical":"ETV6::NTRK3","tags":["gene-containing"]}
//! ```
//! The whole file is read into memory before any lookup. Entries keep the
//! order in which their key first appeared, so saves are diff-stable.
//!
//! Usage:
//! ```ignore
//! let (dict, report) = Dictionary::load("disease_dictionary.jsonl", LoadMode::Lenient)?;
//! let label = dict.lookup("腺癌");  // Some(CanonicalLabel("腺癌"))
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ahash::{AHashMap, AHashSet};
use nosolex_common::{CanonicalLabel, DictionaryEntry, NosolexError, Result};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// How to treat bad lines and repeated keys while loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Skip malformed lines (counted as warnings); last record for a key wins.
    #[default]
    Lenient,
    /// First malformed line or repeated key aborts the load.
    Strict,
}

/// A skipped line from a lenient load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    /// 1-based line number.
    pub line: usize,
    pub reason: String,
}

/// What happened during a load.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Well-formed records read, including ones later overwritten.
    pub records: usize,
    /// Records whose key had already been seen.
    pub duplicates: usize,
    pub malformed: Vec<MalformedRecord>,
}

impl LoadReport {
    pub fn warning_count(&self) -> usize {
        self.malformed.len()
    }
}

/// Outcome of `upsert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: Vec<DictionaryEntry>,
    /// variant key → position in `entries`
    index: AHashMap<String, usize>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Loading ───────────────────────────────────────────────────────────────

    /// Load a dictionary file.
    pub fn load(path: impl AsRef<Path>, mode: LoadMode) -> Result<(Self, LoadReport)> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| NosolexError::io("open dictionary", path, e))?;
        let (dict, report) = Self::from_reader(BufReader::new(file), path, mode)?;

        info!(
            "Loaded dictionary {}: {} entries, {} distinct canonical labels, {} warnings",
            path.display(),
            dict.len(),
            dict.vocabulary().len(),
            report.warning_count()
        );
        Ok((dict, report))
    }

    /// Parse JSONL already held in memory (tests, stdin).
    pub fn from_jsonl(text: &str, mode: LoadMode) -> Result<(Self, LoadReport)> {
        Self::from_reader(text.as_bytes(), Path::new("<memory>"), mode)
    }

    /// Parse JSONL from any reader. `origin` is only used in errors.
    pub fn from_reader<R: BufRead>(mut reader: R, origin: &Path, mode: LoadMode) -> Result<(Self, LoadReport)> {
        let mut dict = Self::new();
        let mut report = LoadReport::default();
        let mut first_seen: AHashMap<String, usize> = AHashMap::new();
        let mut buf = Vec::new();
        let mut line_no = 0usize;

        loop {
            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| NosolexError::io("read dictionary", origin, e))?;
            if n == 0 {
                break;
            }
            line_no += 1;

            let entry = match parse_record(&buf, line_no) {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(reason) => {
                    if mode == LoadMode::Strict {
                        return Err(NosolexError::CorruptDictionary {
                            path: origin.to_path_buf(),
                            line: line_no,
                            reason,
                        });
                    }
                    warn!("Skipping malformed dictionary line {}:{}: {}", origin.display(), line_no, reason);
                    report.malformed.push(MalformedRecord { line: line_no, reason });
                    continue;
                }
            };

            report.records += 1;
            if let Some(&first_line) = first_seen.get(&entry.variant) {
                if mode == LoadMode::Strict {
                    return Err(NosolexError::DuplicateKey {
                        path: origin.to_path_buf(),
                        line: line_no,
                        first_line,
                        key: entry.variant,
                    });
                }
                debug!("Dictionary key '{}' redefined on line {} (first on {})", entry.variant, line_no, first_line);
                report.duplicates += 1;
            } else {
                first_seen.insert(entry.variant.clone(), line_no);
            }

            dict.upsert_entry(entry);
        }

        Ok((dict, report))
    }

    // ── Lookup ────────────────────────────────────────────────────────────────

    /// Exact-match lookup of a canonicalised key.
    pub fn lookup(&self, key: &str) -> Option<&CanonicalLabel> {
        self.get(key).map(|e| &e.canonical)
    }

    pub fn get(&self, key: &str) -> Option<&DictionaryEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in stable (first-insertion) order.
    pub fn entries(&self) -> impl Iterator<Item = &DictionaryEntry> {
        self.entries.iter()
    }

    /// Distinct canonical labels, first-seen order: the controlled vocabulary.
    pub fn vocabulary(&self) -> Vec<&CanonicalLabel> {
        let mut seen = AHashSet::new();
        let mut vocab = Vec::new();
        for entry in &self.entries {
            if seen.insert(entry.canonical.as_str()) {
                vocab.push(&entry.canonical);
            }
        }
        vocab
    }

    // ── Updates ───────────────────────────────────────────────────────────────

    /// Map `key` to `canonical`, replacing any previous mapping and tags.
    /// Other metadata on an existing entry is kept.
    pub fn upsert(&mut self, key: &str, canonical: impl Into<CanonicalLabel>, tags: &[&str]) -> Upsert {
        let mut entry = match self.get(key) {
            Some(existing) => existing.clone(),
            None => DictionaryEntry::new(key, ""),
        };
        entry.canonical = canonical.into();
        entry.tags = Vec::new();
        for tag in tags {
            entry.add_tag(tag);
        }
        self.upsert_entry(entry)
    }

    /// Insert or fully replace the record for `entry.variant`. Position of an
    /// existing key is kept.
    pub fn upsert_entry(&mut self, entry: DictionaryEntry) -> Upsert {
        match self.index.get(&entry.variant) {
            Some(&i) if self.entries[i] == entry => Upsert::Unchanged,
            Some(&i) => {
                self.entries[i] = entry;
                Upsert::Updated
            }
            None => {
                self.index.insert(entry.variant.clone(), self.entries.len());
                self.entries.push(entry);
                Upsert::Inserted
            }
        }
    }

    // ── Persistence ───────────────────────────────────────────────────────────

    /// Serialise every entry, one JSON object per line.
    pub fn write_jsonl<W: Write>(&self, mut writer: W) -> Result<()> {
        for entry in &self.entries {
            let line = serde_json::to_string(entry)?;
            writeln!(writer, "{line}").map_err(|e| NosolexError::io("write dictionary", "<writer>", e))?;
        }
        Ok(())
    }

    /// Write to a temporary file next to `path`, then rename over it, so a
    /// failure mid-save never leaves a truncated dictionary behind.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dir = parent_dir(path);

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| NosolexError::io("create temporary dictionary", &dir, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            self.write_jsonl(&mut writer)?;
            writer.flush().map_err(|e| NosolexError::io("write dictionary", path, e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| NosolexError::io("sync dictionary", path, e))?;
        tmp.persist(path)
            .map_err(|e| NosolexError::io("replace dictionary", path, e.error))?;

        info!("Saved dictionary with {} entries to {}", self.len(), path.display());
        Ok(())
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Parse one raw line. `Ok(None)` for blank lines.
fn parse_record(raw: &[u8], line_no: usize) -> std::result::Result<Option<DictionaryEntry>, String> {
    let text = std::str::from_utf8(raw).map_err(|e| format!("invalid UTF-8: {e}"))?;
    let mut text = text.trim_end_matches(['\n', '\r']);
    if line_no == 1 {
        text = text.trim_start_matches('\u{feff}');
    }
    if text.trim().is_empty() {
        return Ok(None);
    }

    let entry: DictionaryEntry = serde_json::from_str(text).map_err(|e| e.to_string())?;
    if entry.variant.trim().is_empty() {
        return Err("empty `variant`".to_string());
    }
    if entry.canonical.as_str().trim().is_empty() {
        return Err("empty `canonical`".to_string());
    }
    Ok(Some(entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nosolex_common::entities::TAG_GENE;

    fn sample_jsonl() -> String {
        [
            r#"{"variant":"腺癌","canonical":"腺癌"}"#,
            r#"{"variant":"肺腺癌","canonical":"肺腺癌","category":"Disease"}"#,
            r#"{"variant":"C3","canonical":"C3","tags":["gene-containing"]}"#,
        ]
        .join("\n")
    }

    #[test]
    fn test_lookup_exact_key() {
        let (d, report) = Dictionary::from_jsonl(&sample_jsonl(), LoadMode::Lenient).unwrap();
        assert_eq!(report.records, 3);
        assert_eq!(d.lookup("C3").map(|c| c.as_str()), Some("C3"));
        assert!(d.get("C3").unwrap().has_tag(TAG_GENE));
        assert!(d.lookup("c3").is_none());
        assert!(d.lookup("腺").is_none());
    }

    #[test]
    fn test_upsert_last_write_wins() {
        let mut d = Dictionary::new();
        assert_eq!(d.upsert("肉腫", "肉腫", &[]), Upsert::Inserted);
        assert_eq!(d.upsert("肉腫", "軟部肉腫", &[]), Upsert::Updated);
        assert_eq!(d.lookup("肉腫").unwrap().as_str(), "軟部肉腫");
        assert_eq!(d.upsert("肉腫", "軟部肉腫", &[]), Upsert::Unchanged);
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn test_upsert_keeps_position() {
        let mut d = Dictionary::new();
        d.upsert("a", "A", &[]);
        d.upsert("b", "B", &[]);
        d.upsert("a", "A2", &[]);
        let keys: Vec<&str> = d.entries().map(|e| e.variant.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_lenient_load_skips_bad_line() {
        let text = format!("{}\nnot json\n{{\"variant\":\"\",\"canonical\":\"x\"}}\n", sample_jsonl());
        let (d, report) = Dictionary::from_jsonl(&text, LoadMode::Lenient).unwrap();
        assert_eq!(d.len(), 3);
        assert_eq!(report.warning_count(), 2);
        assert_eq!(report.malformed[0].line, 4);
        assert_eq!(report.malformed[1].reason, "empty `variant`");
    }

    #[test]
    fn test_strict_load_fails_on_bad_line() {
        let text = format!("{}\n{{\"variant\":\"x\"}}\n", sample_jsonl());
        match Dictionary::from_jsonl(&text, LoadMode::Strict) {
            Err(NosolexError::CorruptDictionary { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected CorruptDictionary, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_keys_lenient_vs_strict() {
        let text = "{\"variant\":\"k\",\"canonical\":\"v1\"}\n{\"variant\":\"k\",\"canonical\":\"v2\"}\n";
        let (d, report) = Dictionary::from_jsonl(text, LoadMode::Lenient).unwrap();
        assert_eq!(d.lookup("k").unwrap().as_str(), "v2");
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.warning_count(), 0);

        match Dictionary::from_jsonl(text, LoadMode::Strict) {
            Err(NosolexError::DuplicateKey { line, first_line, key, .. }) => {
                assert_eq!((line, first_line, key.as_str()), (2, 1, "k"));
            }
            other => panic!("expected DuplicateKey, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_lines_bom_and_crlf() {
        let text = "\u{feff}{\"variant\":\"a\",\"canonical\":\"A\"}\r\n\r\n{\"variant\":\"b\",\"canonical\":\"B\"}\r\n";
        let (d, report) = Dictionary::from_jsonl(text, LoadMode::Strict).unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(report.warning_count(), 0);
    }

    #[test]
    fn test_invalid_utf8_is_malformed_not_io() {
        let mut bytes = b"{\"variant\":\"a\",\"canonical\":\"A\"}\n".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
        let (d, report) = Dictionary::from_reader(&bytes[..], Path::new("x"), LoadMode::Lenient).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn test_vocabulary_distinct_in_order() {
        let mut d = Dictionary::new();
        d.upsert("胃がん", "胃癌", &[]);
        d.upsert("胃ガン", "胃癌", &[]);
        d.upsert("肺癌", "肺癌", &[]);
        let vocab: Vec<&str> = d.vocabulary().iter().map(|c| c.as_str()).collect();
        assert_eq!(vocab, vec!["胃癌", "肺癌"]);
    }

    #[test]
    fn test_save_and_reload_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.jsonl");
        let (d, _) = Dictionary::from_jsonl(&sample_jsonl(), LoadMode::Strict).unwrap();

        d.save(&path).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        let (reloaded, _) = Dictionary::load(&path, LoadMode::Strict).unwrap();
        reloaded.save(&path).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.lines().count(), 3);
        assert!(first.contains("腺癌"), "non-ASCII must be written unescaped");
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Dictionary::load("/nonexistent/dict.jsonl", LoadMode::Lenient).unwrap_err();
        assert!(matches!(err, NosolexError::Io { op: "open dictionary", .. }));
    }
}

use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_empty_file_gives_defaults() {
    let config = Config::from_toml("").unwrap();
    assert_eq!(config.dictionary.path, PathBuf::from("disease_dictionary.jsonl"));
    assert_eq!(config.dictionary.backup_dir, PathBuf::from("dictionary_backups"));
    assert!(!config.dictionary.strict);
    assert_eq!(config.coverage.target, 0.95);
    assert_eq!(config.coverage.top_n, 20);
    assert!(config.canonicalise.fold_latin_case);
    assert_eq!(config.load_mode(), LoadMode::Lenient);
}

#[test]
fn test_partial_sections_keep_other_defaults() {
    let config = Config::from_toml(
        r#"
        [dictionary]
        strict = true

        [coverage]
        top_n = 5
        "#,
    )
    .unwrap();
    assert_eq!(config.load_mode(), LoadMode::Strict);
    assert_eq!(config.dictionary.path, PathBuf::from("disease_dictionary.jsonl"));
    assert_eq!(config.coverage.top_n, 5);
    assert_eq!(config.coverage.target, 0.95);
}

#[test]
fn test_canonicalise_section() {
    let config = Config::from_toml(
        r#"
        [canonicalise]
        fold_latin_case = false
        extra_status_terms = ["疑い"]
        gene_allowlist = ["p53", "c-KIT"]

        [canonicalise.extra_spelling_variants]
        "ざしょう" = "挫傷"
        "#,
    )
    .unwrap();
    let c = &config.canonicalise;
    assert!(!c.fold_latin_case);
    assert_eq!(c.extra_status_terms, vec!["疑い".to_string()]);
    assert_eq!(c.gene_allowlist, vec!["p53".to_string(), "c-KIT".to_string()]);
    assert_eq!(c.extra_spelling_variants.get("ざしょう").map(String::as_str), Some("挫傷"));
}

#[test]
fn test_target_out_of_range_rejected() {
    let err = Config::from_toml("[coverage]\ntarget = 95\n").unwrap_err();
    assert!(err.to_string().contains("coverage.target"), "{err}");
}

#[test]
fn test_malformed_toml_is_error() {
    assert!(Config::from_toml("[dictionary\npath = 1").is_err());
}

#[test]
fn test_explicit_path_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nosolex.toml");
    std::fs::write(&path, "[dictionary]\npath = \"dict/custom.jsonl\"\n").unwrap();

    let config = Config::load(Some(path.as_path())).unwrap();
    assert_eq!(config.dictionary.path, PathBuf::from("dict/custom.jsonl"));
}

#[test]
fn test_explicit_missing_path_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(Some(dir.path().join("absent.toml").as_path())).unwrap_err();
    assert!(err.to_string().contains("Config file not found"), "{err}");
}

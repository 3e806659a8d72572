//! End-to-end normalisation: raw labels through canonicalisation, dictionary
//! lookup and coverage.
//!
//! ```bash
//! cargo test --package nosolex-normalise --test test_pipeline_e2e
//! ```

use pretty_assertions::assert_eq;

use nosolex_common::RawLabel;
use nosolex_normalise::coverage;
use nosolex_normalise::{Canonicaliser, Dictionary, LoadMode, MissReason, Normaliser, Resolution};

const DICTIONARY: &str = r#"{"variant":"腺癌","canonical":"腺癌"}
{"variant":"C3","canonical":"C3","tags":["gene-containing"]}
{"variant":"ETV6::NTRK3","canonical":"ETV6::NTRK3","tags":["gene-containing"]}
{"variant":"扁平上皮癌","canonical":"扁平上皮癌"}
{"variant":"胃癌","canonical":"胃癌"}
{"variant":"浸潤性乳管癌","canonical":"浸潤性乳管癌"}
"#;

fn dictionary() -> Dictionary {
    Dictionary::from_jsonl(DICTIONARY, LoadMode::Strict).unwrap().0
}

fn labels(items: &[&str]) -> Vec<RawLabel> {
    items.iter().map(|s| RawLabel::from(*s)).collect()
}

#[test]
fn test_marker_and_status_term_stripped() {
    let c = Canonicaliser::default();
    assert_eq!(c.canonicalise("1) 腺癌（陰性）"), "腺癌");
}

#[test]
fn test_fusion_gene_unchanged() {
    let c = Canonicaliser::default();
    assert_eq!(c.canonicalise("ETV6::NTRK3"), "ETV6::NTRK3");
}

#[test]
fn test_short_gene_symbol_resolves_uppercase() {
    let c = Canonicaliser::default();
    let d = dictionary();
    let n = Normaliser::new(&c, &d);

    match n.normalise("C3") {
        Resolution::Matched { key, canonical } => {
            assert_eq!(key, "C3");
            assert_eq!(canonical.as_str(), "C3");
        }
        other => panic!("expected a match, got {other:?}"),
    }
}

#[test]
fn test_bare_marker_is_empty_and_reported_with_raw() {
    let c = Canonicaliser::default();
    let d = dictionary();
    let n = Normaliser::new(&c, &d);

    let out = n.normalise_batch(&labels(&["腺癌", "a: "]));
    assert_eq!(out.canonical[1], None);
    assert_eq!(out.unmatched.len(), 1);
    assert_eq!(out.unmatched[0].raw.as_str(), "a: ");
    assert_eq!(out.unmatched[0].reason, MissReason::EmptyAfterNormalization);
    assert_eq!(out.unmatched[0].key, None);
}

#[test]
fn test_noisy_labels_resolve() {
    let c = Canonicaliser::default();
    let d = dictionary();
    let n = Normaliser::new(&c, &d);

    let out = n.normalise_batch(&labels(&[
        "２）扁平上皮癌",
        "胃がん",
        "Ｂ：胃ガン（陽性）",
        "検体適正、悪性／浸潤性乳管癌",
        "  腺癌　",
        "腺癌（検体適正、陰性）",
    ]));
    let got: Vec<Option<&str>> = out.canonical.iter().map(|c| c.as_ref().map(|c| c.as_str())).collect();
    assert_eq!(
        got,
        vec![
            Some("扁平上皮癌"),
            Some("胃癌"),
            Some("胃癌"),
            Some("浸潤性乳管癌"),
            Some("腺癌"),
            Some("腺癌")
        ]
    );
    assert!(out.unmatched.is_empty());
}

#[test]
fn test_unmatched_order_is_stable_across_runs() {
    let c = Canonicaliser::default();
    let d = dictionary();
    let n = Normaliser::new(&c, &d);
    let input = labels(&["肉腫", "腺癌", "悪性黒色腫", "a: ", "肉腫", "骨髄腫"]);

    let first = n.normalise_batch(&input);
    for _ in 0..5 {
        let again = n.normalise_batch(&input);
        assert_eq!(again.unmatched, first.unmatched);
    }
    let rows: Vec<usize> = first.unmatched.iter().map(|u| u.row).collect();
    assert_eq!(rows, vec![0, 2, 3, 4, 5]);
}

#[test]
fn test_canonicalise_is_idempotent_over_corpus() {
    let c = Canonicaliser::default();
    let corpus = [
        "1) 腺癌（陰性）",
        "２）　肺がん／ＫＲＡＳ陽性",
        "a. 悪性リンパ腫 (R0)",
        "（）肉腫、、",
        "ETV6::NTRK3融合 乳腺分泌癌",
        "子宮頸部細胞診 NILM",
        "1) 2) 3) 多発性骨髄腫",
        "陰性 1) 腺癌",
        "Adenocarcinoma, NOS",
        "【検体不適正】",
        "",
        "   ",
        "腺癌(陰性/陽性)",
        "良性　腫瘍",
        "検体適正、正常",
    ];
    let stacked_markers: String = (1..=25).map(|i| format!("{i}) ")).collect::<String>() + "腺癌";
    let status_then_marker = "陰性 1) ".repeat(25) + "腺癌";
    for raw in corpus.iter().copied().chain([stacked_markers.as_str(), status_then_marker.as_str()]) {
        let once = c.canonicalise(raw);
        assert_eq!(c.canonicalise(&once), once, "not idempotent for {raw:?}");
    }
}

#[test]
fn test_benign_and_malignant_tumours_do_not_merge() {
    let c = Canonicaliser::default();
    let benign = c.canonicalise("良性　腫瘍");
    let malignant = c.canonicalise("悪性　腫瘍");
    assert_ne!(benign, malignant);
    assert_eq!(benign, "良性 腫瘍");
    assert_eq!(malignant, "悪性 腫瘍");
}

#[test]
fn test_gene_tokens_survive_canonicalisation() {
    let c = Canonicaliser::default();
    for (raw, gene) in [
        ("HER2陽性乳癌", "HER2"),
        ("MLH1欠損大腸癌", "MLH1"),
        ("Lung adenocarcinoma with EGFR", "EGFR"),
        ("1) EML4::ALK肺癌", "EML4::ALK"),
    ] {
        let out = c.canonicalise(raw);
        assert!(out.contains(gene), "{gene} lost from {raw:?}: {out:?}");
    }
}

#[test]
fn test_coverage_end_to_end() {
    let c = Canonicaliser::default();
    let d = dictionary();
    let n = Normaliser::new(&c, &d);

    let report = coverage::analyze(&labels(&["腺癌", "腺癌", "肉腫"]), &n);
    assert!((report.coverage() - 2.0 / 3.0).abs() < 1e-9);
    assert!(!report.meets_target(0.95));

    let candidates = report.candidates();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].variant, "肉腫");
}

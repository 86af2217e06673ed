use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use geipan::dataset::compare::{compare_datasets, Verdict};
use geipan::error::GeipanError;

fn unique_temp_dir(name: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("geipan-{name}-{stamp}"));
    fs::create_dir_all(&dir).expect("temp dir should be created");
    dir
}

#[test]
fn corrected_copy_wins_when_it_removes_leftovers() {
    let dir = unique_temp_dir("compare-manual");
    let automated = dir.join("auto.csv");
    let manual = dir.join("manual.csv");
    fs::write(
        &automated,
        "case_id|cas_titre_localisation|1937309697\nC1|a<br>b|x\nC1|a<br>b|x\nC2|c|y\n",
    )
    .expect("automated fixture should be written");
    fs::write(
        &manual,
        "case_id|cas_titre_localisation|temoin_id\nC1|a b|x\nC1|a b|z\nC2|c|y\n",
    )
    .expect("manual fixture should be written");

    let report = compare_datasets(&automated, &manual).expect("comparison should run");

    assert_eq!(report.files.automated.rows, 3);
    assert_eq!(report.files.manual.columns, 3);
    assert!(report.same_shape);
    assert!(!report.identical_column_order);
    assert_eq!(report.only_in_automated, vec!["1937309697"]);
    assert_eq!(report.only_in_manual, vec!["temoin_id"]);
    assert_eq!(report.duplicate_rows.automated, 1);
    assert_eq!(report.duplicate_rows.manual, 0);
    assert_eq!(report.html_tags.automated, 2);
    assert_eq!(report.differing_columns, 1);
    assert_eq!(report.column_differences[0].column, "cas_titre_localisation");
    assert_eq!(report.column_differences[0].changed_cells, 2);
    assert_eq!(report.verdict, Verdict::Manual);

    let payload = serde_json::to_value(&report).expect("report should serialize");
    assert_eq!(payload["verdict"], "manual");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn missing_manual_copy_is_an_error() {
    let dir = unique_temp_dir("compare-missing");
    let automated = dir.join("auto.csv");
    fs::write(&automated, "case_id\nC1\n").expect("automated fixture should be written");

    let err = compare_datasets(&automated, &dir.join("manual.csv")).unwrap_err();
    assert!(matches!(err, GeipanError::FileNotFound { .. }), "{err}");

    let _ = fs::remove_dir_all(dir);
}

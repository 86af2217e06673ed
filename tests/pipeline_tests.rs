use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use geipan::config::PipelineConfig;
use geipan::dataset::integrity::IntegrityWarning;
use geipan::dataset::pipeline;
use geipan::dataset::registry::{load_registry, OUTPUT_DATASET_NAME};
use geipan::dataset::table::read_table;
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

fn case_row(case_id: &str, title: &str, description: &str) -> String {
    format!(
        "{case_id}|{title}|14/07/1977|Landes (40)|Nouvelle-Aquitaine||Plage|Lumiere<br/>orange|REF-1|{description}|Note|Info|D|01/01/2010|GEIPAN\n"
    )
}

fn config_for(dir: &Path, cases: &str, testimonies: &str) -> PipelineConfig {
    fs::write(dir.join("cases.csv"), cases).expect("cases fixture should be written");
    fs::write(dir.join("testimonies.csv"), testimonies)
        .expect("testimonies fixture should be written");
    PipelineConfig {
        data_dir: dir.to_path_buf(),
        cases_file: PathBuf::from("cases.csv"),
        testimonies_file: PathBuf::from("testimonies.csv"),
        output_file: PathBuf::from("out.csv"),
        ..PipelineConfig::default()
    }
}

#[test]
fn duplicate_case_and_unmatched_testimony_end_to_end() {
    let dir = unique_temp_dir("pipeline-scenario");
    let cases = format!(
        "export header line\n{}{}",
        case_row("C1", "MIMIZAN (40) 1977", "Saw lights<br>in sky"),
        case_row("C1", "MIMIZAN (40) 1977 bis", "Saw lights<br>in sky"),
    );
    let testimonies = "1937309697|temoin|age\nC1|premier|34\nC1|second|51\nC2|troisieme|22\n";
    let config = config_for(&dir, &cases, testimonies);

    let report = pipeline::run(&config).expect("pipeline should succeed");

    assert_eq!(report.cases.cases_loaded, 1);
    assert_eq!(report.join.rows_out, 3);
    assert_eq!(report.output.rows, 3);
    assert_eq!(
        report.warnings,
        vec![
            IntegrityWarning::DuplicateCaseIds { removed: 1 },
            IntegrityWarning::UnmatchedTestimonies { count: 1 },
        ]
    );

    let output = read_table(&config.output_path()).expect("output should be readable");
    assert_eq!(output.columns[0], "case_id");
    assert_eq!(output.columns[1], "cas_titre_localisation");
    assert!(output.has_column("temoin"));
    assert!(!output.has_column("cas_colonne_vide"));

    let c1 = output
        .rows
        .iter()
        .position(|row| row[0].as_deref() == Some("C1"))
        .expect("C1 row present");
    assert_eq!(
        output.cell(c1, "cas_description_detaillee"),
        Some("Saw lights in sky")
    );
    assert_eq!(output.cell(c1, "cas_resume_court"), Some("Lumiere orange"));
    assert_eq!(output.cell(c1, "cas_titre_localisation"), Some("MIMIZAN (40) 1977"));

    let c2 = output
        .rows
        .iter()
        .position(|row| row[0].as_deref() == Some("C2"))
        .expect("C2 row present");
    for column in output.columns.iter().filter(|c| c.starts_with("cas_")) {
        assert_eq!(output.cell(c2, column), None, "{column} should be empty for C2");
    }
    assert_eq!(output.cell(c2, "temoin"), Some("troisieme"));

    let registry = load_registry(&config.registry_path()).expect("registry should load");
    assert_eq!(registry[OUTPUT_DATASET_NAME].rows, 3);

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn every_testimony_survives_and_no_row_repeats() {
    let dir = unique_temp_dir("pipeline-conservation");
    let cases = format!(
        "\n{}{}",
        case_row("C1", "a", "one"),
        case_row("C2", "b", "two")
    );
    // Two exact duplicates collapse to one; everything else is kept.
    let testimonies =
        "id|texte\nC1|x\nC1|x\nC1|y\nC2|z\nC3|orphelin\n|sans cas\n";
    let config = config_for(&dir, &cases, testimonies);

    let report = pipeline::run(&config).expect("pipeline should succeed");
    assert_eq!(report.testimonies.testimonies_loaded, 5);
    assert_eq!(report.join.rows_out, report.testimonies.testimonies_loaded);
    assert_eq!(report.join.unmatched_testimonies, 2);

    let output = read_table(&config.output_path()).expect("output should be readable");
    let distinct: HashSet<&Vec<Option<String>>> = output.rows.iter().collect();
    assert_eq!(distinct.len(), output.len());
    assert_eq!(report.stats.unique_cases, 3);

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn sparse_testimony_columns_do_not_reach_the_output() {
    let dir = unique_temp_dir("pipeline-sparse");
    let cases = format!("\n{}", case_row("C1", "a", "one"));
    let mut testimonies = String::from("id|texte|rare\n");
    for i in 0..40 {
        let rare = if i == 0 { "oui" } else { "" };
        testimonies.push_str(&format!("C1|t{i}|{rare}\n"));
    }
    let config = config_for(&dir, &cases, &testimonies);

    let report = pipeline::run(&config).expect("pipeline should succeed");
    assert_eq!(report.testimonies.dropped_columns, vec!["rare"]);
    let output = read_table(&config.output_path()).expect("output should be readable");
    assert!(!output.has_column("rare"));
    assert!(output.has_column("texte"));

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn missing_input_is_fatal_and_writes_nothing() {
    let dir = unique_temp_dir("pipeline-missing");
    let config = PipelineConfig {
        data_dir: dir.clone(),
        ..PipelineConfig::default()
    };

    let err = pipeline::run(&config).unwrap_err();
    assert!(matches!(err, GeipanError::FileNotFound { .. }), "{err}");
    assert!(!config.output_path().exists());

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn malformed_case_row_is_fatal() {
    let dir = unique_temp_dir("pipeline-malformed");
    let config = config_for(&dir, "\nC1|too|short\n", "id|texte\nC1|x\n");

    let err = pipeline::run(&config).unwrap_err();
    assert!(matches!(err, GeipanError::Parse { .. }), "{err}");
    assert!(!config.output_path().exists());

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn corrupt_registry_leaves_previous_output_alone() {
    let dir = unique_temp_dir("pipeline-registry");
    let cases = format!("\n{}", case_row("C1", "a", "one"));
    let config = config_for(&dir, &cases, "id|texte\nC1|x\n");
    fs::write(config.output_path(), "OLD CONTENT\n").expect("old output should be written");
    fs::write(config.registry_path(), "{ not json").expect("registry should be written");

    let err = pipeline::run(&config).unwrap_err();
    assert!(matches!(err, GeipanError::Parse { .. }), "{err}");
    assert_eq!(
        fs::read_to_string(config.output_path()).expect("old output readable"),
        "OLD CONTENT\n"
    );
    assert_eq!(
        fs::read_to_string(config.registry_path()).expect("registry readable"),
        "{ not json"
    );

    let _ = fs::remove_dir_all(dir);
}

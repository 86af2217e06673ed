//! The `prepare` run: load both exports, join, write, register.

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::dataset::cases::{load_cases, CaseLoadReport};
use crate::dataset::integrity::IntegrityWarning;
use crate::dataset::join::{join, JoinReport};
use crate::dataset::persist::{write_table, PersistReport};
use crate::dataset::registry::{load_registry, record_output, OUTPUT_DATASET_NAME};
use crate::dataset::stats::{dataset_stats, DatasetStats};
use crate::dataset::testimonies::{load_testimonies, TestimonyLoadReport};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrepareReport {
    pub cases: CaseLoadReport,
    pub testimonies: TestimonyLoadReport,
    pub join: JoinReport,
    pub stats: DatasetStats,
    pub output: PersistReport,
    /// Every warning raised along the way, in the order it was raised.
    pub warnings: Vec<IntegrityWarning>,
}

pub fn run(config: &PipelineConfig) -> Result<PrepareReport> {
    let cases_path = config.cases_path();
    let testimonies_path = config.testimonies_path();
    let output_path = config.output_path();
    tracing::info!(
        cases = %cases_path.display(),
        testimonies = %testimonies_path.display(),
        output = %output_path.display(),
        "preparing dataset"
    );

    let (cases, case_report) = load_cases(&cases_path)?;
    let (testimonies, testimony_report) =
        load_testimonies(&testimonies_path, config.sparse_threshold)?;
    let (joined, join_report) = join(&cases, &testimonies);
    let stats = dataset_stats(&joined);

    // A bad registry must fail the run before the output is replaced.
    let registry_path = config.registry_path();
    let registry = load_registry(&registry_path)?;
    let output = write_table(&joined, &output_path)?;
    record_output(&registry_path, registry, OUTPUT_DATASET_NAME, &output)?;

    let warnings = case_report
        .warnings
        .iter()
        .chain(&testimony_report.warnings)
        .chain(&join_report.warnings)
        .cloned()
        .collect();

    tracing::info!(
        cases = case_report.cases_loaded,
        testimonies = testimony_report.testimonies_loaded,
        rows = output.rows,
        columns = output.columns,
        "dataset prepared"
    );

    Ok(PrepareReport {
        cases: case_report,
        testimonies: testimony_report,
        join: join_report,
        stats,
        output,
        warnings,
    })
}

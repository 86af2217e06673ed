use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::{PathOverrides, PipelineConfig};
use crate::dataset::compare::compare_datasets;
use crate::dataset::pipeline;
use crate::dataset::validate::validate_dataset;

#[derive(Parser, Debug)]
#[command(name = "geipan", about = "Prepare and check the GEIPAN case/testimony dataset")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Load both exports, join them and write the cleaned dataset.
    Prepare {
        /// YAML file with pipeline settings.
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Directory holding the exports and the output.
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        cases: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        testimonies: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Run the sanity checks on a written dataset.
    Validate {
        /// Dataset to check (default: the configured output).
        path: Option<PathBuf>,
        /// Testimony export to compare row counts against.
        #[arg(long, value_name = "FILE")]
        testimonies: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Compare the automated output with a hand-corrected copy.
    Compare {
        automated: Option<PathBuf>,
        manual: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

/// Parse `args` (program name first) and run the command. Returns the process
/// exit code: 0 on success, 1 on a failed run or failed checks, 2 on usage
/// errors.
pub fn run_with_args(args: &[String]) -> i32 {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return err.exit_code();
        }
    };

    match cli.command {
        Command::Prepare {
            config,
            data_dir,
            cases,
            testimonies,
            output,
        } => handle_prepare(
            config.as_deref(),
            PathOverrides {
                data_dir,
                cases,
                testimonies,
                output,
            },
        ),
        Command::Validate {
            path,
            testimonies,
            config,
        } => handle_validate(path, testimonies, config.as_deref()),
        Command::Compare {
            automated,
            manual,
            config,
        } => handle_compare(automated, manual, config.as_deref()),
    }
}

fn handle_prepare(config: Option<&Path>, overrides: PathOverrides) -> i32 {
    let result = PipelineConfig::load(config)
        .map(|config| config.with_overrides(overrides))
        .and_then(|config| pipeline::run(&config));
    match result {
        Ok(report) => emit_json(&report),
        Err(err) => {
            eprintln!("prepare failed: {err}");
            1
        }
    }
}

fn handle_validate(
    path: Option<PathBuf>,
    testimonies: Option<PathBuf>,
    config: Option<&Path>,
) -> i32 {
    let summary = PipelineConfig::load(config).and_then(|config| {
        let path = path.unwrap_or_else(|| config.output_path());
        // The original export is optional; skip the row-count comparison
        // when it is not around.
        let testimonies = testimonies.or_else(|| {
            let default = config.testimonies_path();
            default.exists().then_some(default)
        });
        validate_dataset(&path, testimonies.as_deref())
    });

    let summary = match summary {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("validate failed: {err}");
            return 1;
        }
    };

    let code = emit_json(&summary);
    if code != 0 {
        return code;
    }
    if summary.all_passed() {
        0
    } else {
        for diag in summary.failures() {
            eprintln!("{diag}");
        }
        eprintln!("validation failed: {} issue(s)", summary.total - summary.passed);
        1
    }
}

fn handle_compare(
    automated: Option<PathBuf>,
    manual: Option<PathBuf>,
    config: Option<&Path>,
) -> i32 {
    let report = PipelineConfig::load(config).and_then(|config| {
        let automated = automated.unwrap_or_else(|| config.output_path());
        let manual = manual.unwrap_or_else(|| config.manual_path());
        compare_datasets(&automated, &manual)
    });
    match report {
        Ok(report) => emit_json(&report),
        Err(err) => {
            eprintln!("compare failed: {err}");
            1
        }
    }
}

fn emit_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize result: {err}");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Command {
        Cli::try_parse_from(args).expect("arguments should parse").command
    }

    #[test]
    fn prepare_collects_path_overrides() {
        let command = parse(&["geipan", "prepare", "--data-dir", "in", "--output", "out.csv"]);
        assert_eq!(
            command,
            Command::Prepare {
                config: None,
                data_dir: Some(PathBuf::from("in")),
                cases: None,
                testimonies: None,
                output: Some(PathBuf::from("out.csv")),
            }
        );
    }

    #[test]
    fn compare_takes_two_positional_paths() {
        let command = parse(&["geipan", "compare", "a.csv", "b.csv"]);
        assert_eq!(
            command,
            Command::Compare {
                automated: Some(PathBuf::from("a.csv")),
                manual: Some(PathBuf::from("b.csv")),
                config: None,
            }
        );
    }

    #[test]
    fn unknown_command_is_a_usage_error() {
        let args: Vec<String> = ["geipan", "simulate"].iter().map(|s| s.to_string()).collect();
        assert_eq!(run_with_args(&args), 2);
    }
}

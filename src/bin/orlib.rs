// src/bin/orlib.rs
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use afit_packer::config::LogConfig;
use afit_packer::optimizer::PackingConfig;
use afit_packer::orlib::{load_cases, run_case};
use clap::Parser;
use tracing::{error, info, warn};

/// Runs the OR-Library thpack benchmark through the packing engine.
#[derive(Parser, Debug)]
#[command(name = "orlib", version)]
struct Cli {
    /// Benchmark file in thpack format
    path: PathBuf,

    /// Only run the first N cases
    #[arg(short, long)]
    limit: Option<usize>,

    /// Apply the weight ranking keys
    #[arg(long)]
    weighted: bool,

    /// Evaluate trials on the rayon pool
    #[arg(long)]
    parallel: bool,
}

fn main() -> ExitCode {
    LogConfig::from_env().init_subscriber();
    let cli = Cli::parse();

    let cases = match load_cases(&cli.path) {
        Ok(cases) => cases,
        Err(err) => {
            error!("Could not read {}: {err}", cli.path.display());
            return ExitCode::FAILURE;
        }
    };

    let config = PackingConfig::builder()
        .weighted(cli.weighted)
        .parallel_trials(cli.parallel)
        .build();

    let limit = cli.limit.unwrap_or(cases.len());
    let started = Instant::now();
    let mut failures = 0usize;
    let mut mismatches = 0usize;
    let mut utilization = 0.0;
    let mut ran = 0usize;

    for case in cases.iter().take(limit) {
        let case_started = Instant::now();
        let report = run_case(case, config);
        ran += 1;
        utilization += report.utilization_percent;

        if let Some(violation) = &report.violation {
            error!(case = %report.id, "invalid placement: {violation}");
            failures += 1;
        }

        if !report.total_matches() {
            error!(
                case = %report.id,
                packed = report.packed,
                unpacked = report.unpacked,
                expected = report.reference.total_units,
                "unit count does not add up"
            );
            failures += 1;
        } else if !report.packed_matches() {
            warn!(
                case = %report.id,
                packed = report.packed,
                expected = report.reference.packed_units,
                "packed count differs from reference"
            );
            mismatches += 1;
        }

        info!(
            case = %report.id,
            packed = report.packed,
            unpacked = report.unpacked,
            utilization = %format!("{:.2}%", report.utilization_percent),
            elapsed_ms = case_started.elapsed().as_millis() as u64,
            "case finished"
        );
    }

    let mean = if ran > 0 { utilization / ran as f64 } else { 0.0 };
    info!(
        cases = ran,
        failures,
        mismatches,
        mean_utilization = %format!("{mean:.2}%"),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "benchmark finished"
    );

    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

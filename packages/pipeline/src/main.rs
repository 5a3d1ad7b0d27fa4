#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Batch entry point for the merge-and-derive pipeline.
//!
//! Reads `uscities_2020.csv`, `violent_crime_2020.csv`, and
//! `income_2020.csv` from the data directory and writes
//! `merged_smartcity.csv` plus its JSON report.

use std::path::PathBuf;

use clap::Parser;
use smart_city_pipeline::join::DuplicatePolicy;
use smart_city_pipeline::{PipelineOptions, progress};
use smart_city_table::paths::{self, SourcePaths};

#[derive(Parser)]
#[command(
    name = "smart_city_pipeline",
    about = "Merge city source tables into the scored city table"
)]
struct Cli {
    /// Directory holding the source CSV files (defaults to `SMART_CITY_DATA_DIR` or `data/`)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Output artifact path (defaults to `<data-dir>/merged_smartcity.csv`)
    #[arg(long)]
    output: Option<PathBuf>,

    /// How to treat repeated join keys in the source tables
    #[arg(long, default_value_t = DuplicatePolicy::Reject)]
    duplicates: DuplicatePolicy,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let data_dir = cli.data_dir.unwrap_or_else(paths::data_dir);
    let output = cli.output.unwrap_or_else(|| paths::merged_path(&data_dir));
    let options = PipelineOptions {
        duplicates: cli.duplicates,
    };

    log::info!("Reading source tables from {}", data_dir.display());

    let report = smart_city_pipeline::run(
        &SourcePaths::in_dir(&data_dir),
        &output,
        &options,
        &progress::null_progress(),
    )?;

    if report.excluded_count() > 0 {
        log::warn!(
            "{} cities were excluded; see {}",
            report.excluded_count(),
            paths::report_path_for(&output).display()
        );
    }

    Ok(())
}

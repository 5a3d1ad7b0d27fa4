//! Interactive front end for the merge-and-derive pipeline.

use std::path::PathBuf;
use std::time::Instant;

use dialoguer::{Input, Select};
use smart_city_cli_utils::{IndicatifProgress, MultiProgress};
use smart_city_pipeline::PipelineOptions;
use smart_city_pipeline::join::DuplicatePolicy;
use smart_city_table::paths::{self, SourcePaths};

const POLICIES: &[DuplicatePolicy] = &[DuplicatePolicy::Reject, DuplicatePolicy::KeepFirst];

const fn policy_label(policy: DuplicatePolicy) -> &'static str {
    match policy {
        DuplicatePolicy::Reject => "Reject (fail on repeated keys)",
        DuplicatePolicy::KeepFirst => "Keep first occurrence",
    }
}

/// Prompts for the data directory and duplicate handling, then rebuilds
/// `merged_smartcity.csv`.
///
/// # Errors
///
/// Returns an error if a prompt fails or the pipeline run fails.
pub fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let default_dir = paths::data_dir().display().to_string();
    let data_dir: String = Input::new()
        .with_prompt("Data directory")
        .default(default_dir)
        .interact_text()?;
    let data_dir = PathBuf::from(data_dir);

    let labels: Vec<&str> = POLICIES.iter().map(|p| policy_label(*p)).collect();
    let idx = Select::new()
        .with_prompt("Duplicate keys in source tables")
        .items(&labels)
        .default(0)
        .interact()?;

    let options = PipelineOptions {
        duplicates: POLICIES[idx],
    };
    let output = paths::merged_path(&data_dir);

    let start = Instant::now();
    let progress = IndicatifProgress::steps_bar(multi, "Building city table");
    let report = smart_city_pipeline::run(
        &SourcePaths::in_dir(&data_dir),
        &output,
        &options,
        &progress,
    )?;

    println!();
    println!(
        "Wrote {} cities to {} in {:.1}s",
        report.output_rows,
        output.display(),
        start.elapsed().as_secs_f64()
    );
    if report.excluded_count() > 0 {
        println!(
            "{} cities excluded; see {}",
            report.excluded_count(),
            paths::report_path_for(&output).display()
        );
    }

    Ok(())
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Merge-and-derive pipeline for the smart-city table.
//!
//! Loads the demographics, crime, and income tables, joins them into one
//! row per city, derives the safety and affordability indices, normalizes
//! the three metrics of interest, computes the default livability score,
//! and persists the result with [`smart_city_table`].
//!
//! ## Stages
//!
//! | Stage | Module |
//! |-------|--------|
//! | Load and validate CSVs | [`load`] |
//! | Income join on `(city, state)`, crime fan-out on `state` | [`join`] |
//! | `SafetyIndex`, `AffordabilityIndex` | [`derive`] |
//! | Min-max normalization, `LivabilityScore` | [`normalize`] |
//! | Artifact + JSON report | [`run`] |

pub mod derive;
pub mod join;
pub mod load;
pub mod normalize;
pub mod progress;
pub mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use smart_city_city_models::{CityDemographic, CityRecord, CrimeRecord, IncomeRecord};
use smart_city_table::TableError;
use smart_city_table::paths::{self, SourcePaths};
use thiserror::Error;

use crate::join::DuplicatePolicy;
use crate::load::DataLoadError;
use crate::progress::{ProgressCallback, Stage};
use crate::report::{InputCounts, PipelineReport};

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A source table is missing, malformed, or has duplicate keys.
    #[error(transparent)]
    Load(#[from] DataLoadError),

    /// The output artifact could not be written.
    #[error("Failed to write city table: {0}")]
    Table(#[from] TableError),

    /// The report could not be serialized.
    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),

    /// The report could not be written.
    #[error("Failed to write report to {}: {source}", path.display())]
    Io {
        /// Report path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Tunable behavior of a pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Handling of repeated join keys in the source tables.
    pub duplicates: DuplicatePolicy,
}

/// Result of [`build`].
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    /// Output rows sorted by `(state, city)`.
    pub records: Vec<CityRecord>,
    /// Data-quality observations.
    pub report: PipelineReport,
}

/// Joins, derives, normalizes, and scores the source tables in memory.
///
/// Row order of the inputs does not affect the output: records and report
/// entries are sorted by `(state, city)`.
///
/// # Errors
///
/// Returns [`DataLoadError::DuplicateKey`] if a source table repeats a key
/// under [`DuplicatePolicy::Reject`].
pub fn build(
    demographics: &[CityDemographic],
    crime: &[CrimeRecord],
    income: &[IncomeRecord],
    options: &PipelineOptions,
) -> Result<PipelineOutput, DataLoadError> {
    build_with_progress(demographics, crime, income, options, &progress::null_progress())
}

fn build_with_progress(
    demographics: &[CityDemographic],
    crime: &[CrimeRecord],
    income: &[IncomeRecord],
    options: &PipelineOptions,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<PipelineOutput, DataLoadError> {
    progress.set_message(Stage::Join.to_string());
    let outcome = join::join(demographics, crime, income, options.duplicates)?;
    progress.inc(1);

    progress.set_message(Stage::Derive.to_string());
    let derived = derive::derive(&outcome.joined);
    progress.inc(1);

    progress.set_message(Stage::Normalize.to_string());
    let mut records = derived.records;
    let ranges = normalize::normalize_metrics(&mut records);
    normalize::apply_livability_score(&mut records);
    records.sort_by(|a, b| (&a.state, &a.city).cmp(&(&b.state, &b.city)));
    progress.inc(1);

    let mut excluded = outcome.excluded;
    excluded.sort_by(|a, b| (&a.state, &a.city).cmp(&(&b.state, &b.city)));

    let report = PipelineReport {
        inputs: InputCounts {
            demographics: demographics.len(),
            crime: crime.len(),
            income: income.len(),
        },
        output_rows: records.len(),
        excluded,
        clamped_states: derived.clamped,
        ranges,
        duplicates_dropped: outcome.dropped,
    };

    Ok(PipelineOutput { records, report })
}

/// Runs the full pipeline from source files to the persisted artifact.
///
/// Writes the city table to `output` and the JSON report beside it (see
/// [`paths::report_path_for`]). Nothing is written if any stage fails.
///
/// # Errors
///
/// Returns [`PipelineError`] if any stage fails.
pub fn run(
    sources: &SourcePaths,
    output: &Path,
    options: &PipelineOptions,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<PipelineReport, PipelineError> {
    progress.set_total(Stage::ALL.len() as u64);

    progress.set_message(Stage::Load.to_string());
    let tables = load::load_sources(sources)?;
    progress.inc(1);

    let PipelineOutput { records, report } = build_with_progress(
        &tables.demographics,
        &tables.crime,
        &tables.income,
        options,
        progress,
    )?;

    progress.set_message(Stage::Persist.to_string());
    persist(output, &records, &report)?;
    progress.inc(1);

    report.log_summary();
    log::info!("Saved merged data to {}", output.display());
    progress.finish(format!("{} cities written", report.output_rows));

    Ok(report)
}

/// Stages the report and the table, then renames both into place with the
/// table last. Staging files are removed on failure.
fn persist(
    output: &Path,
    records: &[CityRecord],
    report: &PipelineReport,
) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(report)?;

    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        paths::ensure_dir(parent).map_err(|source| PipelineError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let report_path = paths::report_path_for(output);
    let report_staging = paths::staging_path_for(&report_path);
    std::fs::write(&report_staging, json).map_err(|source| {
        std::fs::remove_file(&report_staging).ok();
        PipelineError::Io {
            path: report_staging.clone(),
            source,
        }
    })?;

    let table_staging = match smart_city_table::stage_city_table(output, records) {
        Ok(staging) => staging,
        Err(e) => {
            std::fs::remove_file(&report_staging).ok();
            return Err(e.into());
        }
    };

    if let Err(e) = smart_city_table::commit_staged(&report_staging, &report_path) {
        std::fs::remove_file(&table_staging).ok();
        return Err(e.into());
    }
    smart_city_table::commit_staged(&table_staging, output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use smart_city_city_models::{CityTable, Metric};

    const DEMOGRAPHICS: &str = "\
city,state,population,lat,lng
Alpha,AA,1000,40.0,-100.0
Beta,AA,2000,41.0,-101.0
Gamma,BB,3000,42.0,-102.0
Delta,BB,4000,43.0,-103.0
";

    const CRIME: &str = "\
state,violent_crime_rate_2020
AA,200
BB,400
";

    const INCOME: &str = "\
city,state,median_household_income_2020,avg_income
Alpha,AA,60000,50000
Beta,AA,40000,50000
Gamma,BB,80000,50000
Delta,BB,50000,50000
";

    fn build_from(demographics: &str, crime: &str, income: &str) -> PipelineOutput {
        build(
            &load::read_demographics(demographics.as_bytes()).unwrap(),
            &load::read_crime(crime.as_bytes()).unwrap(),
            &load::read_income(income.as_bytes()).unwrap(),
            &PipelineOptions::default(),
        )
        .unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn end_to_end_known_values() {
        let output = build_from(DEMOGRAPHICS, CRIME, INCOME);
        let table = CityTable::new(output.records);
        assert_eq!(table.len(), 4);

        let expected = [
            // city, state, safety_norm, income_norm, affordability_norm, livability
            ("Alpha", "AA", 1.0, 0.5, 0.5, 0.7),
            ("Beta", "AA", 1.0, 0.0, 0.0, 0.4),
            ("Gamma", "BB", 0.0, 1.0, 1.0, 0.6),
            ("Delta", "BB", 0.0, 0.25, 0.25, 0.15),
        ];

        for (city, state, safety, income, affordability, livability) in expected {
            let r = table.find(city, state).unwrap();
            assert_close(r.safety_index_norm, safety);
            assert_close(r.median_household_income_2020_norm, income);
            assert_close(r.affordability_index_norm, affordability);
            assert_close(r.livability_score, livability);
        }

        let alpha = table.find("Alpha", "AA").unwrap();
        assert_close(alpha.safety_index, 0.005);
        assert_close(alpha.affordability_index, 1.2);
    }

    #[test]
    fn output_is_sorted_by_state_then_city() {
        let output = build_from(DEMOGRAPHICS, CRIME, INCOME);
        let keys: Vec<(&str, &str)> = output.records.iter().map(CityRecord::key).collect();
        assert_eq!(
            keys,
            vec![
                ("Alpha", "AA"),
                ("Beta", "AA"),
                ("Delta", "BB"),
                ("Gamma", "BB"),
            ]
        );
    }

    #[test]
    fn city_without_income_is_excluded_and_counted() {
        let demographics = format!("{DEMOGRAPHICS}Epsilon,BB,5000,44.0,-104.0\n");
        let output = build_from(&demographics, CRIME, INCOME);

        assert_eq!(output.records.len(), 4);
        assert!(output.records.iter().all(|r| r.city != "Epsilon"));
        assert_eq!(output.report.excluded_count(), 1);
        assert_eq!(
            output.report.excluded[0].reason,
            join::ExclusionReason::NoIncomeMatch
        );
        assert_eq!(output.report.inputs.demographics, 5);
    }

    #[test]
    fn identical_income_normalizes_to_zero() {
        let income = "\
city,state,median_household_income_2020,avg_income
Alpha,AA,50000,40000
Beta,AA,50000,50000
Gamma,BB,50000,60000
Delta,BB,50000,70000
";
        let output = build_from(DEMOGRAPHICS, CRIME, income);
        for r in &output.records {
            assert!(!r.median_household_income_2020_norm.is_nan());
            assert!(r.median_household_income_2020_norm.abs() < f64::EPSILON);
        }
        assert_eq!(output.report.degenerate_metrics(), vec![Metric::Income]);
    }

    #[test]
    fn zero_crime_state_does_not_flatten_other_safety_scores() {
        let demographics = format!("{DEMOGRAPHICS}Zeta,ZZ,100,45.0,-105.0\n");
        let crime = format!("{CRIME}ZZ,0\n");
        let income = format!("{INCOME}Zeta,ZZ,45000,50000\n");
        let output = build_from(&demographics, &crime, &income);
        let table = CityTable::new(output.records);

        let zeta = table.find("Zeta", "ZZ").unwrap();
        assert!(zeta.safety_index.is_finite());
        assert_close(zeta.safety_index, 0.005);
        assert_close(zeta.safety_index_norm, 1.0);
        assert_close(table.find("Alpha", "AA").unwrap().safety_index_norm, 1.0);
        assert_close(table.find("Gamma", "BB").unwrap().safety_index_norm, 0.0);
        assert_eq!(output.report.clamped_states.len(), 1);
        assert_eq!(output.report.clamped_states[0].state, "ZZ");
    }

    #[test]
    fn every_normalized_field_is_in_unit_interval() {
        let demographics = format!("{DEMOGRAPHICS}Zeta,ZZ,100,45.0,-105.0\n");
        let crime = format!("{CRIME}ZZ,0\n");
        let income = format!("{INCOME}Zeta,ZZ,1000000,3\n");
        let output = build_from(&demographics, &crime, &income);

        for r in &output.records {
            for metric in Metric::ALL {
                let v = metric.normalized(r);
                assert!((0.0..=1.0).contains(&v), "{} {metric} = {v}", r.city);
            }
            assert!(r.livability_score >= 0.0 && r.livability_score <= 1.0 + 1e-12);
        }
    }

    #[test]
    fn input_row_order_does_not_change_output() {
        let shuffled = "\
city,state,population,lat,lng
Delta,BB,4000,43.0,-103.0
Beta,AA,2000,41.0,-101.0
Gamma,BB,3000,42.0,-102.0
Alpha,AA,1000,40.0,-100.0
";
        let a = build_from(DEMOGRAPHICS, CRIME, INCOME);
        let b = build_from(shuffled, CRIME, INCOME);
        assert_eq!(a.records, b.records);
    }

    fn write_sources(dir: &Path) -> SourcePaths {
        let sources = SourcePaths::in_dir(dir);
        std::fs::write(&sources.demographics, DEMOGRAPHICS).unwrap();
        std::fs::write(&sources.crime, CRIME).unwrap();
        std::fs::write(&sources.income, INCOME).unwrap();
        sources
    }

    #[test]
    fn run_is_byte_identical_across_reruns() {
        let dir = tempfile::tempdir().unwrap();
        let sources = write_sources(dir.path());
        let output = paths::merged_path(dir.path());
        let progress = progress::null_progress();

        run(&sources, &output, &PipelineOptions::default(), &progress).unwrap();
        let first = std::fs::read(&output).unwrap();
        let first_report = std::fs::read(paths::report_path_for(&output)).unwrap();

        run(&sources, &output, &PipelineOptions::default(), &progress).unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), first);
        assert_eq!(
            std::fs::read(paths::report_path_for(&output)).unwrap(),
            first_report
        );

        let table = smart_city_table::read_city_table(&output).unwrap();
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn failed_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sources = write_sources(dir.path());
        std::fs::write(
            &sources.income,
            "city,state,median_household_income_2020\nAlpha,AA,1\n",
        )
        .unwrap();
        let output = paths::merged_path(dir.path());

        let err = run(
            &sources,
            &output,
            &PipelineOptions::default(),
            &progress::null_progress(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Load(DataLoadError::MissingColumns { .. })
        ));
        assert!(!output.exists());
        assert!(!paths::report_path_for(&output).exists());
    }

    #[test]
    fn unwritable_report_leaves_no_table() {
        let dir = tempfile::tempdir().unwrap();
        let sources = write_sources(dir.path());
        let output = paths::merged_path(dir.path());
        let report_path = paths::report_path_for(&output);
        std::fs::create_dir(&report_path).unwrap();
        std::fs::write(report_path.join("keep"), "").unwrap();

        let result = run(
            &sources,
            &output,
            &PipelineOptions::default(),
            &progress::null_progress(),
        );

        assert!(result.is_err());
        assert!(!output.exists());
        assert!(!paths::staging_path_for(&output).exists());
        assert!(!paths::staging_path_for(&report_path).exists());
    }

    #[test]
    fn subnormal_average_income_is_excluded_not_normalized() {
        let income = INCOME.replace("Alpha,AA,60000,50000", "Alpha,AA,50000,1e-310");
        let output = build_from(DEMOGRAPHICS, CRIME, &income);

        assert!(output.records.iter().all(|r| r.city != "Alpha"));
        assert_eq!(
            output.report.excluded[0].reason,
            join::ExclusionReason::UnboundedAffordability
        );
        for r in &output.records {
            assert!(r.affordability_index.is_finite());
            for metric in Metric::ALL {
                let v = metric.normalized(r);
                assert!((0.0..=1.0).contains(&v), "{} {metric} = {v}", r.city);
            }
        }
    }

    #[test]
    fn duplicate_income_rows_abort_under_reject() {
        let income = format!("{INCOME}Alpha,AA,1,1\n");
        let err = build(
            &load::read_demographics(DEMOGRAPHICS.as_bytes()).unwrap(),
            &load::read_crime(CRIME.as_bytes()).unwrap(),
            &load::read_income(income.as_bytes()).unwrap(),
            &PipelineOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DataLoadError::DuplicateKey { .. }));
    }

    #[test]
    fn duplicate_income_rows_keep_first_when_configured() {
        let income = format!("{INCOME}Alpha,AA,1,1\n");
        let output = build(
            &load::read_demographics(DEMOGRAPHICS.as_bytes()).unwrap(),
            &load::read_crime(CRIME.as_bytes()).unwrap(),
            &load::read_income(income.as_bytes()).unwrap(),
            &PipelineOptions {
                duplicates: DuplicatePolicy::KeepFirst,
            },
        )
        .unwrap();
        assert_eq!(output.records.len(), 4);
        assert_eq!(output.report.duplicates_dropped.len(), 1);
        let alpha = output.records.iter().find(|r| r.city == "Alpha").unwrap();
        assert_close(alpha.median_household_income_2020, 60_000.0);
    }
}

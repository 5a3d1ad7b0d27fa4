#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Persisted city table storage.
//!
//! The merged city table is a flat CSV file with one row per
//! [`CityRecord`]. This crate owns its column layout, writes it atomically
//! (staged to a temporary sibling, then renamed into place) and reads it
//! back into an immutable [`CityTable`] with its invariants checked.

pub mod paths;

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use smart_city_city_models::{CityRecord, CityTable, Metric};
use thiserror::Error;

/// Column layout of the persisted artifact, in write order.
pub const COLUMNS: [&str; 14] = [
    "city",
    "state",
    "population",
    "lat",
    "lng",
    "median_household_income_2020",
    "violent_crime_rate_2020",
    "avg_income",
    "SafetyIndex",
    "AffordabilityIndex",
    "SafetyIndex_norm",
    "median_household_income_2020_norm",
    "AffordabilityIndex_norm",
    "LivabilityScore",
];

/// Errors that can occur while reading or writing the city table.
#[derive(Debug, Error)]
pub enum TableError {
    /// A file could not be opened, created, or renamed.
    #[error("I/O error on {}: {source}", path.display())]
    File {
        /// The file involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Writer-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding or decoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The table is missing columns the scoring service depends on.
    #[error("City table is missing required columns: {}", columns.join(", "))]
    MissingColumns {
        /// Columns that were not found in the header row.
        columns: Vec<String>,
    },

    /// The same `(city, state)` appears twice.
    #[error("Duplicate city in table: {city}, {state}")]
    DuplicateCity {
        /// City name.
        city: String,
        /// State.
        state: String,
    },

    /// A normalized column holds a value outside `[0, 1]`.
    #[error("{column} for {city}, {state} is {value}, expected a value in [0, 1]")]
    OutOfRange {
        /// City name.
        city: String,
        /// State.
        state: String,
        /// Offending column.
        column: &'static str,
        /// Offending value.
        value: f64,
    },
}

/// Serializes records as CSV into `writer`, header row first.
///
/// An empty slice still produces the header row so the artifact remains
/// readable.
///
/// # Errors
///
/// Returns [`TableError`] if serialization or the underlying write fails.
pub fn write_records<W: Write>(writer: W, records: &[CityRecord]) -> Result<(), TableError> {
    let mut wtr = csv::Writer::from_writer(writer);

    if records.is_empty() {
        wtr.write_record(COLUMNS)?;
    }

    for record in records {
        wtr.serialize(record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes the city table to `path` atomically.
///
/// The rows are written to a `.tmp` sibling first and renamed over `path`
/// only once every row has been written, so a failed run never leaves a
/// partial artifact behind.
///
/// # Errors
///
/// Returns [`TableError`] if the directory, staging file, or rename fails.
pub fn write_city_table(path: &Path, records: &[CityRecord]) -> Result<(), TableError> {
    let staging = stage_city_table(path, records)?;
    commit_staged(&staging, path)?;

    log::info!("Wrote {} cities to {}", records.len(), path.display());
    Ok(())
}

/// Writes the city table to the `.tmp` sibling of `path` and returns the
/// staging path. `path` itself is untouched until [`commit_staged`].
///
/// # Errors
///
/// Returns [`TableError`] if the directory or staging file cannot be
/// written. The staging file is removed on failure.
pub fn stage_city_table(path: &Path, records: &[CityRecord]) -> Result<PathBuf, TableError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        paths::ensure_dir(parent).map_err(|source| TableError::File {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let staging = paths::staging_path_for(path);
    let file = File::create(&staging).map_err(|source| TableError::File {
        path: staging.clone(),
        source,
    })?;

    if let Err(e) = write_records(file, records) {
        std::fs::remove_file(&staging).ok();
        return Err(e);
    }

    Ok(staging)
}

/// Renames a staged file over `path`. The staging file is removed if the
/// rename fails.
///
/// # Errors
///
/// Returns [`TableError::File`] if the rename fails.
pub fn commit_staged(staging: &Path, path: &Path) -> Result<(), TableError> {
    std::fs::rename(staging, path).map_err(|source| {
        std::fs::remove_file(staging).ok();
        TableError::File {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Parses a city table from CSV.
///
/// Checks that every column is present, that `(city, state)` identities
/// are unique, and that normalized columns lie in `[0, 1]`.
///
/// # Errors
///
/// Returns [`TableError`] if the CSV is malformed or an invariant fails.
pub fn read_records<R: Read>(reader: R) -> Result<CityTable, TableError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let missing: Vec<String> = COLUMNS
        .iter()
        .filter(|c| !headers.iter().any(|h| h == **c))
        .map(|c| (*c).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(TableError::MissingColumns { columns: missing });
    }

    let mut seen = BTreeSet::new();
    let mut records = Vec::new();

    for result in rdr.deserialize::<CityRecord>() {
        let record = result?;

        for metric in Metric::ALL {
            let value = metric.normalized(&record);
            if !(0.0..=1.0).contains(&value) {
                return Err(TableError::OutOfRange {
                    city: record.city,
                    state: record.state,
                    column: metric.norm_column(),
                    value,
                });
            }
        }

        if !seen.insert((record.city.clone(), record.state.clone())) {
            return Err(TableError::DuplicateCity {
                city: record.city,
                state: record.state,
            });
        }

        records.push(record);
    }

    Ok(CityTable::new(records))
}

/// Opens and parses the city table at `path`.
///
/// # Errors
///
/// Returns [`TableError`] if the file cannot be opened or parsed.
pub fn read_city_table(path: &Path) -> Result<CityTable, TableError> {
    let file = File::open(path).map_err(|source| TableError::File {
        path: path.to_path_buf(),
        source,
    })?;
    let table = read_records(file)?;
    log::info!("Loaded {} cities from {}", table.len(), path.display());
    Ok(table)
}

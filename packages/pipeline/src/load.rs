//! Source table loading and validation.
//!
//! Each source CSV must carry a header row with the columns its row type
//! requires; extra columns are ignored. Cells are trimmed before parsing.
//! Any structural or value problem is fatal and surfaces as a
//! [`DataLoadError`].

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use smart_city_city_models::{CityDemographic, CrimeRecord, IncomeRecord};
use smart_city_table::paths::SourcePaths;
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

/// Identifies one of the three source tables in errors and reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceTable {
    /// City demographics.
    Demographics,
    /// State violent crime rates.
    Crime,
    /// City income.
    Income,
}

/// Fatal problems with the source tables. No output is written when one of
/// these occurs.
#[derive(Debug, Error)]
pub enum DataLoadError {
    /// The source file could not be opened.
    #[error("Failed to open {table} table at {}: {source}", path.display())]
    Io {
        /// Which table.
        table: SourceTable,
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Required columns are absent from the header row.
    #[error("{table} table is missing required columns: {}", columns.join(", "))]
    MissingColumns {
        /// Which table.
        table: SourceTable,
        /// Missing column names.
        columns: Vec<String>,
    },

    /// The file is not valid CSV or a row does not match its column types.
    #[error("Failed to parse {table} table: {source}")]
    Parse {
        /// Which table.
        table: SourceTable,
        /// Underlying CSV error, including the position.
        source: csv::Error,
    },

    /// A numeric cell is negative or not finite.
    #[error(
        "{table} table line {line}: {column} must be a finite non-negative number, got {value}"
    )]
    InvalidValue {
        /// Which table.
        table: SourceTable,
        /// 1-based line number in the file.
        line: u64,
        /// Offending column.
        column: &'static str,
        /// Offending value.
        value: f64,
    },

    /// A key column is empty.
    #[error("{table} table line {line}: {column} is empty")]
    EmptyKey {
        /// Which table.
        table: SourceTable,
        /// 1-based line number in the file.
        line: u64,
        /// Offending column.
        column: &'static str,
    },

    /// The same join key appears more than once and duplicates are rejected.
    #[error("{table} table has duplicate key '{key}' at data row {row}")]
    DuplicateKey {
        /// Which table.
        table: SourceTable,
        /// The duplicated key, formatted as `city, state` or `state`.
        key: String,
        /// 1-based data row of the second occurrence.
        row: usize,
    },
}

/// A row type that can be read from one of the source CSVs.
pub trait SourceRow: DeserializeOwned {
    /// Which table this row belongs to.
    const TABLE: SourceTable;

    /// Header columns that must be present.
    const REQUIRED_COLUMNS: &'static [&'static str];

    /// Checks value-level constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`DataLoadError`] describing the first violated constraint.
    fn validate(&self, line: u64) -> Result<(), DataLoadError>;
}

fn require_key(
    table: SourceTable,
    line: u64,
    column: &'static str,
    value: &str,
) -> Result<(), DataLoadError> {
    if value.is_empty() {
        return Err(DataLoadError::EmptyKey {
            table,
            line,
            column,
        });
    }
    Ok(())
}

fn require_non_negative(
    table: SourceTable,
    line: u64,
    column: &'static str,
    value: f64,
) -> Result<(), DataLoadError> {
    if !value.is_finite() || value < 0.0 {
        return Err(DataLoadError::InvalidValue {
            table,
            line,
            column,
            value,
        });
    }
    Ok(())
}

fn require_finite(
    table: SourceTable,
    line: u64,
    column: &'static str,
    value: f64,
) -> Result<(), DataLoadError> {
    if !value.is_finite() {
        return Err(DataLoadError::InvalidValue {
            table,
            line,
            column,
            value,
        });
    }
    Ok(())
}

impl SourceRow for CityDemographic {
    const TABLE: SourceTable = SourceTable::Demographics;
    const REQUIRED_COLUMNS: &'static [&'static str] =
        &["city", "state", "population", "lat", "lng"];

    fn validate(&self, line: u64) -> Result<(), DataLoadError> {
        require_key(Self::TABLE, line, "city", &self.city)?;
        require_key(Self::TABLE, line, "state", &self.state)?;
        require_finite(Self::TABLE, line, "lat", self.lat)?;
        require_finite(Self::TABLE, line, "lng", self.lng)
    }
}

impl SourceRow for CrimeRecord {
    const TABLE: SourceTable = SourceTable::Crime;
    const REQUIRED_COLUMNS: &'static [&'static str] = &["state", "violent_crime_rate_2020"];

    fn validate(&self, line: u64) -> Result<(), DataLoadError> {
        require_key(Self::TABLE, line, "state", &self.state)?;
        if let Some(rate) = self.violent_crime_rate_2020 {
            require_non_negative(Self::TABLE, line, "violent_crime_rate_2020", rate)?;
        }
        Ok(())
    }
}

impl SourceRow for IncomeRecord {
    const TABLE: SourceTable = SourceTable::Income;
    const REQUIRED_COLUMNS: &'static [&'static str] = &[
        "city",
        "state",
        "median_household_income_2020",
        "avg_income",
    ];

    fn validate(&self, line: u64) -> Result<(), DataLoadError> {
        require_key(Self::TABLE, line, "city", &self.city)?;
        require_key(Self::TABLE, line, "state", &self.state)?;
        if let Some(income) = self.median_household_income_2020 {
            require_non_negative(Self::TABLE, line, "median_household_income_2020", income)?;
        }
        if let Some(avg) = self.avg_income {
            require_non_negative(Self::TABLE, line, "avg_income", avg)?;
        }
        Ok(())
    }
}

/// Parses and validates every row of a source table.
///
/// # Errors
///
/// Returns [`DataLoadError`] if a required column is missing, a row fails
/// to parse, or a value is out of range.
pub fn read_table<T: SourceRow, R: Read>(reader: R) -> Result<Vec<T>, DataLoadError> {
    let table = T::TABLE;
    let parse_err = |source| DataLoadError::Parse { table, source };

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(parse_err)?.clone();
    let missing: Vec<String> = T::REQUIRED_COLUMNS
        .iter()
        .filter(|c| !headers.iter().any(|h| h == **c))
        .map(|c| (*c).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DataLoadError::MissingColumns {
            table,
            columns: missing,
        });
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(parse_err)?;
        let line = record.position().map_or(0, csv::Position::line);
        let row: T = record.deserialize(Some(&headers)).map_err(parse_err)?;
        row.validate(line)?;
        rows.push(row);
    }

    log::debug!("Parsed {} {table} rows", rows.len());
    Ok(rows)
}

/// Reads the demographics table.
///
/// # Errors
///
/// See [`read_table`].
pub fn read_demographics<R: Read>(reader: R) -> Result<Vec<CityDemographic>, DataLoadError> {
    read_table(reader)
}

/// Reads the crime table.
///
/// # Errors
///
/// See [`read_table`].
pub fn read_crime<R: Read>(reader: R) -> Result<Vec<CrimeRecord>, DataLoadError> {
    read_table(reader)
}

/// Reads the income table.
///
/// # Errors
///
/// See [`read_table`].
pub fn read_income<R: Read>(reader: R) -> Result<Vec<IncomeRecord>, DataLoadError> {
    read_table(reader)
}

fn read_file<T: SourceRow>(path: &Path) -> Result<Vec<T>, DataLoadError> {
    let file = File::open(path).map_err(|source| DataLoadError::Io {
        table: T::TABLE,
        path: path.to_path_buf(),
        source,
    })?;
    let rows = read_table(file)?;
    log::info!("Loaded {} {} rows from {}", rows.len(), T::TABLE, path.display());
    Ok(rows)
}

/// The three parsed source tables.
#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    /// Demographics rows.
    pub demographics: Vec<CityDemographic>,
    /// Crime rows.
    pub crime: Vec<CrimeRecord>,
    /// Income rows.
    pub income: Vec<IncomeRecord>,
}

/// Opens and parses all three source tables.
///
/// # Errors
///
/// Returns the first [`DataLoadError`] encountered.
pub fn load_sources(paths: &SourcePaths) -> Result<SourceTables, DataLoadError> {
    Ok(SourceTables {
        demographics: read_file(&paths.demographics)?,
        crime: read_file(&paths.crime)?,
        income: read_file(&paths.income)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_demographics_ignoring_extra_columns() {
        let csv = "city,state_id,state,population,lat,lng,county\n\
                   Boise , ID_X, ID ,235684,43.6,-116.2,Ada\n";
        let rows = read_demographics(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].city, "Boise");
        assert_eq!(rows[0].state, "ID");
        assert_eq!(rows[0].population, 235_684);
    }

    #[test]
    fn empty_numeric_cells_are_missing_values() {
        let csv = "city,state,median_household_income_2020,avg_income\n\
                   Boise,ID,,65000\n";
        let rows = read_income(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].median_household_income_2020, None);
        assert_eq!(rows[0].avg_income, Some(65_000.0));
    }

    #[test]
    fn reports_missing_columns() {
        let csv = "state,rate\nID,240.1\n";
        match read_crime(csv.as_bytes()).unwrap_err() {
            DataLoadError::MissingColumns { table, columns } => {
                assert_eq!(table, SourceTable::Crime);
                assert_eq!(columns, vec!["violent_crime_rate_2020".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_negative_crime_rate() {
        let csv = "state,violent_crime_rate_2020\nID,240.1\nUT,-3\n";
        match read_crime(csv.as_bytes()).unwrap_err() {
            DataLoadError::InvalidValue { line, column, .. } => {
                assert_eq!(line, 3);
                assert_eq!(column, "violent_crime_rate_2020");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_unparseable_population() {
        let csv = "city,state,population,lat,lng\nBoise,ID,lots,43.6,-116.2\n";
        assert!(matches!(
            read_demographics(csv.as_bytes()),
            Err(DataLoadError::Parse {
                table: SourceTable::Demographics,
                ..
            })
        ));
    }

    #[test]
    fn rejects_empty_city() {
        let csv = "city,state,population,lat,lng\n,ID,10,43.6,-116.2\n";
        assert!(matches!(
            read_demographics(csv.as_bytes()),
            Err(DataLoadError::EmptyKey { column: "city", .. })
        ));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SourcePaths::in_dir(dir.path());
        assert!(matches!(
            load_sources(&paths),
            Err(DataLoadError::Io {
                table: SourceTable::Demographics,
                ..
            })
        ));
    }
}

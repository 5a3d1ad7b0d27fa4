#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the data directory.
//!
//! The data directory defaults to `data/` under the project root and can be
//! overridden with the `SMART_CITY_DATA_DIR` environment variable.

use std::path::{Path, PathBuf};

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "SMART_CITY_DATA_DIR";

/// File name of the demographics source table.
pub const DEMOGRAPHICS_FILE: &str = "uscities_2020.csv";

/// File name of the state crime source table.
pub const CRIME_FILE: &str = "violent_crime_2020.csv";

/// File name of the income source table.
pub const INCOME_FILE: &str = "income_2020.csv";

/// File name of the merged output artifact.
pub const MERGED_FILE: &str = "merged_smartcity.csv";

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`. Falls back to the
/// current directory if the manifest is not nested as expected.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Returns the data directory, honoring [`DATA_DIR_ENV`].
#[must_use]
pub fn data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map_or_else(|| project_root().join("data"), PathBuf::from)
}

/// Paths to the three source tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    /// Demographics CSV.
    pub demographics: PathBuf,
    /// Crime CSV.
    pub crime: PathBuf,
    /// Income CSV.
    pub income: PathBuf,
}

impl SourcePaths {
    /// Standard source file names inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            demographics: dir.join(DEMOGRAPHICS_FILE),
            crime: dir.join(CRIME_FILE),
            income: dir.join(INCOME_FILE),
        }
    }
}

/// Returns the merged artifact path inside `dir`.
#[must_use]
pub fn merged_path(dir: &Path) -> PathBuf {
    dir.join(MERGED_FILE)
}

/// Returns the pipeline report path that accompanies an artifact, e.g.
/// `merged_smartcity.report.json` next to `merged_smartcity.csv`.
#[must_use]
pub fn report_path_for(artifact: &Path) -> PathBuf {
    artifact.with_extension("report.json")
}

/// Returns the temporary sibling an artifact is staged in before being
/// renamed into place.
#[must_use]
pub fn staging_path_for(artifact: &Path) -> PathBuf {
    let mut name = artifact
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    artifact.with_file_name(name)
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

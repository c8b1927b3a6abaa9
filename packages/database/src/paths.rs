#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the `DuckDB` data directory.
//!
//! All paths are relative to the project root's `data/` directory.

use std::path::{Path, PathBuf};

/// Special path that opens a transient in-memory `DuckDB` database.
pub const IN_MEMORY: &str = ":memory:";

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`.
///
/// # Panics
///
/// Panics if the project root cannot be resolved.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("Failed to find project root from CARGO_MANIFEST_DIR")
        .to_path_buf()
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the default path of the country record `DuckDB` file.
#[must_use]
pub fn covid_db_path() -> PathBuf {
    data_dir().join("covid.duckdb")
}

/// Returns `true` if `path` requests an in-memory database.
#[must_use]
pub fn is_in_memory(path: &Path) -> bool {
    path.as_os_str() == IN_MEMORY
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.as_os_str().is_empty() && !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_db_lives_under_data_dir() {
        let path = covid_db_path();
        assert!(path.starts_with(data_dir()));
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("covid.duckdb"));
    }

    #[test]
    fn recognizes_in_memory_path() {
        assert!(is_in_memory(Path::new(":memory:")));
        assert!(!is_in_memory(Path::new("data/covid.duckdb")));
    }
}

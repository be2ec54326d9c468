//! Data loading utilities

use crate::error::{ExoSeekrError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

/// CSV loader with project-root-relative path resolution
pub struct DataLoader {
    project_root: PathBuf,
}

impl DataLoader {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    /// Resolve a data-source path: absolute paths are used as-is, relative
    /// paths are tried against the project root.
    pub fn resolve(&self, path: &Path) -> Result<PathBuf> {
        if path.is_absolute() && path.exists() {
            return Ok(path.to_path_buf());
        }
        let candidate = self.project_root.join(path);
        if candidate.exists() {
            return Ok(candidate);
        }
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        Err(ExoSeekrError::NotFound(format!(
            "CSV not found at: {}",
            path.display()
        )))
    }

    /// Load a CSV file into a DataFrame. The file must exist and must not
    /// be empty.
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame> {
        let resolved = self.resolve(path)?;
        let file = File::open(&resolved)
            .map_err(|e| ExoSeekrError::DataError(format!("{}: {}", resolved.display(), e)))?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(1000))
            .into_reader_with_file_handle(file)
            .finish()?;

        if df.height() == 0 {
            return Err(ExoSeekrError::ValidationError(
                "Input CSV is empty.".to_string(),
            ));
        }

        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        write!(file, "{}", contents).unwrap();
        path
    }

    #[test]
    fn test_load_csv() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "data.csv", "a,b\n1,2\n3,4\n");

        let loader = DataLoader::new(dir.path());
        let df = loader.load_csv(&path).unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 2);
    }

    #[test]
    fn test_relative_path_resolution() {
        let dir = TempDir::new().unwrap();
        write_csv(&dir, "data.csv", "a\n1\n");

        let loader = DataLoader::new(dir.path());
        let df = loader.load_csv(Path::new("data.csv")).unwrap();

        assert_eq!(df.height(), 1);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let loader = DataLoader::new(dir.path());

        let err = loader.load_csv(Path::new("nope.csv")).unwrap_err();
        assert!(matches!(err, ExoSeekrError::NotFound(_)));
    }

    #[test]
    fn test_empty_csv_fails_validation() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "empty.csv", "a,b\n");

        let loader = DataLoader::new(dir.path());
        let err = loader.load_csv(&path).unwrap_err();
        assert!(matches!(err, ExoSeekrError::ValidationError(_)));
    }
}

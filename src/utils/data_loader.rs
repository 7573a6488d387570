//! Data loading utilities

use crate::error::{HeartError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// CSV loader for raw and processed datasets
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows used for schema inference on headed files
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: Some(100),
        }
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let file = File::open(path.as_ref())
            .map_err(|e| HeartError::DataError(format!("{}: {}", path.as_ref().display(), e)))?;

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| HeartError::DataError(e.to_string()))
    }

    /// Load a headerless CSV file, naming the columns in order.
    ///
    /// Every column is read as text so that sentinels and malformed cells
    /// survive until the caller decides how to parse them.
    pub fn load_headerless_csv(&self, path: impl AsRef<Path>, names: &[String]) -> Result<DataFrame> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)
            .map_err(|e| HeartError::DataError(format!("{}: {}", path.display(), e)))?;
        if metadata.len() == 0 {
            return Err(HeartError::MalformedInput(format!(
                "{} contains no records",
                path.display()
            )));
        }

        let file = File::open(path)?;
        let df = CsvReadOptions::default()
            .with_has_header(false)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| HeartError::DataError(e.to_string()))?;

        if df.width() != names.len() {
            return Err(HeartError::MalformedInput(format!(
                "expected {} columns, found {}",
                names.len(),
                df.width()
            )));
        }

        let columns: Vec<Column> = df
            .get_columns()
            .iter()
            .zip(names.iter())
            .map(|(col, name)| {
                let mut col = col.clone();
                col.rename(name.as_str().into());
                col
            })
            .collect();

        Ok(DataFrame::new(columns)?)
    }
}

/// Save DataFrames to disk
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV with a header row. The file is replaced atomically.
    pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        super::write_atomic(path.as_ref(), |file| {
            CsvWriter::new(file)
                .include_header(true)
                .finish(df)
                .map_err(|e| HeartError::DataError(e.to_string()))
        })
    }
}

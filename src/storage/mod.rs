//! Storage backend (Arrow CSV/Parquet)
//!
//! Raw datasets are small, read-whole tables. The engine reads a file into
//! record batches and hands the dataset layer a single combined batch.
//!
//! **Read-Only Design**:
//! - Datasets are replaced wholesale on reload, never mutated in place
//! - Large CSV files arrive as several batches and are concatenated once

use crate::{Error, Result};
use arrow::compute;
use arrow::csv::reader::Format;
use arrow::record_batch::RecordBatch;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

/// Rows per CSV record batch
const CSV_BATCH_SIZE: usize = 8192;

/// On-disk format of a dataset file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetFormat {
    /// Comma-separated values with a header row
    #[default]
    Csv,
    /// Apache Parquet
    Parquet,
}

impl DatasetFormat {
    /// File extension used when resolving `<identifier>.<ext>`
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        }
    }
}

/// Storage engine for Arrow data read from CSV or Parquet
pub struct StorageEngine {
    batches: Vec<RecordBatch>,
}

impl StorageEngine {
    /// Load table from a file in the given format
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load<P: AsRef<Path>>(path: P, format: DatasetFormat) -> Result<Self> {
        match format {
            DatasetFormat::Csv => Self::load_csv(path),
            DatasetFormat::Parquet => Self::load_parquet(path),
        }
    }

    /// Load table from a CSV file with a header row
    ///
    /// The schema is inferred from the whole file so that a column which is
    /// integral in the first rows and fractional later still reads as float.
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path.as_ref())?;

        let format = Format::default().with_header(true);
        let (schema, _) = format
            .infer_schema(&mut file, None)
            .map_err(|e| Error::StorageError(format!("Failed to infer CSV schema: {e}")))?;
        file.seek(SeekFrom::Start(0))?;
        let schema = Arc::new(schema);

        let reader = arrow::csv::ReaderBuilder::new(Arc::clone(&schema))
            .with_format(format)
            .with_batch_size(CSV_BATCH_SIZE)
            .build(file)
            .map_err(|e| Error::StorageError(format!("Failed to create CSV reader: {e}")))?;

        let mut batches = Vec::new();
        for batch in reader {
            let batch = batch
                .map_err(|e| Error::StorageError(format!("Failed to read CSV record batch: {e}")))?;
            batches.push(batch);
        }
        // Header-only file: keep the schema so the dataset reads as zero rows
        if batches.is_empty() {
            batches.push(RecordBatch::new_empty(schema));
        }

        Ok(Self { batches })
    }

    /// Load table from Parquet file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<Self> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let file = File::open(path.as_ref())?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| {
            Error::StorageError(format!("Failed to parse Parquet file: {e}"))
        })?;
        let schema = Arc::clone(builder.schema());

        let reader = builder.build().map_err(|e| {
            Error::StorageError(format!("Failed to create Parquet reader: {e}"))
        })?;

        // Read all batches into memory
        let mut batches = Vec::new();
        for batch in reader {
            let batch = batch.map_err(|e| {
                Error::StorageError(format!("Failed to read record batch: {e}"))
            })?;
            batches.push(batch);
        }
        if batches.is_empty() {
            batches.push(RecordBatch::new_empty(schema));
        }

        Ok(Self { batches })
    }

    /// Get all record batches
    #[must_use]
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Combine all batches into a single batch
    ///
    /// # Errors
    /// Returns error if the storage holds no batches (schema unknown) or
    /// Arrow fails to concatenate them
    pub fn into_single_batch(mut self) -> Result<RecordBatch> {
        match self.batches.len() {
            0 => Err(Error::StorageError(
                "No record batches to combine".to_string(),
            )),
            1 => Ok(self.batches.remove(0)),
            _ => compute::concat_batches(&self.batches[0].schema(), &self.batches)
                .map_err(|e| Error::StorageError(format!("Failed to combine batches: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Float64Array};
    use arrow::datatypes::DataType;
    use std::io::Write;

    #[test]
    fn test_large_csv_combines_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data_big.csv");
        let rows = CSV_BATCH_SIZE * 2 + 17;
        let mut file = File::create(&path).unwrap();
        writeln!(file, "blood_pressure,sex").unwrap();
        for i in 0..rows {
            let sex = if i % 2 == 0 { "Male" } else { "Female" };
            writeln!(file, "{}.5,{sex}", 90 + i % 100).unwrap();
        }
        drop(file);

        let storage = StorageEngine::load_csv(&path).unwrap();
        assert_eq!(storage.batches().len(), 3);

        let combined = storage.into_single_batch().unwrap();
        assert_eq!(combined.num_rows(), rows);
        let bp = combined
            .column(0)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(bp.value(0), 90.5);
        assert_eq!(bp.value(rows - 1), 90.5 + ((rows - 1) % 100) as f64);
    }

    #[test]
    fn test_combine_empty_storage_fails() {
        let storage = StorageEngine { batches: vec![] };
        assert!(storage.into_single_batch().is_err());
    }

    #[test]
    fn test_load_csv_infers_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data_ref.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "age,blood_pressure,sex").unwrap();
        writeln!(file, "40,120,Male").unwrap();
        writeln!(file, "52,130.5,Female").unwrap();
        drop(file);

        let batch = StorageEngine::load_csv(&path)
            .unwrap()
            .into_single_batch()
            .unwrap();

        assert_eq!(batch.num_rows(), 2);
        let schema = batch.schema();
        assert_eq!(
            schema.field_with_name("blood_pressure").unwrap().data_type(),
            &DataType::Float64
        );
        assert_eq!(
            schema.field_with_name("sex").unwrap().data_type(),
            &DataType::Utf8
        );
    }

    #[test]
    fn test_load_header_only_csv_is_empty_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "blood_pressure,sex\n").unwrap();

        let batch = StorageEngine::load_csv(&path)
            .unwrap()
            .into_single_batch()
            .unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 2);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = StorageEngine::load_csv("/nonexistent/trueno_drift.csv");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_format_extension() {
        assert_eq!(DatasetFormat::Csv.extension(), "csv");
        assert_eq!(DatasetFormat::Parquet.extension(), "parquet");
    }
}

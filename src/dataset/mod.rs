//! Raw datasets and the dataset catalog
//!
//! A [`RawDataset`] is an immutable Arrow batch that is guaranteed to carry
//! the two columns the merger reads:
//!
//! - `blood_pressure`: normalized to non-null `Float64`
//! - `sex`: normalized to `Utf8` (nulls allowed)
//!
//! Any other columns are kept as-is for table previews.
//!
//! ## Usage
//!
//! ```rust
//! use trueno_drift::dataset::{DatasetCatalog, RawDataset};
//!
//! let catalog = DatasetCatalog::default();
//! assert!(catalog.contains("data_ref"));
//!
//! let dataset = RawDataset::from_rows([(120.0, "Male"), (130.0, "Female")])?;
//! assert_eq!(dataset.num_rows(), 2);
//! # Ok::<(), trueno_drift::Error>(())
//! ```

mod loader;
mod memory;

pub use loader::{DatasetLoader, FileDatasetLoader};
pub use memory::MemoryDatasetLoader;

use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, Float64Array, RecordBatch, StringArray};
use arrow::compute;
use arrow::datatypes::{DataType, Field, Schema};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Numeric column projected into the distribution series
pub const BLOOD_PRESSURE_COLUMN: &str = "blood_pressure";

/// Categorical column partitioned into the category-count table
pub const SEX_COLUMN: &str = "sex";

/// Identifiers shipped with the drift dashboard
pub const DEFAULT_CATALOG: [&str; 4] = ["data_ref", "data_noisy", "data_female", "data_big"];

/// Rows shown per raw-table page
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Closed set of dataset identifiers the loader accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetCatalog {
    identifiers: Vec<String>,
}

impl DatasetCatalog {
    /// Create a catalog from a list of identifiers.
    ///
    /// Duplicates are dropped; first occurrence wins the position.
    #[must_use]
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for id in identifiers {
            let id = id.into();
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Self { identifiers: unique }
    }

    /// Check whether `identifier` belongs to the catalog.
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.identifiers.iter().any(|id| id == identifier)
    }

    /// Identifiers in display order.
    #[must_use]
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    /// Number of identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    /// Check if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Fail with [`Error::DatasetNotFound`] unless `identifier` is catalogued.
    ///
    /// # Errors
    ///
    /// Returns `DatasetNotFound` for identifiers outside the catalog
    pub fn ensure(&self, identifier: &str) -> Result<()> {
        if self.contains(identifier) {
            Ok(())
        } else {
            Err(Error::not_found(identifier))
        }
    }
}

impl Default for DatasetCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_CATALOG)
    }
}

/// Immutable raw dataset backing one side of the comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDataset {
    batch: RecordBatch,
    blood_pressure: Float64Array,
    sex: StringArray,
}

impl RawDataset {
    /// Validate and normalize a record batch.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDataset` if `blood_pressure` or `sex` is missing,
    /// cannot be cast to its expected type, or `blood_pressure` has nulls
    pub fn try_new(batch: RecordBatch) -> Result<Self> {
        let schema = batch.schema();
        let bp_index = column_index(&schema, BLOOD_PRESSURE_COLUMN)?;
        let sex_index = column_index(&schema, SEX_COLUMN)?;

        let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
        let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();

        let bp = cast_column(&columns[bp_index], BLOOD_PRESSURE_COLUMN, &DataType::Float64)?;
        if bp.null_count() > 0 {
            return Err(Error::InvalidDataset(format!(
                "column '{BLOOD_PRESSURE_COLUMN}' has {} null or non-numeric values",
                bp.null_count()
            )));
        }
        let sex = cast_column(&columns[sex_index], SEX_COLUMN, &DataType::Utf8)?;

        let blood_pressure = bp
            .as_any()
            .downcast_ref::<Float64Array>()
            .cloned()
            .ok_or_else(|| Error::Other("Failed to downcast to Float64Array".to_string()))?;
        let sex_values = sex
            .as_any()
            .downcast_ref::<StringArray>()
            .cloned()
            .ok_or_else(|| Error::Other("Failed to downcast to StringArray".to_string()))?;

        columns[bp_index] = bp;
        fields[bp_index] = Field::new(BLOOD_PRESSURE_COLUMN, DataType::Float64, false);
        columns[sex_index] = sex;
        fields[sex_index] = Field::new(SEX_COLUMN, DataType::Utf8, true);

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        Ok(Self {
            batch,
            blood_pressure,
            sex: sex_values,
        })
    }

    /// Build a two-column dataset from `(blood_pressure, sex)` rows.
    ///
    /// # Errors
    ///
    /// Returns error if Arrow rejects the batch
    pub fn from_rows<I, S>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (f64, S)>,
        S: AsRef<str>,
    {
        let (bp, sex): (Vec<f64>, Vec<String>) = rows
            .into_iter()
            .map(|(bp, sex)| (bp, sex.as_ref().to_string()))
            .unzip();

        let schema = Schema::new(vec![
            Field::new(BLOOD_PRESSURE_COLUMN, DataType::Float64, false),
            Field::new(SEX_COLUMN, DataType::Utf8, true),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Float64Array::from(bp)),
                Arc::new(StringArray::from(sex)),
            ],
        )?;
        Self::try_new(batch)
    }

    /// Number of rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Check if the dataset has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// Underlying Arrow batch, including pass-through columns.
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// The `blood_pressure` column.
    #[must_use]
    pub const fn blood_pressure(&self) -> &Float64Array {
        &self.blood_pressure
    }

    /// The `sex` column.
    #[must_use]
    pub const fn sex(&self) -> &StringArray {
        &self.sex
    }

    /// First `rows` rows, for paged table display.
    #[must_use]
    pub fn preview(&self, rows: usize) -> RecordBatch {
        self.batch.slice(0, rows.min(self.batch.num_rows()))
    }
}

fn column_index(schema: &Schema, name: &str) -> Result<usize> {
    schema
        .index_of(name)
        .map_err(|_| Error::InvalidDataset(format!("missing column '{name}'")))
}

fn cast_column(column: &ArrayRef, name: &str, to: &DataType) -> Result<ArrayRef> {
    if column.data_type() == to {
        return Ok(Arc::clone(column));
    }
    compute::cast(column, to).map_err(|e| {
        Error::InvalidDataset(format!(
            "column '{name}' of type {:?} cannot be read as {to:?}: {e}",
            column.data_type()
        ))
    })
}

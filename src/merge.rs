//! Data merger: two raw datasets → plot-ready derived datasets
//!
//! [`merge`] is a pure function. It reads the `blood_pressure` and `sex`
//! columns of the reference and comparison datasets and produces:
//!
//! - a [`DistributionSeries`] (overlay histogram input, reference first)
//! - a [`CategoryCountTable`] (grouped bar chart input, `Ref` row first)
//!
//! ```text
//! reference ──┐                 ┌──> DistributionSeries [ref values, compare values]
//!             ├──> merge() ─────┤
//! compare ────┘                 └──> CategoryCountTable  Ref: {Male, Female}
//!                                                        Compare: {Male, Female}
//! ```
//!
//! Category matching is exact and case-sensitive. Values other than `Male`
//! and `Female` (including nulls) are not counted.

use crate::dataset::RawDataset;
use crate::{Error, Result};
use arrow::array::{Int64Array, RecordBatch, StringArray};
use arrow::compute::kernels::cmp;
use arrow::datatypes::{DataType, Field, Schema};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use trueno::Vector;

/// Label carried by every distribution group
pub const SERIES_LABEL: &str = "Blood Pressure";

/// Category values counted in the table, in column order
pub const CATEGORIES: [&str; 2] = ["Male", "Female"];

/// Bins per group in the overlay histogram
pub const DEFAULT_HISTOGRAM_BINS: usize = 10;

/// Role of a dataset in the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetRole {
    /// Reference dataset
    Ref,
    /// Comparison dataset
    Compare,
}

impl DatasetRole {
    /// Row key used in the category-count table.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ref => "Ref",
            Self::Compare => "Compare",
        }
    }
}

/// One group of the distribution series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesGroup {
    /// Display label
    pub label: String,
    /// Values in source row order
    pub values: Vec<f64>,
}

/// Count, mean and range of one series group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Number of values
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
}

impl SeriesGroup {
    fn project(dataset: &RawDataset) -> Self {
        Self {
            label: SERIES_LABEL.to_string(),
            values: dataset.blood_pressure().values().to_vec(),
        }
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the group has no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Summary statistics, `None` for an empty group.
    ///
    /// The mean is accumulated in `f64` over the source values. `min` and
    /// `max` come from trueno SIMD kernels over `f32` lanes, so they carry
    /// `f32` precision (about 7 significant digits).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_precision_loss)]
    pub fn summary(&self) -> Option<GroupSummary> {
        if self.values.is_empty() {
            return None;
        }
        let lanes: Vec<f32> = self.values.iter().map(|&v| v as f32).collect();
        let vector = Vector::from_slice(&lanes);

        Some(GroupSummary {
            count: self.values.len(),
            mean: self.values.iter().sum::<f64>() / self.values.len() as f64,
            min: f64::from(vector.min().ok()?),
            max: f64::from(vector.max().ok()?),
        })
    }
}

/// Histogram of one group over the shared bin edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupHistogram {
    /// Group label
    pub label: String,
    /// Count per bin
    pub counts: Vec<u64>,
}

/// Overlay histogram: both groups binned on the same edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayHistogram {
    /// `bins + 1` ascending edges
    pub edges: Vec<f64>,
    /// Reference group first, comparison second
    pub groups: [GroupHistogram; 2],
}

/// Ordered pair of value groups: reference first, comparison second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSeries {
    groups: [SeriesGroup; 2],
}

impl DistributionSeries {
    /// Reference group.
    #[must_use]
    pub const fn reference(&self) -> &SeriesGroup {
        &self.groups[0]
    }

    /// Comparison group.
    #[must_use]
    pub const fn compare(&self) -> &SeriesGroup {
        &self.groups[1]
    }

    /// Both groups in render order.
    #[must_use]
    pub const fn groups(&self) -> &[SeriesGroup; 2] {
        &self.groups
    }

    /// Bin both groups on shared, equal-width edges spanning their combined
    /// range. Values on the upper edge land in the last bin.
    ///
    /// # Errors
    ///
    /// Returns `Config` error if `bins` is zero
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_precision_loss)]
    #[allow(clippy::cast_sign_loss)]
    pub fn histogram(&self, bins: usize) -> Result<OverlayHistogram> {
        if bins == 0 {
            return Err(Error::Config("histogram needs at least one bin".to_string()));
        }

        let all = self.groups.iter().flat_map(|g| g.values.iter().copied());
        let (lo, hi) = all.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

        let (lo, hi) = if lo > hi {
            // No values at all
            (0.0, 1.0)
        } else if (hi - lo).abs() < f64::EPSILON {
            (lo - 0.5, hi + 0.5)
        } else {
            (lo, hi)
        };

        let width = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();

        let bin_group = |group: &SeriesGroup| {
            let mut counts = vec![0u64; bins];
            for &v in &group.values {
                let idx = (((v - lo) / width).floor().max(0.0) as usize).min(bins - 1);
                counts[idx] += 1;
            }
            GroupHistogram {
                label: group.label.clone(),
                counts,
            }
        };

        Ok(OverlayHistogram {
            edges,
            groups: [bin_group(&self.groups[0]), bin_group(&self.groups[1])],
        })
    }
}

/// One row of the category-count table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCountRow {
    /// Dataset role
    pub dataset: DatasetRole,
    /// Rows with `sex == "Male"`
    pub male: u64,
    /// Rows with `sex == "Female"`
    pub female: u64,
}

/// Per-role category counts, rows `Ref` then `Compare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCountTable {
    rows: [CategoryCountRow; 2],
}

impl CategoryCountTable {
    /// Rows in display order.
    #[must_use]
    pub const fn rows(&self) -> &[CategoryCountRow; 2] {
        &self.rows
    }

    /// Row for `role`.
    #[must_use]
    pub const fn row(&self, role: DatasetRole) -> &CategoryCountRow {
        match role {
            DatasetRole::Ref => &self.rows[0],
            DatasetRole::Compare => &self.rows[1],
        }
    }

    /// Arrow form with columns `Dataset`, `Male`, `Female`.
    ///
    /// # Errors
    ///
    /// Returns error if Arrow rejects the batch
    #[allow(clippy::cast_possible_wrap)]
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let schema = Schema::new(vec![
            Field::new("Dataset", DataType::Utf8, false),
            Field::new(CATEGORIES[0], DataType::Int64, false),
            Field::new(CATEGORIES[1], DataType::Int64, false),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from_iter_values(
                    self.rows.iter().map(|r| r.dataset.as_str()),
                )),
                Arc::new(Int64Array::from_iter_values(
                    self.rows.iter().map(|r| r.male as i64),
                )),
                Arc::new(Int64Array::from_iter_values(
                    self.rows.iter().map(|r| r.female as i64),
                )),
            ],
        )?;
        Ok(batch)
    }
}

/// Derived datasets produced by a single [`merge`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedView {
    /// Distribution series
    pub series: DistributionSeries,
    /// Category-count table
    pub table: CategoryCountTable,
}

/// Merge reference and comparison datasets into plot-ready derived datasets.
///
/// # Errors
///
/// Returns error if the Arrow comparison kernel fails
///
/// # Example
///
/// ```rust
/// use trueno_drift::dataset::RawDataset;
/// use trueno_drift::merge::{merge, DatasetRole};
///
/// # fn main() -> trueno_drift::Result<()> {
/// let reference = RawDataset::from_rows([(120.0, "Male"), (130.0, "Female")])?;
/// let compare = RawDataset::from_rows([(140.0, "Male")])?;
///
/// let view = merge(&reference, &compare)?;
/// assert_eq!(view.series.reference().values, vec![120.0, 130.0]);
/// assert_eq!(view.table.row(DatasetRole::Compare).female, 0);
/// # Ok(())
/// # }
/// ```
pub fn merge(reference: &RawDataset, compare: &RawDataset) -> Result<MergedView> {
    let series = DistributionSeries {
        groups: [SeriesGroup::project(reference), SeriesGroup::project(compare)],
    };
    let table = CategoryCountTable {
        rows: [
            count_row(DatasetRole::Ref, reference)?,
            count_row(DatasetRole::Compare, compare)?,
        ],
    };
    Ok(MergedView { series, table })
}

fn count_row(role: DatasetRole, dataset: &RawDataset) -> Result<CategoryCountRow> {
    Ok(CategoryCountRow {
        dataset: role,
        male: count_category(dataset.sex(), CATEGORIES[0])?,
        female: count_category(dataset.sex(), CATEGORIES[1])?,
    })
}

fn count_category(column: &StringArray, category: &str) -> Result<u64> {
    let mask = cmp::eq(column, &StringArray::new_scalar(category))?;
    // true_count skips nulls
    Ok(mask.true_count() as u64)
}

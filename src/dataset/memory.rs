//! In-memory dataset loader using `DashMap`.
//!
//! Datasets are registered up front and cloned out on load (Arrow buffers are
//! reference counted, so a clone is cheap). Data is lost on process restart.

use super::{DatasetCatalog, DatasetLoader, RawDataset};
use crate::{Error, Result};
use dashmap::DashMap;

/// In-memory dataset registry bounded by a catalog.
///
/// # Example
///
/// ```rust
/// use trueno_drift::dataset::{DatasetLoader, MemoryDatasetLoader, RawDataset};
///
/// # async fn example() -> trueno_drift::Result<()> {
/// let loader = MemoryDatasetLoader::new();
/// loader.insert("data_ref", RawDataset::from_rows([(120.0, "Male")])?)?;
/// assert_eq!(loader.load("data_ref").await?.num_rows(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MemoryDatasetLoader {
    catalog: DatasetCatalog,
    datasets: DashMap<String, RawDataset>,
}

impl MemoryDatasetLoader {
    /// Create an empty registry over the default catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::with_catalog(DatasetCatalog::default())
    }

    /// Create an empty registry over `catalog`.
    #[must_use]
    pub fn with_catalog(catalog: DatasetCatalog) -> Self {
        Self {
            datasets: DashMap::with_capacity(catalog.len()),
            catalog,
        }
    }

    /// Register (or replace) the dataset behind `identifier`.
    ///
    /// # Errors
    ///
    /// Returns `DatasetNotFound` if `identifier` is outside the catalog
    pub fn insert(&self, identifier: &str, dataset: RawDataset) -> Result<()> {
        self.catalog.ensure(identifier)?;
        self.datasets.insert(identifier.to_string(), dataset);
        Ok(())
    }

    /// Drop the dataset behind `identifier`. No-op if absent.
    pub fn remove(&self, identifier: &str) {
        self.datasets.remove(identifier);
    }

    /// Number of registered datasets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    /// Check if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

impl Default for MemoryDatasetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetLoader for MemoryDatasetLoader {
    async fn load(&self, identifier: &str) -> Result<RawDataset> {
        self.catalog.ensure(identifier)?;
        self.datasets
            .get(identifier)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::not_found(identifier))
    }

    fn catalog(&self) -> &DatasetCatalog {
        &self.catalog
    }
}

//! Dataset loaders
//!
//! Resolves a catalogued identifier to a [`RawDataset`]. Loading is async so
//! file parsing can leave the runtime thread, but callers await it to
//! completion before touching session state.

use super::{DatasetCatalog, RawDataset};
use crate::config::DriftConfig;
use crate::storage::{DatasetFormat, StorageEngine};
use crate::{Error, Result};
use std::future::Future;
use std::path::{Path, PathBuf};

/// Resolves dataset identifiers to raw datasets.
///
/// Implementations must fail with [`Error::DatasetNotFound`] for identifiers
/// outside their catalog, and must return equivalent datasets when the same
/// identifier is loaded twice over unchanged backing data.
pub trait DatasetLoader: Send + Sync {
    /// Load the dataset registered under `identifier`.
    fn load(&self, identifier: &str) -> impl Future<Output = Result<RawDataset>> + Send;

    /// Identifiers this loader accepts.
    fn catalog(&self) -> &DatasetCatalog;
}

/// Loads `<data_dir>/<identifier>.<ext>` from disk.
///
/// # Example
///
/// ```rust,no_run
/// use trueno_drift::dataset::{DatasetLoader, FileDatasetLoader};
/// use trueno_drift::DriftConfig;
///
/// # async fn example() -> trueno_drift::Result<()> {
/// let loader = FileDatasetLoader::from_config(&DriftConfig::default());
/// let reference = loader.load("data_ref").await?;
/// println!("{} reference rows", reference.num_rows());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileDatasetLoader {
    data_dir: PathBuf,
    format: DatasetFormat,
    catalog: DatasetCatalog,
}

impl FileDatasetLoader {
    /// Create a loader over `data_dir`.
    #[must_use]
    pub fn new(
        data_dir: impl Into<PathBuf>,
        format: DatasetFormat,
        catalog: DatasetCatalog,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            format,
            catalog,
        }
    }

    /// Create a loader from the data directory, format and catalog of `config`.
    #[must_use]
    pub fn from_config(config: &DriftConfig) -> Self {
        Self::new(config.data_dir.clone(), config.format, config.catalog.clone())
    }

    /// Directory datasets are read from.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path an identifier resolves to (whether or not it exists).
    #[must_use]
    pub fn path_for(&self, identifier: &str) -> PathBuf {
        self.data_dir
            .join(format!("{identifier}.{}", self.format.extension()))
    }
}

impl DatasetLoader for FileDatasetLoader {
    async fn load(&self, identifier: &str) -> Result<RawDataset> {
        if let Err(e) = self.catalog.ensure(identifier) {
            tracing::warn!(identifier, "dataset identifier outside catalog");
            return Err(e);
        }

        let path = self.path_for(identifier);
        let format = self.format;
        tracing::debug!(identifier, path = %path.display(), ?format, "loading dataset");

        let read_path = path.clone();
        let batch = tokio::task::spawn_blocking(move || {
            StorageEngine::load(&read_path, format)?.into_single_batch()
        })
        .await
        .map_err(|e| Error::Other(format!("Dataset load task failed: {e}")))?;

        let batch = match batch {
            Ok(batch) => batch,
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(identifier, path = %path.display(), "dataset file missing");
                return Err(Error::not_found(identifier));
            }
            Err(e) => return Err(e),
        };

        let dataset = RawDataset::try_new(batch)?;
        tracing::debug!(identifier, rows = dataset.num_rows(), "dataset loaded");
        Ok(dataset)
    }

    fn catalog(&self) -> &DatasetCatalog {
        &self.catalog
    }
}

//! Dashboard configuration
//!
//! Every field has a default matching the shipped drift page, so an empty
//! JSON object is a valid configuration:
//!
//! ```json
//! {
//!   "data_dir": "data",
//!   "format": "csv",
//!   "catalog": ["data_ref", "data_noisy", "data_female", "data_big"],
//!   "default_reference": "data_ref",
//!   "default_compare": "data_noisy",
//!   "histogram_bins": 10,
//!   "preview_rows": 5,
//!   "monitor": { "notify_failures": false }
//! }
//! ```

use crate::dataset::{DatasetCatalog, DEFAULT_PREVIEW_ROWS};
use crate::merge::DEFAULT_HISTOGRAM_BINS;
use crate::storage::DatasetFormat;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Submission monitor settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Emit an error notification on `FAILED` / `CANCELED` runs
    pub notify_failures: bool,
}

/// Drift dashboard configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Directory holding `<identifier>.<ext>` dataset files
    pub data_dir: PathBuf,
    /// Dataset file format
    pub format: DatasetFormat,
    /// Closed set of selectable dataset identifiers
    pub catalog: DatasetCatalog,
    /// Reference dataset selected at session start
    pub default_reference: String,
    /// Comparison dataset selected at session start
    pub default_compare: String,
    /// Bins per group in the overlay histogram
    pub histogram_bins: usize,
    /// Rows per raw-table page
    pub preview_rows: usize,
    /// Submission monitor settings
    pub monitor: MonitorConfig,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            format: DatasetFormat::Csv,
            catalog: DatasetCatalog::default(),
            default_reference: "data_ref".to_string(),
            default_compare: "data_noisy".to_string(),
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            monitor: MonitorConfig::default(),
        }
    }
}

impl DriftConfig {
    /// Create a configuration builder starting from defaults
    #[must_use]
    pub fn builder() -> DriftConfigBuilder {
        DriftConfigBuilder::default()
    }

    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns `Json` on malformed input, `Config` if validation fails
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, otherwise as [`Self::from_json_str`]
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the catalog is empty, a default selection is not
    /// catalogued, or `histogram_bins` is zero
    pub fn validate(&self) -> Result<()> {
        if self.catalog.is_empty() {
            return Err(Error::Config("dataset catalog is empty".to_string()));
        }
        for (field, id) in [
            ("default_reference", &self.default_reference),
            ("default_compare", &self.default_compare),
        ] {
            if !self.catalog.contains(id) {
                return Err(Error::Config(format!(
                    "{field} '{id}' is not in the dataset catalog"
                )));
            }
        }
        if self.histogram_bins == 0 {
            return Err(Error::Config("histogram_bins must be positive".to_string()));
        }
        Ok(())
    }
}

/// Builder for [`DriftConfig`]
#[derive(Debug, Default)]
pub struct DriftConfigBuilder {
    config: DriftConfig,
}

impl DriftConfigBuilder {
    /// Set the dataset directory
    #[must_use]
    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = data_dir.into();
        self
    }

    /// Set the dataset file format
    #[must_use]
    pub const fn format(mut self, format: DatasetFormat) -> Self {
        self.config.format = format;
        self
    }

    /// Replace the dataset catalog
    #[must_use]
    pub fn catalog(mut self, catalog: DatasetCatalog) -> Self {
        self.config.catalog = catalog;
        self
    }

    /// Set the initial reference and comparison selections
    #[must_use]
    pub fn defaults(mut self, reference: impl Into<String>, compare: impl Into<String>) -> Self {
        self.config.default_reference = reference.into();
        self.config.default_compare = compare.into();
        self
    }

    /// Set the histogram bin count
    #[must_use]
    pub const fn histogram_bins(mut self, bins: usize) -> Self {
        self.config.histogram_bins = bins;
        self
    }

    /// Set the raw-table page size
    #[must_use]
    pub const fn preview_rows(mut self, rows: usize) -> Self {
        self.config.preview_rows = rows;
        self
    }

    /// Opt in to failure notifications
    #[must_use]
    pub const fn notify_failures(mut self, enabled: bool) -> Self {
        self.config.monitor.notify_failures = enabled;
        self
    }

    /// Validate and build the configuration
    ///
    /// # Errors
    ///
    /// Returns `Config` if validation fails
    pub fn build(self) -> Result<DriftConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DriftConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.histogram_bins, 10);
        assert_eq!(config.preview_rows, 5);
        assert!(!config.monitor.notify_failures);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = DriftConfig::from_json_str("{}").unwrap();
        assert_eq!(config, DriftConfig::default());
    }

    #[test]
    fn test_json_overrides() {
        let config = DriftConfig::from_json_str(
            r#"{
                "data_dir": "/srv/drift",
                "format": "parquet",
                "catalog": ["a", "b"],
                "default_reference": "a",
                "default_compare": "b",
                "monitor": { "notify_failures": true }
            }"#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/drift"));
        assert_eq!(config.format, DatasetFormat::Parquet);
        assert_eq!(config.catalog.len(), 2);
        assert!(config.monitor.notify_failures);
    }

    #[test]
    fn test_default_outside_catalog_rejected() {
        let err = DriftConfig::builder()
            .catalog(DatasetCatalog::new(["a"]))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("default_reference"));
    }

    #[test]
    fn test_zero_bins_rejected() {
        assert!(DriftConfig::builder().histogram_bins(0).build().is_err());
    }
}

//! Error types for trueno-drift
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// trueno-drift error types
#[derive(Error, Debug)]
pub enum Error {
    /// Identifier is outside the dataset catalog, or its backing file is missing
    #[error("Dataset not found: {identifier}")]
    DatasetNotFound {
        /// Identifier that failed to resolve
        identifier: String,
    },

    /// Dataset does not carry the columns the merger needs
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    /// Scenario input slot rejected a write
    #[error("Scenario slot '{slot}' is not writable while the scenario is {status}")]
    SlotNotWritable {
        /// Slot name (`reference_data` or `compare_data`)
        slot: String,
        /// Scenario status at the time of the write
        status: String,
    },

    /// Scenario was submitted with an empty input slot
    #[error("Scenario input slot '{0}' has not been written")]
    MissingInput(String),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Storage error (CSV/Parquet)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// JSON (config or export) error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a not-found error for `identifier`.
    pub fn not_found(identifier: impl Into<String>) -> Self {
        Self::DatasetNotFound {
            identifier: identifier.into(),
        }
    }

    /// True for the load-failure class (unknown identifier, missing file).
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::DatasetNotFound { .. })
    }
}

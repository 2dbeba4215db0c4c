//! Scenario boundary: named input slots, the results slot, and run status.
//!
//! The drift-detection pipeline itself is opaque. The core only writes the
//! two input slots and reads the output slot after a `COMPLETED` event.
//!
//! ## Slot Overview
//!
//! ```text
//! reference_data ──┐
//!                  ├──> [ scenario run ] ──> drift_results
//! compare_data ────┘          │
//!                             └──> SubmissionEvent stream
//! ```

mod memory;
mod status;

pub use memory::MemoryScenario;
pub use status::{
    Submission, SubmissionEvent, SubmissionStatus, UnknownStatus, SUBMISSION_STATUS_KEY,
};

use crate::dataset::RawDataset;
use crate::Result;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

/// Name of the readable output slot
pub const OUTPUT_SLOT: &str = "drift_results";

/// Writable input slot of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSlot {
    /// `reference_data`
    ReferenceData,
    /// `compare_data`
    CompareData,
}

impl InputSlot {
    /// Slot name as exposed by the scenario.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReferenceData => "reference_data",
            Self::CompareData => "compare_data",
        }
    }
}

impl fmt::Display for InputSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External orchestration entity with named data slots.
pub trait Scenario: Send + Sync {
    /// Scenario identifier, used as the refresh target and event source.
    fn id(&self) -> &str;

    /// Replace the contents of an input slot.
    ///
    /// Fails with [`crate::Error::SlotNotWritable`] when the scenario does not
    /// accept writes (for example while a run is in flight).
    fn write_input(
        &self,
        slot: InputSlot,
        data: RawDataset,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Current contents of an input slot.
    fn read_input(&self, slot: InputSlot) -> Option<RawDataset>;

    /// Contents of the [`OUTPUT_SLOT`] slot, once a run has completed.
    fn read_output(&self) -> Option<RecordBatch>;
}

/// Push a freshly loaded dataset into the scenario's input slot.
///
/// # Errors
///
/// Propagates the scenario's write failure unchanged
pub async fn sync_input<S: Scenario>(
    scenario: &S,
    slot: InputSlot,
    data: RawDataset,
) -> Result<()> {
    tracing::debug!(
        scenario = scenario.id(),
        slot = slot.as_str(),
        rows = data.num_rows(),
        "syncing scenario input"
    );
    scenario.write_input(slot, data).await
}

//! # Trueno-Drift: Reactive Drift-Detection Dashboard Core
//!
//! **Version**: 0.1.0
//!
//! Trueno-Drift keeps plot-ready views of two selected datasets (reference and
//! comparison) synchronized with a scenario-based drift-detection pipeline.
//! Datasets are Arrow record batches; group summaries use trueno SIMD kernels.
//!
//! ## Components
//!
//! ```text
//! DatasetLoader ──> DriftController ──> sync_input ──> Scenario slots
//!                        │                                  │
//!                        ├──> merge() ──> SelectionSnapshot │
//!                        │        (watch channel)           │
//!                        └──< SubmissionMonitor <── SubmissionEvent stream
//! ```
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Poka-Yoke safety**: failed loads and syncs never leave a half-updated view
//! - **Jidoka**: one immutable snapshot per committed selection
//! - **Genchi Genbutsu**: tracing at every seam
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trueno_drift::controller::{DriftController, Side};
//! use trueno_drift::dataset::FileDatasetLoader;
//! use trueno_drift::monitor::ChannelPresenter;
//! use trueno_drift::scenario::MemoryScenario;
//! use trueno_drift::DriftConfig;
//!
//! # async fn run() -> trueno_drift::Result<()> {
//! trueno_drift::init_tracing();
//!
//! let config = DriftConfig::from_json_file("drift.json")?;
//! let loader = FileDatasetLoader::from_config(&config);
//! let (scenario, status_events) = MemoryScenario::new("drift");
//! let (ui_tx, _ui_rx) = tokio::sync::mpsc::unbounded_channel();
//!
//! let mut controller =
//!     DriftController::start(config, loader, scenario, Arc::new(ChannelPresenter::new(ui_tx)))
//!         .await?;
//! let _watcher = controller.spawn_status_watcher(status_events);
//!
//! let snapshot = controller.on_selection_change(Side::Compare, "data_female").await?;
//! println!("{:?}", snapshot.table());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod controller;
pub mod dataset;
pub mod error;
pub mod export;
pub mod merge;
pub mod monitor;
pub mod scenario;
pub mod storage;

pub use config::{DriftConfig, MonitorConfig};
pub use controller::{DriftController, SelectionSnapshot, Side};
pub use error::{Error, Result};

use tracing_subscriber::EnvFilter;

/// Install a `tracing` fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

//! Reactive controller: owns the selection state of one dashboard session.
//!
//! State is an immutable [`SelectionSnapshot`] behind an `Arc`. A selection
//! change builds a complete new snapshot (raw datasets and derived view
//! together) and swaps it in with one assignment, then publishes it once on
//! a `watch` channel. Observers therefore never see a series and a table
//! from two different merges.
//!
//! ## Selection Change
//!
//! ```text
//! on_selection_change(side, id)
//!   1. loader.load(id)            ── error: nothing changed
//!   2. sync_input(slot(side))     ── error: nothing changed
//!   3. merge(ref, compare)        (other side keeps its current dataset)
//!   4. swap snapshot, publish
//! ```
//!
//! Handlers take `&mut self`, so a session runs at most one at a time.

use crate::config::DriftConfig;
use crate::dataset::{DatasetLoader, RawDataset};
use crate::merge::{
    merge, CategoryCountTable, DatasetRole, DistributionSeries, MergedView, OverlayHistogram,
};
use crate::monitor::{MonitorAction, Presenter, SubmissionMonitor};
use crate::scenario::{sync_input, InputSlot, Scenario, SubmissionEvent};
use crate::Result;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Side of the comparison a selection applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Reference dataset
    Reference,
    /// Comparison dataset
    Compare,
}

impl Side {
    /// Scenario input slot fed by this side.
    #[must_use]
    pub const fn slot(self) -> InputSlot {
        match self {
            Self::Reference => InputSlot::ReferenceData,
            Self::Compare => InputSlot::CompareData,
        }
    }

    /// Row of the category-count table for this side.
    #[must_use]
    pub const fn role(self) -> DatasetRole {
        match self {
            Self::Reference => DatasetRole::Ref,
            Self::Compare => DatasetRole::Compare,
        }
    }
}

/// Complete, immutable selection state.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSnapshot {
    version: u64,
    reference_id: String,
    compare_id: String,
    reference: RawDataset,
    compare: RawDataset,
    view: MergedView,
}

impl SelectionSnapshot {
    /// Monotonic counter, bumped on every committed change.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Identifier selected for `side`.
    #[must_use]
    pub fn selected(&self, side: Side) -> &str {
        match side {
            Side::Reference => &self.reference_id,
            Side::Compare => &self.compare_id,
        }
    }

    /// Raw dataset loaded for `side`.
    #[must_use]
    pub const fn raw(&self, side: Side) -> &RawDataset {
        match side {
            Side::Reference => &self.reference,
            Side::Compare => &self.compare,
        }
    }

    /// Distribution series of the current pair.
    #[must_use]
    pub const fn series(&self) -> &DistributionSeries {
        &self.view.series
    }

    /// Category-count table of the current pair.
    #[must_use]
    pub const fn table(&self) -> &CategoryCountTable {
        &self.view.table
    }

    /// Both derived datasets.
    #[must_use]
    pub const fn view(&self) -> &MergedView {
        &self.view
    }
}

/// Event handlers and state for one dashboard session.
pub struct DriftController<L, S, P: ?Sized> {
    config: DriftConfig,
    loader: L,
    scenario: Arc<S>,
    presenter: Arc<P>,
    monitor: SubmissionMonitor,
    state: Arc<SelectionSnapshot>,
    updates: watch::Sender<Arc<SelectionSnapshot>>,
}

impl<L, S, P> DriftController<L, S, P>
where
    L: DatasetLoader,
    S: Scenario,
    P: Presenter + ?Sized,
{
    /// Start a session: load both default selections, sync both scenario
    /// inputs and compute the initial derived view.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the configuration is invalid, or any load or
    /// sync failure for the default datasets
    pub async fn start(
        config: DriftConfig,
        loader: L,
        scenario: Arc<S>,
        presenter: Arc<P>,
    ) -> Result<Self> {
        config.validate()?;

        let reference = loader.load(&config.default_reference).await?;
        let compare = loader.load(&config.default_compare).await?;
        sync_input(scenario.as_ref(), InputSlot::ReferenceData, reference.clone()).await?;
        sync_input(scenario.as_ref(), InputSlot::CompareData, compare.clone()).await?;
        let view = merge(&reference, &compare)?;

        let state = Arc::new(SelectionSnapshot {
            version: 0,
            reference_id: config.default_reference.clone(),
            compare_id: config.default_compare.clone(),
            reference,
            compare,
            view,
        });
        let (updates, _) = watch::channel(Arc::clone(&state));

        tracing::info!(
            reference = %state.reference_id,
            compare = %state.compare_id,
            scenario = scenario.id(),
            "drift session started"
        );

        Ok(Self {
            monitor: SubmissionMonitor::new(config.monitor),
            config,
            loader,
            scenario,
            presenter,
            state,
            updates,
        })
    }

    /// Current selection state.
    #[must_use]
    pub fn snapshot(&self) -> Arc<SelectionSnapshot> {
        Arc::clone(&self.state)
    }

    /// Subscribe to "state updated" signals. The receiver always holds the
    /// latest committed snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<SelectionSnapshot>> {
        self.updates.subscribe()
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &DriftConfig {
        &self.config
    }

    /// Scenario fed by this session.
    #[must_use]
    pub const fn scenario(&self) -> &Arc<S> {
        &self.scenario
    }

    /// Handle a new selection on `side`.
    ///
    /// Selecting the identifier already shown reloads and resyncs it.
    ///
    /// # Errors
    ///
    /// Returns the load failure (unknown identifier, missing file, invalid
    /// dataset) or the scenario write failure. In both cases the stored
    /// state is unchanged and no update is published.
    pub async fn on_selection_change(
        &mut self,
        side: Side,
        identifier: &str,
    ) -> Result<Arc<SelectionSnapshot>> {
        let raw = self.loader.load(identifier).await.map_err(|e| {
            tracing::warn!(?side, identifier, error = %e, "dataset load failed");
            e
        })?;

        sync_input(self.scenario.as_ref(), side.slot(), raw.clone())
            .await
            .map_err(|e| {
                tracing::warn!(?side, identifier, error = %e, "scenario input sync failed");
                e
            })?;

        let current = &self.state;
        let (reference, compare) = match side {
            Side::Reference => (&raw, &current.compare),
            Side::Compare => (&current.reference, &raw),
        };
        let view = merge(reference, compare)?;

        let mut next = SelectionSnapshot {
            version: current.version + 1,
            reference_id: current.reference_id.clone(),
            compare_id: current.compare_id.clone(),
            reference: current.reference.clone(),
            compare: current.compare.clone(),
            view,
        };
        match side {
            Side::Reference => {
                next.reference_id = identifier.to_string();
                next.reference = raw;
            }
            Side::Compare => {
                next.compare_id = identifier.to_string();
                next.compare = raw;
            }
        }

        self.state = Arc::new(next);
        self.updates.send_replace(Arc::clone(&self.state));

        tracing::info!(
            ?side,
            identifier,
            version = self.state.version,
            rows = self.state.raw(side).num_rows(),
            "selection updated"
        );
        Ok(Arc::clone(&self.state))
    }

    /// Handle a scenario status event.
    pub fn on_submission_status_change(&self, event: &SubmissionEvent) -> MonitorAction {
        self.monitor.on_status_change(self.presenter.as_ref(), event)
    }

    /// First page of the raw table for `side`.
    #[must_use]
    pub fn preview(&self, side: Side) -> RecordBatch {
        self.state.raw(side).preview(self.config.preview_rows)
    }

    /// Overlay histogram of the current series with the configured bin count.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the bin count is zero
    pub fn histogram(&self) -> Result<OverlayHistogram> {
        self.state.series().histogram(self.config.histogram_bins)
    }
}

impl<L, S, P> DriftController<L, S, P>
where
    L: DatasetLoader,
    S: Scenario,
    P: Presenter + ?Sized + 'static,
{
    /// Consume a scenario status stream on its own task, independent of
    /// selection handling. The task ends when the stream closes and yields
    /// the number of events handled.
    pub fn spawn_status_watcher(
        &self,
        events: UnboundedReceiver<SubmissionEvent>,
    ) -> JoinHandle<usize> {
        let monitor = self.monitor;
        let presenter = Arc::clone(&self.presenter);
        tokio::spawn(async move { monitor.watch(presenter.as_ref(), events).await })
    }
}

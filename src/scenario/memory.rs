//! In-process scenario backed by `DashMap` slots and a tokio job.
//!
//! Runs are fire-and-forget: [`MemoryScenario::submit`] spawns the job and
//! returns immediately. Progress is reported only through the
//! [`SubmissionEvent`] channel handed out by [`MemoryScenario::new`].

use super::{
    InputSlot, Scenario, Submission, SubmissionEvent, SubmissionStatus, OUTPUT_SLOT,
    SUBMISSION_STATUS_KEY,
};
use crate::dataset::RawDataset;
use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Scenario with in-memory slots and an async run lifecycle.
pub struct MemoryScenario {
    id: String,
    inputs: DashMap<InputSlot, RawDataset>,
    output: RwLock<Option<RecordBatch>>,
    submission: Mutex<Option<Submission>>,
    next_submission: AtomicU64,
    events: UnboundedSender<SubmissionEvent>,
}

impl MemoryScenario {
    /// Create a scenario and the receiving end of its status stream.
    #[must_use]
    pub fn new(id: impl Into<String>) -> (Arc<Self>, UnboundedReceiver<SubmissionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let scenario = Arc::new(Self {
            id: id.into(),
            inputs: DashMap::with_capacity(2),
            output: RwLock::new(None),
            submission: Mutex::new(None),
            next_submission: AtomicU64::new(1),
            events,
        });
        (scenario, rx)
    }

    /// Status of the latest submission, `None` before the first submit.
    #[must_use]
    pub fn status(&self) -> Option<SubmissionStatus> {
        self.lock_submission().as_ref().map(Submission::status)
    }

    /// Latest submission record.
    #[must_use]
    pub fn last_submission(&self) -> Option<Submission> {
        self.lock_submission().clone()
    }

    /// Submit a run over the current input slots.
    ///
    /// The job receives the reference and comparison datasets and produces
    /// the `drift_results` batch. Status moves `SUBMITTED → PENDING` before
    /// this returns, then `RUNNING → COMPLETED | FAILED` on the spawned task.
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `MissingInput` if an input slot is empty, or `Other` if a run
    /// is already queued or executing
    pub fn submit<F, Fut>(self: &Arc<Self>, job: F) -> Result<JoinHandle<()>>
    where
        F: FnOnce(RawDataset, RawDataset) -> Fut + Send + 'static,
        Fut: Future<Output = Result<RecordBatch>> + Send + 'static,
    {
        let (reference, compare) = {
            let mut guard = self.lock_submission();
            if let Some(status) = guard.as_ref().map(Submission::status) {
                if status.is_active() {
                    return Err(Error::Other(format!(
                        "Scenario '{}' already has a run in status {status}",
                        self.id
                    )));
                }
            }
            let reference = self.input_or_missing(InputSlot::ReferenceData)?;
            let compare = self.input_or_missing(InputSlot::CompareData)?;

            let seq = self.next_submission.fetch_add(1, Ordering::Relaxed);
            let submission_id = format!("{}-submission-{seq}", self.id);
            *guard = Some(Submission::new(submission_id, self.id.clone()));
            self.emit(SubmissionStatus::Submitted);
            Self::advance(&mut guard, SubmissionStatus::Pending);
            self.emit(SubmissionStatus::Pending);
            (reference, compare)
        };

        let scenario = Arc::clone(self);
        Ok(tokio::spawn(async move {
            scenario.transition(SubmissionStatus::Running);
            match job(reference, compare).await {
                Ok(results) => {
                    tracing::debug!(
                        scenario = %scenario.id,
                        slot = OUTPUT_SLOT,
                        rows = results.num_rows(),
                        "scenario output stored"
                    );
                    *scenario
                        .output
                        .write()
                        .unwrap_or_else(PoisonError::into_inner) = Some(results);
                    scenario.transition(SubmissionStatus::Completed);
                }
                Err(e) => {
                    tracing::warn!(scenario = %scenario.id, error = %e, "scenario run failed");
                    scenario.transition_with(SubmissionStatus::Failed, Some(e.to_string()));
                }
            }
        }))
    }

    fn input_or_missing(&self, slot: InputSlot) -> Result<RawDataset> {
        self.read_input(slot)
            .ok_or_else(|| Error::MissingInput(slot.as_str().to_string()))
    }

    fn lock_submission(&self) -> MutexGuard<'_, Option<Submission>> {
        self.submission.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn advance(guard: &mut MutexGuard<'_, Option<Submission>>, status: SubmissionStatus) {
        if let Some(submission) = guard.as_mut() {
            submission.transition(status);
        }
    }

    fn transition(&self, status: SubmissionStatus) {
        self.transition_with(status, None);
    }

    fn transition_with(&self, status: SubmissionStatus, error: Option<String>) {
        Self::advance(&mut self.lock_submission(), status);
        let mut event = SubmissionEvent::new(self.id.clone(), status);
        if let Some(error) = error {
            event = event.with_detail("error", error);
        }
        self.send(event);
    }

    fn emit(&self, status: SubmissionStatus) {
        self.send(SubmissionEvent::new(self.id.clone(), status));
    }

    fn send(&self, event: SubmissionEvent) {
        tracing::debug!(
            scenario = %self.id,
            status = ?event.details().get(SUBMISSION_STATUS_KEY),
            "scenario status transition"
        );
        // Nobody listening is fine: the run is fire-and-forget
        let _ = self.events.send(event);
    }
}

impl Scenario for MemoryScenario {
    fn id(&self) -> &str {
        &self.id
    }

    async fn write_input(&self, slot: InputSlot, data: RawDataset) -> Result<()> {
        let guard = self.lock_submission();
        if let Some(status) = guard.as_ref().map(Submission::status) {
            if status.is_active() {
                return Err(Error::SlotNotWritable {
                    slot: slot.as_str().to_string(),
                    status: status.to_string(),
                });
            }
        }
        self.inputs.insert(slot, data);
        drop(guard);
        Ok(())
    }

    fn read_input(&self, slot: InputSlot) -> Option<RawDataset> {
        self.inputs.get(&slot).map(|entry| entry.value().clone())
    }

    fn read_output(&self) -> Option<RecordBatch> {
        self.output
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Float64Array;
    use arrow::datatypes::{DataType, Field, Schema};

    fn sample() -> RawDataset {
        RawDataset::from_rows([(120.0, "Male"), (130.0, "Female")]).unwrap()
    }

    fn drift_batch(score: f64) -> RecordBatch {
        let schema = Schema::new(vec![Field::new("drift_score", DataType::Float64, false)]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(Float64Array::from(vec![score]))],
        )
        .unwrap()
    }

    async fn fill_inputs(scenario: &MemoryScenario) {
        scenario
            .write_input(InputSlot::ReferenceData, sample())
            .await
            .unwrap();
        scenario
            .write_input(InputSlot::CompareData, sample())
            .await
            .unwrap();
    }

    async fn drain(rx: &mut UnboundedReceiver<SubmissionEvent>) -> Vec<SubmissionStatus> {
        let mut statuses = Vec::new();
        let mut last_emitted = None;
        while let Some(event) = rx.recv().await {
            // Events arrive in emission order
            assert!(last_emitted <= Some(event.emitted_at()));
            last_emitted = Some(event.emitted_at());
            let status = event.status().unwrap();
            statuses.push(status);
            if status.is_terminal() {
                break;
            }
        }
        statuses
    }

    #[tokio::test]
    async fn test_submit_completes_and_stores_output() {
        let (scenario, mut rx) = MemoryScenario::new("drift");
        fill_inputs(&scenario).await;

        let handle = scenario
            .submit(|_, _| async { Ok(drift_batch(0.42)) })
            .unwrap();
        handle.await.unwrap();

        assert_eq!(
            drain(&mut rx).await,
            vec![
                SubmissionStatus::Submitted,
                SubmissionStatus::Pending,
                SubmissionStatus::Running,
                SubmissionStatus::Completed,
            ]
        );
        assert_eq!(scenario.status(), Some(SubmissionStatus::Completed));
        assert_eq!(scenario.read_output().unwrap().num_rows(), 1);

        let submission = scenario.last_submission().unwrap();
        assert_eq!(submission.submission_id(), "drift-submission-1");
        assert_eq!(submission.scenario_id(), "drift");
        let ended_at = submission.ended_at().unwrap();
        assert!(submission.submitted_at() <= ended_at);
    }

    #[tokio::test]
    async fn test_submit_failure_reports_failed() {
        let (scenario, mut rx) = MemoryScenario::new("drift");
        fill_inputs(&scenario).await;

        let handle = scenario
            .submit(|_, _| async { Err(Error::Other("detector crashed".to_string())) })
            .unwrap();
        handle.await.unwrap();

        let statuses = drain(&mut rx).await;
        assert_eq!(statuses.last(), Some(&SubmissionStatus::Failed));
        assert!(scenario.read_output().is_none());
    }

    #[tokio::test]
    async fn test_submit_requires_inputs() {
        let (scenario, _rx) = MemoryScenario::new("drift");
        scenario
            .write_input(InputSlot::ReferenceData, sample())
            .await
            .unwrap();

        let err = scenario
            .submit(|_, _| async { Ok(drift_batch(0.0)) })
            .unwrap_err();
        assert!(matches!(err, Error::MissingInput(slot) if slot == "compare_data"));
        assert!(scenario.status().is_none());
    }

    #[tokio::test]
    async fn test_inputs_locked_while_run_active() {
        let (scenario, _rx) = MemoryScenario::new("drift");
        fill_inputs(&scenario).await;

        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = scenario
            .submit(|_, _| async move {
                let _ = release_rx.await;
                Ok(drift_batch(0.1))
            })
            .unwrap();

        let err = scenario
            .write_input(InputSlot::ReferenceData, sample())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SlotNotWritable { .. }));
        assert!(scenario.submit(|_, _| async { Ok(drift_batch(0.0)) }).is_err());

        release_tx.send(()).unwrap();
        handle.await.unwrap();

        // Writable again once the run is terminal
        scenario
            .write_input(InputSlot::ReferenceData, sample())
            .await
            .unwrap();
    }
}

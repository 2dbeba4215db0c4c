//! Integration tests for the reactive controller
//!
//! Each test drives a full session: loader, scenario slots, merge and the
//! submission monitor wired together the way a dashboard runs them.

use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use trueno_drift::controller::{DriftController, Side};
use trueno_drift::dataset::{MemoryDatasetLoader, RawDataset};
use trueno_drift::merge::{merge, DatasetRole};
use trueno_drift::monitor::{
    ChannelPresenter, MonitorAction, NotificationLevel, PresentationEvent, SCENARIO_VIEW,
};
use trueno_drift::scenario::{
    InputSlot, MemoryScenario, Scenario, SubmissionEvent, SubmissionStatus,
};
use trueno_drift::{DriftConfig, Error};

type Session = DriftController<MemoryDatasetLoader, MemoryScenario, ChannelPresenter>;

fn data_ref() -> RawDataset {
    RawDataset::from_rows([(120.0, "Male"), (130.0, "Female")]).unwrap()
}

fn data_noisy() -> RawDataset {
    RawDataset::from_rows([(140.0, "Male")]).unwrap()
}

fn data_female() -> RawDataset {
    RawDataset::from_rows([(112.0, "Female"), (118.0, "Female"), (125.0, "Female")]).unwrap()
}

fn data_big() -> RawDataset {
    RawDataset::from_rows((0..200).map(|i| {
        let sex = if i % 3 == 0 { "Female" } else { "Male" };
        (100.0 + f64::from(i) * 0.25, sex)
    }))
    .unwrap()
}

fn loader() -> MemoryDatasetLoader {
    let loader = MemoryDatasetLoader::new();
    loader.insert("data_ref", data_ref()).unwrap();
    loader.insert("data_noisy", data_noisy()).unwrap();
    loader.insert("data_female", data_female()).unwrap();
    loader.insert("data_big", data_big()).unwrap();
    loader
}

struct Harness {
    session: Session,
    status_events: UnboundedReceiver<SubmissionEvent>,
    ui: UnboundedReceiver<PresentationEvent>,
}

async fn start_with(config: DriftConfig) -> Harness {
    let (scenario, status_events) = MemoryScenario::new("drift");
    let (ui_tx, ui) = mpsc::unbounded_channel();
    let session = DriftController::start(
        config,
        loader(),
        scenario,
        Arc::new(ChannelPresenter::new(ui_tx)),
    )
    .await
    .unwrap();
    Harness {
        session,
        status_events,
        ui,
    }
}

async fn start() -> Harness {
    start_with(DriftConfig::default()).await
}

#[tokio::test]
async fn test_reference_change_syncs_and_remerges() {
    let Harness { mut session, .. } = start().await;

    let snapshot = session
        .on_selection_change(Side::Reference, "data_big")
        .await
        .unwrap();

    // Scenario slot holds exactly the freshly loaded dataset
    assert_eq!(
        session.scenario().read_input(InputSlot::ReferenceData),
        Some(data_big())
    );
    // Derived view is the merge of new reference with unchanged comparison
    assert_eq!(*snapshot.view(), merge(&data_big(), &data_noisy()).unwrap());
    assert_eq!(snapshot.selected(Side::Reference), "data_big");
    assert_eq!(snapshot.selected(Side::Compare), "data_noisy");
}

#[tokio::test]
async fn test_compare_change_leaves_reference_slot() {
    let Harness { mut session, .. } = start().await;

    session
        .on_selection_change(Side::Compare, "data_female")
        .await
        .unwrap();

    assert_eq!(
        session.scenario().read_input(InputSlot::ReferenceData),
        Some(data_ref())
    );
    assert_eq!(
        session.scenario().read_input(InputSlot::CompareData),
        Some(data_female())
    );
    let row = *session.snapshot().table().row(DatasetRole::Compare);
    assert_eq!((row.male, row.female), (0, 3));
}

#[tokio::test]
async fn test_unknown_identifier_leaves_state_unchanged() {
    let Harness { mut session, .. } = start().await;
    let mut updates = session.subscribe();
    let before = session.snapshot();

    let err = session
        .on_selection_change(Side::Compare, "data_missing")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(Arc::ptr_eq(&session.snapshot(), &before));
    assert!(!updates.has_changed().unwrap());
    assert_eq!(
        session.scenario().read_input(InputSlot::CompareData),
        Some(data_noisy())
    );
}

#[tokio::test]
async fn test_sync_failure_leaves_state_unchanged() {
    let Harness { mut session, .. } = start().await;
    let mut updates = session.subscribe();
    let before = session.snapshot();

    // Hold a run open so the input slots reject writes
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
    let run = session
        .scenario()
        .submit(|_, _| async move {
            let _ = release_rx.await;
            Err(Error::Other("released".to_string()))
        })
        .unwrap();

    let err = session
        .on_selection_change(Side::Reference, "data_female")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::SlotNotWritable { ref slot, .. } if slot == "reference_data"));
    assert_eq!(*session.snapshot(), *before);
    assert!(!updates.has_changed().unwrap());

    release_tx.send(()).unwrap();
    run.await.unwrap();

    // Once the run is over the same selection goes through
    session
        .on_selection_change(Side::Reference, "data_female")
        .await
        .unwrap();
    assert!(updates.has_changed().unwrap());
}

#[tokio::test]
async fn test_one_update_per_committed_change() {
    let Harness { mut session, .. } = start().await;
    let mut updates = session.subscribe();
    assert_eq!(updates.borrow_and_update().version(), 0);

    session
        .on_selection_change(Side::Compare, "data_female")
        .await
        .unwrap();
    assert!(updates.has_changed().unwrap());
    let seen = updates.borrow_and_update().clone();
    assert_eq!(seen.version(), 1);
    assert!(Arc::ptr_eq(&seen, &session.snapshot()));
    assert!(!updates.has_changed().unwrap());

    session
        .on_selection_change(Side::Reference, "data_big")
        .await
        .unwrap();
    assert_eq!(updates.borrow_and_update().version(), 2);
}

#[tokio::test]
async fn test_reselecting_same_identifier_is_stable() {
    let Harness { mut session, .. } = start().await;
    let before = session.snapshot();

    let after = session
        .on_selection_change(Side::Reference, "data_ref")
        .await
        .unwrap();

    assert_eq!(after.view(), before.view());
    assert_eq!(after.version(), before.version() + 1);
}

#[tokio::test]
async fn test_completed_run_notifies_and_refreshes() {
    let Harness {
        session,
        status_events,
        mut ui,
    } = start().await;
    let _watcher = session.spawn_status_watcher(status_events);

    let run = session
        .scenario()
        .submit(|reference, compare| async move {
            let view = merge(&reference, &compare)?;
            view.table.to_record_batch()
        })
        .unwrap();
    run.await.unwrap();

    match ui.recv().await {
        Some(PresentationEvent::Notify(n)) => {
            assert_eq!(n.level, NotificationLevel::Success);
            assert_eq!(n.message, "Drift Detection Completed");
        }
        other => panic!("expected notification, got {other:?}"),
    }
    assert_eq!(
        ui.recv().await,
        Some(PresentationEvent::Refresh(SCENARIO_VIEW.to_string()))
    );
    assert_eq!(session.scenario().read_output().unwrap().num_rows(), 2);
    assert!(ui.try_recv().is_err());
}

#[tokio::test]
async fn test_failed_run_reported_when_enabled() {
    let config = DriftConfig::builder().notify_failures(true).build().unwrap();
    let Harness { session, mut ui, .. } = start_with(config).await;

    let failed = SubmissionEvent::new("drift", SubmissionStatus::Failed)
        .with_detail("error", "detector crashed");
    assert_eq!(
        session.on_submission_status_change(&failed),
        MonitorAction::FailureReported
    );
    match ui.try_recv() {
        Ok(PresentationEvent::Notify(n)) => assert_eq!(n.level, NotificationLevel::Error),
        other => panic!("expected error notification, got {other:?}"),
    }

    let running = SubmissionEvent::new("drift", SubmissionStatus::Running);
    assert_eq!(
        session.on_submission_status_change(&running),
        MonitorAction::Ignored
    );
    assert!(ui.try_recv().is_err());
}

#[tokio::test]
async fn test_start_rejects_bad_defaults() {
    let (scenario, _events) = MemoryScenario::new("drift");
    let (ui_tx, _ui) = mpsc::unbounded_channel();
    let mut config = DriftConfig::default();
    config.default_compare = "data_unknown".to_string();

    let result = DriftController::start(
        config,
        loader(),
        scenario,
        Arc::new(ChannelPresenter::new(ui_tx)),
    )
    .await;
    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
async fn test_preview_and_histogram_use_config() {
    let config = DriftConfig::builder()
        .preview_rows(3)
        .histogram_bins(4)
        .build()
        .unwrap();
    let Harness { mut session, .. } = start_with(config).await;
    session
        .on_selection_change(Side::Reference, "data_big")
        .await
        .unwrap();

    assert_eq!(session.preview(Side::Reference).num_rows(), 3);
    assert_eq!(session.preview(Side::Compare).num_rows(), 1);

    let histogram = session.histogram().unwrap();
    assert_eq!(histogram.edges.len(), 5);
    assert_eq!(histogram.groups[0].counts.iter().sum::<u64>(), 200);
}

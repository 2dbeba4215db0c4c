//! Submission status monitor
//!
//! Reacts to scenario status events. A `COMPLETED` run produces exactly one
//! success notification and one refresh of the scenario view, which is what
//! makes `drift_results` visible. Every other status is ignored unless
//! failure notifications are enabled in [`MonitorConfig`].
//!
//! There are no retries: each event is handled once, as it arrives.

use crate::config::MonitorConfig;
use crate::scenario::{SubmissionEvent, SubmissionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// View refreshed when a run completes
pub const SCENARIO_VIEW: &str = "scenario";

/// Message shown when a run completes
pub const COMPLETED_MESSAGE: &str = "Drift Detection Completed";

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    /// Informational
    Info,
    /// Operation succeeded
    Success,
    /// Something needs attention
    Warning,
    /// Operation failed
    Error,
}

/// User-facing notification (toast).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Severity
    pub level: NotificationLevel,
    /// Message text
    pub message: String,
    /// Creation time
    pub at: DateTime<Utc>,
}

impl Notification {
    /// Create a notification stamped now.
    #[must_use]
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Presentation layer as seen from the core.
pub trait Presenter: Send + Sync {
    /// Deliver a notification to the user.
    fn notify(&self, notification: Notification);

    /// Ask the view bound to `view` to re-render.
    fn refresh(&self, view: &str);
}

/// Presentation request forwarded by [`ChannelPresenter`].
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationEvent {
    /// Show a notification
    Notify(Notification),
    /// Re-render a view
    Refresh(String),
}

/// Presenter that forwards requests to a UI thread over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelPresenter {
    tx: UnboundedSender<PresentationEvent>,
}

impl ChannelPresenter {
    /// Wrap the sending half of a presentation channel.
    #[must_use]
    pub const fn new(tx: UnboundedSender<PresentationEvent>) -> Self {
        Self { tx }
    }
}

impl Presenter for ChannelPresenter {
    fn notify(&self, notification: Notification) {
        let _ = self.tx.send(PresentationEvent::Notify(notification));
    }

    fn refresh(&self, view: &str) {
        let _ = self.tx.send(PresentationEvent::Refresh(view.to_string()));
    }
}

/// What the monitor did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorAction {
    /// Nothing to do for this status
    Ignored,
    /// Success notification sent and scenario view refreshed
    Refreshed,
    /// Failure notification sent
    FailureReported,
}

/// One-shot reaction to submission status events.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmissionMonitor {
    config: MonitorConfig,
}

impl SubmissionMonitor {
    /// Create a monitor.
    #[must_use]
    pub const fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    /// Handle one status event.
    pub fn on_status_change<P: Presenter + ?Sized>(
        &self,
        presenter: &P,
        event: &SubmissionEvent,
    ) -> MonitorAction {
        match event.status() {
            Some(SubmissionStatus::Completed) => {
                tracing::info!(scenario = event.submittable(), "drift detection completed");
                presenter.notify(Notification::new(NotificationLevel::Success, COMPLETED_MESSAGE));
                presenter.refresh(SCENARIO_VIEW);
                MonitorAction::Refreshed
            }
            Some(status) if status.is_failure() && self.config.notify_failures => {
                tracing::warn!(
                    scenario = event.submittable(),
                    %status,
                    "drift detection did not complete"
                );
                let reason = event
                    .details()
                    .get("error")
                    .and_then(serde_json::Value::as_str)
                    .map_or_else(String::new, |e| format!(": {e}"));
                presenter.notify(Notification::new(
                    NotificationLevel::Error,
                    format!("Drift Detection {status}{reason}"),
                ));
                MonitorAction::FailureReported
            }
            other => {
                tracing::debug!(scenario = event.submittable(), status = ?other, "status ignored");
                MonitorAction::Ignored
            }
        }
    }

    /// Consume a status stream until every sender is dropped.
    ///
    /// Returns the number of events handled.
    pub async fn watch<P: Presenter + ?Sized>(
        &self,
        presenter: &P,
        mut events: UnboundedReceiver<SubmissionEvent>,
    ) -> usize {
        let mut handled = 0;
        while let Some(event) = events.recv().await {
            self.on_status_change(presenter, &event);
            handled += 1;
        }
        handled
    }
}

//! Submission status - lifecycle of a scenario run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Key under which submission details carry the status.
pub const SUBMISSION_STATUS_KEY: &str = "submission_status";

/// Status of a scenario submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    /// Accepted by the orchestrator.
    Submitted,
    /// Status could not be determined.
    Undefined,
    /// Waiting on upstream jobs.
    Blocked,
    /// Queued for execution.
    Pending,
    /// Currently executing.
    Running,
    /// Cancelled by user or system.
    Canceled,
    /// Finished with an error.
    Failed,
    /// Finished successfully; outputs are readable.
    Completed,
}

impl SubmissionStatus {
    /// Wire name (`COMPLETED`, `RUNNING`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::Undefined => "UNDEFINED",
            Self::Blocked => "BLOCKED",
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Canceled => "CANCELED",
            Self::Failed => "FAILED",
            Self::Completed => "COMPLETED",
        }
    }

    /// The run will not transition again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Canceled | Self::Failed | Self::Completed)
    }

    /// The run ended without producing results.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Canceled | Self::Failed)
    }

    /// A run is queued or executing, so inputs are locked.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for status strings outside the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown submission status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for SubmissionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "SUBMITTED" => Self::Submitted,
            "UNDEFINED" => Self::Undefined,
            "BLOCKED" => Self::Blocked,
            "PENDING" => Self::Pending,
            "RUNNING" => Self::Running,
            "CANCELED" => Self::Canceled,
            "FAILED" => Self::Failed,
            "COMPLETED" => Self::Completed,
            other => return Err(UnknownStatus(other.to_string())),
        };
        Ok(status)
    }
}

/// Status-change notification for one submission.
///
/// The status lives inside `details` under [`SUBMISSION_STATUS_KEY`], next to
/// whatever else the orchestrator reports (job ids, error text, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionEvent {
    submittable: String,
    details: Map<String, Value>,
    emitted_at: DateTime<Utc>,
}

impl SubmissionEvent {
    /// Create an event carrying `status` for `submittable`.
    #[must_use]
    pub fn new(submittable: impl Into<String>, status: SubmissionStatus) -> Self {
        let mut details = Map::new();
        details.insert(
            SUBMISSION_STATUS_KEY.to_string(),
            Value::String(status.as_str().to_string()),
        );
        Self::from_details(submittable, details)
    }

    /// Create an event from raw orchestrator details.
    #[must_use]
    pub fn from_details(submittable: impl Into<String>, details: Map<String, Value>) -> Self {
        Self {
            submittable: submittable.into(),
            details,
            emitted_at: Utc::now(),
        }
    }

    /// Attach an extra detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Status carried in the details, `None` if missing or unrecognized.
    #[must_use]
    pub fn status(&self) -> Option<SubmissionStatus> {
        self.details
            .get(SUBMISSION_STATUS_KEY)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }

    /// Identifier of the scenario that was submitted.
    #[must_use]
    pub fn submittable(&self) -> &str {
        &self.submittable
    }

    /// Raw details mapping.
    #[must_use]
    pub const fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    /// Time the event was created.
    #[must_use]
    pub const fn emitted_at(&self) -> DateTime<Utc> {
        self.emitted_at
    }
}

/// Lifecycle record of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    submission_id: String,
    scenario_id: String,
    status: SubmissionStatus,
    submitted_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// Create a submission in `Submitted` status.
    #[must_use]
    pub fn new(submission_id: impl Into<String>, scenario_id: impl Into<String>) -> Self {
        Self {
            submission_id: submission_id.into(),
            scenario_id: scenario_id.into(),
            status: SubmissionStatus::Submitted,
            submitted_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Get the submission ID.
    #[must_use]
    pub fn submission_id(&self) -> &str {
        &self.submission_id
    }

    /// Get the submitted scenario ID.
    #[must_use]
    pub fn scenario_id(&self) -> &str {
        &self.scenario_id
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> SubmissionStatus {
        self.status
    }

    /// Get the submission timestamp.
    #[must_use]
    pub const fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    /// Get the end timestamp, if the submission reached a terminal status.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Move to `status`; terminal statuses stamp `ended_at`.
    pub fn transition(&mut self, status: SubmissionStatus) {
        self.status = status;
        if status.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
    }
}

//! Journal events recorded while a workflow runs.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::steps::WorkflowKind;

/// Events appended to the workflow journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WorkflowEvent {
    /// Validation passed and the first write is about to happen.
    RunStarted(RunStartedData),

    /// A write step committed.
    StepCompleted(StepCompletedData),

    /// A step failed. Followed by `RunAborted` or `RunFlagged`.
    StepFailed(StepFailedData),

    /// Every step committed.
    RunCompleted(RunFinishedData),

    /// The run failed before anything was written.
    RunAborted(RunFinishedData),

    /// The run failed after earlier steps committed; the store is left
    /// partially updated until an operator reconciles it.
    RunFlagged(RunFinishedData),
}

impl WorkflowEvent {
    /// Stable name stored alongside the payload.
    /// Event types after which a run is no longer open.
    pub const CLOSING_EVENT_TYPES: [&'static str; 2] = ["RunCompleted", "RunAborted"];

    pub fn event_type(&self) -> &'static str {
        match self {
            WorkflowEvent::RunStarted(_) => "RunStarted",
            WorkflowEvent::StepCompleted(_) => "StepCompleted",
            WorkflowEvent::StepFailed(_) => "StepFailed",
            WorkflowEvent::RunCompleted(_) => "RunCompleted",
            WorkflowEvent::RunAborted(_) => "RunAborted",
            WorkflowEvent::RunFlagged(_) => "RunFlagged",
        }
    }
}

/// Data for RunStarted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStartedData {
    pub run_id: Uuid,
    pub kind: WorkflowKind,
    /// Known up front for cancel and payment; set by the
    /// `create_order` step when placing an order.
    pub order_id: Option<OrderId>,
    pub started_at: DateTime<Utc>,
}

/// Data for StepCompleted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCompletedData {
    pub step_name: String,
    /// Set when the step created the order.
    pub order_id: Option<OrderId>,
    /// What the step wrote, e.g. `product 3: stock 10 -> 7`.
    pub detail: Option<String>,
}

/// Data for StepFailed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFailedData {
    pub step_name: String,
    pub error: String,
}

/// Data for the terminal events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFinishedData {
    pub reason: Option<String>,
    pub finished_at: DateTime<Utc>,
}

// Convenience constructors
impl WorkflowEvent {
    /// Creates a RunStarted event.
    pub fn run_started(run_id: Uuid, kind: WorkflowKind, order_id: Option<OrderId>) -> Self {
        WorkflowEvent::RunStarted(RunStartedData {
            run_id,
            kind,
            order_id,
            started_at: Utc::now(),
        })
    }

    /// Creates a StepCompleted event.
    pub fn step_completed(
        step_name: impl Into<String>,
        order_id: Option<OrderId>,
        detail: Option<String>,
    ) -> Self {
        WorkflowEvent::StepCompleted(StepCompletedData {
            step_name: step_name.into(),
            order_id,
            detail,
        })
    }

    /// Creates a StepFailed event.
    pub fn step_failed(step_name: impl Into<String>, error: impl Into<String>) -> Self {
        WorkflowEvent::StepFailed(StepFailedData {
            step_name: step_name.into(),
            error: error.into(),
        })
    }

    /// Creates a RunCompleted event.
    pub fn run_completed() -> Self {
        WorkflowEvent::RunCompleted(RunFinishedData {
            reason: None,
            finished_at: Utc::now(),
        })
    }

    /// Creates a RunAborted event.
    pub fn run_aborted(reason: impl Into<String>) -> Self {
        WorkflowEvent::RunAborted(RunFinishedData {
            reason: Some(reason.into()),
            finished_at: Utc::now(),
        })
    }

    /// Creates a RunFlagged event.
    pub fn run_flagged(reason: impl Into<String>) -> Self {
        WorkflowEvent::RunFlagged(RunFinishedData {
            reason: Some(reason.into()),
            finished_at: Utc::now(),
        })
    }
}

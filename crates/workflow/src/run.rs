//! A workflow run rebuilt from its journal entries.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::WorkflowEvent;
use crate::state::RunState;
use crate::steps::WorkflowKind;

/// A step that committed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedStep {
    pub step_name: String,
    pub detail: Option<String>,
}

/// The replayed state of one workflow run.
///
/// Tracks which write steps committed so an operator can tell exactly what a
/// failed run left behind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowRun {
    id: Option<Uuid>,
    kind: Option<WorkflowKind>,
    order_id: Option<OrderId>,
    state: RunState,
    completed_steps: Vec<CompletedStep>,
    failed_step: Option<String>,
    failure_reason: Option<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    /// Rebuilds a run from its events, oldest first.
    pub fn replay(events: impl IntoIterator<Item = WorkflowEvent>) -> Self {
        let mut run = Self::default();
        for event in events {
            run.apply(event);
        }
        run
    }

    /// Applies one event to the run.
    pub fn apply(&mut self, event: WorkflowEvent) {
        match event {
            WorkflowEvent::RunStarted(data) => {
                self.id = Some(data.run_id);
                self.kind = Some(data.kind);
                self.order_id = data.order_id;
                self.started_at = Some(data.started_at);
                self.state = RunState::Running;
            }
            WorkflowEvent::StepCompleted(data) => {
                if let Some(order_id) = data.order_id {
                    self.order_id = Some(order_id);
                }
                self.completed_steps.push(CompletedStep {
                    step_name: data.step_name,
                    detail: data.detail,
                });
            }
            WorkflowEvent::StepFailed(data) => {
                self.failed_step = Some(data.step_name);
                self.failure_reason = Some(data.error);
            }
            WorkflowEvent::RunCompleted(data) => {
                self.state = RunState::Completed;
                self.finished_at = Some(data.finished_at);
            }
            WorkflowEvent::RunAborted(data) => {
                self.state = RunState::Aborted;
                self.finish_failed(data.reason, data.finished_at);
            }
            WorkflowEvent::RunFlagged(data) => {
                self.state = RunState::NeedsReconciliation;
                self.finish_failed(data.reason, data.finished_at);
            }
        }
    }

    fn finish_failed(&mut self, reason: Option<String>, at: DateTime<Utc>) {
        if self.failure_reason.is_none() {
            self.failure_reason = reason;
        }
        self.finished_at = Some(at);
    }

    /// Returns true once any write step has committed.
    pub fn has_writes(&self) -> bool {
        !self.completed_steps.is_empty()
    }
}

// Query methods
impl WorkflowRun {
    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn kind(&self) -> Option<WorkflowKind> {
        self.kind
    }

    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn completed_steps(&self) -> &[CompletedStep] {
        &self.completed_steps
    }

    /// Names of the committed steps, in order.
    pub fn completed_step_names(&self) -> Vec<&str> {
        self.completed_steps
            .iter()
            .map(|s| s.step_name.as_str())
            .collect()
    }

    pub fn failed_step(&self) -> Option<&str> {
        self.failed_step.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }
}

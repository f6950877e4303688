//! Workflow journal: an append-only record of every multi-step run.
//!
//! Runs are not atomic. The journal is what lets an operator find runs that
//! stopped halfway and see which writes they committed.

use std::collections::HashMap;

use chrono::Utc;
use common::OrderId;
use domain::{DomainError, Result};
use store::{JournalEntry, JournalGateway, StoreError};
use uuid::Uuid;

use crate::events::WorkflowEvent;
use crate::run::WorkflowRun;
use crate::steps::WorkflowKind;

/// Reads and writes workflow runs.
#[derive(Debug, Clone)]
pub struct Journal<S: JournalGateway> {
    store: S,
}

impl<S: JournalGateway> Journal<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Starts a new run.
    ///
    /// Failing to persist the start record aborts the operation, since
    /// nothing has been written yet.
    pub async fn begin(
        &self,
        kind: WorkflowKind,
        order_id: Option<OrderId>,
    ) -> Result<RunRecorder<'_, S>> {
        let run_id = Uuid::new_v4();
        let mut recorder = RunRecorder {
            store: &self.store,
            run: WorkflowRun::default(),
            sequence: 0,
        };
        recorder
            .append(WorkflowEvent::run_started(run_id, kind, order_id))
            .await?;

        metrics::counter!("workflow_runs_total", "kind" => kind.as_str()).increment(1);
        tracing::debug!(%run_id, %kind, "workflow run started");
        Ok(recorder)
    }

    /// Replays a single run.
    pub async fn load_run(&self, run_id: Uuid) -> Result<Option<WorkflowRun>> {
        let entries = self.store.journal_for_run(run_id).await?;
        if entries.is_empty() {
            return Ok(None);
        }
        Ok(Some(replay_entries(entries)?))
    }

    /// Replays every run in the journal, oldest first.
    pub async fn runs(&self) -> Result<Vec<WorkflowRun>> {
        replay_runs(self.store.journal_entries().await?)
    }

    /// Returns runs flagged for reconciliation or left without a terminal
    /// record.
    ///
    /// Only entries of runs without a closing record are fetched.
    pub async fn open_runs(&self) -> Result<Vec<WorkflowRun>> {
        let entries = self
            .store
            .journal_entries_without(&WorkflowEvent::CLOSING_EVENT_TYPES)
            .await?;
        Ok(replay_runs(entries)?
            .into_iter()
            .filter(|run| run.state().needs_attention())
            .collect())
    }
}

/// Groups entries by run in first-seen order and replays each run.
fn replay_runs(entries: Vec<JournalEntry>) -> Result<Vec<WorkflowRun>> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut grouped: HashMap<Uuid, Vec<JournalEntry>> = HashMap::new();
    for entry in entries {
        let group = grouped.entry(entry.run_id).or_insert_with(|| {
            order.push(entry.run_id);
            Vec::new()
        });
        group.push(entry);
    }

    order
        .into_iter()
        .filter_map(|run_id| grouped.remove(&run_id))
        .map(replay_entries)
        .collect()
}

fn replay_entries(mut entries: Vec<JournalEntry>) -> Result<WorkflowRun> {
    entries.sort_by_key(|e| e.sequence);
    let events = entries
        .into_iter()
        .map(|e| serde_json::from_value::<WorkflowEvent>(e.payload))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| DomainError::Fatal(StoreError::Serialization(e)))?;
    Ok(WorkflowRun::replay(events))
}

/// Records the progress of one run.
///
/// Only the start record is required to persist. Later records are
/// best-effort: the store write they describe has already happened, so a
/// journal failure is logged instead of turned into a business failure.
pub struct RunRecorder<'a, S: JournalGateway> {
    store: &'a S,
    run: WorkflowRun,
    sequence: i64,
}

impl<S: JournalGateway> RunRecorder<'_, S> {
    /// Returns the run id.
    pub fn run_id(&self) -> Uuid {
        self.run.id().unwrap_or_default()
    }

    /// Returns the run as recorded so far.
    pub fn run(&self) -> &WorkflowRun {
        &self.run
    }

    async fn append(&mut self, event: WorkflowEvent) -> std::result::Result<(), StoreError> {
        self.sequence += 1;
        let payload = serde_json::to_value(&event)?;
        let event_type = event.event_type().to_string();
        self.run.apply(event);

        self.store
            .append_journal(JournalEntry {
                run_id: self.run_id(),
                sequence: self.sequence,
                event_type,
                payload,
                recorded_at: Utc::now(),
            })
            .await
    }

    async fn append_best_effort(&mut self, event: WorkflowEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.append(event).await {
            metrics::counter!("workflow_journal_errors_total").increment(1);
            tracing::error!(
                run_id = %self.run_id(),
                event_type,
                error = %e,
                "failed to write workflow journal entry"
            );
        }
    }

    /// Records a committed step.
    pub async fn step_completed(&mut self, step: &'static str, detail: Option<String>) {
        tracing::debug!(step, detail = detail.as_deref(), "workflow step completed");
        self.append_best_effort(WorkflowEvent::step_completed(step, None, detail))
            .await;
    }

    /// Records the step that created the run's order.
    pub async fn order_created(&mut self, step: &'static str, order_id: OrderId) {
        tracing::debug!(step, %order_id, "workflow step completed");
        self.append_best_effort(WorkflowEvent::step_completed(step, Some(order_id), None))
            .await;
    }

    /// Passes `result` through, recording a failure of `step` on error.
    pub async fn check<T, E: Into<DomainError>>(
        &mut self,
        step: &'static str,
        result: std::result::Result<T, E>,
    ) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => Err(self.fail(step, e.into()).await),
        }
    }

    /// Records that `step` failed and closes the run.
    ///
    /// The run is aborted when nothing was written yet, and flagged for
    /// reconciliation otherwise. Returns the error for propagation.
    pub async fn fail(&mut self, step: &'static str, error: DomainError) -> DomainError {
        self.append_best_effort(WorkflowEvent::step_failed(step, error.to_string()))
            .await;

        let kind = self.run.kind().map(|k| k.as_str()).unwrap_or("unknown");
        if self.run.has_writes() {
            let committed = self.run.completed_steps().len();
            metrics::counter!("workflow_flagged_total", "kind" => kind).increment(1);
            tracing::error!(
                run_id = %self.run_id(),
                step,
                committed,
                error = %error,
                "workflow stopped after partial writes; needs reconciliation"
            );
            self.append_best_effort(WorkflowEvent::run_flagged(format!(
                "{step} failed after {committed} committed step(s)"
            )))
            .await;
        } else {
            tracing::warn!(run_id = %self.run_id(), step, error = %error, "workflow aborted");
            self.append_best_effort(WorkflowEvent::run_aborted(format!("{step} failed")))
                .await;
        }
        error
    }

    /// Records that every step committed.
    pub async fn complete(mut self) -> WorkflowRun {
        self.append_best_effort(WorkflowEvent::run_completed()).await;
        self.run
    }
}

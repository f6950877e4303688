//! Workflow journal endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use store::RetailStore;
use workflow::{CompletedStep, WorkflowRun};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct WorkflowRunResponse {
    pub run_id: String,
    pub kind: Option<String>,
    pub order_id: Option<i64>,
    pub state: String,
    pub completed_steps: Vec<CompletedStep>,
    pub failed_step: Option<String>,
    pub failure_reason: Option<String>,
    pub started_at: Option<String>,
}

impl From<WorkflowRun> for WorkflowRunResponse {
    fn from(run: WorkflowRun) -> Self {
        Self {
            run_id: run.id().map(|id| id.to_string()).unwrap_or_default(),
            kind: run.kind().map(|k| k.to_string()),
            order_id: run.order_id().map(|id| id.as_i64()),
            state: run.state().to_string(),
            completed_steps: run.completed_steps().to_vec(),
            failed_step: run.failed_step().map(String::from),
            failure_reason: run.failure_reason().map(String::from),
            started_at: run.started_at().map(|t| t.to_rfc3339()),
        }
    }
}

/// GET /workflows/open: runs that need reconciliation.
#[tracing::instrument(skip(state))]
pub async fn open<S: RetailStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<WorkflowRunResponse>>, ApiError> {
    let runs = state.orders.journal().open_runs().await?;
    Ok(Json(runs.into_iter().map(WorkflowRunResponse::from).collect()))
}

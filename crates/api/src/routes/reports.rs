//! Reporting endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use chrono::NaiveDate;
use domain::SalesSummary;
use serde::Deserialize;
use store::RetailStore;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// GET /reports/sales: revenue from completed orders in a date range.
#[tracing::instrument(skip(state))]
pub async fn sales<S: RetailStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<SalesQuery>,
) -> Result<Json<SalesSummary>, ApiError> {
    let summary = state
        .reports
        .sales_summary(query.start_date, query.end_date)
        .await?;
    Ok(Json(summary))
}

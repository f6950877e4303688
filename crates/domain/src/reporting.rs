//! Sales reporting over the store's pre-aggregated query.

use chrono::NaiveDate;
use common::Money;
use serde::Serialize;
use store::{DateRange, OrderGateway};

use crate::error::{DomainError, Result};

/// Revenue summary for completed orders in a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesSummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_revenue: Money,
    pub total_orders: i64,
}

/// Service for business reports.
pub struct ReportingService<S: OrderGateway> {
    store: S,
}

impl<S: OrderGateway> ReportingService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Summarises completed orders placed between `start` and `end`, inclusive.
    #[tracing::instrument(skip(self))]
    pub async fn sales_summary(&self, start: NaiveDate, end: NaiveDate) -> Result<SalesSummary> {
        if start > end {
            return Err(DomainError::InvalidInput(format!(
                "Report start date {start} is after end date {end}"
            )));
        }

        let aggregate = self
            .store
            .sales_aggregate(DateRange { start, end })
            .await?;

        Ok(SalesSummary {
            start_date: start,
            end_date: end,
            total_revenue: aggregate.total_revenue,
            total_orders: aggregate.total_orders,
        })
    }
}

//! Payment processing: settles a PENDING payment and completes its order.

use std::time::Instant;

use chrono::Utc;
use common::{OrderId, OrderStatus};
use domain::{DomainError, Result};
use store::{Payment, PaymentUpdate, RetailStore};

use crate::journal::Journal;
use crate::steps::{self, WorkflowKind};

/// Marks payments PAID and their orders COMPLETED.
///
/// Does not touch stock; it was debited when the order was placed.
pub struct PaymentProcessor<S: RetailStore + Clone> {
    store: S,
    journal: Journal<S>,
}

impl<S: RetailStore + Clone> PaymentProcessor<S> {
    /// Creates a new payment processor over the given store.
    pub fn new(store: S) -> Self {
        let journal = Journal::new(store.clone());
        Self { store, journal }
    }

    /// Records payment for an order with the given method.
    #[tracing::instrument(skip(self))]
    pub async fn process_payment(&self, order_id: OrderId, method: &str) -> Result<Payment> {
        let started = Instant::now();

        let method = method.trim();
        if method.is_empty() {
            return Err(DomainError::InvalidInput(
                "A payment method is required".to_string(),
            ));
        }

        let payment = self
            .store
            .get_payment_by_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Payment for order", order_id))?;
        if !payment.status.can_pay() {
            return Err(DomainError::payment_state(order_id, payment.status, "pay"));
        }
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", order_id))?;
        if !order.status.can_complete() {
            return Err(DomainError::order_state(order_id, order.status, "complete"));
        }

        let mut run = self
            .journal
            .begin(WorkflowKind::ProcessPayment, Some(order_id))
            .await?;

        let paid = self
            .store
            .update_payment_by_order(order_id, PaymentUpdate::paid(method, Utc::now()))
            .await;
        let paid = match run.check(steps::STEP_MARK_PAID, paid).await? {
            Some(payment) => payment,
            None => {
                let err = DomainError::not_found("Payment for order", order_id);
                return Err(run.fail(steps::STEP_MARK_PAID, err).await);
            }
        };
        run.step_completed(steps::STEP_MARK_PAID, Some(format!("method {method}")))
            .await;

        let completed = self
            .store
            .update_order_status(order_id, OrderStatus::Completed)
            .await;
        if run.check(steps::STEP_COMPLETE_ORDER, completed).await?.is_none() {
            let err = DomainError::not_found("Order", order_id);
            return Err(run.fail(steps::STEP_COMPLETE_ORDER, err).await);
        }
        run.step_completed(steps::STEP_COMPLETE_ORDER, None).await;
        run.complete().await;

        let duration = started.elapsed().as_secs_f64();
        metrics::counter!("payments_processed_total").increment(1);
        metrics::histogram!("workflow_duration_seconds", "kind" => WorkflowKind::ProcessPayment.as_str())
            .record(duration);
        tracing::info!(%order_id, amount = %paid.amount, method, duration, "payment processed");

        Ok(paid)
    }
}

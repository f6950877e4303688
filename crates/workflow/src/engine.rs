//! Order Workflow Engine: placing and cancelling orders.

use std::collections::HashMap;
use std::time::Instant;

use common::{CustomerId, OrderId, OrderStatus, ProductId};
use domain::{DomainError, Result};
use serde::Serialize;
use store::{
    Customer, NewOrderLine, Order, OrderLineDetail, PaymentUpdate, Product, ProductUpdate,
    RetailStore,
};

use crate::inventory::{self, InventoryGuard, LineRequest};
use crate::journal::Journal;
use crate::steps::{self, WorkflowKind};

/// An order assembled with its customer and lines.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    pub order: Order,
    pub customer: Customer,
    pub lines: Vec<OrderLineDetail>,
}

/// Drives order creation and cancellation against the store.
///
/// Steps commit one at a time. When a step fails after earlier ones
/// committed, nothing is rolled back: the error propagates and the run is
/// flagged in the journal for reconciliation.
pub struct OrderWorkflow<S: RetailStore + Clone> {
    store: S,
    guard: InventoryGuard<S>,
    journal: Journal<S>,
}

impl<S: RetailStore + Clone> OrderWorkflow<S> {
    /// Creates a new order workflow over the given store.
    pub fn new(store: S) -> Self {
        let guard = InventoryGuard::new(store.clone());
        let journal = Journal::new(store.clone());
        Self {
            store,
            guard,
            journal,
        }
    }

    /// Places an order for `customer_id`.
    ///
    /// Validation is all-or-nothing: if any line fails, nothing is written.
    /// Writes happen in this order: order header (PLACED), payment
    /// (PENDING), lines, then one stock debit per line.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn create_order(
        &self,
        customer_id: CustomerId,
        lines: Vec<LineRequest>,
    ) -> Result<OrderDetails> {
        let started = Instant::now();

        let customer = self
            .store
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Customer", customer_id))?;
        let reserved = self.guard.reserve(&lines).await?;
        let total = inventory::order_total(&reserved)?;

        let mut run = self.journal.begin(WorkflowKind::PlaceOrder, None).await?;

        let order = run
            .check(
                steps::STEP_CREATE_ORDER,
                self.store.create_order(customer.id, total).await,
            )
            .await?;
        run.order_created(steps::STEP_CREATE_ORDER, order.id).await;

        run.check(
            steps::STEP_CREATE_PAYMENT,
            self.store.create_payment(order.id, total).await,
        )
        .await?;
        run.step_completed(steps::STEP_CREATE_PAYMENT, Some(format!("amount {total}")))
            .await;

        let new_lines: Vec<NewOrderLine> = reserved
            .iter()
            .map(|line| NewOrderLine {
                product_id: line.product.id,
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
            .collect();
        let created_lines = run
            .check(
                steps::STEP_CREATE_LINES,
                self.store.create_lines(order.id, new_lines).await,
            )
            .await?;
        run.step_completed(
            steps::STEP_CREATE_LINES,
            Some(format!("{} line(s)", reserved.len())),
        )
        .await;

        for line in &reserved {
            let product_id = line.product.id;
            let updated = self
                .store
                .update_product(product_id, ProductUpdate::stock(line.stock_after))
                .await;
            if run.check(steps::STEP_DEBIT_STOCK, updated).await?.is_none() {
                let err = DomainError::not_found("Product", product_id);
                return Err(run.fail(steps::STEP_DEBIT_STOCK, err).await);
            }
            run.step_completed(
                steps::STEP_DEBIT_STOCK,
                Some(format!(
                    "product {product_id}: stock {} -> {}",
                    line.stock_before(),
                    line.stock_after
                )),
            )
            .await;
        }

        run.complete().await;

        let duration = started.elapsed().as_secs_f64();
        metrics::counter!("orders_created_total").increment(1);
        metrics::histogram!("workflow_duration_seconds", "kind" => WorkflowKind::PlaceOrder.as_str())
            .record(duration);
        tracing::info!(order_id = %order.id, %customer_id, %total, duration, "order placed");

        // Built from the validation snapshot: no store reads after the run
        // completes.
        let products: HashMap<ProductId, &Product> = reserved
            .iter()
            .map(|line| (line.product.id, &line.product))
            .collect();
        let lines = created_lines
            .iter()
            .map(|line| line.with_product(products.get(&line.product_id).copied()))
            .collect();
        Ok(OrderDetails {
            order,
            customer,
            lines,
        })
    }

    /// Cancels a PLACED order.
    ///
    /// Credits back each line's quantity onto the product's current stock,
    /// marks the payment REFUNDED and the order CANCELLED.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order> {
        let started = Instant::now();

        let order = self.get_order(order_id).await?;
        if !order.status.can_cancel() {
            return Err(DomainError::order_state(order_id, order.status, "cancel"));
        }
        // A missing payment is detected at the refund step and flags the run.
        let payment = self.store.get_payment_by_order(order_id).await?;
        if let Some(payment) = payment.filter(|p| !p.status.can_refund()) {
            return Err(DomainError::payment_state(order_id, payment.status, "refund"));
        }
        let lines = self.store.get_lines(order_id).await?;

        let mut run = self
            .journal
            .begin(WorkflowKind::CancelOrder, Some(order_id))
            .await?;

        for line in &lines {
            let product = run
                .check(
                    steps::STEP_CREDIT_STOCK,
                    self.store.get_product(line.product_id).await,
                )
                .await?;
            let Some(product) = product else {
                tracing::warn!(
                    %order_id,
                    product_id = %line.product_id,
                    quantity = line.quantity,
                    "product no longer exists; stock credit skipped"
                );
                continue;
            };

            let Some(stock) = product.stock.checked_add(line.quantity) else {
                let err = DomainError::InvalidInput(format!(
                    "Crediting {} units to product {} overflows its stock of {}",
                    line.quantity, product.id, product.stock
                ));
                return Err(run.fail(steps::STEP_CREDIT_STOCK, err).await);
            };
            let updated = self
                .store
                .update_product(product.id, ProductUpdate::stock(stock))
                .await;
            if run.check(steps::STEP_CREDIT_STOCK, updated).await?.is_none() {
                let err = DomainError::not_found("Product", product.id);
                return Err(run.fail(steps::STEP_CREDIT_STOCK, err).await);
            }
            run.step_completed(
                steps::STEP_CREDIT_STOCK,
                Some(format!(
                    "product {}: stock {} -> {stock}",
                    product.id, product.stock
                )),
            )
            .await;
        }

        let refunded = self
            .store
            .update_payment_by_order(order_id, PaymentUpdate::refunded())
            .await;
        if run.check(steps::STEP_REFUND_PAYMENT, refunded).await?.is_none() {
            let err = DomainError::not_found("Payment for order", order_id);
            return Err(run.fail(steps::STEP_REFUND_PAYMENT, err).await);
        }
        run.step_completed(steps::STEP_REFUND_PAYMENT, None).await;

        let cancelled = self
            .store
            .update_order_status(order_id, OrderStatus::Cancelled)
            .await;
        let cancelled = match run.check(steps::STEP_CANCEL_ORDER, cancelled).await? {
            Some(order) => order,
            None => {
                let err = DomainError::not_found("Order", order_id);
                return Err(run.fail(steps::STEP_CANCEL_ORDER, err).await);
            }
        };
        run.step_completed(steps::STEP_CANCEL_ORDER, None).await;
        run.complete().await;

        let duration = started.elapsed().as_secs_f64();
        metrics::counter!("orders_cancelled_total").increment(1);
        metrics::histogram!("workflow_duration_seconds", "kind" => WorkflowKind::CancelOrder.as_str())
            .record(duration);
        tracing::info!(%order_id, duration, "order cancelled");

        Ok(cancelled)
    }

    /// Loads an order with its customer and lines.
    pub async fn get_order_details(&self, order_id: OrderId) -> Result<OrderDetails> {
        let order = self.get_order(order_id).await?;
        let customer = self
            .store
            .get_customer(order.customer_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Customer", order.customer_id))?;
        let lines = self.store.get_lines(order_id).await?;
        Ok(OrderDetails {
            order,
            customer,
            lines,
        })
    }

    /// Lists a customer's orders, newest first.
    pub async fn list_orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        self.store
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Customer", customer_id))?;
        Ok(self.store.list_orders_by_customer(customer_id).await?)
    }

    /// Returns the journal the workflow records into.
    pub fn journal(&self) -> &Journal<S> {
        &self.journal
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", order_id))
    }
}

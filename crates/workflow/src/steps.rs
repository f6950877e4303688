//! Workflow kinds and step names recorded in the journal.

use serde::{Deserialize, Serialize};

/// Step: insert the order header (PLACED).
pub const STEP_CREATE_ORDER: &str = "create_order";

/// Step: insert the PENDING payment obligation.
pub const STEP_CREATE_PAYMENT: &str = "create_payment";

/// Step: insert the order lines.
pub const STEP_CREATE_LINES: &str = "create_lines";

/// Step: debit one product's stock. Recorded once per line.
pub const STEP_DEBIT_STOCK: &str = "debit_stock";

/// Step: credit one product's stock back. Recorded once per line.
pub const STEP_CREDIT_STOCK: &str = "credit_stock";

/// Step: mark the payment REFUNDED.
pub const STEP_REFUND_PAYMENT: &str = "refund_payment";

/// Step: mark the order CANCELLED.
pub const STEP_CANCEL_ORDER: &str = "cancel_order";

/// Step: mark the payment PAID.
pub const STEP_MARK_PAID: &str = "mark_paid";

/// Step: mark the order COMPLETED.
pub const STEP_COMPLETE_ORDER: &str = "complete_order";

/// The multi-step operations that are journaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    PlaceOrder,
    CancelOrder,
    ProcessPayment,
}

impl WorkflowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::PlaceOrder => "place_order",
            WorkflowKind::CancelOrder => "cancel_order",
            WorkflowKind::ProcessPayment => "process_payment",
        }
    }
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//! Order fulfillment workflow for the retail back office.
//!
//! Three multi-step operations drive the order/payment state machine:
//!
//! ```text
//! create_order:    PLACED + PENDING ──► lines ──► stock debits
//! process_payment: PENDING ──► PAID,  PLACED ──► COMPLETED
//! cancel_order:    stock credits ──► REFUNDED ──► CANCELLED
//! ```
//!
//! Steps are committed one by one against the store with no surrounding
//! transaction. A step failing after earlier writes leaves the store
//! partially updated; the run is recorded in the [`Journal`] as needing
//! reconciliation rather than rolled back.

pub mod engine;
pub mod events;
pub mod inventory;
pub mod journal;
pub mod payment;
pub mod run;
pub mod state;
pub mod steps;

pub use engine::{OrderDetails, OrderWorkflow};
pub use events::WorkflowEvent;
pub use inventory::{InventoryGuard, LineRequest, ReservedLine};
pub use journal::{Journal, RunRecorder};
pub use payment::PaymentProcessor;
pub use run::{CompletedStep, WorkflowRun};
pub use state::RunState;
pub use steps::WorkflowKind;

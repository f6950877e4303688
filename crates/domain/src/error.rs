//! Domain error types.

use common::{OrderStatus, PaymentStatus, ProductId};
use store::StoreError;
use thiserror::Error;

/// Coarse classification of a [`DomainError`], used by the command surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    InvalidState,
    InsufficientStock,
    Fatal,
}

/// Errors raised by the services and workflows.
///
/// Every variant carries enough identifying context (ids, SKUs, quantities)
/// to diagnose the failure without inspecting storage.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An entity id or unique key is absent.
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    /// A unique key is already taken, or a delete is blocked by references.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The request itself is malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A workflow transition was attempted from a disallowed state.
    #[error("Cannot {action} {entity} {id}: status is {status}")]
    InvalidState {
        entity: &'static str,
        id: String,
        status: String,
        action: &'static str,
    },

    /// Requested quantity exceeds available stock.
    #[error(
        "Not enough stock for product '{name}' (ID: {product_id}). Requested: {requested}, Available: {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: u32,
        available: u32,
    },

    /// The store call itself failed. Not retried.
    #[error("Store failure: {0}")]
    Fatal(StoreError),
}

impl DomainError {
    /// Shorthand for [`DomainError::NotFound`].
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Invalid transition on an order.
    pub fn order_state(id: impl ToString, status: OrderStatus, action: &'static str) -> Self {
        DomainError::InvalidState {
            entity: "Order",
            id: id.to_string(),
            status: status.to_string(),
            action,
        }
    }

    /// Invalid transition on the payment of an order.
    pub fn payment_state(
        order_id: impl ToString,
        status: PaymentStatus,
        action: &'static str,
    ) -> Self {
        DomainError::InvalidState {
            entity: "payment for order",
            id: order_id.to_string(),
            status: status.to_string(),
            action,
        }
    }

    /// Returns the error's classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::InvalidInput(_) => ErrorKind::InvalidInput,
            DomainError::InvalidState { .. } => ErrorKind::InvalidState,
            DomainError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            DomainError::Fatal(_) => ErrorKind::Fatal,
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation { constraint } => {
                DomainError::Conflict(format!("unique constraint {constraint} violated"))
            }
            other => DomainError::Fatal(other),
        }
    }
}

/// Convenience type alias for domain results.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_identify_entities() {
        let err = DomainError::not_found("Customer", 7);
        assert_eq!(err.to_string(), "Customer 7 not found");

        let err = DomainError::InsufficientStock {
            product_id: ProductId::new(3),
            name: "Widget".to_string(),
            requested: 20,
            available: 10,
        };
        assert_eq!(
            err.to_string(),
            "Not enough stock for product 'Widget' (ID: 3). Requested: 20, Available: 10"
        );

        let err = DomainError::order_state(5, OrderStatus::Completed, "cancel");
        assert_eq!(err.to_string(), "Cannot cancel Order 5: status is COMPLETED");
    }

    #[test]
    fn test_unique_violation_becomes_conflict() {
        let err: DomainError = StoreError::UniqueViolation {
            constraint: "products_sku_key".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err: DomainError = StoreError::Unavailable("down".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }
}

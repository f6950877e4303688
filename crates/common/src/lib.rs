//! Shared types for the retail back office.

pub mod money;
pub mod status;
pub mod types;

pub use money::{Money, ParseMoneyError};
pub use status::{OrderStatus, ParseStatusError, PaymentStatus};
pub use types::{CustomerId, OrderId, PaymentId, ProductId};

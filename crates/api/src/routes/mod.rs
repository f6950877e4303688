//! Route handlers grouped by resource.

pub mod customers;
pub mod orders;
pub mod products;
pub mod reports;
pub mod system;
pub mod workflows;

use crate::error::ApiError;

/// Parses a numeric path id.
pub(crate) fn parse_id<T: From<i64>>(id: &str) -> Result<T, ApiError> {
    id.parse::<i64>()
        .map(T::from)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format '{id}': {e}")))
}

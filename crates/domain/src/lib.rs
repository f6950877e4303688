//! Domain layer for the retail back office.
//!
//! This crate provides:
//! - The `DomainError` taxonomy shared by services and workflows
//! - Product and customer administration
//! - Sales reporting

pub mod customer;
pub mod error;
pub mod product;
pub mod reporting;

pub use customer::CustomerService;
pub use error::{DomainError, ErrorKind, Result};
pub use product::{DEFAULT_LOW_STOCK_THRESHOLD, ProductService};
pub use reporting::{ReportingService, SalesSummary};

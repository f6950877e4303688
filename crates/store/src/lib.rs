//! Resource gateways for the retail back office.
//!
//! Each entity (product, customer, order, payment) is reached through a
//! small trait of point operations. The store gives no multi-statement
//! atomicity to callers: every call commits on its own.

pub mod error;
pub mod gateway;
pub mod memory;
pub mod postgres;
pub mod records;

pub use error::{Result, StoreError};
pub use gateway::{
    CustomerGateway, JournalGateway, OrderGateway, PaymentGateway, ProductGateway, RetailStore,
};
pub use memory::{InMemoryStore, StoreOp};
pub use postgres::PostgresStore;
pub use records::{
    Customer, CustomerUpdate, DateRange, JournalEntry, NewCustomer, NewOrderLine, NewProduct,
    Order, OrderLine, OrderLineDetail, Payment, PaymentUpdate, Product, ProductFilter,
    ProductUpdate, SalesAggregate,
};

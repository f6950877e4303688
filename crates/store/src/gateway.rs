use async_trait::async_trait;
use common::{CustomerId, Money, OrderId, OrderStatus, ProductId};
use uuid::Uuid;

use crate::{
    Customer, CustomerUpdate, DateRange, JournalEntry, NewCustomer, NewOrderLine, NewProduct,
    Order, OrderLine, OrderLineDetail, Payment, PaymentUpdate, Product, ProductFilter,
    ProductUpdate, Result, SalesAggregate,
};

/// Point operations on product rows.
///
/// Writes return the written row. Updates of a missing id return `Ok(None)`.
#[async_trait]
pub trait ProductGateway: Send + Sync {
    /// Inserts a product. Fails with `UniqueViolation` on a duplicate SKU.
    async fn create_product(&self, product: NewProduct) -> Result<Product>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    async fn get_product_by_sku(&self, sku: &str) -> Result<Option<Product>>;

    async fn update_product(&self, id: ProductId, update: ProductUpdate)
    -> Result<Option<Product>>;

    /// Lists products ordered by id.
    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>>;
}

/// Point operations on customer rows.
#[async_trait]
pub trait CustomerGateway: Send + Sync {
    /// Inserts a customer. Fails with `UniqueViolation` on a duplicate email.
    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer>;

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>>;

    async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>>;

    async fn update_customer(
        &self,
        id: CustomerId,
        update: CustomerUpdate,
    ) -> Result<Option<Customer>>;

    /// Deletes a customer, returning the removed row.
    async fn delete_customer(&self, id: CustomerId) -> Result<Option<Customer>>;

    /// Lists customers ordered by id.
    async fn list_customers(&self, limit: usize) -> Result<Vec<Customer>>;

    async fn search_customers_by_city(&self, city: &str, limit: usize) -> Result<Vec<Customer>>;
}

/// Point operations on order headers and lines.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Inserts an order header in PLACED status.
    async fn create_order(&self, customer_id: CustomerId, total_amount: Money) -> Result<Order>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    async fn update_order_status(&self, id: OrderId, status: OrderStatus)
    -> Result<Option<Order>>;

    /// Inserts all lines of an order in one write.
    async fn create_lines(&self, order_id: OrderId, lines: Vec<NewOrderLine>)
    -> Result<Vec<OrderLine>>;

    /// Returns the lines of an order joined with product name and SKU.
    async fn get_lines(&self, order_id: OrderId) -> Result<Vec<OrderLineDetail>>;

    /// Lists a customer's orders, newest first.
    async fn list_orders_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>>;

    /// Revenue and count of COMPLETED orders placed within the range.
    async fn sales_aggregate(&self, range: DateRange) -> Result<SalesAggregate>;
}

/// Point operations on payment rows, addressed by their order.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Inserts the PENDING payment obligation for an order.
    async fn create_payment(&self, order_id: OrderId, amount: Money) -> Result<Payment>;

    async fn get_payment_by_order(&self, order_id: OrderId) -> Result<Option<Payment>>;

    async fn update_payment_by_order(
        &self,
        order_id: OrderId,
        update: PaymentUpdate,
    ) -> Result<Option<Payment>>;
}

/// Append-only log of workflow runs.
#[async_trait]
pub trait JournalGateway: Send + Sync {
    async fn append_journal(&self, entry: JournalEntry) -> Result<()>;

    /// Entries of one run in sequence order.
    async fn journal_for_run(&self, run_id: Uuid) -> Result<Vec<JournalEntry>>;

    /// All entries in append order.
    async fn journal_entries(&self) -> Result<Vec<JournalEntry>>;

    /// Entries, in append order, of runs that have no entry of any of the
    /// given event types.
    async fn journal_entries_without(&self, event_types: &[&str]) -> Result<Vec<JournalEntry>>;
}

/// Everything the services and workflows need from the store.
pub trait RetailStore:
    ProductGateway + CustomerGateway + OrderGateway + PaymentGateway + JournalGateway
{
}

impl<T> RetailStore for T where
    T: ProductGateway + CustomerGateway + OrderGateway + PaymentGateway + JournalGateway
{
}

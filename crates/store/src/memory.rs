use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CustomerId, Money, OrderId, OrderStatus, PaymentId, PaymentStatus, ProductId};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    Customer, CustomerGateway, CustomerUpdate, DateRange, JournalEntry, JournalGateway,
    NewCustomer, NewOrderLine, NewProduct, Order, OrderGateway, OrderLine, OrderLineDetail,
    Payment, PaymentGateway, PaymentUpdate, Product, ProductFilter, ProductGateway, ProductUpdate,
    Result, SalesAggregate, StoreError,
};

/// Store operations that can be made to fail in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    GetProduct,
    UpdateProduct,
    CreateOrder,
    UpdateOrder,
    CreateLines,
    GetLines,
    CreatePayment,
    UpdatePayment,
    AppendJournal,
}

#[derive(Debug, Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    customers: BTreeMap<CustomerId, Customer>,
    orders: BTreeMap<OrderId, Order>,
    lines: Vec<OrderLine>,
    payments: BTreeMap<OrderId, Payment>,
    journal: Vec<JournalEntry>,
    next_id: i64,
    /// Remaining successful calls before an operation starts failing.
    faults: HashMap<StoreOp, usize>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn trip(&mut self, op: StoreOp) -> Result<()> {
        if let Some(remaining) = self.faults.get_mut(&op) {
            if *remaining == 0 {
                return Err(StoreError::Unavailable(format!(
                    "injected failure on {op:?}"
                )));
            }
            *remaining -= 1;
        }
        Ok(())
    }
}

/// In-memory store for tests and local runs.
///
/// Clones share the same tables. Enforces the unique SKU and email keys
/// the way the database schema does.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets `op` succeed `after` more times, then fail on every later call.
    pub async fn fail_on(&self, op: StoreOp, after: usize) {
        self.tables.write().await.faults.insert(op, after);
    }

    /// Removes all injected failures.
    pub async fn clear_faults(&self) {
        self.tables.write().await.faults.clear();
    }

    /// Returns the number of order headers stored.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Returns the number of payments stored.
    pub async fn payment_count(&self) -> usize {
        self.tables.read().await.payments.len()
    }

    /// Returns the number of order lines stored.
    pub async fn line_count(&self) -> usize {
        self.tables.read().await.lines.len()
    }

    /// Overrides an order's creation time.
    pub async fn backdate_order(&self, id: OrderId, created_at: chrono::DateTime<Utc>) {
        if let Some(order) = self.tables.write().await.orders.get_mut(&id) {
            order.created_at = created_at;
        }
    }
}

#[async_trait]
impl ProductGateway for InMemoryStore {
    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        let mut tables = self.tables.write().await;
        if tables.products.values().any(|p| p.sku == product.sku) {
            return Err(StoreError::UniqueViolation {
                constraint: "products_sku_key".to_string(),
            });
        }

        let id = ProductId::new(tables.next_id());
        let row = Product {
            id,
            name: product.name,
            sku: product.sku,
            price: product.price,
            stock: product.stock,
            category: product.category,
        };
        tables.products.insert(id, row.clone());
        Ok(row)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let mut tables = self.tables.write().await;
        tables.trip(StoreOp::GetProduct)?;
        Ok(tables.products.get(&id).cloned())
    }

    async fn get_product_by_sku(&self, sku: &str) -> Result<Option<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.values().find(|p| p.sku == sku).cloned())
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Option<Product>> {
        let mut tables = self.tables.write().await;
        tables.trip(StoreOp::UpdateProduct)?;

        let Some(product) = tables.products.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        if let Some(stock) = update.stock {
            product.stock = stock;
        }
        if let Some(category) = update.category {
            product.category = Some(category);
        }
        Ok(Some(product.clone()))
    }

    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .values()
            .filter(|p| match &filter.category {
                Some(category) => p.category.as_ref() == Some(category),
                None => true,
            })
            .take(filter.limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CustomerGateway for InMemoryStore {
    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer> {
        let mut tables = self.tables.write().await;
        if tables.customers.values().any(|c| c.email == customer.email) {
            return Err(StoreError::UniqueViolation {
                constraint: "customers_email_key".to_string(),
            });
        }

        let id = CustomerId::new(tables.next_id());
        let row = Customer {
            id,
            name: customer.name,
            email: customer.email,
            phone: customer.phone,
            city: customer.city,
        };
        tables.customers.insert(id, row.clone());
        Ok(row)
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        Ok(self.tables.read().await.customers.get(&id).cloned())
    }

    async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
        let tables = self.tables.read().await;
        Ok(tables.customers.values().find(|c| c.email == email).cloned())
    }

    async fn update_customer(
        &self,
        id: CustomerId,
        update: CustomerUpdate,
    ) -> Result<Option<Customer>> {
        let mut tables = self.tables.write().await;
        let Some(customer) = tables.customers.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(phone) = update.phone {
            customer.phone = phone;
        }
        if let Some(city) = update.city {
            customer.city = Some(city);
        }
        Ok(Some(customer.clone()))
    }

    async fn delete_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        Ok(self.tables.write().await.customers.remove(&id))
    }

    async fn list_customers(&self, limit: usize) -> Result<Vec<Customer>> {
        let tables = self.tables.read().await;
        Ok(tables.customers.values().take(limit).cloned().collect())
    }

    async fn search_customers_by_city(&self, city: &str, limit: usize) -> Result<Vec<Customer>> {
        let tables = self.tables.read().await;
        Ok(tables
            .customers
            .values()
            .filter(|c| c.city.as_deref() == Some(city))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrderGateway for InMemoryStore {
    async fn create_order(&self, customer_id: CustomerId, total_amount: Money) -> Result<Order> {
        let mut tables = self.tables.write().await;
        tables.trip(StoreOp::CreateOrder)?;

        let id = OrderId::new(tables.next_id());
        let row = Order {
            id,
            customer_id,
            total_amount,
            status: OrderStatus::Placed,
            created_at: Utc::now(),
        };
        tables.orders.insert(id, row.clone());
        Ok(row)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>> {
        let mut tables = self.tables.write().await;
        tables.trip(StoreOp::UpdateOrder)?;

        let Some(order) = tables.orders.get_mut(&id) else {
            return Ok(None);
        };
        order.status = status;
        Ok(Some(order.clone()))
    }

    async fn create_lines(
        &self,
        order_id: OrderId,
        lines: Vec<NewOrderLine>,
    ) -> Result<Vec<OrderLine>> {
        let mut tables = self.tables.write().await;
        tables.trip(StoreOp::CreateLines)?;

        let rows: Vec<OrderLine> = lines
            .into_iter()
            .map(|line| OrderLine {
                order_id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
            .collect();
        tables.lines.extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn get_lines(&self, order_id: OrderId) -> Result<Vec<OrderLineDetail>> {
        let mut tables = self.tables.write().await;
        tables.trip(StoreOp::GetLines)?;
        Ok(tables
            .lines
            .iter()
            .filter(|line| line.order_id == order_id)
            .map(|line| line.with_product(tables.products.get(&line.product_id)))
            .collect())
    }

    async fn list_orders_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn sales_aggregate(&self, range: DateRange) -> Result<SalesAggregate> {
        let tables = self.tables.read().await;
        let completed = tables
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::Completed && range.contains(o.created_at));

        let mut aggregate = SalesAggregate::default();
        for order in completed {
            aggregate.total_revenue = aggregate
                .total_revenue
                .checked_add(order.total_amount)
                .ok_or_else(|| StoreError::Corrupt("sales revenue overflows".to_string()))?;
            aggregate.total_orders += 1;
        }
        Ok(aggregate)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryStore {
    async fn create_payment(&self, order_id: OrderId, amount: Money) -> Result<Payment> {
        let mut tables = self.tables.write().await;
        tables.trip(StoreOp::CreatePayment)?;

        if tables.payments.contains_key(&order_id) {
            return Err(StoreError::UniqueViolation {
                constraint: "payments_order_id_key".to_string(),
            });
        }

        let row = Payment {
            id: PaymentId::new(tables.next_id()),
            order_id,
            amount,
            status: PaymentStatus::Pending,
            method: None,
            paid_at: None,
        };
        tables.payments.insert(order_id, row.clone());
        Ok(row)
    }

    async fn get_payment_by_order(&self, order_id: OrderId) -> Result<Option<Payment>> {
        Ok(self.tables.read().await.payments.get(&order_id).cloned())
    }

    async fn update_payment_by_order(
        &self,
        order_id: OrderId,
        update: PaymentUpdate,
    ) -> Result<Option<Payment>> {
        let mut tables = self.tables.write().await;
        tables.trip(StoreOp::UpdatePayment)?;

        let Some(payment) = tables.payments.get_mut(&order_id) else {
            return Ok(None);
        };
        payment.status = update.status;
        if update.method.is_some() {
            payment.method = update.method;
        }
        if update.paid_at.is_some() {
            payment.paid_at = update.paid_at;
        }
        Ok(Some(payment.clone()))
    }
}

#[async_trait]
impl JournalGateway for InMemoryStore {
    async fn append_journal(&self, entry: JournalEntry) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.trip(StoreOp::AppendJournal)?;
        tables.journal.push(entry);
        Ok(())
    }

    async fn journal_for_run(&self, run_id: Uuid) -> Result<Vec<JournalEntry>> {
        let tables = self.tables.read().await;
        let mut entries: Vec<_> = tables
            .journal
            .iter()
            .filter(|e| e.run_id == run_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.sequence);
        Ok(entries)
    }

    async fn journal_entries(&self) -> Result<Vec<JournalEntry>> {
        Ok(self.tables.read().await.journal.clone())
    }

    async fn journal_entries_without(&self, event_types: &[&str]) -> Result<Vec<JournalEntry>> {
        let tables = self.tables.read().await;
        let closed: HashSet<Uuid> = tables
            .journal
            .iter()
            .filter(|e| event_types.contains(&e.event_type.as_str()))
            .map(|e| e.run_id)
            .collect();
        Ok(tables
            .journal
            .iter()
            .filter(|e| !closed.contains(&e.run_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(sku: &str) -> NewProduct {
        NewProduct {
            name: "Widget".to_string(),
            sku: sku.to_string(),
            price: Money::from_cents(500),
            stock: 10,
            category: Some("tools".to_string()),
        }
    }

    fn alice() -> NewCustomer {
        NewCustomer {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            phone: "555-0100".to_string(),
            city: Some("Lisbon".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_product() {
        let store = InMemoryStore::new();
        let created = store.create_product(widget("SKU-1")).await.unwrap();

        let by_id = store.get_product(created.id).await.unwrap().unwrap();
        let by_sku = store.get_product_by_sku("SKU-1").await.unwrap().unwrap();
        assert_eq!(by_id, created);
        assert_eq!(by_sku, created);
        assert!(store.get_product_by_sku("SKU-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let store = InMemoryStore::new();
        store.create_product(widget("SKU-1")).await.unwrap();

        let result = store.create_product(widget("SKU-1")).await;
        assert!(matches!(result, Err(StoreError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn test_update_missing_product_returns_none() {
        let store = InMemoryStore::new();
        let result = store
            .update_product(ProductId::new(99), ProductUpdate::stock(1))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_list_products_by_category() {
        let store = InMemoryStore::new();
        store.create_product(widget("SKU-1")).await.unwrap();
        let mut other = widget("SKU-2");
        other.category = None;
        store.create_product(other).await.unwrap();

        let all = store.list_products(ProductFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let tools = store
            .list_products(ProductFilter::limit(10).category("tools"))
            .await
            .unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].sku, "SKU-1");
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = InMemoryStore::new();
        store.create_customer(alice()).await.unwrap();
        let result = store.create_customer(alice()).await;
        assert!(matches!(result, Err(StoreError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn test_lines_are_joined_with_product() {
        let store = InMemoryStore::new();
        let customer = store.create_customer(alice()).await.unwrap();
        let product = store.create_product(widget("SKU-1")).await.unwrap();
        let order = store
            .create_order(customer.id, Money::from_cents(1000))
            .await
            .unwrap();

        store
            .create_lines(
                order.id,
                vec![NewOrderLine {
                    product_id: product.id,
                    quantity: 2,
                    unit_price: product.price,
                }],
            )
            .await
            .unwrap();

        let lines = store.get_lines(order.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].sku, "SKU-1");
        assert_eq!(lines[0].product_name, "Widget");
        assert_eq!(lines[0].line_total(), Some(Money::from_cents(1000)));
    }

    #[tokio::test]
    async fn test_orders_listed_newest_first() {
        let store = InMemoryStore::new();
        let customer = store.create_customer(alice()).await.unwrap();
        let first = store
            .create_order(customer.id, Money::from_cents(100))
            .await
            .unwrap();
        let second = store
            .create_order(customer.id, Money::from_cents(200))
            .await
            .unwrap();
        store
            .backdate_order(first.id, Utc::now() - chrono::Duration::days(1))
            .await;

        let orders = store.list_orders_by_customer(customer.id).await.unwrap();
        assert_eq!(
            orders.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
    }

    #[tokio::test]
    async fn test_one_payment_per_order() {
        let store = InMemoryStore::new();
        let order_id = OrderId::new(1);
        let payment = store
            .create_payment(order_id, Money::from_cents(100))
            .await
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);

        let result = store.create_payment(order_id, Money::from_cents(100)).await;
        assert!(matches!(result, Err(StoreError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn test_fault_injection_after_successes() {
        let store = InMemoryStore::new();
        let product = store.create_product(widget("SKU-1")).await.unwrap();
        store.fail_on(StoreOp::UpdateProduct, 1).await;

        store
            .update_product(product.id, ProductUpdate::stock(5))
            .await
            .unwrap();
        let result = store
            .update_product(product.id, ProductUpdate::stock(4))
            .await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));

        store.clear_faults().await;
        let product = store.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(product.stock, 5);
    }

    #[tokio::test]
    async fn test_sales_aggregate_counts_completed_in_range() {
        let store = InMemoryStore::new();
        let customer = store.create_customer(alice()).await.unwrap();
        let done = store
            .create_order(customer.id, Money::from_cents(1500))
            .await
            .unwrap();
        store
            .update_order_status(done.id, OrderStatus::Completed)
            .await
            .unwrap();
        store
            .create_order(customer.id, Money::from_cents(900))
            .await
            .unwrap();

        let today = Utc::now().date_naive();
        let aggregate = store
            .sales_aggregate(DateRange {
                start: today,
                end: today,
            })
            .await
            .unwrap();
        assert_eq!(aggregate.total_orders, 1);
        assert_eq!(aggregate.total_revenue, Money::from_cents(1500));
    }

    #[tokio::test]
    async fn test_sales_aggregate_reports_revenue_overflow() {
        let store = InMemoryStore::new();
        let customer = store.create_customer(alice()).await.unwrap();
        for _ in 0..2 {
            let order = store
                .create_order(customer.id, Money::from_cents(i64::MAX - 1))
                .await
                .unwrap();
            store
                .update_order_status(order.id, OrderStatus::Completed)
                .await
                .unwrap();
        }

        let today = Utc::now().date_naive();
        let result = store
            .sales_aggregate(DateRange {
                start: today,
                end: today,
            })
            .await;
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }

    #[tokio::test]
    async fn test_journal_entries_without_closed_runs() {
        let store = InMemoryStore::new();
        let closed = Uuid::new_v4();
        let open = Uuid::new_v4();
        for (run_id, sequence, event_type) in [
            (closed, 1, "RunStarted"),
            (open, 1, "RunStarted"),
            (closed, 2, "RunCompleted"),
            (open, 2, "StepCompleted"),
        ] {
            store
                .append_journal(JournalEntry {
                    run_id,
                    sequence,
                    event_type: event_type.to_string(),
                    payload: serde_json::Value::Null,
                    recorded_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        let entries = store
            .journal_entries_without(&["RunCompleted", "RunAborted"])
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.run_id == open));
        assert_eq!(entries[1].event_type, "StepCompleted");
    }
}

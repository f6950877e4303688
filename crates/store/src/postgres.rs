use async_trait::async_trait;
use common::{CustomerId, Money, OrderId, OrderStatus, PaymentId, PaymentStatus, ProductId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Customer, CustomerGateway, CustomerUpdate, DateRange, JournalEntry, JournalGateway,
    NewCustomer, NewOrderLine, NewProduct, Order, OrderGateway, OrderLine, OrderLineDetail,
    Payment, PaymentGateway, PaymentUpdate, Product, ProductFilter, ProductGateway, ProductUpdate,
    Result, SalesAggregate, StoreError,
};

const PRODUCT_COLUMNS: &str = "prod_id, name, sku, price_cents, stock, category";
const CUSTOMER_COLUMNS: &str = "cust_id, name, email, phone, city";
const ORDER_COLUMNS: &str = "order_id, cust_id, total_cents, status, order_date";
const PAYMENT_COLUMNS: &str = "payment_id, order_id, amount_cents, status, method, paid_at";

/// PostgreSQL-backed gateways.
///
/// Every write uses `RETURNING` so the written row comes back from the same
/// statement.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get("prod_id")?),
            name: row.try_get("name")?,
            sku: row.try_get("sku")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: to_u32(row.try_get("stock")?, "stock")?,
            category: row.try_get("category")?,
        })
    }

    fn row_to_customer(row: PgRow) -> Result<Customer> {
        Ok(Customer {
            id: CustomerId::new(row.try_get("cust_id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            city: row.try_get("city")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        Ok(Order {
            id: OrderId::new(row.try_get("order_id")?),
            customer_id: CustomerId::new(row.try_get("cust_id")?),
            total_amount: Money::from_cents(row.try_get("total_cents")?),
            status: status
                .parse::<OrderStatus>()
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            created_at: row.try_get("order_date")?,
        })
    }

    fn row_to_payment(row: PgRow) -> Result<Payment> {
        let status: String = row.try_get("status")?;
        Ok(Payment {
            id: PaymentId::new(row.try_get("payment_id")?),
            order_id: OrderId::new(row.try_get("order_id")?),
            amount: Money::from_cents(row.try_get("amount_cents")?),
            status: status
                .parse::<PaymentStatus>()
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            method: row.try_get("method")?,
            paid_at: row.try_get("paid_at")?,
        })
    }

    fn row_to_journal(row: PgRow) -> Result<JournalEntry> {
        Ok(JournalEntry {
            run_id: row.try_get("run_id")?,
            sequence: row.try_get("sequence")?,
            event_type: row.try_get("event_type")?,
            payload: row.try_get("payload")?,
            recorded_at: row.try_get("recorded_at")?,
        })
    }
}

fn to_u32(value: i32, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {column}: {value}")))
}

fn to_i32(value: u32) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| StoreError::Corrupt(format!("{value} exceeds the INTEGER column range")))
}

/// Maps unique-constraint failures to `UniqueViolation`.
fn map_write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return StoreError::UniqueViolation {
            constraint: db_err.constraint().unwrap_or("unknown").to_string(),
        };
    }
    StoreError::Database(e)
}

fn limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl ProductGateway for PostgresStore {
    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        let row = sqlx::query(&format!(
            "INSERT INTO products (name, sku, price_cents, stock, category)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.price.cents())
        .bind(to_i32(product.stock)?)
        .bind(&product.category)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Self::row_to_product(row)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE prod_id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn get_product_by_sku(&self, sku: &str) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = $1"
        ))
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Option<Product>> {
        let stock = update.stock.map(to_i32).transpose()?;
        let row = sqlx::query(&format!(
            "UPDATE products SET
                name = COALESCE($2, name),
                price_cents = COALESCE($3, price_cents),
                stock = COALESCE($4, stock),
                category = COALESCE($5, category)
             WHERE prod_id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(update.name)
        .bind(update.price.map(|p| p.cents()))
        .bind(stock)
        .bind(update.category)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE ($1::TEXT IS NULL OR category = $1)
             ORDER BY prod_id ASC
             LIMIT $2"
        ))
        .bind(filter.category)
        .bind(limit(filter.limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }
}

#[async_trait]
impl CustomerGateway for PostgresStore {
    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer> {
        let row = sqlx::query(&format!(
            "INSERT INTO customers (name, email, phone, city)
             VALUES ($1, $2, $3, $4)
             RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.city)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Self::row_to_customer(row)
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE cust_id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_customer).transpose()
    }

    async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_customer).transpose()
    }

    async fn update_customer(
        &self,
        id: CustomerId,
        update: CustomerUpdate,
    ) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "UPDATE customers SET
                phone = COALESCE($2, phone),
                city = COALESCE($3, city)
             WHERE cust_id = $1
             RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(update.phone)
        .bind(update.city)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_customer).transpose()
    }

    async fn delete_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "DELETE FROM customers WHERE cust_id = $1 RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_customer).transpose()
    }

    async fn list_customers(&self, max: usize) -> Result<Vec<Customer>> {
        let rows = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY cust_id ASC LIMIT $1"
        ))
        .bind(limit(max))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_customer).collect()
    }

    async fn search_customers_by_city(&self, city: &str, max: usize) -> Result<Vec<Customer>> {
        let rows = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers
             WHERE city = $1
             ORDER BY cust_id ASC
             LIMIT $2"
        ))
        .bind(city)
        .bind(limit(max))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_customer).collect()
    }
}

#[async_trait]
impl OrderGateway for PostgresStore {
    async fn create_order(&self, customer_id: CustomerId, total_amount: Money) -> Result<Order> {
        let row = sqlx::query(&format!(
            "INSERT INTO orders (cust_id, total_cents, status)
             VALUES ($1, $2, $3)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(customer_id.as_i64())
        .bind(total_amount.cents())
        .bind(OrderStatus::Placed.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Self::row_to_order(row)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "UPDATE orders SET status = $2 WHERE order_id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn create_lines(
        &self,
        order_id: OrderId,
        lines: Vec<NewOrderLine>,
    ) -> Result<Vec<OrderLine>> {
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let product_ids: Vec<i64> = lines.iter().map(|l| l.product_id.as_i64()).collect();
        let quantities = lines
            .iter()
            .map(|l| to_i32(l.quantity))
            .collect::<Result<Vec<i32>>>()?;
        let prices: Vec<i64> = lines.iter().map(|l| l.unit_price.cents()).collect();

        // One multi-row insert so the lines land together.
        let rows = sqlx::query(
            r#"
            INSERT INTO order_items (order_id, prod_id, quantity, price_cents)
            SELECT $1, prod_id, quantity, price_cents
            FROM UNNEST($2::BIGINT[], $3::INTEGER[], $4::BIGINT[])
                AS t(prod_id, quantity, price_cents)
            RETURNING order_id, prod_id, quantity, price_cents
            "#,
        )
        .bind(order_id.as_i64())
        .bind(&product_ids)
        .bind(&quantities)
        .bind(&prices)
        .fetch_all(&self.pool)
        .await
        .map_err(map_write_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(OrderLine {
                    order_id: OrderId::new(row.try_get("order_id")?),
                    product_id: ProductId::new(row.try_get("prod_id")?),
                    quantity: to_u32(row.try_get("quantity")?, "quantity")?,
                    unit_price: Money::from_cents(row.try_get("price_cents")?),
                })
            })
            .collect()
    }

    async fn get_lines(&self, order_id: OrderId) -> Result<Vec<OrderLineDetail>> {
        let rows = sqlx::query(
            r#"
            SELECT i.order_id, i.prod_id, i.quantity, i.price_cents, p.name, p.sku
            FROM order_items i
            JOIN products p ON p.prod_id = i.prod_id
            WHERE i.order_id = $1
            ORDER BY i.item_id ASC
            "#,
        )
        .bind(order_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(OrderLineDetail {
                    order_id: OrderId::new(row.try_get("order_id")?),
                    product_id: ProductId::new(row.try_get("prod_id")?),
                    quantity: to_u32(row.try_get("quantity")?, "quantity")?,
                    unit_price: Money::from_cents(row.try_get("price_cents")?),
                    product_name: row.try_get("name")?,
                    sku: row.try_get("sku")?,
                })
            })
            .collect()
    }

    async fn list_orders_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE cust_id = $1
             ORDER BY order_date DESC, order_id DESC"
        ))
        .bind(customer_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn sales_aggregate(&self, range: DateRange) -> Result<SalesAggregate> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(total_cents), 0)::BIGINT AS total_revenue,
                   COUNT(*) AS total_orders
            FROM orders
            WHERE status = $1
              AND (order_date AT TIME ZONE 'UTC')::DATE BETWEEN $2 AND $3
            "#,
        )
        .bind(OrderStatus::Completed.as_str())
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await?;

        Ok(SalesAggregate {
            total_revenue: Money::from_cents(row.try_get("total_revenue")?),
            total_orders: row.try_get("total_orders")?,
        })
    }
}

#[async_trait]
impl PaymentGateway for PostgresStore {
    async fn create_payment(&self, order_id: OrderId, amount: Money) -> Result<Payment> {
        let row = sqlx::query(&format!(
            "INSERT INTO payments (order_id, amount_cents, status)
             VALUES ($1, $2, $3)
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(order_id.as_i64())
        .bind(amount.cents())
        .bind(PaymentStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Self::row_to_payment(row)
    }

    async fn get_payment_by_order(&self, order_id: OrderId) -> Result<Option<Payment>> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1"
        ))
        .bind(order_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_payment).transpose()
    }

    async fn update_payment_by_order(
        &self,
        order_id: OrderId,
        update: PaymentUpdate,
    ) -> Result<Option<Payment>> {
        let row = sqlx::query(&format!(
            "UPDATE payments SET
                status = $2,
                method = COALESCE($3, method),
                paid_at = COALESCE($4, paid_at)
             WHERE order_id = $1
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(order_id.as_i64())
        .bind(update.status.as_str())
        .bind(update.method)
        .bind(update.paid_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_payment).transpose()
    }
}

#[async_trait]
impl JournalGateway for PostgresStore {
    async fn append_journal(&self, entry: JournalEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO workflow_journal (run_id, sequence, event_type, payload, recorded_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.run_id)
        .bind(entry.sequence)
        .bind(&entry.event_type)
        .bind(&entry.payload)
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    async fn journal_for_run(&self, run_id: Uuid) -> Result<Vec<JournalEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT run_id, sequence, event_type, payload, recorded_at
            FROM workflow_journal
            WHERE run_id = $1
            ORDER BY sequence ASC
            "#,
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_journal).collect()
    }

    async fn journal_entries(&self) -> Result<Vec<JournalEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT run_id, sequence, event_type, payload, recorded_at
            FROM workflow_journal
            ORDER BY entry_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_journal).collect()
    }

    async fn journal_entries_without(&self, event_types: &[&str]) -> Result<Vec<JournalEntry>> {
        let event_types: Vec<String> = event_types.iter().map(|t| t.to_string()).collect();
        let rows = sqlx::query(
            r#"
            SELECT j.run_id, j.sequence, j.event_type, j.payload, j.recorded_at
            FROM workflow_journal j
            WHERE NOT EXISTS (
                SELECT 1 FROM workflow_journal closed
                WHERE closed.run_id = j.run_id
                  AND closed.event_type = ANY($1)
            )
            ORDER BY j.entry_id ASC
            "#,
        )
        .bind(&event_types)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_journal).collect()
    }
}

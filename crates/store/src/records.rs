//! Typed rows exchanged with the gateways.

use chrono::{DateTime, NaiveDate, Utc};
use common::{CustomerId, Money, OrderId, OrderStatus, PaymentId, PaymentStatus, ProductId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unique stock-keeping unit.
    pub sku: String,
    pub price: Money,
    pub stock: u32,
    pub category: Option<String>,
}

/// Fields for inserting a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    /// Read from requests as a decimal amount (`"5.00"` or `5.0`).
    #[serde(deserialize_with = "common::money::deserialize_decimal")]
    pub price: Money,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub category: Option<String>,
}

/// Partial product update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<u32>,
    pub category: Option<String>,
}

impl ProductUpdate {
    /// An update that only sets the stock level.
    pub fn stock(stock: u32) -> Self {
        Self {
            stock: Some(stock),
            ..Default::default()
        }
    }
}

/// Filter for listing products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFilter {
    pub limit: usize,
    pub category: Option<String>,
}

impl ProductFilter {
    /// Lists up to `limit` products of any category.
    pub fn limit(limit: usize) -> Self {
        Self {
            limit,
            category: None,
        }
    }

    /// Restricts the listing to one category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self::limit(100)
    }
}

/// A customer row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    /// Unique contact email.
    pub email: String,
    pub phone: String,
    pub city: Option<String>,
}

/// Fields for inserting a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub city: Option<String>,
}

/// Partial customer update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerUpdate {
    pub phone: Option<String>,
    pub city: Option<String>,
}

/// An order header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    /// Sum of line price x quantity at placement; never recomputed.
    pub total_amount: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// A line to persist under an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Price captured when the order was placed.
    pub unit_price: Money,
}

/// A persisted order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    /// Joins the line with its product's name and SKU. A missing product
    /// leaves both empty.
    pub fn with_product(&self, product: Option<&Product>) -> OrderLineDetail {
        OrderLineDetail {
            order_id: self.order_id,
            product_id: self.product_id,
            quantity: self.quantity,
            unit_price: self.unit_price,
            product_name: product.map(|p| p.name.clone()).unwrap_or_default(),
            sku: product.map(|p| p.sku.clone()).unwrap_or_default(),
        }
    }
}

/// An order line joined with the product's name and SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineDetail {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub product_name: String,
    pub sku: String,
}

impl OrderLineDetail {
    /// Returns unit price x quantity, or `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }
}

/// A payment row. Exactly one exists per order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub amount: Money,
    pub status: PaymentStatus,
    /// Set only once the payment is PAID.
    pub method: Option<String>,
    /// Set only once the payment is PAID.
    pub paid_at: Option<DateTime<Utc>>,
}

/// Status change for a payment, located by its order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentUpdate {
    pub status: PaymentStatus,
    pub method: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentUpdate {
    /// Marks the payment paid with the given method.
    pub fn paid(method: impl Into<String>, paid_at: DateTime<Utc>) -> Self {
        Self {
            status: PaymentStatus::Paid,
            method: Some(method.into()),
            paid_at: Some(paid_at),
        }
    }

    /// Marks the payment refunded.
    pub fn refunded() -> Self {
        Self {
            status: PaymentStatus::Refunded,
            method: None,
            paid_at: None,
        }
    }
}

/// Pre-aggregated revenue over completed orders in a date range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesAggregate {
    pub total_revenue: Money,
    pub total_orders: i64,
}

/// Inclusive date range for the sales aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.start <= day && day <= self.end
    }
}

/// One append-only record of the workflow journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// The workflow run this entry belongs to.
    pub run_id: Uuid,
    /// Position within the run, starting at 1.
    pub sequence: i64,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

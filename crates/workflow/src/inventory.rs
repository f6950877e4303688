//! Inventory Guard: stock validation before an order is placed.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use common::{Money, ProductId};
use domain::{DomainError, Result};
use serde::Deserialize;
use store::{Product, ProductGateway};

/// One requested order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl LineRequest {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// A line that passed validation.
///
/// Carries the product as read during validation. The unit price is
/// captured from that snapshot and never re-read.
#[derive(Debug, Clone)]
pub struct ReservedLine {
    pub product: Product,
    pub quantity: u32,
    pub unit_price: Money,
    /// Unit price x quantity.
    pub line_total: Money,
    /// Stock the product should hold once this line is debited. Accounts
    /// for earlier lines of the same request naming the same product.
    pub stock_after: u32,
}

impl ReservedLine {
    pub fn stock_before(&self) -> u32 {
        self.stock_after + self.quantity
    }
}

/// Checks a whole order request against current stock.
///
/// Performs reads only. The check and the later debit are not atomic: a
/// concurrent order can consume the same stock in between.
#[derive(Debug, Clone)]
pub struct InventoryGuard<S: ProductGateway> {
    store: S,
}

impl<S: ProductGateway> InventoryGuard<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Validates every line, failing on the first violation in input order.
    ///
    /// Lines naming the same product are checked against the cumulative
    /// quantity requested so far.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn reserve(&self, lines: &[LineRequest]) -> Result<Vec<ReservedLine>> {
        if lines.is_empty() {
            return Err(DomainError::InvalidInput(
                "An order needs at least one line".to_string(),
            ));
        }

        let mut remaining: HashMap<ProductId, (Product, u32)> = HashMap::new();
        let mut reserved = Vec::with_capacity(lines.len());

        for line in lines {
            if line.quantity == 0 {
                return Err(DomainError::InvalidInput(format!(
                    "Quantity for product {} must be positive",
                    line.product_id
                )));
            }

            let (product, available) = match remaining.entry(line.product_id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let product = self
                        .store
                        .get_product(line.product_id)
                        .await?
                        .ok_or_else(|| DomainError::not_found("Product", line.product_id))?;
                    let stock = product.stock;
                    entry.insert((product, stock))
                }
            };

            if line.quantity > *available {
                tracing::info!(
                    product_id = %line.product_id,
                    requested = line.quantity,
                    available = *available,
                    "insufficient stock"
                );
                return Err(DomainError::InsufficientStock {
                    product_id: line.product_id,
                    name: product.name.clone(),
                    requested: line.quantity,
                    available: *available,
                });
            }

            let line_total = product.price.checked_multiply(line.quantity).ok_or_else(|| {
                DomainError::InvalidInput(format!(
                    "Line total for product '{}' (ID: {}) overflows: {} x {}",
                    product.name, line.product_id, line.quantity, product.price
                ))
            })?;

            *available -= line.quantity;
            reserved.push(ReservedLine {
                product: product.clone(),
                quantity: line.quantity,
                unit_price: product.price,
                line_total,
                stock_after: *available,
            });
        }

        Ok(reserved)
    }
}

/// Sums the line totals of a reservation.
///
/// Fails with `InvalidInput` naming the product whose line pushes the
/// total past the representable range.
pub fn order_total(lines: &[ReservedLine]) -> Result<Money> {
    lines.iter().try_fold(Money::zero(), |total, line| {
        total.checked_add(line.line_total).ok_or_else(|| {
            DomainError::InvalidInput(format!(
                "Order total overflows at product '{}' (ID: {})",
                line.product.name, line.product.id
            ))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{InMemoryStore, NewProduct, StoreOp};

    async fn seed(store: &InMemoryStore, sku: &str, price: i64, stock: u32) -> Product {
        store
            .create_product(NewProduct {
                name: format!("Product {sku}"),
                sku: sku.to_string(),
                price: Money::from_cents(price),
                stock,
                category: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_reserve_captures_price_and_stock() {
        let store = InMemoryStore::new();
        let widget = seed(&store, "W", 500, 10).await;
        let guard = InventoryGuard::new(store);

        let reserved = guard
            .reserve(&[LineRequest::new(widget.id, 3)])
            .await
            .unwrap();

        assert_eq!(reserved.len(), 1);
        assert_eq!(reserved[0].unit_price, Money::from_cents(500));
        assert_eq!(reserved[0].line_total, Money::from_cents(1500));
        assert_eq!(reserved[0].stock_before(), 10);
        assert_eq!(reserved[0].stock_after, 7);
    }

    #[tokio::test]
    async fn test_exact_stock_is_allowed() {
        let store = InMemoryStore::new();
        let widget = seed(&store, "W", 500, 4).await;
        let guard = InventoryGuard::new(store);

        let reserved = guard
            .reserve(&[LineRequest::new(widget.id, 4)])
            .await
            .unwrap();
        assert_eq!(reserved[0].stock_after, 0);
    }

    #[tokio::test]
    async fn test_insufficient_stock_reports_first_offender() {
        let store = InMemoryStore::new();
        let a = seed(&store, "A", 100, 1).await;
        let b = seed(&store, "B", 100, 1).await;
        let guard = InventoryGuard::new(store);

        let result = guard
            .reserve(&[LineRequest::new(a.id, 2), LineRequest::new(b.id, 5)])
            .await;

        match result {
            Err(DomainError::InsufficientStock {
                product_id,
                requested,
                available,
                ..
            }) => {
                assert_eq!(product_id, a.id);
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("expected insufficient stock, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_repeated_product_is_checked_cumulatively() {
        let store = InMemoryStore::new();
        let widget = seed(&store, "W", 100, 5).await;
        let guard = InventoryGuard::new(store);

        let ok = guard
            .reserve(&[LineRequest::new(widget.id, 2), LineRequest::new(widget.id, 3)])
            .await
            .unwrap();
        assert_eq!(ok[0].stock_after, 3);
        assert_eq!(ok[1].stock_after, 0);

        let result = guard
            .reserve(&[LineRequest::new(widget.id, 3), LineRequest::new(widget.id, 3)])
            .await;
        assert!(matches!(
            result,
            Err(DomainError::InsufficientStock { available: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_requests() {
        let store = InMemoryStore::new();
        let widget = seed(&store, "W", 100, 5).await;
        let guard = InventoryGuard::new(store);

        let empty = guard.reserve(&[]).await;
        assert!(matches!(empty, Err(DomainError::InvalidInput(_))));

        let zero = guard.reserve(&[LineRequest::new(widget.id, 0)]).await;
        assert!(matches!(zero, Err(DomainError::InvalidInput(_))));

        let missing = guard
            .reserve(&[LineRequest::new(ProductId::new(999), 1)])
            .await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_store_failure_is_fatal() {
        let store = InMemoryStore::new();
        let widget = seed(&store, "W", 100, 5).await;
        store.fail_on(StoreOp::GetProduct, 0).await;
        let guard = InventoryGuard::new(store);

        let result = guard.reserve(&[LineRequest::new(widget.id, 1)]).await;
        assert!(matches!(result, Err(DomainError::Fatal(_))));
    }

    #[tokio::test]
    async fn test_line_total_overflow_is_invalid_input() {
        let store = InMemoryStore::new();
        let pricey = seed(&store, "GOLD", 4_000_000_000_000_000_000, 10).await;
        let guard = InventoryGuard::new(store);

        let result = guard.reserve(&[LineRequest::new(pricey.id, 3)]).await;
        match result {
            Err(DomainError::InvalidInput(msg)) => {
                assert!(msg.contains("Product GOLD"));
                assert!(msg.contains(&pricey.id.to_string()));
            }
            other => panic!("expected invalid input, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_order_total_overflow_is_invalid_input() {
        let store = InMemoryStore::new();
        let a = seed(&store, "A", 4_000_000_000_000_000_000, 10).await;
        let b = seed(&store, "B", 4_000_000_000_000_000_000, 10).await;
        let guard = InventoryGuard::new(store);

        let ok = guard
            .reserve(&[LineRequest::new(a.id, 2)])
            .await
            .unwrap();
        assert_eq!(
            order_total(&ok).unwrap(),
            Money::from_cents(8_000_000_000_000_000_000)
        );

        let both = guard
            .reserve(&[LineRequest::new(a.id, 2), LineRequest::new(b.id, 1)])
            .await
            .unwrap();
        match order_total(&both) {
            Err(DomainError::InvalidInput(msg)) => assert!(msg.contains("Product B")),
            other => panic!("expected invalid input, got {other:?}"),
        }
    }
}

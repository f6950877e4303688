//! Product administration.

use common::ProductId;
use store::{NewProduct, Product, ProductFilter, ProductGateway, ProductUpdate};

use crate::error::{DomainError, Result};

/// Default stock level at or below which a product counts as low.
pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 5;

/// Upper bound on products scanned by [`ProductService::low_stock`].
const LOW_STOCK_SCAN_LIMIT: usize = 1000;

/// Service for managing the product catalogue.
pub struct ProductService<S: ProductGateway> {
    store: S,
}

impl<S: ProductGateway> ProductService<S> {
    /// Creates a new product service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Validates and adds a new product.
    #[tracing::instrument(skip(self, product), fields(sku = %product.sku))]
    pub async fn add_product(&self, product: NewProduct) -> Result<Product> {
        if !product.price.is_positive() {
            return Err(DomainError::InvalidInput(format!(
                "Price must be a positive number, got {}",
                product.price
            )));
        }
        if product.sku.trim().is_empty() {
            return Err(DomainError::InvalidInput("SKU must not be empty".to_string()));
        }
        if product.name.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "Product name must not be empty".to_string(),
            ));
        }
        if self.store.get_product_by_sku(&product.sku).await?.is_some() {
            return Err(DomainError::Conflict(format!(
                "Product with SKU '{}' already exists",
                product.sku
            )));
        }

        let created = self.store.create_product(product).await?;
        tracing::info!(product_id = %created.id, "product added");
        Ok(created)
    }

    /// Increases the stock of an existing product by `delta`.
    #[tracing::instrument(skip(self))]
    pub async fn restock_product(&self, id: ProductId, delta: u32) -> Result<Product> {
        if delta == 0 {
            return Err(DomainError::InvalidInput(
                "Restock quantity (delta) must be positive".to_string(),
            ));
        }

        let product = self.get_product(id).await?;
        let stock = product.stock.checked_add(delta).ok_or_else(|| {
            DomainError::InvalidInput(format!(
                "Restocking product {id} by {delta} overflows its stock of {}",
                product.stock
            ))
        })?;

        self.store
            .update_product(id, ProductUpdate::stock(stock))
            .await?
            .ok_or_else(|| DomainError::not_found("Product", id))
    }

    /// Loads a product by id.
    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", id))
    }

    /// Lists products, optionally restricted to a category.
    pub async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>> {
        Ok(self.store.list_products(filter).await?)
    }

    /// Returns products whose stock is at or below `threshold`.
    pub async fn low_stock(&self, threshold: u32) -> Result<Vec<Product>> {
        let products = self
            .store
            .list_products(ProductFilter::limit(LOW_STOCK_SCAN_LIMIT))
            .await?;
        Ok(products
            .into_iter()
            .filter(|p| p.stock <= threshold)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use store::InMemoryStore;

    fn widget(sku: &str, stock: u32) -> NewProduct {
        NewProduct {
            name: "Widget".to_string(),
            sku: sku.to_string(),
            price: Money::from_cents(500),
            stock,
            category: None,
        }
    }

    #[tokio::test]
    async fn test_add_product_rejects_non_positive_price() {
        let service = ProductService::new(InMemoryStore::new());
        let mut product = widget("SKU-1", 1);
        product.price = Money::zero();

        let result = service.add_product(product).await;
        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_add_product_rejects_duplicate_sku() {
        let service = ProductService::new(InMemoryStore::new());
        service.add_product(widget("SKU-1", 1)).await.unwrap();

        let result = service.add_product(widget("SKU-1", 2)).await;
        match result {
            Err(DomainError::Conflict(msg)) => assert!(msg.contains("SKU-1")),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_restock_adds_delta() {
        let service = ProductService::new(InMemoryStore::new());
        let product = service.add_product(widget("SKU-1", 4)).await.unwrap();

        let restocked = service.restock_product(product.id, 6).await.unwrap();
        assert_eq!(restocked.stock, 10);
    }

    #[tokio::test]
    async fn test_restock_validation() {
        let service = ProductService::new(InMemoryStore::new());
        let product = service.add_product(widget("SKU-1", 4)).await.unwrap();

        let zero = service.restock_product(product.id, 0).await;
        assert!(matches!(zero, Err(DomainError::InvalidInput(_))));

        let missing = service.restock_product(ProductId::new(999), 1).await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_low_stock_is_inclusive() {
        let service = ProductService::new(InMemoryStore::new());
        service.add_product(widget("SKU-1", 5)).await.unwrap();
        service.add_product(widget("SKU-2", 6)).await.unwrap();
        service.add_product(widget("SKU-3", 0)).await.unwrap();

        let low = service
            .low_stock(DEFAULT_LOW_STOCK_THRESHOLD)
            .await
            .unwrap();
        let skus: Vec<_> = low.iter().map(|p| p.sku.as_str()).collect();
        assert_eq!(skus, vec!["SKU-1", "SKU-3"]);
    }
}

//! Product catalogue endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::ProductId;
use domain::DEFAULT_LOW_STOCK_THRESHOLD;
use serde::Deserialize;
use store::{NewProduct, Product, ProductFilter, RetailStore};

use crate::error::ApiError;
use crate::routes::parse_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LowStockQuery {
    pub threshold: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RestockRequest {
    pub quantity: u32,
}

/// POST /products: add a product to the catalogue.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: RetailStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.products.add_product(req).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /products: list products, optionally by category.
#[tracing::instrument(skip(state))]
pub async fn list<S: RetailStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let mut filter = ProductFilter::default();
    if let Some(limit) = query.limit {
        filter = ProductFilter::limit(limit);
    }
    if let Some(category) = query.category.filter(|c| !c.is_empty()) {
        filter = filter.category(category);
    }
    Ok(Json(state.products.list_products(filter).await?))
}

/// GET /products/:id: load one product.
#[tracing::instrument(skip(state))]
pub async fn get<S: RetailStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let id: ProductId = parse_id(&id)?;
    Ok(Json(state.products.get_product(id).await?))
}

/// POST /products/:id/restock: add stock to a product.
#[tracing::instrument(skip(state, req))]
pub async fn restock<S: RetailStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<RestockRequest>,
) -> Result<Json<Product>, ApiError> {
    let id: ProductId = parse_id(&id)?;
    Ok(Json(state.products.restock_product(id, req.quantity).await?))
}

/// GET /products/low-stock: products at or below a stock threshold.
#[tracing::instrument(skip(state))]
pub async fn low_stock<S: RetailStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<LowStockQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    Ok(Json(state.products.low_stock(threshold).await?))
}

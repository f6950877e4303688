//! Customer administration endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::CustomerId;
use serde::Deserialize;
use store::{Customer, NewCustomer, Order, RetailStore};

use crate::error::ApiError;
use crate::routes::parse_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub email: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCustomerRequest {
    pub phone: Option<String>,
    pub city: Option<String>,
}

/// POST /customers: register a customer.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: RetailStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<NewCustomer>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    let customer = state.customers.add_customer(req).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// GET /customers: list customers.
#[tracing::instrument(skip(state))]
pub async fn list<S: RetailStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    Ok(Json(state.customers.list_customers().await?))
}

/// GET /customers/search: find customers by email or city.
#[tracing::instrument(skip(state))]
pub async fn search<S: RetailStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    let found = state
        .customers
        .find_customers(query.email.as_deref(), query.city.as_deref())
        .await?;
    Ok(Json(found))
}

/// GET /customers/:id: load one customer.
#[tracing::instrument(skip(state))]
pub async fn get<S: RetailStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Customer>, ApiError> {
    let id: CustomerId = parse_id(&id)?;
    Ok(Json(state.customers.get_customer(id).await?))
}

/// PATCH /customers/:id: update phone and/or city.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: RetailStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCustomerRequest>,
) -> Result<Json<Customer>, ApiError> {
    let id: CustomerId = parse_id(&id)?;
    let updated = state
        .customers
        .update_customer_details(id, req.phone, req.city)
        .await?;
    Ok(Json(updated))
}

/// DELETE /customers/:id: remove a customer without orders.
#[tracing::instrument(skip(state))]
pub async fn delete<S: RetailStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Customer>, ApiError> {
    let id: CustomerId = parse_id(&id)?;
    Ok(Json(state.customers.delete_customer(id).await?))
}

/// GET /customers/:id/orders: a customer's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn orders<S: RetailStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let id: CustomerId = parse_id(&id)?;
    Ok(Json(state.orders.list_orders_for_customer(id).await?))
}

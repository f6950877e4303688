//! Order workflow endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CustomerId, OrderId};
use serde::Deserialize;
use store::{Order, Payment, RetailStore};
use workflow::{LineRequest, OrderDetails};

use crate::error::ApiError;
use crate::routes::parse_id;
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: CustomerId,
    pub lines: Vec<LineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub method: String,
}

// -- Handlers --

/// POST /orders: place an order.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: RetailStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderDetails>), ApiError> {
    let details = state
        .orders
        .create_order(req.customer_id, req.lines)
        .await?;
    Ok((StatusCode::CREATED, Json(details)))
}

/// GET /orders/:id: order with its customer and lines.
#[tracing::instrument(skip(state))]
pub async fn get<S: RetailStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderDetails>, ApiError> {
    let id: OrderId = parse_id(&id)?;
    Ok(Json(state.orders.get_order_details(id).await?))
}

/// POST /orders/:id/cancel: cancel a PLACED order.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: RetailStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let id: OrderId = parse_id(&id)?;
    Ok(Json(state.orders.cancel_order(id).await?))
}

/// POST /orders/:id/payment: pay for an order.
#[tracing::instrument(skip(state, req))]
pub async fn pay<S: RetailStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<Payment>, ApiError> {
    let id: OrderId = parse_id(&id)?;
    Ok(Json(state.payments.process_payment(id, &req.method).await?))
}

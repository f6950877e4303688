//! HTTP command surface for the retail back office.
//!
//! Exposes product and customer administration, the order workflow and
//! reporting as JSON endpoints, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use store::RetailStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: RetailStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health::<S>))
        .route(
            "/products",
            post(routes::products::create::<S>).get(routes::products::list::<S>),
        )
        .route("/products/low-stock", get(routes::products::low_stock::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .route("/products/{id}/restock", post(routes::products::restock::<S>))
        .route(
            "/customers",
            post(routes::customers::create::<S>).get(routes::customers::list::<S>),
        )
        .route("/customers/search", get(routes::customers::search::<S>))
        .route(
            "/customers/{id}",
            get(routes::customers::get::<S>)
                .patch(routes::customers::update::<S>)
                .delete(routes::customers::delete::<S>),
        )
        .route("/customers/{id}/orders", get(routes::customers::orders::<S>))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route("/orders/{id}/payment", post(routes::orders::pay::<S>))
        .route("/reports/sales", get(routes::reports::sales::<S>))
        .route("/workflows/open", get(routes::workflows::open::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state with every service sharing one store.
pub fn create_state<S: RetailStore + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store))
}

//! HTTP API server for the order lifecycle engine.
//!
//! Provides REST endpoints for order transitions, draft editing and catalog
//! maintenance, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use lifecycle::{Catalog, LifecycleEngine};
use metrics_exporter_prometheus::PrometheusHandle;
use store::TransactionalStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<D: TransactionalStore> {
    pub engine: LifecycleEngine<D>,
    pub catalog: Catalog<D>,
}

/// Creates the application state over a store.
pub fn create_state<D: TransactionalStore + Clone>(store: D) -> Arc<AppState<D>> {
    Arc::new(AppState {
        engine: LifecycleEngine::new(store.clone()),
        catalog: Catalog::new(store),
    })
}

/// Registers descriptions for the metrics the engine records.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "order_transitions_total",
        "Committed order status transitions"
    );
    metrics::describe_counter!(
        "order_transition_rejections_total",
        "Order transitions rolled back, by error code"
    );
    metrics::describe_histogram!(
        "order_transition_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent in one transition unit of work"
    );
    metrics::describe_counter!("orders_created_total", "Draft orders created");
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<D: TransactionalStore + Clone + 'static>(
    state: Arc<AppState<D>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::ops::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::ops::health::<D>))
        .route(
            "/orders",
            post(routes::orders::create::<D>).get(routes::orders::list::<D>),
        )
        .route(
            "/orders/{order_no}",
            get(routes::orders::get::<D>)
                .patch(routes::orders::edit::<D>)
                .delete(routes::orders::delete::<D>),
        )
        .route(
            "/orders/{order_no}/complete",
            post(routes::orders::complete::<D>),
        )
        .route(
            "/orders/{order_no}/deliver",
            post(routes::orders::deliver::<D>),
        )
        .route(
            "/orders/{order_no}/revert",
            post(routes::orders::revert::<D>),
        )
        .route(
            "/orders/{order_no}/return",
            post(routes::orders::return_order::<D>),
        )
        .route(
            "/products",
            post(routes::products::register::<D>).get(routes::products::list::<D>),
        )
        .route("/products/{product_code}", get(routes::products::get::<D>))
        .route(
            "/products/{product_code}/restock",
            post(routes::products::restock::<D>),
        )
        .route(
            "/customers",
            post(routes::customers::register::<D>).get(routes::customers::list::<D>),
        )
        .route(
            "/customers/{customer_id}",
            get(routes::customers::get::<D>)
                .patch(routes::customers::update::<D>)
                .delete(routes::customers::delete::<D>),
        )
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

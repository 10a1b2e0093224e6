//! Operational endpoints: health check and Prometheus scrape.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use store::{TransactionalStore, UnitOfWork};

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health
///
/// Opens and rolls back an empty unit of work, so a store that cannot start
/// transactions reports 503.
pub async fn health<D: TransactionalStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
) -> (StatusCode, Json<HealthResponse>) {
    let check = match state.engine.store().begin().await {
        Ok(tx) => tx.rollback().await,
        Err(e) => Err(e),
    };

    match check {
        Ok(()) => (StatusCode::OK, Json(HealthResponse { status: "ok" })),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                }),
            )
        }
    }
}

/// GET /metrics
pub async fn metrics(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
}

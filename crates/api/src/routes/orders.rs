//! Order draft and lifecycle transition endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::OrderNo;
use domain::{NewOrder, Order, OrderEvent, OrderPatch, OrderStatus, ReturnOptions};
use lifecycle::TransitionOutcome;
use serde::{Deserialize, Serialize};
use store::TransactionalStore;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RevertRequest {
    #[serde(default)]
    pub rollback_stock: bool,
}

// -- Response types --

#[derive(Serialize)]
pub struct TransitionResponse {
    pub order: Order,
    pub previous_status: OrderStatus,
    pub event: OrderEvent,
}

impl From<TransitionOutcome> for TransitionResponse {
    fn from(outcome: TransitionOutcome) -> Self {
        Self {
            order: outcome.order,
            previous_status: outcome.previous_status,
            event: outcome.event,
        }
    }
}

// -- Handlers --

/// POST /orders: open a new draft.
#[tracing::instrument(skip(state, req))]
pub async fn create<D: TransactionalStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Json(req): Json<NewOrder>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state.engine.create_draft(req).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders: list orders, newest first, optionally filtered by `?status=`.
#[tracing::instrument(skip(state))]
pub async fn list<D: TransactionalStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let status = query
        .status
        .map(|s| s.parse::<OrderStatus>())
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let orders = state.engine.list_orders(status).await?;
    Ok(Json(orders))
}

/// GET /orders/{order_no}
#[tracing::instrument(skip(state))]
pub async fn get<D: TransactionalStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Path(order_no): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order = state.engine.get_order(&OrderNo::new(order_no)).await?;
    Ok(Json(order))
}

/// PATCH /orders/{order_no}: edit a draft.
#[tracing::instrument(skip(state, patch))]
pub async fn edit<D: TransactionalStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Path(order_no): Path<String>,
    Json(patch): Json<OrderPatch>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .engine
        .edit_draft(&OrderNo::new(order_no), patch)
        .await?;
    Ok(Json(order))
}

/// DELETE /orders/{order_no}: delete a draft.
#[tracing::instrument(skip(state))]
pub async fn delete<D: TransactionalStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Path(order_no): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.engine.delete_draft(&OrderNo::new(order_no)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /orders/{order_no}/complete
#[tracing::instrument(skip(state))]
pub async fn complete<D: TransactionalStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Path(order_no): Path<String>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let outcome = state.engine.complete(&OrderNo::new(order_no)).await?;
    Ok(Json(outcome.into()))
}

/// POST /orders/{order_no}/deliver
#[tracing::instrument(skip(state))]
pub async fn deliver<D: TransactionalStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Path(order_no): Path<String>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let outcome = state.engine.deliver(&OrderNo::new(order_no)).await?;
    Ok(Json(outcome.into()))
}

/// POST /orders/{order_no}/revert: body `{"rollback_stock": bool}`.
#[tracing::instrument(skip(state, req))]
pub async fn revert<D: TransactionalStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Path(order_no): Path<String>,
    Json(req): Json<RevertRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let outcome = state
        .engine
        .revert_to_draft(&OrderNo::new(order_no), req.rollback_stock)
        .await?;
    Ok(Json(outcome.into()))
}

/// POST /orders/{order_no}/return
#[tracing::instrument(skip(state))]
pub async fn return_order<D: TransactionalStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Path(order_no): Path<String>,
    Json(options): Json<ReturnOptions>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let outcome = state
        .engine
        .return_order(&OrderNo::new(order_no), options)
        .await?;
    Ok(Json(outcome.into()))
}

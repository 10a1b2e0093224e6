//! Inventory registration and restock endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ProductCode;
use domain::{InventoryItem, NewProduct, Quantity};
use serde::Deserialize;
use store::TransactionalStore;

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct RestockRequest {
    pub delta: Quantity,
}

/// POST /products
#[tracing::instrument(skip(state, req))]
pub async fn register<D: TransactionalStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Json(req): Json<NewProduct>,
) -> Result<(StatusCode, Json<InventoryItem>), ApiError> {
    let item = state.catalog.register_product(req).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /products: ordered by product code.
#[tracing::instrument(skip(state))]
pub async fn list<D: TransactionalStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
) -> Result<Json<Vec<InventoryItem>>, ApiError> {
    let items = state.catalog.list_products().await?;
    Ok(Json(items))
}

/// GET /products/{product_code}
#[tracing::instrument(skip(state))]
pub async fn get<D: TransactionalStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Path(product_code): Path<String>,
) -> Result<Json<InventoryItem>, ApiError> {
    let item = state
        .catalog
        .product(&ProductCode::new(product_code))
        .await?;
    Ok(Json(item))
}

/// POST /products/{product_code}/restock: body `{"delta": "12.5"}`.
#[tracing::instrument(skip(state, req))]
pub async fn restock<D: TransactionalStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Path(product_code): Path<String>,
    Json(req): Json<RestockRequest>,
) -> Result<Json<InventoryItem>, ApiError> {
    let item = state
        .catalog
        .restock(&ProductCode::new(product_code), req.delta)
        .await?;
    Ok(Json(item))
}

//! Customer registration and maintenance endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::CustomerId;
use domain::{Customer, CustomerPatch, NewCustomer};
use store::TransactionalStore;

use crate::AppState;
use crate::error::ApiError;

/// POST /customers
#[tracing::instrument(skip(state, req))]
pub async fn register<D: TransactionalStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Json(req): Json<NewCustomer>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    let customer = state.catalog.register_customer(req).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// GET /customers: newest first.
#[tracing::instrument(skip(state))]
pub async fn list<D: TransactionalStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    let customers = state.catalog.list_customers().await?;
    Ok(Json(customers))
}

/// GET /customers/{customer_id}
#[tracing::instrument(skip(state))]
pub async fn get<D: TransactionalStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Path(customer_id): Path<String>,
) -> Result<Json<Customer>, ApiError> {
    let customer = state.catalog.customer(parse_id(&customer_id)?).await?;
    Ok(Json(customer))
}

/// PATCH /customers/{customer_id}
#[tracing::instrument(skip(state, patch))]
pub async fn update<D: TransactionalStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Path(customer_id): Path<String>,
    Json(patch): Json<CustomerPatch>,
) -> Result<Json<Customer>, ApiError> {
    let customer = state
        .catalog
        .update_customer(parse_id(&customer_id)?, patch)
        .await?;
    Ok(Json(customer))
}

/// DELETE /customers/{customer_id}
#[tracing::instrument(skip(state))]
pub async fn delete<D: TransactionalStore + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Path(customer_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_customer(parse_id(&customer_id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_id(raw: &str) -> Result<CustomerId, ApiError> {
    uuid::Uuid::parse_str(raw)
        .map(CustomerId::from_uuid)
        .map_err(|e| ApiError::BadRequest(format!("Invalid customer_id: {e}")))
}

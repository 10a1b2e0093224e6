//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::OrderError;
use lifecycle::LifecycleError;
use serde_json::{Value, json};
use store::StoreError;

/// API-level error type that maps to HTTP responses.
///
/// Every response body has the shape
/// `{ "error": <stable code>, "message": <text>, "details": {...} }`.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request from the client.
    BadRequest(String),
    /// Lifecycle or catalog error.
    Lifecycle(LifecycleError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, json!({})),
            ApiError::Lifecycle(err) => {
                let status = lifecycle_status(&err);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %err, "internal server error");
                }
                (status, err.code(), err.to_string(), details(&err))
            }
        };

        let body = json!({ "error": code, "message": message, "details": details });
        (status, axum::Json(body)).into_response()
    }
}

fn lifecycle_status(err: &LifecycleError) -> StatusCode {
    match err {
        LifecycleError::OrderNotFound { .. }
        | LifecycleError::ProductNotFound { .. }
        | LifecycleError::CustomerNotFound { .. } => StatusCode::NOT_FOUND,
        LifecycleError::Order(order_err) => match order_err {
            OrderError::InvalidTransition { .. }
            | OrderError::IllegalEdit { .. }
            | OrderError::IllegalDelete { .. } => StatusCode::CONFLICT,
            OrderError::EmptyOrder
            | OrderError::CustomerRequired
            | OrderError::InvalidQuantity { .. }
            | OrderError::InvalidPrice { .. }
            | OrderError::InvalidFinalPrice { .. }
            | OrderError::AmountOverflow { .. }
            | OrderError::DuplicateProduct { .. }
            | OrderError::UnknownStatus { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        },
        LifecycleError::InsufficientStock { .. }
        | LifecycleError::QuantityOverflow { .. }
        | LifecycleError::Customer(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LifecycleError::AlreadyExists { .. } => StatusCode::CONFLICT,
        LifecycleError::Store(StoreError::ConcurrencyConflict { .. }) => StatusCode::CONFLICT,
        LifecycleError::Store(StoreError::NegativeStock { .. } | StoreError::Overflow { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LifecycleError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn details(err: &LifecycleError) -> Value {
    match err {
        LifecycleError::OrderNotFound { order_no } => json!({ "order_no": order_no }),
        LifecycleError::ProductNotFound { product_code }
        | LifecycleError::QuantityOverflow { product_code } => {
            json!({ "product_code": product_code })
        }
        LifecycleError::CustomerNotFound { customer_id } => {
            json!({ "customer_id": customer_id })
        }
        LifecycleError::InsufficientStock {
            product_code,
            available,
            required,
            shortfall,
        } => json!({
            "product_code": product_code,
            "available": available,
            "required": required,
            "shortfall": shortfall,
        }),
        LifecycleError::AlreadyExists { entity, key } => json!({ "entity": entity, "key": key }),
        LifecycleError::Order(OrderError::InvalidTransition { current, target }) => {
            json!({ "current": current, "target": target })
        }
        LifecycleError::Order(
            OrderError::IllegalEdit { status } | OrderError::IllegalDelete { status },
        ) => json!({ "status": status }),
        LifecycleError::Order(
            OrderError::InvalidQuantity { product_code, .. }
            | OrderError::InvalidPrice { product_code, .. }
            | OrderError::AmountOverflow { product_code }
            | OrderError::DuplicateProduct { product_code },
        ) => json!({ "product_code": product_code }),
        LifecycleError::Order(OrderError::InvalidFinalPrice { price }) => {
            json!({ "price": price })
        }
        LifecycleError::Store(StoreError::ConcurrencyConflict {
            order_no,
            expected,
            actual,
        }) => json!({ "order_no": order_no, "expected": expected, "actual": actual }),
        _ => json!({}),
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        ApiError::Lifecycle(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductCode;
    use domain::{CustomerError, Money, OrderStatus, Quantity};
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_mapping() {
        let not_found = LifecycleError::ProductNotFound {
            product_code: ProductCode::new("P1"),
        };
        assert_eq!(lifecycle_status(&not_found), StatusCode::NOT_FOUND);

        let conflict = LifecycleError::Order(OrderError::IllegalEdit {
            status: OrderStatus::Delivered,
        });
        assert_eq!(lifecycle_status(&conflict), StatusCode::CONFLICT);

        let stock = LifecycleError::InsufficientStock {
            product_code: ProductCode::new("P1"),
            available: Quantity::from(2),
            required: Quantity::from(3),
            shortfall: Quantity::from(1),
        };
        assert_eq!(lifecycle_status(&stock), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(details(&stock)["product_code"], "P1");

        let overflow = LifecycleError::QuantityOverflow {
            product_code: ProductCode::new("P1"),
        };
        assert_eq!(lifecycle_status(&overflow), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(details(&overflow)["product_code"], "P1");

        let final_price = LifecycleError::Order(OrderError::InvalidFinalPrice {
            price: Money::new(dec!(-1)),
        });
        assert_eq!(lifecycle_status(&final_price), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(details(&final_price)["price"], "-1");

        let blank = LifecycleError::Customer(CustomerError::EmptyName);
        assert_eq!(lifecycle_status(&blank), StatusCode::UNPROCESSABLE_ENTITY);
    }
}

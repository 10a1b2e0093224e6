//! Lifecycle error types.

use common::{CustomerId, OrderNo, ProductCode};
use domain::{CustomerError, OrderError, Quantity};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during lifecycle operations.
///
/// When one of these is returned, the unit of work has already been rolled
/// back; nothing the operation wrote is visible.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Order not found.
    #[error("Order not found: {order_no}")]
    OrderNotFound { order_no: OrderNo },

    /// The order's own rules refused the operation.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// A line item references a product with no inventory record.
    #[error("Product not found: {product_code}")]
    ProductNotFound { product_code: ProductCode },

    /// Not enough stock to reserve a line item.
    #[error(
        "Insufficient stock for {product_code}: available {available}, required {required} (short by {shortfall})"
    )]
    InsufficientStock {
        product_code: ProductCode,
        available: Quantity,
        required: Quantity,
        shortfall: Quantity,
    },

    /// A stock level would leave the decimal range.
    #[error("Stock for {product_code} would overflow")]
    QuantityOverflow { product_code: ProductCode },

    /// The customer record's own rules refused the operation.
    #[error(transparent)]
    Customer(#[from] CustomerError),

    /// The customer referenced by the order does not exist.
    #[error("Customer not found: {customer_id}")]
    CustomerNotFound { customer_id: CustomerId },

    /// A catalog record with this key is already registered.
    #[error("{entity} already exists: {key}")]
    AlreadyExists { entity: &'static str, key: String },

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl LifecycleError {
    pub(crate) fn insufficient_stock(
        product_code: &ProductCode,
        available: Quantity,
        required: Quantity,
    ) -> Self {
        LifecycleError::InsufficientStock {
            product_code: product_code.clone(),
            available,
            required,
            shortfall: required - available,
        }
    }

    /// Stable machine-readable key for this error, suitable for localized
    /// messages.
    pub fn code(&self) -> &'static str {
        match self {
            LifecycleError::OrderNotFound { .. } => "order_not_found",
            LifecycleError::Order(e) => e.code(),
            LifecycleError::ProductNotFound { .. } => "product_not_found",
            LifecycleError::InsufficientStock { .. } => "insufficient_stock",
            LifecycleError::QuantityOverflow { .. } => "quantity_overflow",
            LifecycleError::Customer(e) => e.code(),
            LifecycleError::CustomerNotFound { .. } => "customer_not_found",
            LifecycleError::AlreadyExists { .. } => "already_exists",
            LifecycleError::Store(StoreError::ConcurrencyConflict { .. }) => {
                "concurrency_conflict"
            }
            LifecycleError::Store(StoreError::NegativeStock { .. }) => "negative_stock",
            LifecycleError::Store(StoreError::Overflow { .. }) => "store_overflow",
            LifecycleError::Store(_) => "store_error",
        }
    }
}

/// Convenience type alias for lifecycle results.
pub type Result<T> = std::result::Result<T, LifecycleError>;

#[cfg(test)]
mod tests {
    use super::*;
    use domain::OrderStatus;

    #[test]
    fn test_shortfall_is_required_minus_available() {
        let err = LifecycleError::insufficient_stock(
            &ProductCode::new("P1"),
            Quantity::from(2),
            Quantity::from(3),
        );
        match err {
            LifecycleError::InsufficientStock { shortfall, .. } => {
                assert_eq!(shortfall, Quantity::from(1))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_codes_are_stable() {
        let err = LifecycleError::from(OrderError::InvalidTransition {
            current: OrderStatus::Returned,
            target: OrderStatus::Completed,
        });
        assert_eq!(err.code(), "invalid_transition");
        assert_eq!(
            err.to_string(),
            "Invalid transition: cannot move from Returned to Completed"
        );

        let err = LifecycleError::Store(StoreError::ConcurrencyConflict {
            order_no: OrderNo::new("ORD-1"),
            expected: 1,
            actual: 2,
        });
        assert_eq!(err.code(), "concurrency_conflict");

        let err = LifecycleError::from(CustomerError::EmptyName);
        assert_eq!(err.code(), "empty_customer_name");
        assert_eq!(err.to_string(), "Customer name must not be empty");
    }
}

//! Order entity and related types.

mod aggregate;
mod commands;
mod events;
mod state;
mod value_objects;

pub use aggregate::{Order, OrderParts};
pub use commands::{NewOrder, OrderPatch, ReturnOptions};
pub(crate) use commands::double_option;
pub use events::{
    OrderCompletedData, OrderDeliveredData, OrderEvent, OrderReturnedData, OrderRevertedData,
    StockMovement,
};
pub use state::{OrderStatus, Transition};
pub use value_objects::{LineItem, LineItems, Money, Quantity};

use common::ProductCode;
use thiserror::Error;

/// Errors raised by the order's own rules, before any store is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The requested transition does not start from the current status.
    #[error("Invalid transition: cannot move from {current} to {target}")]
    InvalidTransition {
        current: OrderStatus,
        target: OrderStatus,
    },

    /// The order left Draft; its fields are frozen.
    #[error("Cannot edit an order in {status} status")]
    IllegalEdit { status: OrderStatus },

    /// Only Draft orders may be deleted.
    #[error("Cannot delete an order in {status} status")]
    IllegalDelete { status: OrderStatus },

    /// An order must have line items before it can be completed.
    #[error("Order has no line items")]
    EmptyOrder,

    /// A customer is required for this operation.
    #[error("Order has no customer")]
    CustomerRequired,

    /// Line item quantity must be positive.
    #[error("Invalid quantity {quantity} for product {product_code} (must be greater than 0)")]
    InvalidQuantity {
        product_code: ProductCode,
        quantity: Quantity,
    },

    /// Prices may be zero but never negative.
    #[error("Invalid price {price} for product {product_code} (must not be negative)")]
    InvalidPrice {
        product_code: ProductCode,
        price: Money,
    },

    /// A negative final selling price.
    #[error("Invalid final selling price {price} (must not be negative)")]
    InvalidFinalPrice { price: Money },

    /// A line total or order total exceeds the decimal range.
    #[error("Totals overflow at product {product_code}")]
    AmountOverflow { product_code: ProductCode },

    /// Product codes must be unique within one order.
    #[error("Product {product_code} appears more than once")]
    DuplicateProduct { product_code: ProductCode },

    /// A stored or requested status name is not recognized.
    #[error("Unknown order status: {status}")]
    UnknownStatus { status: String },
}

impl OrderError {
    /// Stable machine-readable key for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            OrderError::InvalidTransition { .. } => "invalid_transition",
            OrderError::IllegalEdit { .. } => "illegal_edit",
            OrderError::IllegalDelete { .. } => "illegal_delete",
            OrderError::EmptyOrder => "empty_order",
            OrderError::CustomerRequired => "customer_required",
            OrderError::InvalidQuantity { .. } => "invalid_quantity",
            OrderError::InvalidPrice { .. } => "invalid_price",
            OrderError::InvalidFinalPrice { .. } => "invalid_final_price",
            OrderError::AmountOverflow { .. } => "amount_overflow",
            OrderError::DuplicateProduct { .. } => "duplicate_product",
            OrderError::UnknownStatus { .. } => "unknown_status",
        }
    }
}

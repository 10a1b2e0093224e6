use common::{OrderNo, ProductCode};
use domain::{Quantity, StockError};
use thiserror::Error;

/// Errors that can occur when interacting with a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The order was saved by someone else since it was loaded.
    #[error(
        "Concurrency conflict for order {order_no}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        order_no: OrderNo,
        expected: i64,
        actual: i64,
    },

    /// A row that must exist for the update was not found.
    #[error("{entity} not found: {key}")]
    RowNotFound { entity: &'static str, key: String },

    /// An adjustment would have taken stock below zero.
    #[error("Stock for {product_code} would go negative: {stock} + ({delta})")]
    NegativeStock {
        product_code: ProductCode,
        stock: Quantity,
        delta: Quantity,
    },

    /// An adjustment would have left the numeric range of a stored value.
    #[error("{entity} {key} would overflow")]
    Overflow { entity: &'static str, key: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be turned back into a domain value.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        StoreError::RowNotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn overflow(entity: &'static str, key: impl ToString) -> Self {
        StoreError::Overflow {
            entity,
            key: key.to_string(),
        }
    }

    /// Maps a rejected stock adjustment onto the store's error kinds.
    pub(crate) fn from_stock(
        err: StockError,
        product_code: &ProductCode,
        stock: Quantity,
        delta: Quantity,
    ) -> Self {
        match err {
            StockError::Negative => StoreError::NegativeStock {
                product_code: product_code.clone(),
                stock,
                delta,
            },
            StockError::Overflow => StoreError::overflow("product", product_code),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

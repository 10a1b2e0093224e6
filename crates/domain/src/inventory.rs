//! Inventory record keyed by product code.

use chrono::{DateTime, Utc};
use common::ProductCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order::Quantity;

/// Why a stock adjustment cannot be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("stock would go negative")]
    Negative,
    #[error("stock would overflow")]
    Overflow,
}

/// Adds `delta` to `stock`, refusing results below zero or out of range.
///
/// Shared by every store so that all backends agree on the rule.
pub fn apply_stock_delta(stock: Quantity, delta: Quantity) -> Result<Quantity, StockError> {
    let next = stock.checked_add(delta).ok_or(StockError::Overflow)?;
    if next.is_negative() {
        return Err(StockError::Negative);
    }
    Ok(next)
}

/// Whether the product is offered for sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StockStatus {
    #[default]
    Enabled,
    Disabled,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Enabled => "Enabled",
            StockStatus::Disabled => "Disabled",
        }
    }

    /// Parses a stored status name; unknown values read as `Enabled`.
    pub fn parse(s: &str) -> Self {
        match s {
            "Disabled" => StockStatus::Disabled,
            _ => StockStatus::Enabled,
        }
    }
}

/// Stock held for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub product_code: ProductCode,
    /// Never negative.
    pub stock_qty: Quantity,
    pub status: StockStatus,
    /// Display unit, e.g. "pcs" or "g".
    pub stock_unit: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration request for a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub product_code: ProductCode,
    #[serde(default)]
    pub stock_qty: Quantity,
    #[serde(default)]
    pub status: StockStatus,
    #[serde(default)]
    pub stock_unit: Option<String>,
}

impl NewProduct {
    pub fn new(product_code: impl Into<ProductCode>, stock_qty: impl Into<Quantity>) -> Self {
        Self {
            product_code: product_code.into(),
            stock_qty: stock_qty.into(),
            status: StockStatus::Enabled,
            stock_unit: None,
        }
    }
}

impl InventoryItem {
    /// Builds a stored record from a registration request.
    pub fn register(new: NewProduct, now: DateTime<Utc>) -> Self {
        Self {
            product_code: new.product_code,
            stock_qty: new.stock_qty,
            status: new.status,
            stock_unit: new.stock_unit,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the stock after applying `delta`.
    pub fn adjusted(&self, delta: Quantity) -> Result<Quantity, StockError> {
        apply_stock_delta(self.stock_qty, delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_adjusted_refuses_negative_stock() {
        let item = InventoryItem::register(NewProduct::new("P1", 5), Utc::now());
        assert_eq!(item.adjusted(Quantity::from(-3)), Ok(Quantity::from(2)));
        assert_eq!(item.adjusted(Quantity::from(-5)), Ok(Quantity::zero()));
        assert_eq!(item.adjusted(Quantity::from(-6)), Err(StockError::Negative));
    }

    #[test]
    fn test_adjusted_handles_fractional_stock() {
        let item = InventoryItem::register(
            NewProduct::new("BEAD-G", Quantity::new(dec!(12.5))),
            Utc::now(),
        );
        assert_eq!(
            item.adjusted(Quantity::new(dec!(-2.25))),
            Ok(Quantity::new(dec!(10.25)))
        );
    }

    #[test]
    fn test_adjusted_reports_overflow() {
        let item = InventoryItem::register(
            NewProduct::new("P1", Quantity::new(rust_decimal::Decimal::MAX)),
            Utc::now(),
        );
        assert_eq!(item.adjusted(Quantity::from(1)), Err(StockError::Overflow));
        assert_eq!(
            item.adjusted(Quantity::from(-1)),
            Ok(Quantity::new(rust_decimal::Decimal::MAX - dec!(1)))
        );
    }

    #[test]
    fn test_status_parse_defaults_to_enabled() {
        assert_eq!(StockStatus::parse("Disabled"), StockStatus::Disabled);
        assert_eq!(StockStatus::parse("whatever"), StockStatus::Enabled);
    }
}

//! Value objects for the order domain.

use std::collections::HashSet;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use common::ProductCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::OrderError;

/// Monetary amount held as an exact decimal.
///
/// Stat adjustments are applied incrementally and later reversed, so amounts
/// must add and subtract without rounding drift.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Creates a money amount from a decimal.
    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Returns the underlying decimal amount.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Multiplies a unit price by a quantity, or `None` on overflow.
    pub fn checked_times(&self, quantity: Quantity) -> Option<Money> {
        self.0.checked_mul(quantity.value()).map(Money)
    }

    /// Adds two amounts, or `None` on overflow.
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

/// Stock or line-item quantity.
///
/// Fractional values are legal: some products are stocked by weight.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Creates a quantity from a decimal.
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Returns the underlying decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Adds two quantities, or `None` on overflow.
    pub fn checked_add(self, rhs: Quantity) -> Option<Quantity> {
        self.0.checked_add(rhs.0).map(Quantity)
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl From<Decimal> for Quantity {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<i32> for Quantity {
    fn from(value: i32) -> Self {
        Self(Decimal::from(value))
    }
}

impl From<u32> for Quantity {
    fn from(value: u32) -> Self {
        Self(Decimal::from(value))
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Self) -> Self::Output {
        Quantity(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Self) -> Self::Output {
        Quantity(self.0 - rhs.0)
    }
}

impl Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Self::Output {
        Quantity(-self.0)
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), Add::add)
    }
}

/// One product line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Inventory record this line draws from.
    pub product_code: ProductCode,

    /// Quantity sold; always greater than zero.
    pub quantity: Quantity,

    /// Purchase cost per unit.
    pub unit_cost: Money,

    /// Selling price per unit.
    pub unit_sell_price: Money,
}

impl LineItem {
    /// Creates a new line item.
    pub fn new(
        product_code: impl Into<ProductCode>,
        quantity: impl Into<Quantity>,
        unit_cost: Money,
        unit_sell_price: Money,
    ) -> Self {
        Self {
            product_code: product_code.into(),
            quantity: quantity.into(),
            unit_cost,
            unit_sell_price,
        }
    }

    /// Returns quantity × unit cost, or `None` on overflow.
    pub fn cost(&self) -> Option<Money> {
        self.unit_cost.checked_times(self.quantity)
    }

    /// Returns quantity × unit selling price, or `None` on overflow.
    pub fn sell(&self) -> Option<Money> {
        self.unit_sell_price.checked_times(self.quantity)
    }

    fn validate(&self) -> Result<(), OrderError> {
        if !self.quantity.is_positive() {
            return Err(OrderError::InvalidQuantity {
                product_code: self.product_code.clone(),
                quantity: self.quantity,
            });
        }

        for price in [self.unit_cost, self.unit_sell_price] {
            if price.is_negative() {
                return Err(OrderError::InvalidPrice {
                    product_code: self.product_code.clone(),
                    price,
                });
            }
        }

        Ok(())
    }
}

/// The validated, ordered line items of an order.
///
/// Every quantity is positive, no price is negative, product codes are
/// unique and the totals fit in a decimal. Deserialization goes through the
/// same checks, so stored detail blobs are parsed once on read rather than
/// re-checked by each caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LineItem>", into = "Vec<LineItem>")]
pub struct LineItems {
    items: Vec<LineItem>,
    cost_price: Money,
    sell_price: Money,
    total_quantity: Quantity,
}

impl LineItems {
    /// Validates and wraps a list of line items.
    pub fn new(items: Vec<LineItem>) -> Result<Self, OrderError> {
        let mut seen = HashSet::with_capacity(items.len());
        let mut cost_price = Money::zero();
        let mut sell_price = Money::zero();
        let mut total_quantity = Quantity::zero();

        for item in &items {
            item.validate()?;
            if !seen.insert(&item.product_code) {
                return Err(OrderError::DuplicateProduct {
                    product_code: item.product_code.clone(),
                });
            }

            let overflow = || OrderError::AmountOverflow {
                product_code: item.product_code.clone(),
            };
            cost_price = item
                .cost()
                .and_then(|cost| cost_price.checked_add(cost))
                .ok_or_else(overflow)?;
            sell_price = item
                .sell()
                .and_then(|sell| sell_price.checked_add(sell))
                .ok_or_else(overflow)?;
            total_quantity = total_quantity
                .checked_add(item.quantity)
                .ok_or_else(overflow)?;
        }

        Ok(Self {
            items,
            cost_price,
            sell_price,
            total_quantity,
        })
    }

    /// Returns an empty item list.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the line for a product code.
    pub fn get(&self, product_code: &ProductCode) -> Option<&LineItem> {
        self.items
            .iter()
            .find(|item| &item.product_code == product_code)
    }

    /// Returns Σ(quantity × unit_cost).
    pub fn cost_price(&self) -> Money {
        self.cost_price
    }

    /// Returns Σ(quantity × unit_sell_price).
    pub fn sell_price(&self) -> Money {
        self.sell_price
    }

    /// Returns the sum of all line quantities.
    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }
}

impl TryFrom<Vec<LineItem>> for LineItems {
    type Error = OrderError;

    fn try_from(items: Vec<LineItem>) -> Result<Self, Self::Error> {
        Self::new(items)
    }
}

impl From<LineItems> for Vec<LineItem> {
    fn from(items: LineItems) -> Self {
        items.items
    }
}

impl<'a> IntoIterator for &'a LineItems {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

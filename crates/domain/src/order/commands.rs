//! Inputs for creating and editing orders.

use common::CustomerId;
use serde::{Deserialize, Deserializer, Serialize};

use super::{LineItem, Money};

/// Everything a caller supplies to open a new draft order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrder {
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub express_no: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub final_sell_price: Option<Money>,
}

impl NewOrder {
    /// Creates a draft request for a customer with the given line items.
    pub fn for_customer(customer_id: CustomerId, line_items: Vec<LineItem>) -> Self {
        Self {
            customer_id: Some(customer_id),
            line_items,
            ..Self::default()
        }
    }
}

/// A partial update to a draft order.
///
/// Absent fields are left unchanged. Every optional field distinguishes
/// "absent" from an explicit `null`, which clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderPatch {
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub customer_id: Option<Option<CustomerId>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub customer_name: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub address: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub express_no: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub remark: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<LineItem>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub final_sell_price: Option<Option<Money>>,
}

impl OrderPatch {
    /// Patch that replaces the line items.
    pub fn line_items(items: Vec<LineItem>) -> Self {
        Self {
            line_items: Some(items),
            ..Self::default()
        }
    }

    /// Returns the customer this patch newly references, if any.
    pub fn new_customer(&self) -> Option<CustomerId> {
        self.customer_id.flatten()
    }
}

pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Caller-chosen sub-effects of returning a delivered order.
///
/// Each flag is applied independently; the order becomes Returned whatever
/// combination is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReturnOptions {
    /// Subtract the order from the customer's purchase totals.
    pub rollback_purchase: bool,
    /// Record the order in the customer's return totals.
    pub add_return: bool,
    /// Put the line item quantities back into stock.
    pub rollback_stock: bool,
}

impl ReturnOptions {
    /// All three reversals.
    pub fn all() -> Self {
        Self {
            rollback_purchase: true,
            add_return: true,
            rollback_stock: true,
        }
    }

    /// Whether any chosen effect touches the customer record.
    pub fn touches_customer(&self) -> bool {
        self.rollback_purchase || self.add_return
    }
}

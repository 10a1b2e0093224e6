//! Order lifecycle events.
//!
//! Each event is the full description of one transition: the status it
//! leads to and every compensating change it requires on inventory and
//! customer records. The order decides the event; the engine carries out its
//! effects and then applies it back onto the order.

use chrono::{DateTime, Utc};
use common::{CustomerId, OrderNo, ProductCode};
use serde::{Deserialize, Serialize};

use crate::customer::StatsAdjustment;

use super::{Money, Quantity, Transition};

/// A signed stock change for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub product_code: ProductCode,
    /// Negative when stock is reserved, positive when released.
    pub delta: Quantity,
}

/// Events produced by order transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Draft → Completed; stock reserved.
    OrderCompleted(OrderCompletedData),

    /// Completed → Delivered; purchase stats accrued.
    OrderDelivered(OrderDeliveredData),

    /// Completed → Draft; stock optionally released.
    OrderRevertedToDraft(OrderRevertedData),

    /// Delivered → Returned; optional reversals.
    OrderReturned(OrderReturnedData),
}

/// Data for the OrderCompleted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompletedData {
    pub order_no: OrderNo,
    /// One negative movement per line item.
    pub reservations: Vec<StockMovement>,
    pub completed_at: DateTime<Utc>,
}

/// Data for the OrderDelivered event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDeliveredData {
    pub order_no: OrderNo,
    pub customer_id: CustomerId,
    /// The order's stored sell price.
    pub purchase_amount: Money,
    pub delivered_at: DateTime<Utc>,
}

/// Data for the OrderRevertedToDraft event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRevertedData {
    pub order_no: OrderNo,
    /// Empty when the caller kept the reservation.
    pub released: Vec<StockMovement>,
    pub reverted_at: DateTime<Utc>,
}

/// Data for the OrderReturned event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReturnedData {
    pub order_no: OrderNo,
    /// Set whenever a customer-side effect was chosen.
    pub customer_id: Option<CustomerId>,
    /// Amount subtracted from purchase totals, if chosen.
    pub purchase_reversed: Option<Money>,
    /// Amount added to return totals, if chosen.
    pub return_recorded: Option<Money>,
    /// Empty unless stock rollback was chosen.
    pub released: Vec<StockMovement>,
    pub returned_at: DateTime<Utc>,
}

impl OrderEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCompleted(_) => "OrderCompleted",
            OrderEvent::OrderDelivered(_) => "OrderDelivered",
            OrderEvent::OrderRevertedToDraft(_) => "OrderRevertedToDraft",
            OrderEvent::OrderReturned(_) => "OrderReturned",
        }
    }

    /// Returns the transition this event records.
    pub fn transition(&self) -> Transition {
        match self {
            OrderEvent::OrderCompleted(_) => Transition::Complete,
            OrderEvent::OrderDelivered(_) => Transition::Deliver,
            OrderEvent::OrderRevertedToDraft(_) => Transition::RevertToDraft,
            OrderEvent::OrderReturned(_) => Transition::Return,
        }
    }

    pub fn order_no(&self) -> &OrderNo {
        match self {
            OrderEvent::OrderCompleted(data) => &data.order_no,
            OrderEvent::OrderDelivered(data) => &data.order_no,
            OrderEvent::OrderRevertedToDraft(data) => &data.order_no,
            OrderEvent::OrderReturned(data) => &data.order_no,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderCompleted(data) => data.completed_at,
            OrderEvent::OrderDelivered(data) => data.delivered_at,
            OrderEvent::OrderRevertedToDraft(data) => data.reverted_at,
            OrderEvent::OrderReturned(data) => data.returned_at,
        }
    }

    /// Stock changes this event requires, in line item order.
    pub fn stock_movements(&self) -> &[StockMovement] {
        match self {
            OrderEvent::OrderCompleted(data) => &data.reservations,
            OrderEvent::OrderDelivered(_) => &[],
            OrderEvent::OrderRevertedToDraft(data) => &data.released,
            OrderEvent::OrderReturned(data) => &data.released,
        }
    }

    /// The customer whose record this event changes, if any.
    pub fn affected_customer(&self) -> Option<CustomerId> {
        match self {
            OrderEvent::OrderDelivered(data) => Some(data.customer_id),
            OrderEvent::OrderReturned(data)
                if data.purchase_reversed.is_some() || data.return_recorded.is_some() =>
            {
                data.customer_id
            }
            _ => None,
        }
    }

    /// Change to the customer's purchase counters.
    pub fn purchase_adjustment(&self) -> Option<StatsAdjustment> {
        match self {
            OrderEvent::OrderDelivered(data) => Some(StatsAdjustment::accrue(
                data.purchase_amount,
                data.delivered_at,
            )),
            OrderEvent::OrderReturned(data) => data
                .purchase_reversed
                .map(|amount| StatsAdjustment::reverse(amount, data.returned_at)),
            _ => None,
        }
    }

    /// Change to the customer's return counters.
    pub fn return_adjustment(&self) -> Option<StatsAdjustment> {
        match self {
            OrderEvent::OrderReturned(data) => data
                .return_recorded
                .map(|amount| StatsAdjustment::accrue(amount, data.returned_at)),
            _ => None,
        }
    }

    pub(crate) fn order_completed(
        order_no: OrderNo,
        reservations: Vec<StockMovement>,
        at: DateTime<Utc>,
    ) -> Self {
        OrderEvent::OrderCompleted(OrderCompletedData {
            order_no,
            reservations,
            completed_at: at,
        })
    }

    pub(crate) fn order_delivered(
        order_no: OrderNo,
        customer_id: CustomerId,
        purchase_amount: Money,
        at: DateTime<Utc>,
    ) -> Self {
        OrderEvent::OrderDelivered(OrderDeliveredData {
            order_no,
            customer_id,
            purchase_amount,
            delivered_at: at,
        })
    }

    pub(crate) fn order_reverted(
        order_no: OrderNo,
        released: Vec<StockMovement>,
        at: DateTime<Utc>,
    ) -> Self {
        OrderEvent::OrderRevertedToDraft(OrderRevertedData {
            order_no,
            released,
            reverted_at: at,
        })
    }

    pub(crate) fn order_returned(data: OrderReturnedData) -> Self {
        OrderEvent::OrderReturned(data)
    }
}

//! Order entity.

use chrono::{DateTime, Utc};
use common::{CustomerId, OrderNo};
use serde::{Deserialize, Serialize};

use super::{
    LineItems, Money, NewOrder, OrderError, OrderEvent, OrderPatch, OrderStatus, ReturnOptions,
    StockMovement, Transition, events::OrderReturnedData,
};

/// An order and its position in the lifecycle.
///
/// Command methods (`complete`, `deliver`, ...) never mutate: they check the
/// state machine and return the [`OrderEvent`] describing the transition.
/// [`Order::apply`] then moves the order to the event's target status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    order_no: OrderNo,
    status: OrderStatus,
    customer_id: Option<CustomerId>,
    customer_name: Option<String>,
    address: Option<String>,
    express_no: Option<String>,
    remark: Option<String>,
    line_items: LineItems,
    cost_price: Money,
    sell_price: Money,
    final_sell_price: Option<Money>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,

    /// Persisted revision, bumped on every mutation.
    version: i64,
}

/// Raw field set used by stores to rebuild an order.
#[derive(Debug, Clone)]
pub struct OrderParts {
    pub order_no: OrderNo,
    pub status: OrderStatus,
    pub customer_id: Option<CustomerId>,
    pub customer_name: Option<String>,
    pub address: Option<String>,
    pub express_no: Option<String>,
    pub remark: Option<String>,
    pub line_items: LineItems,
    pub cost_price: Money,
    pub sell_price: Money,
    pub final_sell_price: Option<Money>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

// Query methods
impl Order {
    pub fn order_no(&self) -> &OrderNo {
        &self.order_no
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn customer_name(&self) -> Option<&str> {
        self.customer_name.as_deref()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn express_no(&self) -> Option<&str> {
        self.express_no.as_deref()
    }

    pub fn remark(&self) -> Option<&str> {
        self.remark.as_deref()
    }

    pub fn line_items(&self) -> &LineItems {
        &self.line_items
    }

    /// Σ(quantity × unit_cost) as last derived.
    pub fn cost_price(&self) -> Money {
        self.cost_price
    }

    /// Σ(quantity × unit_sell_price) as last derived; the amount used for
    /// customer stats.
    pub fn sell_price(&self) -> Money {
        self.sell_price
    }

    pub fn final_sell_price(&self) -> Option<Money> {
        self.final_sell_price
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Construction
impl Order {
    /// Opens a new draft. The returned order is at version 1 and has not been
    /// persisted yet.
    pub fn draft(
        order_no: OrderNo,
        new: NewOrder,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        let line_items = LineItems::new(new.line_items)?;
        validate_final_price(new.final_sell_price)?;

        Ok(Order {
            order_no,
            status: OrderStatus::Draft,
            customer_id: new.customer_id,
            customer_name: new.customer_name,
            address: new.address,
            express_no: new.express_no,
            remark: new.remark,
            cost_price: line_items.cost_price(),
            sell_price: line_items.sell_price(),
            line_items,
            final_sell_price: new.final_sell_price,
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }

    /// Rebuilds an order from stored fields. Totals are taken as stored.
    pub fn from_parts(parts: OrderParts) -> Order {
        Order {
            order_no: parts.order_no,
            status: parts.status,
            customer_id: parts.customer_id,
            customer_name: parts.customer_name,
            address: parts.address,
            express_no: parts.express_no,
            remark: parts.remark,
            line_items: parts.line_items,
            cost_price: parts.cost_price,
            sell_price: parts.sell_price,
            final_sell_price: parts.final_sell_price,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            version: parts.version,
        }
    }
}

// Draft editing
impl Order {
    /// Applies a patch to a draft order.
    ///
    /// Fails with `IllegalEdit` outside Draft, whichever field is touched.
    pub fn edit(&mut self, patch: OrderPatch, now: DateTime<Utc>) -> Result<(), OrderError> {
        if !self.status.can_edit() {
            return Err(OrderError::IllegalEdit {
                status: self.status,
            });
        }

        // Validate everything before changing anything.
        let line_items = patch.line_items.map(LineItems::new).transpose()?;
        if let Some(final_sell_price) = patch.final_sell_price {
            validate_final_price(final_sell_price)?;
        }

        if let Some(customer_id) = patch.customer_id {
            self.customer_id = customer_id;
        }
        if let Some(customer_name) = patch.customer_name {
            self.customer_name = customer_name;
        }
        if let Some(address) = patch.address {
            self.address = address;
        }
        if let Some(express_no) = patch.express_no {
            self.express_no = express_no;
        }
        if let Some(remark) = patch.remark {
            self.remark = remark;
        }
        if let Some(line_items) = line_items {
            self.cost_price = line_items.cost_price();
            self.sell_price = line_items.sell_price();
            self.line_items = line_items;
        }
        if let Some(final_sell_price) = patch.final_sell_price {
            self.final_sell_price = final_sell_price;
        }

        self.touch(now);
        Ok(())
    }

    /// Checks that the order may be hard-deleted.
    pub fn ensure_deletable(&self) -> Result<(), OrderError> {
        if self.status.can_delete() {
            Ok(())
        } else {
            Err(OrderError::IllegalDelete {
                status: self.status,
            })
        }
    }
}

// Transition commands (return events)
impl Order {
    /// Draft → Completed. Reserves every line item's quantity.
    pub fn complete(&self, now: DateTime<Utc>) -> Result<OrderEvent, OrderError> {
        self.status.transition(Transition::Complete)?;

        if self.line_items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        if self.customer_id.is_none() {
            return Err(OrderError::CustomerRequired);
        }

        let reservations = self.stock_movements(|quantity| -quantity);
        Ok(OrderEvent::order_completed(
            self.order_no.clone(),
            reservations,
            now,
        ))
    }

    /// Completed → Delivered. Accrues the stored sell price on the customer.
    pub fn deliver(&self, now: DateTime<Utc>) -> Result<OrderEvent, OrderError> {
        self.status.transition(Transition::Deliver)?;
        let customer_id = self.customer_id.ok_or(OrderError::CustomerRequired)?;

        Ok(OrderEvent::order_delivered(
            self.order_no.clone(),
            customer_id,
            self.sell_price,
            now,
        ))
    }

    /// Completed → Draft. Releases the reservation when `rollback_stock`.
    pub fn revert_to_draft(
        &self,
        rollback_stock: bool,
        now: DateTime<Utc>,
    ) -> Result<OrderEvent, OrderError> {
        self.status.transition(Transition::RevertToDraft)?;

        let released = if rollback_stock {
            self.stock_movements(|quantity| quantity)
        } else {
            Vec::new()
        };
        Ok(OrderEvent::order_reverted(
            self.order_no.clone(),
            released,
            now,
        ))
    }

    /// Delivered → Returned, with each reversal chosen by the caller.
    pub fn return_order(
        &self,
        options: ReturnOptions,
        now: DateTime<Utc>,
    ) -> Result<OrderEvent, OrderError> {
        self.status.transition(Transition::Return)?;

        let customer_id = if options.touches_customer() {
            Some(self.customer_id.ok_or(OrderError::CustomerRequired)?)
        } else {
            self.customer_id
        };

        Ok(OrderEvent::order_returned(OrderReturnedData {
            order_no: self.order_no.clone(),
            customer_id,
            purchase_reversed: options.rollback_purchase.then_some(self.sell_price),
            return_recorded: options.add_return.then_some(self.sell_price),
            released: if options.rollback_stock {
                self.stock_movements(|quantity| quantity)
            } else {
                Vec::new()
            },
            returned_at: now,
        }))
    }

    /// Moves the order to the event's target status.
    ///
    /// Events are produced by this order's own command methods, so the
    /// transition is known to be valid.
    pub fn apply(&mut self, event: &OrderEvent) {
        self.status = event.transition().target();
        self.touch(event.occurred_at());
    }

    fn stock_movements(
        &self,
        sign: impl Fn(super::Quantity) -> super::Quantity,
    ) -> Vec<StockMovement> {
        self.line_items
            .iter()
            .map(|item| StockMovement {
                product_code: item.product_code.clone(),
                delta: sign(item.quantity),
            })
            .collect()
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.version += 1;
    }
}

fn validate_final_price(price: Option<Money>) -> Result<(), OrderError> {
    match price {
        Some(price) if price.is_negative() => Err(OrderError::InvalidFinalPrice { price }),
        _ => Ok(()),
    }
}

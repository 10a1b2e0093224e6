use async_trait::async_trait;
use common::{CustomerId, OrderNo, ProductCode};
use domain::{Customer, InventoryItem, Order, OrderStatus, Quantity, StatsAdjustment};

use crate::Result;

/// Order rows.
#[async_trait]
pub trait OrderStore: Send {
    /// Loads an order. Returns `None` if it doesn't exist.
    async fn load_order(&mut self, order_no: &OrderNo) -> Result<Option<Order>>;

    /// Inserts or updates an order.
    ///
    /// `expected_version` is the version the caller loaded; `0` means the
    /// order must not exist yet. Fails with `ConcurrencyConflict` if the
    /// persisted version differs.
    async fn save_order(&mut self, order: &Order, expected_version: i64) -> Result<()>;

    /// Hard-deletes an order. Returns false if there was nothing to delete.
    async fn delete_order(&mut self, order_no: &OrderNo) -> Result<bool>;

    /// Lists orders, newest first, optionally filtered by status.
    async fn list_orders(&mut self, status: Option<OrderStatus>) -> Result<Vec<Order>>;
}

/// Inventory rows keyed by product code.
#[async_trait]
pub trait InventoryStore: Send {
    /// Current stock of a product, or `None` if the product is unknown.
    async fn get_stock(&mut self, product_code: &ProductCode) -> Result<Option<Quantity>> {
        Ok(self
            .get_product(product_code)
            .await?
            .map(|item| item.stock_qty))
    }

    /// Adds `delta` to the product's stock and returns the new level.
    ///
    /// Fails with `RowNotFound` for an unknown product, `NegativeStock` if the
    /// result would be below zero and `Overflow` if it would leave the decimal
    /// range; the stock is unchanged then.
    async fn adjust_stock(&mut self, product_code: &ProductCode, delta: Quantity)
    -> Result<Quantity>;

    async fn get_product(&mut self, product_code: &ProductCode) -> Result<Option<InventoryItem>>;

    async fn insert_product(&mut self, item: &InventoryItem) -> Result<()>;

    /// Lists every product ordered by product code.
    async fn list_products(&mut self) -> Result<Vec<InventoryItem>>;
}

/// Customer rows and their statistics.
#[async_trait]
pub trait CustomerStore: Send {
    async fn get_customer(&mut self, customer_id: CustomerId) -> Result<Option<Customer>>;

    async fn insert_customer(&mut self, customer: &Customer) -> Result<()>;

    /// Overwrites a customer row, statistics included. Fails with
    /// `RowNotFound` if the customer does not exist.
    async fn update_customer(&mut self, customer: &Customer) -> Result<()>;

    /// Hard-deletes a customer. Returns false if there was nothing to delete.
    async fn delete_customer(&mut self, customer_id: CustomerId) -> Result<bool>;

    /// Lists customers, newest first.
    async fn list_customers(&mut self) -> Result<Vec<Customer>>;

    /// Applies an adjustment to the purchase counters.
    ///
    /// Fails with `Overflow` and leaves the row unchanged if a counter would
    /// leave its range.
    async fn adjust_purchase_stats(
        &mut self,
        customer_id: CustomerId,
        adjustment: &StatsAdjustment,
    ) -> Result<()>;

    /// Applies an adjustment to the return counters.
    async fn adjust_return_stats(
        &mut self,
        customer_id: CustomerId,
        adjustment: &StatsAdjustment,
    ) -> Result<()>;
}

/// One atomic unit of work across all three tables.
///
/// Nothing written through a unit of work is visible to others until
/// [`commit`](UnitOfWork::commit). Dropping it without committing discards
/// every write.
#[async_trait]
pub trait UnitOfWork: OrderStore + InventoryStore + CustomerStore + Sized {
    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

/// A store that hands out units of work.
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    type Tx: UnitOfWork;

    async fn begin(&self) -> Result<Self::Tx>;
}

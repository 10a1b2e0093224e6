use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CustomerId, OrderNo, ProductCode};
use domain::{Customer, InventoryItem, Order, OrderStatus, Quantity, StatsAdjustment};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    Result, StoreError,
    store::{CustomerStore, InventoryStore, OrderStore, TransactionalStore, UnitOfWork},
};

#[derive(Debug, Clone, Default)]
struct Tables {
    orders: HashMap<OrderNo, Order>,
    inventory: HashMap<ProductCode, InventoryItem>,
    customers: HashMap<CustomerId, Customer>,
}

/// In-memory store.
///
/// Units of work are serialized: each holds the store's lock for its whole
/// lifetime and writes to a private copy of the tables that only replaces the
/// committed state on `commit`.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    /// Clears all tables.
    pub async fn clear(&self) {
        let mut tables = self.tables.lock().await;
        *tables = Tables::default();
    }
}

/// Unit of work over an [`InMemoryStore`].
pub struct InMemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl TransactionalStore for InMemoryStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<InMemoryTx> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryTx { guard, working })
    }
}

#[async_trait]
impl UnitOfWork for InMemoryTx {
    async fn commit(self) -> Result<()> {
        let InMemoryTx { mut guard, working } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryTx {
    async fn load_order(&mut self, order_no: &OrderNo) -> Result<Option<Order>> {
        Ok(self.working.orders.get(order_no).cloned())
    }

    async fn save_order(&mut self, order: &Order, expected_version: i64) -> Result<()> {
        let actual = self
            .working
            .orders
            .get(order.order_no())
            .map(|stored| stored.version())
            .unwrap_or(0);

        if actual != expected_version {
            return Err(StoreError::ConcurrencyConflict {
                order_no: order.order_no().clone(),
                expected: expected_version,
                actual,
            });
        }

        self.working
            .orders
            .insert(order.order_no().clone(), order.clone());
        Ok(())
    }

    async fn delete_order(&mut self, order_no: &OrderNo) -> Result<bool> {
        Ok(self.working.orders.remove(order_no).is_some())
    }

    async fn list_orders(&mut self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let mut orders: Vec<_> = self
            .working
            .orders
            .values()
            .filter(|order| status.is_none_or(|s| order.status() == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.order_no().cmp(a.order_no()))
        });
        Ok(orders)
    }
}

#[async_trait]
impl InventoryStore for InMemoryTx {
    async fn adjust_stock(
        &mut self,
        product_code: &ProductCode,
        delta: Quantity,
    ) -> Result<Quantity> {
        let item = self
            .working
            .inventory
            .get_mut(product_code)
            .ok_or_else(|| StoreError::not_found("product", product_code))?;

        let next = item
            .adjusted(delta)
            .map_err(|e| StoreError::from_stock(e, product_code, item.stock_qty, delta))?;

        item.stock_qty = next;
        item.updated_at = Utc::now();
        Ok(next)
    }

    async fn get_product(&mut self, product_code: &ProductCode) -> Result<Option<InventoryItem>> {
        Ok(self.working.inventory.get(product_code).cloned())
    }

    async fn insert_product(&mut self, item: &InventoryItem) -> Result<()> {
        self.working
            .inventory
            .insert(item.product_code.clone(), item.clone());
        Ok(())
    }

    async fn list_products(&mut self) -> Result<Vec<InventoryItem>> {
        let mut items: Vec<_> = self.working.inventory.values().cloned().collect();
        items.sort_by(|a, b| a.product_code.cmp(&b.product_code));
        Ok(items)
    }
}

#[async_trait]
impl CustomerStore for InMemoryTx {
    async fn get_customer(&mut self, customer_id: CustomerId) -> Result<Option<Customer>> {
        Ok(self.working.customers.get(&customer_id).cloned())
    }

    async fn insert_customer(&mut self, customer: &Customer) -> Result<()> {
        self.working.customers.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn update_customer(&mut self, customer: &Customer) -> Result<()> {
        *self.customer_mut(customer.id)? = customer.clone();
        Ok(())
    }

    async fn delete_customer(&mut self, customer_id: CustomerId) -> Result<bool> {
        Ok(self.working.customers.remove(&customer_id).is_some())
    }

    async fn list_customers(&mut self) -> Result<Vec<Customer>> {
        let mut customers: Vec<_> = self.working.customers.values().cloned().collect();
        customers.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(&a.id.as_uuid()))
        });
        Ok(customers)
    }

    async fn adjust_purchase_stats(
        &mut self,
        customer_id: CustomerId,
        adjustment: &StatsAdjustment,
    ) -> Result<()> {
        let customer = self.customer_mut(customer_id)?;
        customer
            .stats
            .apply_purchase(adjustment)
            .map_err(|_| StoreError::overflow("customer", customer_id))?;
        customer.updated_at = adjustment.at;
        Ok(())
    }

    async fn adjust_return_stats(
        &mut self,
        customer_id: CustomerId,
        adjustment: &StatsAdjustment,
    ) -> Result<()> {
        let customer = self.customer_mut(customer_id)?;
        customer
            .stats
            .apply_return(adjustment)
            .map_err(|_| StoreError::overflow("customer", customer_id))?;
        customer.updated_at = adjustment.at;
        Ok(())
    }
}

impl InMemoryTx {
    fn customer_mut(&mut self, customer_id: CustomerId) -> Result<&mut Customer> {
        self.working
            .customers
            .get_mut(&customer_id)
            .ok_or_else(|| StoreError::not_found("customer", customer_id))
    }
}

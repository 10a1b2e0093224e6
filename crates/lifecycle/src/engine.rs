//! The order lifecycle engine.

use std::time::Instant;

use chrono::{DateTime, Utc};
use common::{CustomerId, OrderNo};
use domain::{
    Customer, NewOrder, Order, OrderError, OrderEvent, OrderPatch, OrderStatus, ReturnOptions,
    StockError, StockMovement, Transition, apply_stock_delta,
};
use store::{OrderStore, TransactionalStore, UnitOfWork};

use crate::error::{LifecycleError, Result};

/// Result of a committed transition.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    /// The order as saved.
    pub order: Order,
    pub previous_status: OrderStatus,
    /// What the transition did to inventory and customer records.
    pub event: OrderEvent,
}

/// Drives orders through their lifecycle.
///
/// Every public method is one unit of work: it either commits all of its
/// writes or none of them.
#[derive(Clone)]
pub struct LifecycleEngine<D: TransactionalStore> {
    store: D,
}

impl<D: TransactionalStore> LifecycleEngine<D> {
    /// Creates a new engine over the given store.
    pub fn new(store: D) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &D {
        &self.store
    }

    /// Draft → Completed: reserves stock for every line item.
    ///
    /// Fails with `InsufficientStock` (inventory and order untouched) if any
    /// line item needs more than is available.
    #[tracing::instrument(skip(self))]
    pub async fn complete(&self, order_no: &OrderNo) -> Result<TransitionOutcome> {
        self.transition(order_no, Transition::Complete, |order, now| {
            order.complete(now)
        })
        .await
    }

    /// Completed → Delivered: accrues the order's sell price on the customer.
    #[tracing::instrument(skip(self))]
    pub async fn deliver(&self, order_no: &OrderNo) -> Result<TransitionOutcome> {
        self.transition(order_no, Transition::Deliver, |order, now| {
            order.deliver(now)
        })
        .await
    }

    /// Completed → Draft. Puts the reserved stock back only if
    /// `rollback_stock` is set.
    #[tracing::instrument(skip(self))]
    pub async fn revert_to_draft(
        &self,
        order_no: &OrderNo,
        rollback_stock: bool,
    ) -> Result<TransitionOutcome> {
        self.transition(order_no, Transition::RevertToDraft, |order, now| {
            order.revert_to_draft(rollback_stock, now)
        })
        .await
    }

    /// Delivered → Returned, applying each chosen reversal.
    #[tracing::instrument(skip(self))]
    pub async fn return_order(
        &self,
        order_no: &OrderNo,
        options: ReturnOptions,
    ) -> Result<TransitionOutcome> {
        self.transition(order_no, Transition::Return, |order, now| {
            order.return_order(options, now)
        })
        .await
    }

    /// Opens a new draft order under a freshly generated order number.
    #[tracing::instrument(skip(self, new), fields(line_items = new.line_items.len()))]
    pub async fn create_draft(&self, new: NewOrder) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let result = create_draft_in(&mut tx, new).await;
        let order = finish(tx, result).await?;

        tracing::info!(order_no = %order.order_no(), "draft order created");
        metrics::counter!("orders_created_total").increment(1);
        Ok(order)
    }

    /// Applies a patch to a draft order.
    #[tracing::instrument(skip(self, patch))]
    pub async fn edit_draft(&self, order_no: &OrderNo, patch: OrderPatch) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let result = edit_draft_in(&mut tx, order_no, patch).await;
        finish(tx, result).await
    }

    /// Hard-deletes a draft order. Inventory and customers are not touched.
    #[tracing::instrument(skip(self))]
    pub async fn delete_draft(&self, order_no: &OrderNo) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let result = delete_draft_in(&mut tx, order_no).await;
        finish(tx, result).await?;

        tracing::info!("draft order deleted");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_no: &OrderNo) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let result = load_existing(&mut tx, order_no).await;
        finish(tx, result).await
    }

    /// Lists orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let mut tx = self.store.begin().await?;
        let result = tx.list_orders(status).await.map_err(LifecycleError::from);
        finish(tx, result).await
    }

    async fn transition<F>(
        &self,
        order_no: &OrderNo,
        transition: Transition,
        decide: F,
    ) -> Result<TransitionOutcome>
    where
        F: FnOnce(&Order, DateTime<Utc>) -> std::result::Result<OrderEvent, OrderError> + Send,
    {
        let start = Instant::now();

        let result = match self.store.begin().await {
            Ok(mut tx) => {
                let result = transition_in(&mut tx, order_no, decide).await;
                finish(tx, result).await
            }
            Err(e) => Err(e.into()),
        };

        match &result {
            Ok(outcome) => {
                metrics::counter!("order_transitions_total", "transition" => transition.name())
                    .increment(1);
                tracing::info!(
                    transition = transition.name(),
                    from = %outcome.previous_status,
                    to = %outcome.order.status(),
                    version = outcome.order.version(),
                    "order transition committed"
                );
            }
            Err(e) => {
                metrics::counter!(
                    "order_transition_rejections_total",
                    "transition" => transition.name(),
                    "code" => e.code()
                )
                .increment(1);
                tracing::warn!(
                    transition = transition.name(),
                    code = e.code(),
                    error = %e,
                    "order transition rejected"
                );
            }
        }

        metrics::histogram!("order_transition_duration_seconds", "transition" => transition.name())
            .record(start.elapsed().as_secs_f64());

        result
    }
}

/// Commits on success; otherwise rolls back and hands back the original
/// error.
pub(crate) async fn finish<T: UnitOfWork, R>(tx: T, result: Result<R>) -> Result<R> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(error = %rollback_err, "rollback failed");
            }
            Err(e)
        }
    }
}

async fn load_existing<T: UnitOfWork>(tx: &mut T, order_no: &OrderNo) -> Result<Order> {
    tx.load_order(order_no)
        .await?
        .ok_or_else(|| LifecycleError::OrderNotFound {
            order_no: order_no.clone(),
        })
}

async fn ensure_customer<T: UnitOfWork>(tx: &mut T, customer_id: CustomerId) -> Result<Customer> {
    tx.get_customer(customer_id)
        .await?
        .ok_or(LifecycleError::CustomerNotFound { customer_id })
}

async fn transition_in<T, F>(tx: &mut T, order_no: &OrderNo, decide: F) -> Result<TransitionOutcome>
where
    T: UnitOfWork,
    F: FnOnce(&Order, DateTime<Utc>) -> std::result::Result<OrderEvent, OrderError>,
{
    let mut order = load_existing(tx, order_no).await?;
    let previous_status = order.status();
    let expected_version = order.version();

    let event = decide(&order, Utc::now())?;
    apply_effects(tx, &event).await?;

    order.apply(&event);
    tx.save_order(&order, expected_version).await?;

    Ok(TransitionOutcome {
        order,
        previous_status,
        event,
    })
}

/// The event's stock movements in the order their rows are locked.
///
/// Every unit of work locks inventory rows by ascending product code, so two
/// orders sharing products cannot wait on each other.
fn ordered_movements(event: &OrderEvent) -> Vec<&StockMovement> {
    let mut movements: Vec<_> = event.stock_movements().iter().collect();
    movements.sort_by(|a, b| a.product_code.cmp(&b.product_code));
    movements
}

/// Carries out the event's stock and customer changes.
///
/// Everything is checked before the first write, so a rejected transition
/// leaves no partial changes even inside the unit of work.
async fn apply_effects<T: UnitOfWork>(tx: &mut T, event: &OrderEvent) -> Result<()> {
    let movements = ordered_movements(event);

    for movement in &movements {
        let available = tx.get_stock(&movement.product_code).await?.ok_or_else(|| {
            LifecycleError::ProductNotFound {
                product_code: movement.product_code.clone(),
            }
        })?;

        apply_stock_delta(available, movement.delta).map_err(|e| match e {
            StockError::Negative => LifecycleError::insufficient_stock(
                &movement.product_code,
                available,
                -movement.delta,
            ),
            StockError::Overflow => LifecycleError::QuantityOverflow {
                product_code: movement.product_code.clone(),
            },
        })?;
    }

    let customer_id = event.affected_customer();
    if let Some(customer_id) = customer_id {
        let mut stats = ensure_customer(tx, customer_id).await?.stats;
        if let Some(adjustment) = event.purchase_adjustment() {
            stats.apply_purchase(&adjustment)?;
        }
        if let Some(adjustment) = event.return_adjustment() {
            stats.apply_return(&adjustment)?;
        }
    }

    for movement in movements {
        tx.adjust_stock(&movement.product_code, movement.delta)
            .await?;
    }

    if let Some(customer_id) = customer_id {
        if let Some(adjustment) = event.purchase_adjustment() {
            tx.adjust_purchase_stats(customer_id, &adjustment).await?;
        }
        if let Some(adjustment) = event.return_adjustment() {
            tx.adjust_return_stats(customer_id, &adjustment).await?;
        }
    }

    Ok(())
}

async fn create_draft_in<T: UnitOfWork>(tx: &mut T, new: NewOrder) -> Result<Order> {
    let now = Utc::now();
    let customer_id = new.customer_id;
    let order = Order::draft(OrderNo::generate(now), new, now)?;

    if let Some(customer_id) = customer_id {
        ensure_customer(tx, customer_id).await?;
    }

    tx.save_order(&order, 0).await?;
    Ok(order)
}

async fn edit_draft_in<T: UnitOfWork>(
    tx: &mut T,
    order_no: &OrderNo,
    patch: OrderPatch,
) -> Result<Order> {
    let mut order = load_existing(tx, order_no).await?;
    let expected_version = order.version();
    let new_customer = patch.new_customer();

    order.edit(patch, Utc::now())?;
    if let Some(customer_id) = new_customer {
        ensure_customer(tx, customer_id).await?;
    }

    tx.save_order(&order, expected_version).await?;
    Ok(order)
}

async fn delete_draft_in<T: UnitOfWork>(tx: &mut T, order_no: &OrderNo) -> Result<()> {
    let order = load_existing(tx, order_no).await?;
    order.ensure_deletable()?;
    tx.delete_order(order_no).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Customer, InventoryItem, LineItem, Money, NewCustomer, NewProduct, Quantity};
    use rust_decimal_macros::dec;
    use store::{CustomerStore, InMemoryStore, InventoryStore, OrderStore};

    async fn seeded() -> (LifecycleEngine<InMemoryStore>, CustomerId) {
        let store = InMemoryStore::new();
        let customer = Customer::register(NewCustomer::named("Alice"), Utc::now());

        let mut tx = store.begin().await.unwrap();
        tx.insert_customer(&customer).await.unwrap();
        tx.insert_product(&InventoryItem::register(NewProduct::new("P1", 5), Utc::now()))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        (LifecycleEngine::new(store), customer.id)
    }

    fn p1_order(customer_id: CustomerId, qty: i32) -> NewOrder {
        NewOrder::for_customer(
            customer_id,
            vec![LineItem::new(
                "P1",
                qty,
                Money::new(dec!(10)),
                Money::new(dec!(20)),
            )],
        )
    }

    async fn stock(engine: &LifecycleEngine<InMemoryStore>) -> Quantity {
        let mut tx = engine.store().begin().await.unwrap();
        tx.get_stock(&"P1".into()).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_complete_reserves_stock() {
        let (engine, customer_id) = seeded().await;
        let order = engine.create_draft(p1_order(customer_id, 3)).await.unwrap();

        let outcome = engine.complete(order.order_no()).await.unwrap();

        assert_eq!(outcome.previous_status, OrderStatus::Draft);
        assert_eq!(outcome.order.status(), OrderStatus::Completed);
        assert_eq!(outcome.order.version(), 2);
        assert_eq!(stock(&engine).await, Quantity::from(2));
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let (engine, _) = seeded().await;
        let result = engine.complete(&OrderNo::new("ORD-MISSING")).await;
        assert!(matches!(result, Err(LifecycleError::OrderNotFound { .. })));
    }

    #[tokio::test]
    async fn test_stale_save_rolls_back_everything() {
        let (engine, customer_id) = seeded().await;
        let loaded = engine.create_draft(p1_order(customer_id, 3)).await.unwrap();

        let mut tx = engine.store().begin().await.unwrap();
        let event = loaded.complete(Utc::now()).unwrap();
        apply_effects(&mut tx, &event).await.unwrap();

        // Another writer saves version 2 first.
        let mut other = loaded.clone();
        other
            .edit(OrderPatch::default(), Utc::now())
            .unwrap();
        tx.save_order(&other, 1).await.unwrap();

        let mut mine = loaded.clone();
        mine.apply(&event);
        let result = tx
            .save_order(&mine, loaded.version())
            .await
            .map_err(LifecycleError::from);
        let result = finish(tx, result).await;

        assert_eq!(result.unwrap_err().code(), "concurrency_conflict");
        assert_eq!(stock(&engine).await, Quantity::from(5));
        let reloaded = engine.get_order(loaded.order_no()).await.unwrap();
        assert_eq!(reloaded.status(), OrderStatus::Draft);
        assert_eq!(reloaded.version(), 1);
    }

    #[tokio::test]
    async fn test_create_draft_requires_existing_customer() {
        let (engine, _) = seeded().await;
        let result = engine.create_draft(p1_order(CustomerId::new(), 1)).await;
        assert!(matches!(
            result,
            Err(LifecycleError::CustomerNotFound { .. })
        ));
        assert_eq!(engine.store().order_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_draft_rejects_overflowing_totals() {
        let (engine, customer_id) = seeded().await;
        let new = NewOrder::for_customer(
            customer_id,
            vec![LineItem::new(
                "P1",
                Quantity::new(rust_decimal::Decimal::MAX),
                Money::new(dec!(1)),
                Money::new(dec!(2)),
            )],
        );

        let result = engine.create_draft(new).await;
        assert!(matches!(
            result,
            Err(LifecycleError::Order(OrderError::AmountOverflow { .. }))
        ));
        assert_eq!(engine.store().order_count().await, 0);
    }

    #[tokio::test]
    async fn test_releasing_stock_past_the_decimal_range_is_refused() {
        let (engine, customer_id) = seeded().await;
        let order = engine.create_draft(p1_order(customer_id, 3)).await.unwrap();
        engine.complete(order.order_no()).await.unwrap();

        let mut tx = engine.store().begin().await.unwrap();
        let headroom = Quantity::new(rust_decimal::Decimal::MAX - dec!(3));
        tx.adjust_stock(&"P1".into(), headroom).await.unwrap();
        tx.commit().await.unwrap();
        let before = stock(&engine).await;

        let result = engine.revert_to_draft(order.order_no(), true).await;
        assert!(matches!(
            result,
            Err(LifecycleError::QuantityOverflow { .. })
        ));
        assert_eq!(result.unwrap_err().code(), "quantity_overflow");
        assert_eq!(stock(&engine).await, before);
        let reloaded = engine.get_order(order.order_no()).await.unwrap();
        assert_eq!(reloaded.status(), OrderStatus::Completed);
    }

    #[tokio::test]
    async fn test_overflowing_customer_stats_roll_back_delivery() {
        let (engine, customer_id) = seeded().await;
        let order = engine.create_draft(p1_order(customer_id, 1)).await.unwrap();
        engine.complete(order.order_no()).await.unwrap();

        let mut tx = engine.store().begin().await.unwrap();
        let mut customer = tx.get_customer(customer_id).await.unwrap().unwrap();
        customer.stats.total_purchase_amount = Money::new(rust_decimal::Decimal::MAX);
        tx.update_customer(&customer).await.unwrap();
        tx.commit().await.unwrap();

        let result = engine.deliver(order.order_no()).await;
        assert_eq!(result.unwrap_err().code(), "stats_overflow");
        let reloaded = engine.get_order(order.order_no()).await.unwrap();
        assert_eq!(reloaded.status(), OrderStatus::Completed);
    }

    #[test]
    fn test_movements_are_locked_in_product_code_order() {
        let order = Order::draft(
            OrderNo::new("ORD-1"),
            NewOrder::for_customer(
                CustomerId::new(),
                vec![
                    LineItem::new("P2", 1, Money::new(dec!(1)), Money::new(dec!(2))),
                    LineItem::new("P3", 2, Money::new(dec!(1)), Money::new(dec!(2))),
                    LineItem::new("P1", 3, Money::new(dec!(1)), Money::new(dec!(2))),
                ],
            ),
            Utc::now(),
        )
        .unwrap();
        let event = order.complete(Utc::now()).unwrap();

        let locked: Vec<_> = ordered_movements(&event)
            .into_iter()
            .map(|m| (m.product_code.as_str(), m.delta))
            .collect();
        assert_eq!(
            locked,
            vec![
                ("P1", Quantity::from(-3)),
                ("P2", Quantity::from(-1)),
                ("P3", Quantity::from(-2)),
            ]
        );
    }
}

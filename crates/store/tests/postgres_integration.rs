//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --nocapture
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{CustomerId, OrderNo, ProductCode};
use domain::{
    Customer, InventoryItem, LineItem, Money, NewCustomer, NewOrder, NewProduct, Order,
    OrderPatch, OrderStatus, Quantity, StatsAdjustment,
};
use rust_decimal_macros::dec;
use serial_test::serial;
use sqlx::PgPool;
use store::{
    CustomerStore, InventoryStore, OrderStore, PostgresStore, StoreError, TransactionalStore,
    UnitOfWork,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!("../../../migrations/001_create_tables.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let store = PostgresStore::connect(&info.connection_string, 5)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE orders, inventory, customers")
        .execute(store.pool())
        .await
        .unwrap();

    store
}

fn p1_draft(order_no: &str, customer_id: CustomerId) -> Order {
    Order::draft(
        OrderNo::new(order_no),
        NewOrder {
            address: Some("12 Main St".to_string()),
            final_sell_price: Some(Money::new(dec!(55))),
            ..NewOrder::for_customer(
                customer_id,
                vec![
                    LineItem::new("P1", 3, Money::new(dec!(10)), Money::new(dec!(20))),
                    LineItem::new(
                        "BEAD-G",
                        Quantity::new(dec!(2.5)),
                        Money::new(dec!(0.4)),
                        Money::new(dec!(1.2)),
                    ),
                ],
            )
        },
        Utc::now(),
    )
    .unwrap()
}

#[tokio::test]
#[serial]
async fn order_round_trips_through_detail_column() {
    let store = get_test_store().await;
    let order = p1_draft("ORD-PG-1", CustomerId::new());

    let mut tx = store.begin().await.unwrap();
    tx.save_order(&order, 0).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let loaded = tx.load_order(order.order_no()).await.unwrap().unwrap();
    tx.rollback().await.unwrap();

    assert_eq!(loaded.line_items(), order.line_items());
    assert_eq!(loaded.sell_price(), Money::new(dec!(63)));
    assert_eq!(loaded.final_sell_price(), Some(Money::new(dec!(55))));
    assert_eq!(loaded.status(), OrderStatus::Draft);
    assert_eq!(loaded.version(), 1);
    assert_eq!(loaded.address(), Some("12 Main St"));
}

#[tokio::test]
#[serial]
async fn stale_version_is_a_conflict() {
    let store = get_test_store().await;
    let mut order = p1_draft("ORD-PG-2", CustomerId::new());

    let mut tx = store.begin().await.unwrap();
    tx.save_order(&order, 0).await.unwrap();
    tx.commit().await.unwrap();

    order
        .edit(
            OrderPatch {
                remark: Some(Some("rush".to_string())),
                ..OrderPatch::default()
            },
            Utc::now(),
        )
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    let result = tx.save_order(&order, 0).await;
    assert!(matches!(
        result,
        Err(StoreError::ConcurrencyConflict {
            expected: 0,
            actual: 1,
            ..
        })
    ));
    drop(tx);

    let mut tx = store.begin().await.unwrap();
    tx.save_order(&order, 1).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let loaded = tx.load_order(order.order_no()).await.unwrap().unwrap();
    assert_eq!(loaded.remark(), Some("rush"));
    assert_eq!(loaded.version(), 2);
}

#[tokio::test]
#[serial]
async fn uncommitted_writes_are_discarded_on_drop() {
    let store = get_test_store().await;

    {
        let mut tx = store.begin().await.unwrap();
        tx.insert_product(&InventoryItem::register(
            NewProduct::new("P1", 5),
            Utc::now(),
        ))
        .await
        .unwrap();
    }

    let mut tx = store.begin().await.unwrap();
    assert!(
        tx.get_product(&ProductCode::new("P1"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
#[serial]
async fn adjust_stock_never_goes_negative() {
    let store = get_test_store().await;
    let code = ProductCode::new("P1");

    let mut tx = store.begin().await.unwrap();
    tx.insert_product(&InventoryItem::register(
        NewProduct::new("P1", 5),
        Utc::now(),
    ))
    .await
    .unwrap();

    let next = tx.adjust_stock(&code, Quantity::from(-3)).await.unwrap();
    assert_eq!(next, Quantity::from(2));

    let result = tx.adjust_stock(&code, Quantity::from(-3)).await;
    assert!(matches!(result, Err(StoreError::NegativeStock { .. })));

    // The transaction is still usable after the refusal.
    assert_eq!(tx.get_stock(&code).await.unwrap(), Some(Quantity::from(2)));

    let missing = tx
        .adjust_stock(&ProductCode::new("NOPE"), Quantity::from(1))
        .await;
    assert!(matches!(missing, Err(StoreError::RowNotFound { .. })));
    tx.commit().await.unwrap();
}

#[tokio::test]
#[serial]
async fn customer_stats_adjust_incrementally() {
    let store = get_test_store().await;
    let customer = Customer::register(NewCustomer::named("Alice"), Utc::now());
    let amount = Money::new(dec!(60));
    let now = Utc::now();

    let mut tx = store.begin().await.unwrap();
    tx.insert_customer(&customer).await.unwrap();
    tx.adjust_purchase_stats(customer.id, &StatsAdjustment::accrue(amount, now))
        .await
        .unwrap();
    tx.adjust_purchase_stats(customer.id, &StatsAdjustment::reverse(amount, now))
        .await
        .unwrap();
    tx.adjust_return_stats(customer.id, &StatsAdjustment::accrue(amount, now))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let stored = tx.get_customer(customer.id).await.unwrap().unwrap();
    assert_eq!(stored.stats.purchase_times, 0);
    assert!(stored.stats.total_purchase_amount.is_zero());
    assert!(stored.stats.last_purchase_date.is_some());
    assert_eq!(stored.stats.return_times, 1);
    assert_eq!(stored.stats.total_return_amount, amount);

    let missing = tx
        .adjust_return_stats(CustomerId::new(), &StatsAdjustment::accrue(amount, now))
        .await;
    assert!(matches!(missing, Err(StoreError::RowNotFound { .. })));
}

#[tokio::test]
#[serial]
async fn corrupt_detail_is_reported() {
    let store = get_test_store().await;

    sqlx::query(
        "INSERT INTO orders (order_no, detail) VALUES ('ORD-BAD', '[{\"product_code\": \"P1\"}]')",
    )
    .execute(store.pool())
    .await
    .unwrap();

    let mut tx = store.begin().await.unwrap();
    let result = tx.load_order(&OrderNo::new("ORD-BAD")).await;
    assert!(matches!(result, Err(StoreError::Corrupt(_))));
}

#[tokio::test]
#[serial]
async fn null_sell_price_reads_as_zero() {
    let store = get_test_store().await;

    sqlx::query("INSERT INTO orders (order_no, status, sell_price) VALUES ('ORD-OLD', 'Delivered', NULL)")
        .execute(store.pool())
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    let order = tx
        .load_order(&OrderNo::new("ORD-OLD"))
        .await
        .unwrap()
        .unwrap();
    assert!(order.sell_price().is_zero());
    assert_eq!(order.status(), OrderStatus::Delivered);
    assert!(order.line_items().is_empty());
}

#[tokio::test]
#[serial]
async fn list_and_delete_orders() {
    let store = get_test_store().await;
    let customer_id = CustomerId::new();

    let draft = p1_draft("ORD-PG-A", customer_id);
    let mut completed = p1_draft("ORD-PG-B", customer_id);
    let event = completed.complete(Utc::now()).unwrap();
    completed.apply(&event);

    let mut tx = store.begin().await.unwrap();
    tx.save_order(&draft, 0).await.unwrap();
    tx.save_order(&completed, 0).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.list_orders(None).await.unwrap().len(), 2);
    let drafts = tx.list_orders(Some(OrderStatus::Draft)).await.unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].order_no(), draft.order_no());

    assert!(tx.delete_order(draft.order_no()).await.unwrap());
    assert!(!tx.delete_order(draft.order_no()).await.unwrap());
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.list_orders(None).await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
async fn adjust_stock_refuses_overflow() {
    let store = get_test_store().await;
    let code = ProductCode::new("P1");
    let max = Quantity::new(rust_decimal::Decimal::MAX);

    let mut tx = store.begin().await.unwrap();
    tx.insert_product(&InventoryItem::register(NewProduct::new("P1", max), Utc::now()))
        .await
        .unwrap();

    let result = tx.adjust_stock(&code, Quantity::from(1)).await;
    assert!(matches!(result, Err(StoreError::Overflow { .. })));
    assert_eq!(tx.get_stock(&code).await.unwrap(), Some(max));
}

#[tokio::test]
#[serial]
async fn customers_can_be_updated_listed_and_deleted() {
    let store = get_test_store().await;
    let alice = Customer::register(NewCustomer::named("Alice"), Utc::now());
    let bob = Customer::register(
        NewCustomer::named("Bob"),
        alice.created_at + chrono::Duration::seconds(1),
    );

    let mut tx = store.begin().await.unwrap();
    tx.insert_customer(&alice).await.unwrap();
    tx.insert_customer(&bob).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let names: Vec<_> = tx
        .list_customers()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Bob", "Alice"]);

    let mut renamed = alice.clone();
    renamed.name = "Alicia".to_string();
    renamed.phone = Some("555-0100".to_string());
    renamed.stats.purchase_times = 4;
    tx.update_customer(&renamed).await.unwrap();

    assert!(tx.delete_customer(bob.id).await.unwrap());
    assert!(!tx.delete_customer(bob.id).await.unwrap());
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let remaining = tx.list_customers().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "Alicia");
    assert_eq!(remaining[0].phone.as_deref(), Some("555-0100"));
    assert_eq!(remaining[0].stats.purchase_times, 4);

    let missing = tx.update_customer(&bob).await;
    assert!(matches!(missing, Err(StoreError::RowNotFound { .. })));
}

#[tokio::test]
#[serial]
async fn products_are_listed_by_code() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    for code in ["P2", "BEAD-G", "P1"] {
        tx.insert_product(&InventoryItem::register(NewProduct::new(code, 1), Utc::now()))
            .await
            .unwrap();
    }
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let codes: Vec<_> = tx
        .list_products()
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.product_code)
        .collect();
    assert_eq!(
        codes,
        vec![
            ProductCode::new("BEAD-G"),
            ProductCode::new("P1"),
            ProductCode::new("P2")
        ]
    );
}

use async_trait::async_trait;
use common::{CustomerId, OrderNo, ProductCode};
use domain::{
    Customer, CustomerError, CustomerStats, CustomerStatus, InventoryItem, LineItems, Money, Order,
    OrderParts, OrderStatus, Quantity, StatsAdjustment, StockStatus, apply_stock_delta,
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgPoolOptions, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{CustomerStore, InventoryStore, OrderStore, TransactionalStore, UnitOfWork},
};

const ORDER_COLUMNS: &str = "order_no, status, customer_id, customer_name, address, express_no, \
     remark, detail, cost_price, sell_price, final_sell_price, created_at, updated_at, version";

const INVENTORY_COLUMNS: &str =
    "product_code, stock_qty, status, stock_unit, created_at, updated_at";

const CUSTOMER_COLUMNS: &str = "id, name, status, phone, address, remark, last_purchase_date, \
     total_purchase_amount, purchase_times, last_return_date, total_return_amount, return_times, \
     created_at, updated_at";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }
}

/// Unit of work backed by a PostgreSQL transaction.
///
/// Rows read through it are locked with `FOR UPDATE` until commit or
/// rollback. Dropping it rolls the transaction back.
pub struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl TransactionalStore for PostgresStore {
    type Tx = PostgresTx;

    async fn begin(&self) -> Result<PostgresTx> {
        Ok(PostgresTx {
            tx: self.pool.begin().await?,
        })
    }
}

#[async_trait]
impl UnitOfWork for PostgresTx {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

fn row_to_order(row: PgRow) -> Result<Order> {
    let order_no: String = row.try_get("order_no")?;
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<OrderStatus>()
        .map_err(|e| StoreError::Corrupt(format!("order {order_no}: {e}")))?;
    let detail: serde_json::Value = row.try_get("detail")?;
    let line_items: LineItems = serde_json::from_value(detail)
        .map_err(|e| StoreError::Corrupt(format!("order {order_no} detail: {e}")))?;
    let sell_price: Option<Decimal> = row.try_get("sell_price")?;

    Ok(Order::from_parts(OrderParts {
        status,
        customer_id: row
            .try_get::<Option<Uuid>, _>("customer_id")?
            .map(CustomerId::from_uuid),
        customer_name: row.try_get("customer_name")?,
        address: row.try_get("address")?,
        express_no: row.try_get("express_no")?,
        remark: row.try_get("remark")?,
        line_items,
        cost_price: Money::new(row.try_get("cost_price")?),
        sell_price: Money::new(sell_price.unwrap_or_default()),
        final_sell_price: row
            .try_get::<Option<Decimal>, _>("final_sell_price")?
            .map(Money::new),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        version: row.try_get("version")?,
        order_no: OrderNo::new(order_no),
    }))
}

fn row_to_product(row: PgRow) -> Result<InventoryItem> {
    Ok(InventoryItem {
        product_code: ProductCode::new(row.try_get::<String, _>("product_code")?),
        stock_qty: Quantity::new(row.try_get("stock_qty")?),
        status: StockStatus::parse(row.try_get::<&str, _>("status")?),
        stock_unit: row.try_get("stock_unit")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_customer(row: PgRow) -> Result<Customer> {
    Ok(Customer {
        id: CustomerId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        status: CustomerStatus::parse(row.try_get::<&str, _>("status")?),
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        remark: row.try_get("remark")?,
        stats: CustomerStats {
            last_purchase_date: row.try_get("last_purchase_date")?,
            total_purchase_amount: Money::new(row.try_get("total_purchase_amount")?),
            purchase_times: row.try_get("purchase_times")?,
            last_return_date: row.try_get("last_return_date")?,
            total_return_amount: Money::new(row.try_get("total_return_amount")?),
            return_times: row.try_get("return_times")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl OrderStore for PostgresTx {
    async fn load_order(&mut self, order_no: &OrderNo) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_no = $1 FOR UPDATE"
        ))
        .bind(order_no.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_order).transpose()
    }

    async fn save_order(&mut self, order: &Order, expected_version: i64) -> Result<()> {
        let order_no = order.order_no();
        let actual: Option<i64> =
            sqlx::query_scalar("SELECT version FROM orders WHERE order_no = $1 FOR UPDATE")
                .bind(order_no.as_str())
                .fetch_optional(&mut *self.tx)
                .await?;
        let actual = actual.unwrap_or(0);

        if actual != expected_version {
            return Err(StoreError::ConcurrencyConflict {
                order_no: order_no.clone(),
                expected: expected_version,
                actual,
            });
        }

        let detail = serde_json::to_value(order.line_items())?;
        let sql = if expected_version == 0 {
            r#"
            INSERT INTO orders (order_no, status, customer_id, customer_name, address, express_no,
                                remark, detail, cost_price, sell_price, final_sell_price,
                                created_at, updated_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#
        } else {
            r#"
            UPDATE orders SET
                status = $2, customer_id = $3, customer_name = $4, address = $5,
                express_no = $6, remark = $7, detail = $8, cost_price = $9, sell_price = $10,
                final_sell_price = $11, created_at = $12, updated_at = $13, version = $14
            WHERE order_no = $1
            "#
        };

        sqlx::query(sql)
            .bind(order_no.as_str())
            .bind(order.status().as_str())
            .bind(order.customer_id().map(|id| id.as_uuid()))
            .bind(order.customer_name())
            .bind(order.address())
            .bind(order.express_no())
            .bind(order.remark())
            .bind(detail)
            .bind(order.cost_price().amount())
            .bind(order.sell_price().amount())
            .bind(order.final_sell_price().map(|price| price.amount()))
            .bind(order.created_at())
            .bind(order.updated_at())
            .bind(order.version())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                // A concurrent insert of the same order number
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("orders_pkey")
                {
                    return StoreError::ConcurrencyConflict {
                        order_no: order_no.clone(),
                        expected: expected_version,
                        actual: order.version(),
                    };
                }
                StoreError::Database(e)
            })?;

        Ok(())
    }

    async fn delete_order(&mut self, order_no: &OrderNo) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE order_no = $1")
            .bind(order_no.as_str())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_orders(&mut self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE ($1::text IS NULL OR status = $1) \
             ORDER BY created_at DESC, order_no DESC"
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_order).collect()
    }
}

#[async_trait]
impl InventoryStore for PostgresTx {
    async fn adjust_stock(
        &mut self,
        product_code: &ProductCode,
        delta: Quantity,
    ) -> Result<Quantity> {
        // Check first: a CHECK violation would abort the whole transaction.
        let stock: Option<Decimal> =
            sqlx::query_scalar("SELECT stock_qty FROM inventory WHERE product_code = $1 FOR UPDATE")
                .bind(product_code.as_str())
                .fetch_optional(&mut *self.tx)
                .await?;
        let stock = stock
            .map(Quantity::new)
            .ok_or_else(|| StoreError::not_found("product", product_code))?;

        apply_stock_delta(stock, delta)
            .map_err(|e| StoreError::from_stock(e, product_code, stock, delta))?;

        let next: Decimal = sqlx::query_scalar(
            r#"
            UPDATE inventory SET stock_qty = stock_qty + $2, updated_at = NOW()
            WHERE product_code = $1
            RETURNING stock_qty
            "#,
        )
        .bind(product_code.as_str())
        .bind(delta.value())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("stock_qty_non_negative")
            {
                return StoreError::NegativeStock {
                    product_code: product_code.clone(),
                    stock,
                    delta,
                };
            }
            StoreError::Database(e)
        })?;

        Ok(Quantity::new(next))
    }

    async fn get_product(&mut self, product_code: &ProductCode) -> Result<Option<InventoryItem>> {
        let row = sqlx::query(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory WHERE product_code = $1 FOR UPDATE"
        ))
        .bind(product_code.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_product).transpose()
    }

    async fn insert_product(&mut self, item: &InventoryItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory (product_code, stock_qty, status, stock_unit, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(item.product_code.as_str())
        .bind(item.stock_qty.value())
        .bind(item.status.as_str())
        .bind(item.stock_unit.as_deref())
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn list_products(&mut self) -> Result<Vec<InventoryItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory ORDER BY product_code"
        ))
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_product).collect()
    }
}

impl PostgresTx {
    /// Locks the customer row, applies `apply` to its stats and writes the
    /// row back. NUMERIC accepts values `Decimal` cannot read, so the sums
    /// are checked here rather than in SQL.
    async fn adjust_stats(
        &mut self,
        customer_id: CustomerId,
        adjustment: &StatsAdjustment,
        apply: fn(&mut CustomerStats, &StatsAdjustment) -> std::result::Result<(), CustomerError>,
    ) -> Result<()> {
        let mut customer = self
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| StoreError::not_found("customer", customer_id))?;

        apply(&mut customer.stats, adjustment)
            .map_err(|_| StoreError::overflow("customer", customer_id))?;
        customer.updated_at = adjustment.at;

        self.update_customer(&customer).await
    }
}

#[async_trait]
impl CustomerStore for PostgresTx {
    async fn get_customer(&mut self, customer_id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1 FOR UPDATE"
        ))
        .bind(customer_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_customer).transpose()
    }

    async fn insert_customer(&mut self, customer: &Customer) -> Result<()> {
        let stats = &customer.stats;
        sqlx::query(&format!(
            "INSERT INTO customers ({CUSTOMER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        ))
        .bind(customer.id.as_uuid())
        .bind(&customer.name)
        .bind(customer.status.as_str())
        .bind(customer.phone.as_deref())
        .bind(customer.address.as_deref())
        .bind(customer.remark.as_deref())
        .bind(stats.last_purchase_date)
        .bind(stats.total_purchase_amount.amount())
        .bind(stats.purchase_times)
        .bind(stats.last_return_date)
        .bind(stats.total_return_amount.amount())
        .bind(stats.return_times)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_customer(&mut self, customer: &Customer) -> Result<()> {
        let stats = &customer.stats;
        let result = sqlx::query(
            r#"
            UPDATE customers SET
                name = $2, status = $3, phone = $4, address = $5, remark = $6,
                last_purchase_date = $7, total_purchase_amount = $8, purchase_times = $9,
                last_return_date = $10, total_return_amount = $11, return_times = $12,
                updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(customer.id.as_uuid())
        .bind(&customer.name)
        .bind(customer.status.as_str())
        .bind(customer.phone.as_deref())
        .bind(customer.address.as_deref())
        .bind(customer.remark.as_deref())
        .bind(stats.last_purchase_date)
        .bind(stats.total_purchase_amount.amount())
        .bind(stats.purchase_times)
        .bind(stats.last_return_date)
        .bind(stats.total_return_amount.amount())
        .bind(stats.return_times)
        .bind(customer.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("customer", customer.id));
        }
        Ok(())
    }

    async fn delete_customer(&mut self, customer_id: CustomerId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(customer_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_customers(&mut self) -> Result<Vec<Customer>> {
        let rows = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_customer).collect()
    }

    async fn adjust_purchase_stats(
        &mut self,
        customer_id: CustomerId,
        adjustment: &StatsAdjustment,
    ) -> Result<()> {
        self.adjust_stats(customer_id, adjustment, CustomerStats::apply_purchase)
            .await
    }

    async fn adjust_return_stats(
        &mut self,
        customer_id: CustomerId,
        adjustment: &StatsAdjustment,
    ) -> Result<()> {
        self.adjust_stats(customer_id, adjustment, CustomerStats::apply_return)
            .await
    }
}
